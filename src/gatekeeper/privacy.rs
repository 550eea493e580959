//! Privacy gate for shared channels
//!
//! Applied before a wallet submission or a bug-report forward. In a shared
//! channel a wallet is always deferred (masked), and a long report is
//! deferred with a truncated summary. Direct conversations always proceed.

use crate::ledger::request::mask_wallet;

/// Reports longer than this are deferred in shared channels.
pub const REPORT_SUMMARY_LEN: usize = 100;

/// What kind of sensitive payload is being gated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Wallet,
    BugReport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Process the payload normally.
    Proceed,
    /// Do not process here; the masked summary may be echoed back.
    Defer(String),
}

impl GateDecision {
    pub fn is_proceed(&self) -> bool {
        matches!(self, GateDecision::Proceed)
    }
}

pub fn guard(is_shared: bool, kind: PayloadKind, payload: &str) -> GateDecision {
    if !is_shared {
        return GateDecision::Proceed;
    }

    match kind {
        PayloadKind::Wallet => GateDecision::Defer(mask_wallet(payload)),
        PayloadKind::BugReport => {
            if payload.chars().count() > REPORT_SUMMARY_LEN {
                let summary: String = payload.chars().take(REPORT_SUMMARY_LEN).collect();
                GateDecision::Defer(format!("{}...", summary))
            } else {
                GateDecision::Proceed
            }
        }
    }
}

/// Transports that only expose a channel id mark multi-party channels with
/// negative ids.
pub fn is_shared_by_sign(channel_id: i64) -> bool {
    channel_id < 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const WALLET: &str = "0x52908400098527886E0F7030069857D2E4169EE7";

    #[test]
    fn test_wallet_in_shared_channel_is_masked() {
        match guard(true, PayloadKind::Wallet, WALLET) {
            GateDecision::Defer(summary) => {
                assert_eq!(summary, "0x5290...9EE7");
                assert!(summary.starts_with(&WALLET[..6]));
                assert!(summary.ends_with(&WALLET[38..]));
                // nothing from the middle leaks
                assert!(!summary.contains(&WALLET[6..38]));
            }
            GateDecision::Proceed => panic!("wallet must be deferred in shared channel"),
        }
    }

    #[test]
    fn test_direct_channel_always_proceeds() {
        assert_eq!(guard(false, PayloadKind::Wallet, WALLET), GateDecision::Proceed);
        let long = "x".repeat(500);
        assert_eq!(guard(false, PayloadKind::BugReport, &long), GateDecision::Proceed);
    }

    #[test]
    fn test_short_report_in_shared_channel_proceeds() {
        let report = "the swap button does nothing on testnet";
        assert!(guard(true, PayloadKind::BugReport, report).is_proceed());

        let exactly = "a".repeat(REPORT_SUMMARY_LEN);
        assert!(guard(true, PayloadKind::BugReport, &exactly).is_proceed());
    }

    #[test]
    fn test_long_report_in_shared_channel_is_truncated() {
        let report = format!("{}TAIL", "b".repeat(REPORT_SUMMARY_LEN));
        assert_eq!(
            guard(true, PayloadKind::BugReport, &report),
            GateDecision::Defer(format!("{}...", "b".repeat(REPORT_SUMMARY_LEN)))
        );
    }

    #[test]
    fn test_truncation_counts_chars_not_bytes() {
        let report = "é".repeat(REPORT_SUMMARY_LEN + 1);
        match guard(true, PayloadKind::BugReport, &report) {
            GateDecision::Defer(summary) => {
                assert_eq!(summary.chars().count(), REPORT_SUMMARY_LEN + 3)
            }
            GateDecision::Proceed => panic!("expected Defer"),
        }
    }

    #[test]
    fn test_shared_by_sign() {
        assert!(is_shared_by_sign(-1001234));
        assert!(!is_shared_by_sign(42));
        assert!(!is_shared_by_sign(0));
    }
}
