//! Gatekeeper module: what may be processed where
//!
//! - Privacy: wallet addresses and long reports are never acted on in a
//!   shared channel; the sender is pointed to a direct message instead
//! - Triage: keyword classification of forwarded bug reports

pub mod privacy;
pub mod triage;

pub use privacy::{guard, is_shared_by_sign, GateDecision, PayloadKind, REPORT_SUMMARY_LEN};
pub use triage::{analyze_report, BugAnalysis, Category, Level, Priority};
