//! Token request records
//!
//! A `Request` is one user's claim for test tokens against one wallet.
//! Records are never deleted; rejected requests stay in the ledger so a
//! user who was turned down cannot simply submit again.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Length of a wallet address including the `0x` prefix.
pub const WALLET_ADDRESS_LEN: usize = 42;

/// Chat-platform user identifier.
///
/// Kept as a string so the ledger does not depend on any one transport's
/// numeric id width.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        UserId(id.to_string())
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        UserId(id.to_string())
    }
}

/// Opaque request identifier (`req_` + random 128-bit id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn generate() -> Self {
        RequestId(format!("req_{}", uuid::Uuid::new_v4().simple()))
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        RequestId(id.to_string())
    }
}

/// Request lifecycle status.
///
/// Only `Pending -> Approved` and `Pending -> Rejected` are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }

    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        matches!(
            (self, next),
            (RequestStatus::Pending, RequestStatus::Approved)
                | (RequestStatus::Pending, RequestStatus::Rejected)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A syntactically valid wallet address: `0x` followed by 40 hex digits.
///
/// The original casing is kept for display; equality checks go through
/// [`WalletAddress::canonical`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WalletAddress(String);

impl WalletAddress {
    /// Parse a wallet address, rejecting anything but `0x` + 40 hex chars.
    pub fn parse(input: &str) -> Option<Self> {
        let digits = input.strip_prefix("0x")?;
        if input.len() != WALLET_ADDRESS_LEN || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        Some(WalletAddress(input.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lower-cased form used as the wallet index key.
    pub fn canonical(&self) -> String {
        canonical_wallet(&self.0)
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn canonical_wallet(address: &str) -> String {
    address.to_ascii_lowercase()
}

/// Shortened address for logs and shared channels: `0x5290...9EE7`.
///
/// Inputs too short to shorten keep only their first few characters.
pub fn mask_wallet(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 10 {
        let head: String = chars.iter().take(6).collect();
        return format!("{}...", head);
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// One token-claim attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub request_id: RequestId,
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub display_name: String,
    /// Original casing, as submitted.
    pub wallet_address: String,
    /// Unix seconds.
    pub submitted_at: u64,
    pub status: RequestStatus,
    /// Submission order within the ledger.
    pub seq: u64,
}

impl Request {
    pub fn canonical_wallet(&self) -> String {
        canonical_wallet(&self.wallet_address)
    }

    /// `@username` when present, otherwise a placeholder.
    pub fn handle(&self) -> String {
        match &self.username {
            Some(name) => format!("@{}", name),
            None => "no username".to_string(),
        }
    }

    pub fn submitted_at_display(&self) -> String {
        format_timestamp(self.submitted_at)
    }
}

/// A request as recorded in the approved/rejected collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecidedRequest {
    #[serde(flatten)]
    pub request: Request,
    /// Unix seconds at which the admin decided.
    pub decided_at: u64,
    /// Decision order within its collection.
    pub order: u64,
}

/// Current time as Unix seconds.
///
/// A clock set before the epoch reads as 0 rather than failing.
pub fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Render Unix seconds as RFC 3339 (UTC).
pub fn format_timestamp(unix_secs: u64) -> String {
    let time = UNIX_EPOCH + Duration::from_secs(unix_secs);
    humantime::format_rfc3339_seconds(time).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = "0x52908400098527886E0F7030069857D2E4169EE7";

    #[test]
    fn test_wallet_parse_valid() {
        let wallet = WalletAddress::parse(VALID).unwrap();
        assert_eq!(wallet.as_str(), VALID);
        assert_eq!(wallet.canonical(), VALID.to_ascii_lowercase());
    }

    #[test]
    fn test_wallet_parse_rejects_short() {
        assert!(WalletAddress::parse("0x123").is_none());
    }

    #[test]
    fn test_wallet_parse_rejects_missing_prefix() {
        let no_prefix = &VALID[2..];
        assert_eq!(no_prefix.len(), 40);
        assert!(WalletAddress::parse(no_prefix).is_none());
        // 42 chars but wrong prefix
        assert!(WalletAddress::parse(&format!("1x{}", no_prefix)).is_none());
    }

    #[test]
    fn test_wallet_parse_rejects_non_hex() {
        let bad = format!("0x{}", "g".repeat(40));
        assert_eq!(bad.len(), WALLET_ADDRESS_LEN);
        assert!(WalletAddress::parse(&bad).is_none());
    }

    #[test]
    fn test_wallet_parse_rejects_uppercase_prefix() {
        assert!(WalletAddress::parse(&format!("0X{}", &VALID[2..])).is_none());
    }

    #[test]
    fn test_status_transitions() {
        use RequestStatus::*;
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(!Pending.can_transition_to(Pending));
        assert!(!Approved.can_transition_to(Rejected));
        assert!(!Rejected.can_transition_to(Approved));
        assert!(!Approved.can_transition_to(Approved));
        assert!(Approved.is_terminal());
        assert!(!Pending.is_terminal());
    }

    #[test]
    fn test_request_id_generate_unique() {
        let a = RequestId::generate();
        let b = RequestId::generate();
        assert_ne!(a, b);
        assert!(a.0.starts_with("req_"));
        assert_eq!(a.0.len(), 4 + 32);
    }

    #[test]
    fn test_request_serializes_camel_case() {
        let request = Request {
            request_id: RequestId::from("req_1"),
            user_id: UserId::from(42),
            username: None,
            display_name: "Alice".to_string(),
            wallet_address: VALID.to_string(),
            submitted_at: 0,
            status: RequestStatus::Pending,
            seq: 0,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["requestId"], "req_1");
        assert_eq!(json["userId"], "42");
        assert_eq!(json["walletAddress"], VALID);
        assert_eq!(json["status"], "pending");
        assert!(json.get("username").is_none());
    }

    #[test]
    fn test_mask_wallet() {
        assert_eq!(mask_wallet(VALID), "0x5290...9EE7");
        assert_eq!(mask_wallet("0x12"), "0x12...");
        // multi-byte input does not split a char
        assert_eq!(mask_wallet("ééééééééééééé"), "éééééé...éééé");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn test_handle() {
        let mut request = Request {
            request_id: RequestId::from("req_1"),
            user_id: UserId::from(1),
            username: Some("alice".to_string()),
            display_name: "Alice".to_string(),
            wallet_address: VALID.to_string(),
            submitted_at: 0,
            status: RequestStatus::Pending,
            seq: 0,
        };
        assert_eq!(request.handle(), "@alice");
        request.username = None;
        assert_eq!(request.handle(), "no username");
    }
}
