//! Persisted ledger document
//!
//! One JSON document holds every index. `requests` is authoritative;
//! `users`, `wallets`, `approved` and `rejected` are derived views that the
//! ledger rewrites together with `requests` on every mutation.

use crate::ledger::request::{DecidedRequest, Request, RequestId, RequestStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    /// requestId -> Request
    #[serde(default)]
    pub requests: BTreeMap<String, Request>,
    /// userId -> Request
    #[serde(default)]
    pub users: BTreeMap<String, Request>,
    /// canonical wallet -> Request
    #[serde(default)]
    pub wallets: BTreeMap<String, Request>,
    /// requestId -> approved Request
    #[serde(default)]
    pub approved: BTreeMap<String, DecidedRequest>,
    /// requestId -> rejected Request
    #[serde(default)]
    pub rejected: BTreeMap<String, DecidedRequest>,
    /// Next value handed out for `Request::seq` and `DecidedRequest::order`.
    #[serde(default, rename = "nextSeq")]
    pub next_seq: u64,
}

impl LedgerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn get(&self, request_id: &RequestId) -> Option<&Request> {
        self.requests.get(&request_id.0)
    }

    pub fn take_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Write `request` into `requests`, `users` and `wallets` as one unit.
    ///
    /// The user and wallet entries are only replaced when they are absent or
    /// already point at this request, except that a wallet entry held by a
    /// rejected request may be taken over.
    pub fn index(&mut self, request: &Request) {
        let user_key = request.user_id.0.clone();
        let wallet_key = request.canonical_wallet();

        let owns_user = self
            .users
            .get(&user_key)
            .map_or(true, |r| r.request_id == request.request_id);
        if owns_user {
            self.users.insert(user_key, request.clone());
        }

        let owns_wallet = self.wallets.get(&wallet_key).map_or(true, |r| {
            r.request_id == request.request_id || r.status == RequestStatus::Rejected
        });
        if owns_wallet {
            self.wallets.insert(wallet_key, request.clone());
        }

        self.requests
            .insert(request.request_id.0.clone(), request.clone());
    }

    /// Requests with the given status, in submission order.
    pub fn by_status(&self, status: RequestStatus) -> Vec<Request> {
        let mut matching: Vec<Request> = self
            .requests
            .values()
            .filter(|r| r.status == status)
            .cloned()
            .collect();
        matching.sort_by_key(|r| r.seq);
        matching
    }

    /// Approved requests in approval order.
    pub fn approved_in_order(&self) -> Vec<DecidedRequest> {
        let mut approved: Vec<DecidedRequest> = self.approved.values().cloned().collect();
        approved.sort_by_key(|d| d.order);
        approved
    }
}
