//! Property-based tests for the request ledger
//!
//! Random interleavings of submissions and decisions over a small pool of
//! users and wallets (so collisions are frequent) must always leave:
//! - at most one request per user
//! - at most one non-rejected request per canonical wallet
//! - `users` and `wallets` pointing at the current version of a request
//! - decided requests never moving again

use super::request::{RequestId, RequestStatus, UserId};
use super::{Ledger, LedgerError, Requester};
use crate::persistence::{LedgerState, MemoryStore, RetryPolicy};
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Op {
    Submit { user: u8, wallet: u8, upper: bool },
    Decide { pick: usize, approve: bool },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..6, 0u8..6, any::<bool>())
            .prop_map(|(user, wallet, upper)| Op::Submit { user, wallet, upper }),
        (0usize..16, any::<bool>()).prop_map(|(pick, approve)| Op::Decide { pick, approve }),
    ]
}

fn wallet_for(slot: u8, upper: bool) -> String {
    let digits = format!("{:040x}", 0xabcdef00u64 + slot as u64);
    if upper {
        format!("0x{}", digits.to_ascii_uppercase())
    } else {
        format!("0x{}", digits)
    }
}

fn check_invariants(state: &LedgerState) -> Result<(), TestCaseError> {
    let mut per_user: HashMap<&str, usize> = HashMap::new();
    let mut live_per_wallet: HashMap<String, usize> = HashMap::new();

    for request in state.requests.values() {
        *per_user.entry(request.user_id.0.as_str()).or_default() += 1;
        if request.status != RequestStatus::Rejected {
            *live_per_wallet.entry(request.canonical_wallet()).or_default() += 1;
        }
    }

    prop_assert!(per_user.values().all(|&n| n == 1), "user with two requests");
    prop_assert!(
        live_per_wallet.values().all(|&n| n == 1),
        "wallet with two live requests"
    );

    for (user, request) in &state.users {
        prop_assert_eq!(&request.user_id.0, user);
        prop_assert_eq!(Some(request), state.requests.get(&request.request_id.0));
    }
    for (wallet, request) in &state.wallets {
        prop_assert_eq!(&request.canonical_wallet(), wallet);
        prop_assert_eq!(Some(request), state.requests.get(&request.request_id.0));
    }
    for (id, decided) in &state.approved {
        prop_assert_eq!(decided.request.status, RequestStatus::Approved);
        prop_assert_eq!(
            state.requests.get(id).map(|r| r.status),
            Some(RequestStatus::Approved)
        );
    }
    for (id, decided) in &state.rejected {
        prop_assert_eq!(decided.request.status, RequestStatus::Rejected);
        prop_assert_eq!(
            state.requests.get(id).map(|r| r.status),
            Some(RequestStatus::Rejected)
        );
    }
    Ok(())
}

async fn run_ops(ops: Vec<Op>) -> Result<(), TestCaseError> {
    let policy = RetryPolicy::once(Duration::from_secs(1));
    let ledger = Ledger::with_state(Arc::new(MemoryStore::new()), LedgerState::new(), policy);
    let mut decided: HashMap<RequestId, RequestStatus> = HashMap::new();

    for op in ops {
        match op {
            Op::Submit { user, wallet, upper } => {
                let requester = Requester {
                    user_id: UserId::from(user as i64),
                    username: None,
                    display_name: format!("user {}", user),
                };
                let _ = ledger.submit(requester, &wallet_for(wallet, upper)).await;
            }
            Op::Decide { pick, approve } => {
                let snapshot = ledger.snapshot().await;
                let ids: Vec<RequestId> = snapshot
                    .requests
                    .values()
                    .map(|r| r.request_id.clone())
                    .collect();
                if ids.is_empty() {
                    continue;
                }
                let id = &ids[pick % ids.len()];
                let target = if approve {
                    RequestStatus::Approved
                } else {
                    RequestStatus::Rejected
                };

                match ledger.transition(id, target).await {
                    Ok(updated) => {
                        prop_assert!(!decided.contains_key(id), "decided twice");
                        decided.insert(id.clone(), updated.status);
                    }
                    Err(LedgerError::InvalidTransition { from, .. }) => {
                        prop_assert_eq!(decided.get(id).copied(), Some(from));
                    }
                    Err(other) => {
                        return Err(TestCaseError::fail(format!("unexpected error {:?}", other)))
                    }
                }
            }
        }
        check_invariants(&*ledger.snapshot().await)?;
    }

    // decided requests keep their outcome
    let snapshot = ledger.snapshot().await;
    for (id, status) in decided {
        prop_assert_eq!(snapshot.get(&id).map(|r| r.status), Some(status));
    }

    // distribution list matches approved set
    let distribution = ledger.build_distribution_list().await;
    prop_assert_eq!(distribution.len(), snapshot.approved.len());
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: uniqueness and index consistency hold after every operation
    #[test]
    fn ledger_invariants_hold(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(run_ops(ops))?;
    }

    /// Property: malformed addresses never change the ledger
    #[test]
    fn invalid_addresses_leave_ledger_unchanged(input in "[0-9a-zA-Z]{0,50}") {
        prop_assume!(!(input.len() == 42
            && input.starts_with("0x")
            && input[2..].chars().all(|c| c.is_ascii_hexdigit())));

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async {
            let ledger = Ledger::with_state(
                Arc::new(MemoryStore::new()),
                LedgerState::new(),
                RetryPolicy::once(Duration::from_secs(1)),
            );
            let requester = Requester {
                user_id: UserId::from(1),
                username: None,
                display_name: "user".to_string(),
            };
            let result = ledger.submit(requester, &input).await;
            prop_assert!(matches!(result, Err(LedgerError::InvalidAddress(_))));
            prop_assert!(ledger.snapshot().await.is_empty());
            Ok(())
        })?;
    }
}
