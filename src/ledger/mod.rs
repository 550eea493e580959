//! Request ledger
//!
//! Enforces the two uniqueness rules of the testing program:
//! - one request per user (a rejected request still counts)
//! - one live (non-rejected) request per canonical wallet address
//!
//! and moves requests through `pending -> approved | rejected`.
//!
//! ## Concurrency
//!
//! Mutations (`submit`, `transition`, `flush`) run under a single write gate
//! covering "read state, check, write, persist". Readers never take the gate;
//! they clone an `Arc` of the last published state, so a listing always sees
//! every index from the same mutation.
//!
//! ## Persistence
//!
//! The in-memory state is authoritative. A failed save is logged and flips
//! the ledger into degraded mode; the next mutation or an explicit
//! [`Ledger::flush`] writes the full state again and clears the flag.

pub mod request;

#[cfg(test)]
mod proptests;

use crate::persistence::{
    is_store_error_retryable, retry_with_backoff, write_atomic, LedgerState, LedgerStore,
    RetryPolicy, StoreError,
};
use request::{
    now_unix, DecidedRequest, Request, RequestId, RequestStatus, UserId, WalletAddress,
};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};

pub use request::mask_wallet;

/// Ledger operation errors.
///
/// The validation kinds leave the ledger untouched. `PersistenceFailure` and
/// `AdminNotifyFailure` are fail-soft: they are logged, never returned from
/// `submit` or `transition`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Invalid wallet address: {0}")]
    InvalidAddress(String),

    #[error("User {} already has request {} ({})", existing.user_id, existing.request_id, existing.status)]
    DuplicateUser { existing: Box<Request> },

    #[error("Wallet {} is already attached to a request", mask_wallet(.0))]
    WalletReused(String),

    #[error("Request not found: {0}")]
    NotFound(RequestId),

    #[error("Cannot move request {request_id} from {from} to {to}")]
    InvalidTransition {
        request_id: RequestId,
        from: RequestStatus,
        to: RequestStatus,
    },

    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    #[error("Admin notification failed: {0}")]
    AdminNotifyFailure(String),
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        LedgerError::PersistenceFailure(err.to_string())
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Request counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerStats {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}

/// Who is submitting a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    pub user_id: UserId,
    pub username: Option<String>,
    pub display_name: String,
}

pub struct Ledger {
    store: Arc<dyn LedgerStore>,
    state: RwLock<Arc<LedgerState>>,
    write_gate: Mutex<()>,
    retry: RetryPolicy,
    degraded: AtomicBool,
}

impl Ledger {
    /// Open the ledger from `store`.
    ///
    /// A corrupt document has already been moved aside by the store, so the
    /// ledger logs it and starts empty. Any other load failure is returned:
    /// starting empty then would overwrite the existing document on the
    /// next save.
    pub async fn open(
        store: Arc<dyn LedgerStore>,
        retry: RetryPolicy,
    ) -> Result<Self, StoreError> {
        let state = match store.load().await {
            Ok(state) => {
                info!(requests = state.requests.len(), "ledger loaded");
                state
            }
            Err(e @ StoreError::Corrupt { .. }) => {
                error!(error = %e, "ledger file corrupt, starting empty");
                LedgerState::new()
            }
            Err(e) => {
                error!(error = %e, "failed to load ledger");
                return Err(e);
            }
        };
        Ok(Self::with_state(store, state, retry))
    }

    /// Build a ledger around an already loaded state.
    pub fn with_state(store: Arc<dyn LedgerStore>, state: LedgerState, retry: RetryPolicy) -> Self {
        Self {
            store,
            state: RwLock::new(Arc::new(state)),
            write_gate: Mutex::new(()),
            retry,
            degraded: AtomicBool::new(false),
        }
    }

    /// Consistent view of the whole ledger.
    pub async fn snapshot(&self) -> Arc<LedgerState> {
        self.state.read().await.clone()
    }

    /// True while the on-disk document is behind the in-memory state.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    /// Record a new pending request.
    ///
    /// Checks run in order: address syntax, existing request for the user,
    /// live request for the wallet.
    pub async fn submit(&self, requester: Requester, wallet_address: &str) -> LedgerResult<Request> {
        let wallet = WalletAddress::parse(wallet_address)
            .ok_or_else(|| LedgerError::InvalidAddress(wallet_address.to_string()))?;

        let _gate = self.write_gate.lock().await;
        let current = self.snapshot().await;

        if let Some(existing) = current.users.get(&requester.user_id.0) {
            return Err(LedgerError::DuplicateUser {
                existing: Box::new(existing.clone()),
            });
        }

        let canonical = wallet.canonical();
        if let Some(holder) = current.wallets.get(&canonical) {
            if holder.status != RequestStatus::Rejected {
                return Err(LedgerError::WalletReused(wallet.to_string()));
            }
        }

        let mut next = (*current).clone();
        let request = Request {
            request_id: RequestId::generate(),
            user_id: requester.user_id,
            username: requester.username,
            display_name: requester.display_name,
            wallet_address: wallet.to_string(),
            submitted_at: now_unix(),
            status: RequestStatus::Pending,
            seq: next.take_seq(),
        };
        next.index(&request);

        self.commit(next).await;

        info!(
            request_id = %request.request_id,
            user_id = %request.user_id,
            wallet = %mask_wallet(&request.wallet_address),
            "token request recorded"
        );
        Ok(request)
    }

    /// Move a pending request to `approved` or `rejected`.
    ///
    /// Returns the updated request.
    pub async fn transition(
        &self,
        request_id: &RequestId,
        new_status: RequestStatus,
    ) -> LedgerResult<Request> {
        let _gate = self.write_gate.lock().await;
        let current = self.snapshot().await;

        let existing = current
            .get(request_id)
            .ok_or_else(|| LedgerError::NotFound(request_id.clone()))?;

        if !existing.status.can_transition_to(new_status) {
            return Err(LedgerError::InvalidTransition {
                request_id: request_id.clone(),
                from: existing.status,
                to: new_status,
            });
        }

        let mut next = (*current).clone();
        let mut updated = existing.clone();
        updated.status = new_status;
        next.index(&updated);

        let decided = DecidedRequest {
            request: updated.clone(),
            decided_at: now_unix(),
            order: next.take_seq(),
        };
        match new_status {
            RequestStatus::Approved => {
                next.approved.insert(request_id.0.clone(), decided);
            }
            RequestStatus::Rejected => {
                next.rejected.insert(request_id.0.clone(), decided);
            }
            RequestStatus::Pending => {}
        }

        self.commit(next).await;

        info!(
            request_id = %request_id,
            status = %new_status,
            "request status changed"
        );
        Ok(updated)
    }

    /// Write the current state to the store, reporting failure.
    pub async fn flush(&self) -> LedgerResult<()> {
        let _gate = self.write_gate.lock().await;
        let current = self.snapshot().await;
        self.save(&current).await.map_err(LedgerError::from)
    }

    /// Pending requests in submission order.
    pub async fn list_pending(&self) -> Vec<Request> {
        self.snapshot().await.by_status(RequestStatus::Pending)
    }

    /// Approved requests in approval order.
    pub async fn list_approved(&self) -> Vec<Request> {
        self.list_approved_decided()
            .await
            .into_iter()
            .map(|d| d.request)
            .collect()
    }

    /// Approved requests with their decision timestamps, in approval order.
    pub async fn list_approved_decided(&self) -> Vec<DecidedRequest> {
        self.snapshot().await.approved_in_order()
    }

    /// Wallet addresses to fund, in approval order. Empty means nothing to
    /// distribute.
    pub async fn build_distribution_list(&self) -> Vec<String> {
        self.list_approved()
            .await
            .into_iter()
            .map(|r| r.wallet_address)
            .collect()
    }

    /// Write the distribution list to `path` as a JSON array.
    ///
    /// Returns the number of addresses written.
    pub async fn export_distribution(&self, path: &Path) -> LedgerResult<usize> {
        let addresses = self.build_distribution_list().await;
        let json = serde_json::to_vec_pretty(&addresses)
            .map_err(|e| LedgerError::PersistenceFailure(e.to_string()))?;
        write_atomic(path, &json).await?;
        info!(
            path = %path.display(),
            addresses = addresses.len(),
            "distribution list exported"
        );
        Ok(addresses.len())
    }

    /// The user's request, whatever its status.
    pub async fn lookup_user(&self, user_id: &UserId) -> Option<Request> {
        self.snapshot().await.users.get(&user_id.0).cloned()
    }

    pub async fn lookup(&self, request_id: &RequestId) -> Option<Request> {
        self.snapshot().await.get(request_id).cloned()
    }

    pub async fn stats(&self) -> LedgerStats {
        let state = self.snapshot().await;
        let mut stats = LedgerStats {
            total: state.requests.len(),
            ..Default::default()
        };
        for request in state.requests.values() {
            match request.status {
                RequestStatus::Pending => stats.pending += 1,
                RequestStatus::Approved => stats.approved += 1,
                RequestStatus::Rejected => stats.rejected += 1,
            }
        }
        stats
    }

    /// Persist `next` (fail-soft) and publish it to readers.
    ///
    /// Caller must hold the write gate.
    async fn commit(&self, next: LedgerState) {
        if let Err(e) = self.save(&next).await {
            error!(error = %e, "ledger save failed, continuing in degraded mode");
        }
        *self.state.write().await = Arc::new(next);
    }

    async fn save(&self, state: &LedgerState) -> Result<(), StoreError> {
        let result = retry_with_backoff(
            &self.retry,
            || self.store.save(state),
            is_store_error_retryable,
        )
        .await;

        match &result {
            Ok(()) => {
                if self.degraded.swap(false, Ordering::SeqCst) {
                    info!("ledger persisted again, leaving degraded mode");
                }
            }
            Err(_) => {
                if !self.degraded.swap(true, Ordering::SeqCst) {
                    warn!("ledger entering degraded mode: on-disk state is stale");
                }
            }
        }
        result
    }
}
