//! Durable storage for the request ledger.
//!
//! The ledger is persisted as one JSON document (see [`state::LedgerState`])
//! and always replaced as a whole. Writes are bounded by [`retry::RetryPolicy`].

pub mod retry;
pub mod state;
pub mod store;

pub use retry::{is_store_error_retryable, retry_with_backoff, RetryPolicy};
pub use state::LedgerState;
pub use store::{write_atomic, JsonFileStore, LedgerStore, MemoryStore, StoreError, StoreResult};
