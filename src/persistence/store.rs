//! Ledger store
//!
//! `LedgerStore` is the seam between the ledger and durable storage.
//! `JsonFileStore` keeps the whole ledger in one JSON document and replaces
//! it atomically (write temp file, fsync, rename), so a crash leaves either
//! the old or the new document on disk. `MemoryStore` backs tests.
//!
//! File writes run to completion on the blocking pool even when the caller
//! stops waiting (a retry timeout). Every write uses its own temp file, and
//! `JsonFileStore` numbers its saves so a late write never replaces a newer
//! document.

use super::state::LedgerState;
use crate::ledger::request::now_unix;
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize ledger: {0}")]
    Serialize(String),

    #[error("Ledger file '{}' is corrupt ({reason}); preserved as '{}'", path.display(), preserved_as.display())]
    Corrupt {
        path: PathBuf,
        preserved_as: PathBuf,
        reason: String,
    },

    #[error("Ledger file '{}' cannot be parsed: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error("Store operation timed out after {0:?}")]
    Timeout(Duration),
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Load the persisted ledger. A missing document is an empty ledger.
    async fn load(&self) -> StoreResult<LedgerState>;

    /// Replace the persisted ledger with `state` as one unit.
    async fn save(&self, state: &LedgerState) -> StoreResult<()>;
}

/// Order of saves issued through one store.
#[derive(Debug, Default)]
struct SaveOrder {
    issued: AtomicU64,
    /// Highest save number already renamed into place.
    landed: std::sync::Mutex<u64>,
}

/// Single-document JSON store.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    order: Arc<SaveOrder>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            order: Arc::new(SaveOrder::default()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load without touching the disk: no directory creation and no
    /// quarantine. An unparsable document is reported as `Malformed`.
    pub async fn load_readonly(&self) -> StoreResult<LedgerState> {
        match self.read().await? {
            Some(contents) => serde_json::from_slice(&contents).map_err(|e| StoreError::Malformed {
                path: self.path.clone(),
                reason: e.to_string(),
            }),
            None => Ok(LedgerState::new()),
        }
    }

    /// Check that a save could create its temp file next to the ledger,
    /// without rewriting the ledger itself.
    pub async fn check_writable(&self) -> StoreResult<()> {
        let marker = unique_sibling(&self.path, "check");
        let outcome = tokio::fs::write(&marker, b"").await;
        // best effort; the name is unique to this call
        let _ = tokio::fs::remove_file(&marker).await;
        outcome.map_err(|e| StoreError::io(&marker, e))
    }

    async fn read(&self) -> StoreResult<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no ledger file yet, starting empty");
                Ok(None)
            }
            Err(e) => Err(StoreError::io(&self.path, e)),
        }
    }

    fn quarantine_path(&self) -> PathBuf {
        sibling_path(&self.path, |name| format!("{}.corrupt-{}", name, now_unix()))
    }

    async fn ensure_parent(&self) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StoreError::io(parent, e))?;
            }
        }
        Ok(())
    }

    /// Move an unreadable document aside so it can be inspected later.
    async fn quarantine(&self, reason: String) -> StoreError {
        let preserved_as = self.quarantine_path();
        if let Err(e) = tokio::fs::rename(&self.path, &preserved_as).await {
            error!(
                path = %self.path.display(),
                error = %e,
                "failed to preserve corrupt ledger file"
            );
        }
        StoreError::Corrupt {
            path: self.path.clone(),
            preserved_as,
            reason,
        }
    }

    fn next_save(&self) -> u64 {
        self.order.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Write save number `number`, unless a later save already landed.
    fn write_numbered(
        path: &Path,
        order: &SaveOrder,
        number: u64,
        contents: &[u8],
    ) -> StoreResult<()> {
        let mut landed = order.landed.lock().unwrap_or_else(PoisonError::into_inner);
        if *landed > number {
            warn!(
                path = %path.display(),
                save = number,
                landed = *landed,
                "stale ledger write skipped"
            );
            return Ok(());
        }
        write_atomic_blocking(path, contents)?;
        *landed = number;
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for JsonFileStore {
    async fn load(&self) -> StoreResult<LedgerState> {
        self.ensure_parent().await?;

        let Some(contents) = self.read().await? else {
            return Ok(LedgerState::new());
        };

        match serde_json::from_slice::<LedgerState>(&contents) {
            Ok(state) => Ok(state),
            Err(e) => Err(self.quarantine(e.to_string()).await),
        }
    }

    async fn save(&self, state: &LedgerState) -> StoreResult<()> {
        let json =
            serde_json::to_vec_pretty(state).map_err(|e| StoreError::Serialize(e.to_string()))?;
        let number = self.next_save();
        let path = self.path.clone();
        let order = Arc::clone(&self.order);

        run_blocking(&self.path, move || Self::write_numbered(&path, &order, number, &json)).await
    }
}

/// Write `contents` to `path` through a temp file and rename.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> StoreResult<()> {
    let target = path.to_path_buf();
    let contents = contents.to_vec();
    run_blocking(path, move || write_atomic_blocking(&target, &contents)).await
}

/// Run a file operation on the blocking pool. Dropping the returned future
/// does not stop the operation.
async fn run_blocking<F>(path: &Path, operation: F) -> StoreResult<()>
where
    F: FnOnce() -> StoreResult<()> + Send + 'static,
{
    tokio::task::spawn_blocking(operation)
        .await
        .map_err(|e| StoreError::io(path, std::io::Error::new(std::io::ErrorKind::Other, e)))?
}

fn write_atomic_blocking(path: &Path, contents: &[u8]) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
    }

    let tmp_path = unique_sibling(path, "tmp");
    let written = std::fs::File::create(&tmp_path)
        .and_then(|mut file| {
            file.write_all(contents)?;
            file.sync_all()
        })
        .and_then(|()| std::fs::rename(&tmp_path, path));

    if let Err(e) = written {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(StoreError::io(path, e));
    }
    Ok(())
}

/// `.<name>.<random>.<suffix>` next to `path`.
fn unique_sibling(path: &Path, suffix: &str) -> PathBuf {
    let id = uuid::Uuid::new_v4().simple();
    sibling_path(path, |name| format!(".{}.{}.{}", name, id, suffix))
}

fn sibling_path(path: &Path, name: impl FnOnce(&str) -> String) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "ledger.json".to_string());
    path.with_file_name(name(&file_name))
}

/// In-memory store with failure injection.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    saved: Mutex<Option<LedgerState>>,
    save_count: AtomicUsize,
    failures_remaining: AtomicU32,
    fail_loads: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an already persisted ledger.
    pub fn with_state(state: LedgerState) -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                saved: Mutex::new(Some(state)),
                ..MemoryInner::default()
            }),
        }
    }

    /// Make the next `count` saves fail with an I/O error.
    pub fn fail_next_saves(&self, count: u32) {
        self.inner.failures_remaining.store(count, Ordering::SeqCst);
    }

    /// Make every load fail with an I/O error.
    pub fn fail_loads(&self) {
        self.inner.fail_loads.store(true, Ordering::SeqCst);
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.inner.save_count.load(Ordering::SeqCst)
    }

    pub async fn saved(&self) -> Option<LedgerState> {
        self.inner.saved.lock().await.clone()
    }
}

fn injected_failure(what: &str) -> StoreError {
    StoreError::Io {
        path: PathBuf::from("memory"),
        source: std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("injected {} failure", what),
        ),
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn load(&self) -> StoreResult<LedgerState> {
        if self.inner.fail_loads.load(Ordering::SeqCst) {
            return Err(injected_failure("load"));
        }
        Ok(self.inner.saved.lock().await.clone().unwrap_or_default())
    }

    async fn save(&self, state: &LedgerState) -> StoreResult<()> {
        let injected = self
            .inner
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(injected_failure("save"));
        }

        *self.inner.saved.lock().await = Some(state.clone());
        self.inner.save_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::request::{Request, RequestId, RequestStatus, UserId};
    use tempfile::TempDir;

    fn sample_state() -> LedgerState {
        let mut state = LedgerState::new();
        let request = Request {
            request_id: RequestId::from("req_1"),
            user_id: UserId::from(7),
            username: Some("alice".to_string()),
            display_name: "Alice".to_string(),
            wallet_address: format!("0xAbC{}", "1".repeat(37)),
            submitted_at: 1_700_000_000,
            status: RequestStatus::Pending,
            seq: state.take_seq(),
        };
        state.index(&request);
        state
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty_and_creates_dir() {
        let temp_dir = TempDir::new().unwrap();
        let data_dir = temp_dir.path().join("data");
        let store = JsonFileStore::new(data_dir.join("token-requests.json"));

        let state = store.load().await.unwrap();

        assert_eq!(state, LedgerState::new());
        assert!(data_dir.is_dir());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(temp_dir.path().join("ledger.json"));
        let state = sample_state();

        store.save(&state).await.unwrap();
        let loaded = store.load().await.unwrap();

        assert_eq!(loaded, state);
        // only the ledger itself is left behind
        let names: Vec<String> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["ledger.json".to_string()]);
    }

    #[tokio::test]
    async fn test_load_twice_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(temp_dir.path().join("ledger.json"));
        store.save(&sample_state()).await.unwrap();

        let first = store.load().await.unwrap();
        let second = store.load().await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_quarantined() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ledger.json");
        std::fs::write(&path, b"{ not json").unwrap();
        let store = JsonFileStore::new(&path);

        let err = store.load().await.unwrap_err();

        match err {
            StoreError::Corrupt { preserved_as, .. } => {
                assert!(preserved_as.exists());
                assert_eq!(std::fs::read(&preserved_as).unwrap(), b"{ not json");
            }
            other => panic!("Expected Corrupt, got {:?}", other),
        }
        assert!(!path.exists());

        // Next load starts clean
        assert_eq!(store.load().await.unwrap(), LedgerState::new());
    }

    #[tokio::test]
    async fn test_persisted_layout_keys() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ledger.json");
        let store = JsonFileStore::new(&path);
        store.save(&sample_state()).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert!(raw["requests"]["req_1"].is_object());
        assert!(raw["users"]["7"].is_object());
        let canonical = format!("0xabc{}", "1".repeat(37));
        assert_eq!(raw["wallets"][&canonical]["walletAddress"], format!("0xAbC{}", "1".repeat(37)));
        assert!(raw["approved"].is_object());
        assert!(raw["rejected"].is_object());
    }

    #[tokio::test]
    async fn test_write_atomic_replaces_content() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("out.json");

        write_atomic(&path, b"[1]").await.unwrap();
        write_atomic(&path, b"[2]").await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"[2]");
    }

    #[test]
    fn test_temp_names_are_unique() {
        let path = Path::new("/data/ledger.json");
        let a = unique_sibling(path, "tmp");
        let b = unique_sibling(path, "tmp");

        assert_ne!(a, b);
        assert_eq!(a.parent(), path.parent());
        assert!(a.file_name().unwrap().to_string_lossy().starts_with(".ledger.json."));
    }

    #[tokio::test]
    async fn test_late_save_does_not_replace_newer_document() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ledger.json");
        let store = JsonFileStore::new(&path);

        // an earlier save that was abandoned by a timeout finishes last
        let stale = store.next_save();
        let fresh = store.next_save();
        JsonFileStore::write_numbered(&path, &store.order, fresh, b"{\"fresh\":1}").unwrap();
        JsonFileStore::write_numbered(&path, &store.order, stale, b"{\"stale\":1}").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"{\"fresh\":1}");

        // later saves still go through
        store.save(&sample_state()).await.unwrap();
        assert_eq!(store.load().await.unwrap(), sample_state());
    }

    #[tokio::test]
    async fn test_load_readonly_leaves_corrupt_file_in_place() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ledger.json");
        std::fs::write(&path, b"{ not json").unwrap();
        let store = JsonFileStore::new(&path);

        let err = store.load_readonly().await.unwrap_err();

        assert!(matches!(err, StoreError::Malformed { .. }));
        assert_eq!(std::fs::read(&path).unwrap(), b"{ not json");
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_load_readonly_missing_file_creates_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let data_dir = temp_dir.path().join("data");
        let store = JsonFileStore::new(data_dir.join("ledger.json"));

        assert_eq!(store.load_readonly().await.unwrap(), LedgerState::new());
        assert!(!data_dir.exists());
    }

    #[tokio::test]
    async fn test_check_writable_does_not_touch_ledger() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ledger.json");
        let store = JsonFileStore::new(&path);
        store.save(&sample_state()).await.unwrap();
        let before = std::fs::metadata(&path).unwrap().modified().unwrap();

        store.check_writable().await.unwrap();

        assert_eq!(std::fs::metadata(&path).unwrap().modified().unwrap(), before);
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 1);

        let missing = JsonFileStore::new(temp_dir.path().join("absent").join("ledger.json"));
        assert!(missing.check_writable().await.is_err());
    }

    #[tokio::test]
    async fn test_memory_store_load_failure_injection() {
        let store = MemoryStore::with_state(sample_state());
        store.fail_loads();
        assert!(matches!(store.load().await, Err(StoreError::Io { .. })));
    }

    #[tokio::test]
    async fn test_memory_store_failure_injection() {
        let store = MemoryStore::new();
        store.fail_next_saves(1);

        assert!(store.save(&sample_state()).await.is_err());
        assert!(store.save(&sample_state()).await.is_ok());
        assert_eq!(store.save_count(), 1);
        assert_eq!(store.saved().await, Some(sample_state()));
    }
}
