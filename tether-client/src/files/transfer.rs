//! Transfer record types
//!
//! An [`ActiveTransfer`] is the shared runtime state for one upload or
//! download. The registry hands out `Arc` references; progress counters are
//! atomics and the mutable strings sit behind their own short-lived locks,
//! so the component driving the transfer (upload worker or dispatcher)
//! never needs the registry lock to advance it.

use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;

use tether_common::protocol::TransferId;

use super::splitter::FileSplitter;

/// Direction of a file transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferDirection {
    /// Remote agent streaming a file to us
    Download,
    /// Us streaming a local file to the agent
    Upload,
}

impl std::fmt::Display for TransferDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Download => write!(f, "download"),
            Self::Upload => write!(f, "upload"),
        }
    }
}

/// Progress as a percentage rounded to two decimals
///
/// A transfer with a declared size of 0 is complete the moment it starts,
/// so it reports 100.
pub fn progress_percent(transferred: u64, total: u64) -> f64 {
    if total == 0 {
        return 100.0;
    }
    (transferred as f64 / total as f64 * 10000.0).round() / 100.0
}

/// Runtime state for one active transfer
///
/// Shared between the registry and the component driving the transfer via
/// `Arc`. Exactly one component mutates a given transfer at a time; the
/// transferred counter never decreases before a terminal status.
pub struct ActiveTransfer {
    /// Unique transfer identifier
    pub id: TransferId,
    /// Upload or download
    pub direction: TransferDirection,
    /// Local file path (source for uploads, destination for downloads)
    pub local_path: PathBuf,
    /// Path on the agent; completions may rewrite it
    remote_path: Mutex<String>,
    /// Human-readable progress/error string
    status: Mutex<String>,
    /// Declared total size in bytes (0 if not yet known)
    total_size: AtomicU64,
    /// Bytes transferred so far
    transferred: AtomicU64,
    /// Owned chunk handle; taken on removal so the file closes promptly
    splitter: AsyncMutex<Option<FileSplitter>>,
}

impl ActiveTransfer {
    pub fn new(
        id: TransferId,
        direction: TransferDirection,
        local_path: PathBuf,
        remote_path: String,
        total_size: u64,
        splitter: FileSplitter,
    ) -> Self {
        Self {
            id,
            direction,
            local_path,
            remote_path: Mutex::new(remote_path),
            status: Mutex::new(String::new()),
            total_size: AtomicU64::new(total_size),
            transferred: AtomicU64::new(0),
            splitter: AsyncMutex::new(Some(splitter)),
        }
    }

    pub fn status(&self) -> String {
        self.status.lock().expect("status lock poisoned").clone()
    }

    pub fn set_status(&self, status: impl Into<String>) {
        *self.status.lock().expect("status lock poisoned") = status.into();
    }

    pub fn remote_path(&self) -> String {
        self.remote_path
            .lock()
            .expect("remote path lock poisoned")
            .clone()
    }

    pub fn set_remote_path(&self, path: impl Into<String>) {
        *self.remote_path.lock().expect("remote path lock poisoned") = path.into();
    }

    pub fn total_size(&self) -> u64 {
        self.total_size.load(Ordering::Relaxed)
    }

    pub fn set_total_size(&self, size: u64) {
        self.total_size.store(size, Ordering::Relaxed);
    }

    pub fn transferred(&self) -> u64 {
        self.transferred.load(Ordering::Relaxed)
    }

    /// Add to the transferred counter, returning the new total
    pub fn add_transferred(&self, bytes: u64) -> u64 {
        self.transferred.fetch_add(bytes, Ordering::Relaxed) + bytes
    }

    /// Current progress as a two-decimal percentage
    pub fn progress(&self) -> f64 {
        progress_percent(self.transferred(), self.total_size())
    }

    /// Access the chunk handle for reading or appending
    ///
    /// Per-transfer lock; never held together with the registry lock.
    pub(crate) fn splitter(&self) -> &AsyncMutex<Option<FileSplitter>> {
        &self.splitter
    }

    /// Take and drop the chunk handle, closing the underlying file
    ///
    /// Idempotent; later I/O attempts see the handle gone and treat the
    /// transfer as cancelled.
    pub async fn close_splitter(&self) {
        self.splitter.lock().await.take();
    }

    /// Immutable deep copy of the transfer at this instant
    pub fn snapshot(&self) -> TransferSnapshot {
        TransferSnapshot {
            id: self.id,
            direction: self.direction,
            local_path: self.local_path.clone(),
            remote_path: self.remote_path(),
            status: self.status(),
            total_size: self.total_size(),
            transferred: self.transferred(),
            progress: self.progress(),
        }
    }
}

impl std::fmt::Debug for ActiveTransfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveTransfer")
            .field("id", &self.id)
            .field("direction", &self.direction)
            .field("local_path", &self.local_path)
            .field("remote_path", &self.remote_path())
            .field("status", &self.status())
            .field("total_size", &self.total_size())
            .field("transferred", &self.transferred())
            .finish()
    }
}

/// Immutable copy of a transfer delivered in `TransferUpdated` events
///
/// Decoupled from the live record so host-side handlers never race with
/// later in-place mutation by the owning worker or dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferSnapshot {
    pub id: TransferId,
    pub direction: TransferDirection,
    pub local_path: PathBuf,
    pub remote_path: String,
    pub status: String,
    pub total_size: u64,
    pub transferred: u64,
    /// Percentage rounded to two decimals, 100 for zero-byte transfers
    pub progress: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn make_transfer(dir: &TempDir, size: u64) -> ActiveTransfer {
        let path = dir.path().join("file.bin");
        tokio::fs::write(&path, vec![0u8; size as usize]).await.unwrap();
        let splitter = FileSplitter::open(&path).await.expect("open");
        ActiveTransfer::new(
            TransferId::new(1),
            TransferDirection::Upload,
            path,
            "C:\\remote\\file.bin".to_string(),
            size,
            splitter,
        )
    }

    #[test]
    fn test_progress_percent_rounding() {
        assert_eq!(progress_percent(100_000, 300_000), 33.33);
        assert_eq!(progress_percent(200_000, 300_000), 66.67);
        assert_eq!(progress_percent(300_000, 300_000), 100.0);
        assert_eq!(progress_percent(250, 1000), 25.0);
    }

    #[test]
    fn test_progress_percent_zero_size_is_complete() {
        assert_eq!(progress_percent(0, 0), 100.0);
    }

    #[test]
    fn test_progress_display_drops_trailing_zeros() {
        // Status strings embed the raw f64, so 100.0 must render as "100"
        assert_eq!(format!("{}", progress_percent(3, 3)), "100");
        assert_eq!(format!("{}", progress_percent(1, 3)), "33.33");
    }

    #[tokio::test]
    async fn test_transferred_counter_accumulates() {
        let dir = TempDir::new().expect("temp dir");
        let transfer = make_transfer(&dir, 1000).await;

        assert_eq!(transfer.transferred(), 0);
        assert_eq!(transfer.add_transferred(400), 400);
        assert_eq!(transfer.add_transferred(600), 1000);
        assert_eq!(transfer.progress(), 100.0);
    }

    #[tokio::test]
    async fn test_snapshot_is_deep_copy() {
        let dir = TempDir::new().expect("temp dir");
        let transfer = make_transfer(&dir, 1000).await;
        transfer.set_status("Pending...");

        let snapshot = transfer.snapshot();

        // Later mutation must not show through the snapshot
        transfer.set_status("Uploading...(50%)");
        transfer.add_transferred(500);

        assert_eq!(snapshot.status, "Pending...");
        assert_eq!(snapshot.transferred, 0);
        assert_eq!(transfer.snapshot().transferred, 500);
    }

    #[tokio::test]
    async fn test_close_splitter_is_idempotent() {
        let dir = TempDir::new().expect("temp dir");
        let transfer = make_transfer(&dir, 10).await;

        transfer.close_splitter().await;
        transfer.close_splitter().await;
        assert!(transfer.splitter().lock().await.is_none());
    }

    #[test]
    fn test_direction_display() {
        assert_eq!(format!("{}", TransferDirection::Download), "download");
        assert_eq!(format!("{}", TransferDirection::Upload), "upload");
    }
}
