//! File transfer and remote filesystem management
//!
//! [`FileManager`] is the controller-side entry point: it initiates
//! downloads and uploads, dispatches inbound agent messages, and emits
//! [`FileManagerEvent`]s to the host. All transfer state lives in the
//! [`registry::TransferRegistry`], the only structure shared between the
//! initiating path, upload workers, and the inbound dispatch path.
//!
//! Key types:
//! - `FileManager` - public operations and teardown
//! - `ActiveTransfer` / `TransferSnapshot` - per-transfer state
//! - `FileManagerEvent` - notifications delivered to the host

mod dispatcher;
mod events;
mod registry;
mod splitter;
mod transfer;
mod upload;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, warn};

use tether_common::MAX_CONCURRENT_UPLOADS;
use tether_common::protocol::{AgentMessage, ClientMessage, PathType, TransferId};

use crate::process::ProcessHandler;

pub use events::FileManagerEvent;
pub use registry::TransferRegistry;
pub use splitter::FileSplitter;
pub use transfer::{ActiveTransfer, TransferDirection, TransferSnapshot, progress_percent};

use events::EventSender;

/// State shared between the manager, upload workers, and the dispatcher
pub(crate) struct Shared {
    pub(crate) registry: TransferRegistry,
    pub(crate) outbound: mpsc::Sender<ClientMessage>,
    pub(crate) events: EventSender,
    pub(crate) upload_slots: Arc<Semaphore>,
    pub(crate) download_dir: PathBuf,
    pub(crate) process: Mutex<Option<Arc<dyn ProcessHandler>>>,
}

/// Controller-side file manager
///
/// Cheap to clone; clones share one registry, event channel, and upload
/// admission pool.
#[derive(Clone)]
pub struct FileManager {
    shared: Arc<Shared>,
}

impl FileManager {
    /// Create a manager bound to the host's channels
    ///
    /// `outbound` feeds the host's write pump toward the agent; its
    /// capacity provides the per-chunk back-pressure that keeps at most one
    /// chunk in flight per upload. `events` is drained by the host on its
    /// own schedule. `download_dir` is created on demand.
    pub fn new(
        outbound: mpsc::Sender<ClientMessage>,
        events: mpsc::UnboundedSender<FileManagerEvent>,
        download_dir: PathBuf,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                registry: TransferRegistry::new(),
                outbound,
                events: EventSender::new(events),
                upload_slots: Arc::new(Semaphore::new(MAX_CONCURRENT_UPLOADS)),
                download_dir,
                process: Mutex::new(None),
            }),
        }
    }

    /// Number of transfers currently tracked
    pub fn active_transfers(&self) -> usize {
        self.shared.registry.active_count()
    }

    /// Request a download from the agent
    ///
    /// No-op for an empty remote path. With `overwrite` false an existing
    /// target gets a numeric disambiguator: `name(1).ext`, `name(2).ext`, …
    /// If the local file cannot be opened the failure is reported as a
    /// `TransferUpdated` event and nothing is registered.
    pub async fn begin_download(
        &self,
        remote_path: &str,
        local_file_name: Option<&str>,
        overwrite: bool,
    ) {
        if remote_path.is_empty() {
            return;
        }
        let shared = &self.shared;

        if let Err(err) = tokio::fs::create_dir_all(&shared.download_dir).await {
            // The open below will fail and report it
            debug!(%err, "could not create download directory");
        }

        let name = match local_file_name {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => remote_basename(remote_path).to_string(),
        };
        let target = if overwrite {
            shared.download_dir.join(&name)
        } else {
            unique_local_path(&shared.download_dir, &name).await
        };

        let splitter = match FileSplitter::create(&target).await {
            Ok(splitter) => splitter,
            Err(err) => {
                warn!(path = %target.display(), %err, "failed to open download target");
                shared.events.transfer_updated(TransferSnapshot {
                    id: shared.registry.draw_id(),
                    direction: TransferDirection::Download,
                    local_path: target,
                    remote_path: remote_path.to_string(),
                    status: "Error writing file".to_string(),
                    total_size: 0,
                    transferred: 0,
                    progress: 0.0,
                });
                return;
            }
        };

        let transfer = shared.registry.register(|id| {
            ActiveTransfer::new(
                id,
                TransferDirection::Download,
                target.clone(),
                remote_path.to_string(),
                0,
                splitter,
            )
        });
        transfer.set_status("Pending...");
        shared.events.transfer_updated(transfer.snapshot());

        let _ = shared
            .outbound
            .send(ClientMessage::TransferRequest {
                id: transfer.id,
                remote_path: remote_path.to_string(),
            })
            .await;
    }

    /// Stream a local file to the agent
    ///
    /// Spawns an independent worker; must be called within a tokio runtime.
    /// The worker queues behind the global upload slots if both are busy.
    pub fn begin_upload(&self, local_path: impl Into<PathBuf>, remote_path: impl Into<String>) {
        let shared = Arc::clone(&self.shared);
        tokio::spawn(upload::run_upload(shared, local_path.into(), remote_path.into()));
    }

    /// Cancel an active transfer; unknown or repeated ids are no-ops
    ///
    /// Upload workers notice the removal before their next chunk send and
    /// report their own `Canceled` status (at most one chunk later).
    pub async fn cancel_transfer(&self, id: TransferId) {
        let Some(transfer) = self.shared.registry.remove(id) else {
            return;
        };
        transfer.close_splitter().await;
        let _ = self
            .shared
            .outbound
            .send(ClientMessage::TransferCancel { id })
            .await;

        if transfer.direction == TransferDirection::Download {
            transfer.set_status("Canceled");
            self.shared.events.transfer_updated(transfer.snapshot());
            let _ = tokio::fs::remove_file(&transfer.local_path).await;
        }
    }

    /// Rename a remote file or directory
    pub async fn rename(&self, path: &str, new_path: &str, path_type: PathType) {
        let _ = self
            .shared
            .outbound
            .send(ClientMessage::PathRename {
                path: path.to_string(),
                new_path: new_path.to_string(),
                path_type,
            })
            .await;
    }

    /// Delete a remote file or directory
    pub async fn delete(&self, path: &str, path_type: PathType) {
        let _ = self
            .shared
            .outbound
            .send(ClientMessage::PathDelete {
                path: path.to_string(),
                path_type,
            })
            .await;
    }

    /// Request a remote directory listing
    pub async fn list_directory(&self, path: &str) {
        let _ = self
            .shared
            .outbound
            .send(ClientMessage::DirectoryRequest {
                remote_path: path.to_string(),
            })
            .await;
    }

    /// Request a fresh storage volume snapshot
    pub async fn refresh_drives(&self) {
        let _ = self.shared.outbound.send(ClientMessage::DrivesRequest).await;
    }

    /// Register the delegated process-management sub-handler
    pub fn set_process_handler(&self, handler: Arc<dyn ProcessHandler>) {
        *self
            .shared
            .process
            .lock()
            .expect("process handler lock poisoned") = Some(handler);
    }

    /// Start a process on the agent, delegated to the registered sub-handler
    pub fn start_remote_process(&self, remote_path: &str) {
        let handler = self
            .shared
            .process
            .lock()
            .expect("process handler lock poisoned")
            .clone();
        match handler {
            Some(handler) => handler.start_process(remote_path),
            None => debug!(path = remote_path, "no process handler attached"),
        }
    }

    /// Process one inbound message from the agent
    pub async fn handle_message(&self, message: AgentMessage) {
        dispatcher::handle_message(&self.shared, message).await;
    }

    /// Tear everything down
    ///
    /// Every active transfer gets a cancel message to the peer and its file
    /// handle closed; partially written downloads are deleted. The drain is
    /// atomic, the per-transfer I/O happens after the registry lock drops.
    /// Also detaches the process sub-handler.
    pub async fn shutdown(&self) {
        let transfers = self.shared.registry.drain();
        for transfer in transfers {
            let _ = self
                .shared
                .outbound
                .send(ClientMessage::TransferCancel { id: transfer.id })
                .await;
            transfer.close_splitter().await;
            if transfer.direction == TransferDirection::Download {
                let _ = tokio::fs::remove_file(&transfer.local_path).await;
            }
        }
        *self
            .shared
            .process
            .lock()
            .expect("process handler lock poisoned") = None;
    }
}

/// Last path component of a remote path, tolerating both separators
fn remote_basename(remote_path: &str) -> &str {
    remote_path
        .rsplit(['/', '\\'])
        .find(|part| !part.is_empty())
        .unwrap_or(remote_path)
}

/// Join `name` under `dir`, disambiguating an occupied target
///
/// Tries `name`, then `name(1).ext`, `name(2).ext`, … until a free path is
/// found (capped; the final candidate is used regardless).
async fn unique_local_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if tokio::fs::metadata(&candidate).await.is_err() {
        return candidate;
    }

    let stem = candidate
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("file")
        .to_string();
    let extension = candidate
        .extension()
        .and_then(|s| s.to_str())
        .map(str::to_string);

    let mut fallback = candidate;
    for i in 1..10_000u32 {
        let alt = match &extension {
            Some(ext) => format!("{stem}({i}).{ext}"),
            None => format!("{stem}({i})"),
        };
        fallback = dir.join(alt);
        if tokio::fs::metadata(&fallback).await.is_err() {
            return fallback;
        }
    }
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_remote_basename() {
        assert_eq!(remote_basename("C:\\Users\\bob\\report.pdf"), "report.pdf");
        assert_eq!(remote_basename("/home/bob/report.pdf"), "report.pdf");
        assert_eq!(remote_basename("report.pdf"), "report.pdf");
        assert_eq!(remote_basename("C:\\dir\\"), "dir");
        assert_eq!(remote_basename("mixed/sep\\name.txt"), "name.txt");
    }

    #[tokio::test]
    async fn test_unique_local_path_free_target() {
        let dir = TempDir::new().expect("temp dir");
        let path = unique_local_path(dir.path(), "a.txt").await;
        assert_eq!(path, dir.path().join("a.txt"));
    }

    #[tokio::test]
    async fn test_unique_local_path_disambiguates() {
        let dir = TempDir::new().expect("temp dir");
        tokio::fs::write(dir.path().join("a.txt"), b"x").await.unwrap();

        let first = unique_local_path(dir.path(), "a.txt").await;
        assert_eq!(first, dir.path().join("a(1).txt"));

        tokio::fs::write(&first, b"x").await.unwrap();
        let second = unique_local_path(dir.path(), "a.txt").await;
        assert_eq!(second, dir.path().join("a(2).txt"));
    }

    #[tokio::test]
    async fn test_unique_local_path_without_extension() {
        let dir = TempDir::new().expect("temp dir");
        tokio::fs::write(dir.path().join("notes"), b"x").await.unwrap();

        let path = unique_local_path(dir.path(), "notes").await;
        assert_eq!(path, dir.path().join("notes(1)"));
    }
}
