//! Events delivered to the host
//!
//! The host supplies one unbounded channel at construction and drains it on
//! its own schedule, so event handlers never run on a transfer worker or
//! the dispatch path.

use tokio::sync::mpsc;

use tether_common::protocol::{Drive, FileSystemEntry};

use super::transfer::TransferSnapshot;

/// Notifications emitted by the file manager
#[derive(Debug, Clone)]
pub enum FileManagerEvent {
    /// Fresh snapshot of the agent's storage volumes
    DrivesChanged(Vec<Drive>),
    /// One remote directory listing
    DirectoryChanged {
        remote_path: String,
        entries: Vec<FileSystemEntry>,
    },
    /// A transfer changed state; carries a deep copy taken at emission time
    TransferUpdated(TransferSnapshot),
    /// Informational report from the agent, not tied to a transfer
    Status(String),
}

/// Sending half of the event channel
///
/// Send failures mean the host dropped its receiver during shutdown; events
/// are best-effort at that point and get discarded.
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<FileManagerEvent>,
}

impl EventSender {
    pub fn new(tx: mpsc::UnboundedSender<FileManagerEvent>) -> Self {
        Self { tx }
    }

    pub fn emit(&self, event: FileManagerEvent) {
        let _ = self.tx.send(event);
    }

    pub fn transfer_updated(&self, snapshot: TransferSnapshot) {
        self.emit(FileManagerEvent::TransferUpdated(snapshot));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_after_receiver_dropped_is_silent() {
        let (tx, rx) = mpsc::unbounded_channel();
        let sender = EventSender::new(tx);
        drop(rx);
        sender.emit(FileManagerEvent::Status("late".to_string()));
    }

    #[tokio::test]
    async fn test_events_arrive_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sender = EventSender::new(tx);

        sender.emit(FileManagerEvent::Status("first".to_string()));
        sender.emit(FileManagerEvent::Status("second".to_string()));

        match rx.recv().await {
            Some(FileManagerEvent::Status(s)) => assert_eq!(s, "first"),
            other => panic!("unexpected event: {other:?}"),
        }
        match rx.recv().await {
            Some(FileManagerEvent::Status(s)) => assert_eq!(s, "second"),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
