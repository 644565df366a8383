//! Inbound message dispatch
//!
//! Advances per-transfer state in reaction to agent messages. Downloads
//! have no dedicated worker; they move forward only here. Messages that
//! reference an id no longer in the registry are stale (the transfer was
//! cancelled or completed) and are ignored rather than treated as errors.

use tracing::{debug, warn};

use tether_common::protocol::{AgentMessage, ClientMessage, Drive, FileSystemEntry, TransferId};

use super::Shared;
use super::events::FileManagerEvent;
use super::transfer::TransferDirection;

pub(crate) async fn handle_message(shared: &Shared, message: AgentMessage) {
    match message {
        AgentMessage::FileChunk { id, chunk, file_size } => {
            handle_chunk(shared, id, chunk, file_size).await;
        }
        AgentMessage::TransferCancel { id, reason } => {
            handle_cancel(shared, id, reason).await;
        }
        AgentMessage::TransferComplete { id, file_path } => {
            handle_complete(shared, id, file_path).await;
        }
        AgentMessage::DrivesResponse { drives } => handle_drives(shared, drives),
        AgentMessage::DirectoryResponse { remote_path, items } => {
            handle_directory(shared, remote_path, items);
        }
        AgentMessage::Status { message } => {
            shared.events.emit(FileManagerEvent::Status(message));
        }
    }
}

/// One download chunk arrived
async fn handle_chunk(shared: &Shared, id: TransferId, chunk: Vec<u8>, file_size: u64) {
    let Some(transfer) = shared.registry.find(id) else {
        debug!(%id, "chunk for unknown transfer ignored");
        return;
    };

    transfer.set_total_size(file_size);
    transfer.add_transferred(chunk.len() as u64);

    let written = {
        let mut guard = transfer.splitter().lock().await;
        match guard.as_mut() {
            Some(splitter) => splitter.append(&chunk).await,
            // Handle already taken by a racing cancel; the chunk is stale
            None => return,
        }
    };

    if let Err(err) = written {
        warn!(%id, %err, "failed to write download chunk");
        transfer.set_status("Error writing file");
        shared.events.transfer_updated(transfer.snapshot());
        // The agent answers the cancel and the entry is removed on that
        // round-trip, not here.
        let _ = shared
            .outbound
            .send(ClientMessage::TransferCancel { id })
            .await;
        return;
    }

    transfer.set_status(format!("Downloading...({}%)", transfer.progress()));
    shared.events.transfer_updated(transfer.snapshot());
}

/// The agent cancelled a transfer or acknowledged our cancel
async fn handle_cancel(shared: &Shared, id: TransferId, reason: String) {
    let Some(transfer) = shared.registry.remove(id) else {
        return;
    };
    transfer.close_splitter().await;
    transfer.set_status(reason);
    shared.events.transfer_updated(transfer.snapshot());

    if transfer.direction == TransferDirection::Download {
        // Best effort: a half-written download is useless
        if let Err(err) = tokio::fs::remove_file(&transfer.local_path).await {
            debug!(%id, %err, "could not delete partial download");
        }
    }
}

/// A transfer finished on the agent side
async fn handle_complete(shared: &Shared, id: TransferId, file_path: String) {
    let Some(transfer) = shared.registry.remove(id) else {
        return;
    };
    transfer.close_splitter().await;
    if !file_path.is_empty() {
        // Uploads may land under an agent-generated name
        transfer.set_remote_path(file_path);
    }
    transfer.set_status("Completed");
    shared.events.transfer_updated(transfer.snapshot());
    debug!(%id, "transfer completed");
}

fn handle_drives(shared: &Shared, drives: Vec<Drive>) {
    if drives.is_empty() {
        return;
    }
    shared.events.emit(FileManagerEvent::DrivesChanged(drives));
}

fn handle_directory(shared: &Shared, remote_path: String, entries: Vec<FileSystemEntry>) {
    shared.events.emit(FileManagerEvent::DirectoryChanged {
        remote_path,
        entries,
    });
}
