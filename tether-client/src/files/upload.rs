//! Upload worker - streams one local file to the agent
//!
//! Each upload runs as its own task. Workers register the transfer, then
//! wait for one of the global admission slots before streaming chunks, so
//! any number of uploads can be requested while at most
//! [`tether_common::MAX_CONCURRENT_UPLOADS`] stream at once.
//!
//! Cancellation is cooperative: the worker re-checks registry membership
//! before every chunk send, so the worst-case cancellation latency is one
//! chunk transmission.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};

use tether_common::protocol::ClientMessage;

use super::Shared;
use super::transfer::{ActiveTransfer, TransferDirection, TransferSnapshot};

/// Outcome of pulling the next chunk from the transfer's splitter
enum Pull {
    Chunk(Vec<u8>),
    Eof,
    /// The handle was taken by a concurrent cancel or shutdown
    Gone,
    ReadError(std::io::Error),
}

/// Run one upload to completion, cancellation, or error
///
/// The admission permit is held in a local binding, so every return path
/// below releases it exactly once.
pub(crate) async fn run_upload(shared: Arc<Shared>, local_path: PathBuf, remote_path: String) {
    let splitter = match super::splitter::FileSplitter::open(&local_path).await {
        Ok(splitter) => splitter,
        Err(err) => {
            warn!(path = %local_path.display(), %err, "failed to open upload source");
            shared.events.transfer_updated(TransferSnapshot {
                id: shared.registry.draw_id(),
                direction: TransferDirection::Upload,
                local_path,
                remote_path,
                status: "Error reading file".to_string(),
                total_size: 0,
                transferred: 0,
                progress: 0.0,
            });
            return;
        }
    };

    let total_size = splitter.size();
    let transfer = shared.registry.register(|id| {
        ActiveTransfer::new(
            id,
            TransferDirection::Upload,
            local_path.clone(),
            remote_path.clone(),
            total_size,
            splitter,
        )
    });
    transfer.set_status("Pending...");
    shared.events.transfer_updated(transfer.snapshot());

    // Admission control: block here until one of the global upload slots
    // frees up. Dropping the permit on any exit path below releases it.
    let _permit = match Arc::clone(&shared.upload_slots).acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => {
            // Semaphore closed; nothing will ever stream again
            shared.registry.remove(transfer.id);
            transfer.close_splitter().await;
            return;
        }
    };

    debug!(id = %transfer.id, path = %transfer.local_path.display(), size = total_size, "upload streaming");

    loop {
        let pull = {
            let mut guard = transfer.splitter().lock().await;
            match guard.as_mut() {
                None => Pull::Gone,
                Some(splitter) => match splitter.next_chunk().await {
                    Ok(Some(chunk)) => Pull::Chunk(chunk),
                    Ok(None) => Pull::Eof,
                    Err(err) => Pull::ReadError(err),
                },
            }
        };

        match pull {
            Pull::Chunk(chunk) => {
                transfer.add_transferred(chunk.len() as u64);
                transfer.set_status(format!("Uploading...({}%)", transfer.progress()));
                shared.events.transfer_updated(transfer.snapshot());

                // Cancelled externally? Stop before the pending chunk is sent.
                if !shared.registry.contains(transfer.id) {
                    transfer.set_status("Canceled");
                    shared.events.transfer_updated(transfer.snapshot());
                    return;
                }

                let message = ClientMessage::FileChunk {
                    id: transfer.id,
                    chunk,
                    file_path: transfer.remote_path(),
                    file_size: total_size,
                };
                // Awaiting the bounded channel keeps chunks ordered with at
                // most one in flight for this transfer.
                if shared.outbound.send(message).await.is_err() {
                    warn!(id = %transfer.id, "outbound channel closed mid-upload");
                    fail_upload(&shared, &transfer).await;
                    return;
                }
            }
            Pull::Eof => break,
            Pull::Gone => {
                transfer.set_status("Canceled");
                shared.events.transfer_updated(transfer.snapshot());
                return;
            }
            Pull::ReadError(err) => {
                warn!(id = %transfer.id, %err, "read failed mid-upload");
                fail_upload(&shared, &transfer).await;
                return;
            }
        }
    }

    debug!(id = %transfer.id, "upload streamed; awaiting peer completion");
    // All chunks sent. The peer drives the Completed transition via a
    // TransferComplete message; the registry entry stays until then.
}

/// Handle a mid-stream read/send failure
///
/// If the transfer was removed concurrently the failure is moot and nothing
/// is reported (the cancel path already handled the transfer).
async fn fail_upload(shared: &Shared, transfer: &ActiveTransfer) {
    if !shared.registry.contains(transfer.id) {
        return;
    }
    transfer.set_status("Error reading file");
    shared.events.transfer_updated(transfer.snapshot());
    let _ = shared
        .outbound
        .send(ClientMessage::TransferCancel { id: transfer.id })
        .await;
}
