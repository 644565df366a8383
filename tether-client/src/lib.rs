//! Tether controller-side file management
//!
//! This crate implements the file-transfer and remote-filesystem subsystem
//! of the Tether remote administration link. It multiplexes concurrent
//! uploads and downloads over one ordered message channel, tracks transfer
//! state in a shared registry, caps concurrent outbound streams, and
//! recovers cleanly from cancellation, peer disconnects, and local I/O
//! failures.
//!
//! The transport itself (framing, TLS) is the host's concern: the host
//! hands [`files::FileManager`] an outbound message channel, drains its
//! event channel, and feeds inbound [`tether_common::protocol::AgentMessage`]s
//! into [`files::FileManager::handle_message`].

pub mod files;
pub mod process;

pub use files::{FileManager, FileManagerEvent, TransferSnapshot};
pub use process::ProcessHandler;
