//! Protocol definitions for the Tether remote administration link
//!
//! Messages are serialized as tagged JSON objects; the transport layer
//! (framing, TLS) lives outside this crate and treats payloads as opaque.
//! The controller sends [`ClientMessage`]s to the remote agent and consumes
//! [`AgentMessage`]s coming back over the same ordered channel.

use serde::{Deserialize, Serialize};

/// Unique identifier for an active file transfer
///
/// Positive, drawn at random, and unique among transfers that are currently
/// tracked. Ids may be reused after a transfer reaches a terminal state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TransferId(u64);

impl TransferId {
    /// Wrap a raw id received from the wire
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the inner id value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TransferId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a path operation targets a file or a directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathType {
    File,
    Directory,
}

/// Snapshot of a remote storage volume
///
/// Valid only at receipt time; the agent sends a fresh array on every
/// drives request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Drive {
    /// Root path of the volume (e.g. "C:\\" or "/")
    pub path: String,
    /// Volume label, may be empty
    #[serde(default)]
    pub label: String,
    /// Total capacity in bytes
    pub total_bytes: u64,
    /// Free space in bytes
    pub free_bytes: u64,
}

/// Snapshot of one remote file or directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSystemEntry {
    /// Entry name without its parent path
    pub name: String,
    /// File or directory
    pub kind: PathType,
    /// Size in bytes (0 for directories)
    #[serde(default)]
    pub size: u64,
    /// Last modification time as unix seconds
    #[serde(default)]
    pub modified: i64,
}

/// Messages sent by the controller to the remote agent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Ask the agent to start streaming a remote file to us
    TransferRequest {
        id: TransferId,
        remote_path: String,
    },
    /// One chunk of an upload, in file order
    FileChunk {
        id: TransferId,
        chunk: Vec<u8>,
        /// Destination path on the agent (may be empty for the default drop
        /// location)
        file_path: String,
        file_size: u64,
    },
    /// Abort a transfer in either direction
    TransferCancel { id: TransferId },
    /// Request a directory listing
    DirectoryRequest { remote_path: String },
    /// Request the list of storage volumes
    DrivesRequest,
    /// Rename a remote file or directory
    PathRename {
        path: String,
        new_path: String,
        path_type: PathType,
    },
    /// Delete a remote file or directory
    PathDelete { path: String, path_type: PathType },
}

/// Messages received from the remote agent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AgentMessage {
    /// One chunk of a download, in file order
    FileChunk {
        id: TransferId,
        chunk: Vec<u8>,
        file_size: u64,
    },
    /// The agent cancelled a transfer (or acknowledged our cancel)
    TransferCancel { id: TransferId, reason: String },
    /// A transfer finished; `file_path` is the final remote path, which may
    /// differ from the requested one (the agent can pick a temporary name)
    TransferComplete { id: TransferId, file_path: String },
    /// Storage volume snapshot
    DrivesResponse { drives: Vec<Drive> },
    /// One directory listing
    DirectoryResponse {
        remote_path: String,
        #[serde(default)]
        items: Vec<FileSystemEntry>,
    },
    /// Generic informational report, not correlated to a transfer
    Status { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_id_display() {
        let id = TransferId::new(42);
        assert_eq!(format!("{id}"), "42");
        assert_eq!(id.as_u64(), 42);
    }

    #[test]
    fn test_transfer_id_serializes_transparent() {
        let json = serde_json::to_string(&TransferId::new(7)).expect("serialize");
        assert_eq!(json, "7");
        let id: TransferId = serde_json::from_str("7").expect("deserialize");
        assert_eq!(id, TransferId::new(7));
    }

    #[test]
    fn test_client_message_tagged() {
        let msg = ClientMessage::TransferRequest {
            id: TransferId::new(1),
            remote_path: "C:\\data\\report.pdf".to_string(),
        };
        let json = serde_json::to_string(&msg).expect("serialize");
        assert!(json.contains(r#""type":"TransferRequest""#));
        assert!(json.contains(r#""id":1"#));
    }

    #[test]
    fn test_drives_request_roundtrip() {
        let json = serde_json::to_string(&ClientMessage::DrivesRequest).expect("serialize");
        let parsed: ClientMessage = serde_json::from_str(&json).expect("deserialize");
        assert!(matches!(parsed, ClientMessage::DrivesRequest));
    }

    #[test]
    fn test_directory_response_missing_items() {
        // An agent may omit the items array for an empty directory
        let json = r#"{"type":"DirectoryResponse","remote_path":"C:\\empty"}"#;
        let parsed: AgentMessage = serde_json::from_str(json).expect("deserialize");
        match parsed {
            AgentMessage::DirectoryResponse { remote_path, items } => {
                assert_eq!(remote_path, "C:\\empty");
                assert!(items.is_empty());
            }
            _ => panic!("Expected DirectoryResponse"),
        }
    }

    #[test]
    fn test_file_system_entry_defaults() {
        let json = r#"{"name":"docs","kind":"directory"}"#;
        let entry: FileSystemEntry = serde_json::from_str(json).expect("deserialize");
        assert_eq!(entry.name, "docs");
        assert_eq!(entry.kind, PathType::Directory);
        assert_eq!(entry.size, 0);
        assert_eq!(entry.modified, 0);
    }

    #[test]
    fn test_path_type_lowercase() {
        assert_eq!(
            serde_json::to_string(&PathType::File).expect("serialize"),
            r#""file""#
        );
        assert_eq!(
            serde_json::to_string(&PathType::Directory).expect("serialize"),
            r#""directory""#
        );
    }

    #[test]
    fn test_agent_chunk_roundtrip() {
        let msg = AgentMessage::FileChunk {
            id: TransferId::new(9),
            chunk: vec![1, 2, 3],
            file_size: 3,
        };
        let json = serde_json::to_string(&msg).expect("serialize");
        let parsed: AgentMessage = serde_json::from_str(&json).expect("deserialize");
        match parsed {
            AgentMessage::FileChunk { id, chunk, file_size } => {
                assert_eq!(id, TransferId::new(9));
                assert_eq!(chunk, vec![1, 2, 3]);
                assert_eq!(file_size, 3);
            }
            _ => panic!("Expected FileChunk"),
        }
    }
}
