//! Tether Common Library
//!
//! Shared protocol types and constants for the Tether remote
//! administration link. Both the controller side and the remote agent
//! speak the message vocabulary defined in [`protocol`].

pub mod protocol;

/// Version information for the Tether protocol
pub const PROTOCOL_VERSION: &str = "0.2.1";

/// Fixed chunk size for file transfers (64 KiB)
///
/// Files are exchanged as an ordered sequence of chunks of at most this
/// many bytes. The last chunk of a file may be shorter.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Maximum number of uploads streaming chunks at the same time
///
/// Additional uploads queue behind an admission slot until one frees up.
pub const MAX_CONCURRENT_UPLOADS: usize = 2;
