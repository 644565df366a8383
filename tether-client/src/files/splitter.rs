//! File splitter - chunked file access for transfers
//!
//! A [`FileSplitter`] wraps one open local file. For uploads it yields the
//! file as a lazy, finite, non-restartable sequence of fixed-size chunks;
//! for downloads it appends chunks in arrival order. Which set of methods a
//! transfer uses is determined by its direction; the handle itself is just
//! a cursor over the file.

use std::io;
use std::path::Path;

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use tether_common::CHUNK_SIZE;

/// Chunked reader/writer over one local file
///
/// The cursor only ever moves forward: chunks already read cannot be
/// re-read, and appended chunks land after everything written so far.
pub struct FileSplitter {
    file: File,
    /// File size recorded at open time (0 for files opened for writing)
    size: u64,
}

impl FileSplitter {
    /// Open a file for chunked reading (upload direction)
    pub async fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::open(path).await?;
        let size = file.metadata().await?.len();
        Ok(Self { file, size })
    }

    /// Create (or truncate) a file for chunked writing (download direction)
    pub async fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .await?;
        Ok(Self { file, size: 0 })
    }

    /// Total file size recorded when the splitter was opened for reading
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Read the next chunk, or `None` at end of file
    ///
    /// Chunks are at most [`CHUNK_SIZE`] bytes; only the final chunk of a
    /// file may be shorter.
    pub async fn next_chunk(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut filled = 0;

        // A single read may return short even mid-file, so keep reading
        // until the buffer is full or the file ends.
        while filled < buf.len() {
            let n = self.file.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        if filled == 0 {
            return Ok(None);
        }
        buf.truncate(filled);
        Ok(Some(buf))
    }

    /// Append one chunk at the current end of the file
    pub async fn append(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.file.write_all(chunk).await?;
        self.file.flush().await
    }
}
