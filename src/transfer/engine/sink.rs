//! Local sink and chunk reads for the transfer loop.

use std::io;
use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio_util::io::StreamReader;

use crate::transfer::error::TransferError;

/// Open destination file. Exists only while the loop is active.
#[derive(Debug)]
pub(crate) struct Sink {
    file: File,
    path: PathBuf,
}

impl Sink {
    /// Opens `path` in create+append mode.
    pub(crate) async fn open(path: &Path) -> Result<Self, TransferError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| TransferError::io(path, e))?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Writes one chunk and waits until it has reached the OS.
    pub(crate) async fn write_chunk(&mut self, bytes: &[u8]) -> Result<(), TransferError> {
        self.file
            .write_all(bytes)
            .await
            .map_err(|e| TransferError::io(&self.path, e))?;
        // tokio's File hands writes to a blocking thread; flush waits for it.
        self.file
            .flush()
            .await
            .map_err(|e| TransferError::io(&self.path, e))
    }

    /// Flushes and releases the OS handle before returning.
    ///
    /// `into_std` waits for in-flight blocking operations, so once this
    /// returns no thread still holds the descriptor.
    pub(crate) async fn close(self) -> Result<(), TransferError> {
        let Self { mut file, path } = self;
        let flushed = file.flush().await;
        let std_file = file.into_std().await;
        drop(std_file);
        flushed.map_err(|e| TransferError::io(path, e))
    }
}

/// Adapts a response body into an [`AsyncRead`] so chunks can be sized freely.
pub(crate) fn body_reader(response: reqwest::Response) -> impl AsyncRead + Send {
    StreamReader::new(
        response
            .bytes_stream()
            .map(|item| item.map_err(io::Error::other)),
    )
}

/// Reads until `buf` is full or the stream ends. Returns the bytes read.
///
/// A short count therefore always means end-of-stream.
pub(crate) async fn fill_chunk<R>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
