//! Controllable streaming file transfer.
//!
//! Downloads one file from a file server in bounded chunks while a caller
//! pauses, resumes or stops it from another task.
//!
//! # Features
//!
//! - Metadata-only length probe before the transfer starts
//! - Fixed-size chunk reads, written synchronously to a create+append sink
//! - Pause/resume observed between chunks, never mid-chunk
//! - `stop` rendezvous: the partial file is deleted only after the loop has
//!   closed it
//! - Closed set of terminal outcomes (`Completed`, `Stopped`, `ResourceNotFound`)
//!
//! # Example
//!
//! ```no_run
//! use filetransfer_core::transfer::{HttpClient, Transfer, resolve_unique_path};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new("https://localhost:7092/api")?;
//! let dest = resolve_unique_path(Path::new("./downloads"), "movie.mkv");
//! let transfer = Transfer::new(client, "movie.mkv", dest, 64 * 1024).await?;
//! let handle = transfer.spawn();
//!
//! // From a UI task:
//! transfer.stop().await?;
//! println!("outcome: {}", handle.await??);
//! # Ok(())
//! # }
//! ```

mod client;
pub(crate) mod constants;
mod engine;
mod error;
mod filename;
mod outcome;
mod state;

pub use client::{FetchResponse, HttpClient};
pub use constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE, PAUSE_POLL_INTERVAL, READ_TIMEOUT_SECS,
    STOP_POLL_INTERVAL,
};
pub use engine::{Transfer, TransferDescriptor, TransferOptions};
pub use error::TransferError;
pub use filename::{resolve_unique_path, sanitize_filename};
pub use outcome::{DownloadState, ExpectedLength, TransferOutcome};

// Note: no module-local Result alias. Use `Result<T, TransferError>` explicitly.
