//! Filetransfer Core Library
//!
//! Client-side engine that downloads a file over HTTP in bounded chunks and
//! exposes live pause, resume and stop controls to a caller such as a UI
//! thread or the bundled CLI.
//!
//! # Architecture
//!
//! - [`transfer`] - length probe, chunked transfer loop, control surface and
//!   outcome model

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(test)]
pub mod test_support;
pub mod transfer;

// Re-export commonly used types
pub use transfer::{
    DEFAULT_CHUNK_SIZE, DownloadState, ExpectedLength, HttpClient, Transfer, TransferDescriptor,
    TransferError, TransferOptions, TransferOutcome, resolve_unique_path,
};
