//! Error types for the transfer module.
//!
//! `ResourceNotFound` is deliberately absent here: a missing resource is a
//! terminal [`TransferOutcome`](super::TransferOutcome), not an error.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while probing, starting or stopping a transfer.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Transport failure while determining the expected length.
    ///
    /// Fatal to construction: the transfer is never created.
    #[error("length probe failed for {url}: {source}")]
    Probe {
        /// The URL that was probed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Transport failure on the full fetch request.
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The response body failed while being streamed.
    #[error("stream error reading {url}: {source}")]
    Stream {
        /// The URL whose body failed.
        url: String,
        /// The underlying read error.
        #[source]
        source: std::io::Error,
    },

    /// Local sink failure (open, write, flush or delete).
    #[error("IO error on {path}: {source}")]
    Io {
        /// The sink path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The server base URL or resource URL is malformed.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The offending URL string.
        url: String,
    },

    /// The underlying HTTP client could not be built.
    #[error("failed to build HTTP client: {source}")]
    ClientBuild {
        /// The builder error.
        #[source]
        source: reqwest::Error,
    },

    /// Chunk size must be at least one byte.
    #[error("invalid chunk size: must be at least 1 byte")]
    InvalidChunkSize,

    /// `start` was invoked a second time on the same transfer.
    #[error("transfer for {name} was already started")]
    AlreadyStarted {
        /// The requested resource name.
        name: String,
    },

    /// A known-length body ended before all bytes arrived.
    #[error("body ended early for {path}: expected {expected} bytes, received {received}")]
    Incomplete {
        /// Sink path holding the partial data.
        path: PathBuf,
        /// Expected size in bytes.
        expected: u64,
        /// Bytes actually written.
        received: u64,
    },
}

impl TransferError {
    /// Creates a probe failure.
    pub fn probe(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Probe {
            url: url.into(),
            source,
        }
    }

    /// Creates a fetch network error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a mid-stream read error.
    pub fn stream(url: impl Into<String>, source: std::io::Error) -> Self {
        Self::Stream {
            url: url.into(),
            source,
        }
    }

    /// Creates a sink IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates an already-started error.
    pub fn already_started(name: impl Into<String>) -> Self {
        Self::AlreadyStarted { name: name.into() }
    }

    /// Creates an incomplete-body error.
    pub fn incomplete(path: impl Into<PathBuf>, expected: u64, received: u64) -> Self {
        Self::Incomplete {
            path: path.into(),
            expected,
            received,
        }
    }
}

// No From<reqwest::Error> / From<std::io::Error>: every variant needs the url
// or path that the source error does not carry.
