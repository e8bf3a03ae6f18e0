//! Terminal outcomes, live states and the expected-length tri-state.

use std::fmt;

use serde::Serialize;

/// Total size of the remote resource as learned from `Content-Length`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "bytes", rename_all = "snake_case")]
pub enum ExpectedLength {
    /// The server reported this many bytes.
    Known(u64),
    /// The resource is absent or the server sent no usable length.
    Unknown,
}

impl ExpectedLength {
    /// Returns the byte count when known.
    #[must_use]
    pub fn bytes(self) -> Option<u64> {
        match self {
            Self::Known(n) => Some(n),
            Self::Unknown => None,
        }
    }

    /// Returns true when `written` has reached the known length.
    ///
    /// Always false for an unknown length; such loops run to end-of-stream.
    #[must_use]
    pub fn is_reached_by(self, written: u64) -> bool {
        matches!(self, Self::Known(n) if written >= n)
    }
}

impl fmt::Display for ExpectedLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(n) => write!(f, "{n} bytes"),
            Self::Unknown => f.write_str("unknown length"),
        }
    }
}

/// How a single `start` invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferOutcome {
    /// Every expected byte was written and no stop was requested.
    Completed,
    /// The loop observed a stop request and exited early.
    Stopped,
    /// The full fetch returned a non-success status; no sink was created.
    ResourceNotFound,
}

impl fmt::Display for TransferOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Completed => "completed",
            Self::Stopped => "stopped",
            Self::ResourceNotFound => "resource not found",
        })
    }
}

/// Live state derived from the control flags.
///
/// `Stopped` means a stop was *requested*. Whether the loop has finished
/// quiescing is reported separately by `Transfer::is_active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadState {
    /// Not paused and no stop requested.
    Running,
    /// Paused between chunks.
    Paused,
    /// Stop requested.
    Stopped,
}

impl DownloadState {
    /// Derives the live state; `paused` wins over `stop_requested`.
    #[must_use]
    pub fn from_flags(paused: bool, stop_requested: bool) -> Self {
        if paused {
            Self::Paused
        } else if stop_requested {
            Self::Stopped
        } else {
            Self::Running
        }
    }
}

impl fmt::Display for DownloadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
        })
    }
}
