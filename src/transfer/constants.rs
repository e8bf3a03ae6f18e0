//! Constants for the transfer module (timeouts, chunking, control polling).

use std::time::Duration;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes for large files).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Default bytes per read/write cycle.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Largest chunk size accepted from configuration (16 MiB).
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// How long a paused loop sleeps before re-checking its flags.
pub const PAUSE_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// How long `stop` waits between checks for loop quiescence.
pub const STOP_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Path segment under the server base that serves files.
pub const FILES_ROUTE: &str = "files";
