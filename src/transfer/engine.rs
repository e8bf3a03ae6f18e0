//! Chunked transfer loop.
//!
//! A [`Transfer`] is created once per download attempt. Construction probes
//! the expected length; [`Transfer::start`] (or [`Transfer::spawn`]) runs the
//! loop that streams the body into the destination file one chunk at a time,
//! checking the control flags between chunks. Pause, resume and stop may be
//! called from any task through a cloned handle.
//!
//! # Example
//!
//! ```no_run
//! use filetransfer_core::transfer::{HttpClient, Transfer, TransferOutcome};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new("https://localhost:7092/api")?;
//! let transfer = Transfer::new(client, "movie.mkv", "./movie.mkv", 64 * 1024).await?;
//!
//! let handle = transfer.spawn();
//! transfer.pause();
//! transfer.resume();
//!
//! assert_eq!(handle.await??, TransferOutcome::Completed);
//! # Ok(())
//! # }
//! ```

mod control;
mod sink;

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace, warn};

use super::client::{FetchResponse, HttpClient, content_length_header};
use super::constants::{PAUSE_POLL_INTERVAL, STOP_POLL_INTERVAL};
use super::error::TransferError;
use super::outcome::{ExpectedLength, TransferOutcome};
use super::state::TransferState;
use sink::{Sink, body_reader, fill_chunk};

/// Immutable description of one download attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferDescriptor {
    requested_name: String,
    destination_path: PathBuf,
    chunk_size: usize,
    expected_length: ExpectedLength,
}

impl TransferDescriptor {
    /// Logical name of the remote resource.
    #[must_use]
    pub fn requested_name(&self) -> &str {
        &self.requested_name
    }

    /// Local sink path.
    #[must_use]
    pub fn destination_path(&self) -> &Path {
        &self.destination_path
    }

    /// Bytes per read/write cycle.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Length reported by the construction-time probe.
    #[must_use]
    pub fn expected_length(&self) -> ExpectedLength {
        self.expected_length
    }
}

/// Timing knobs for the loop and the stop rendezvous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOptions {
    /// Upper bound on how long a paused loop sleeps before re-checking flags.
    pub pause_poll_interval: Duration,
    /// Upper bound on how long `stop` sleeps between quiescence checks.
    pub stop_poll_interval: Duration,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            pause_poll_interval: PAUSE_POLL_INTERVAL,
            stop_poll_interval: STOP_POLL_INTERVAL,
        }
    }
}

/// Handle to one controllable transfer.
///
/// Cloning is cheap and every clone controls the same transfer, so one clone
/// can run the loop while another pauses, resumes or stops it.
#[derive(Debug, Clone)]
pub struct Transfer {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    client: HttpClient,
    descriptor: TransferDescriptor,
    options: TransferOptions,
    state: TransferState,
    /// Length adopted from the GET response when the probe could not tell.
    resolved_length: OnceLock<u64>,
}

/// Why the loop stopped iterating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopExit {
    StopObserved,
    LengthReached,
    EndOfStream,
}

impl Transfer {
    /// Creates a transfer with default [`TransferOptions`], probing the length.
    ///
    /// The caller is responsible for `destination_path` being unused; see
    /// [`resolve_unique_path`](super::resolve_unique_path).
    ///
    /// # Errors
    ///
    /// - [`TransferError::InvalidChunkSize`] if `chunk_size` is zero
    /// - [`TransferError::Probe`] if the server cannot be reached
    /// - [`TransferError::InvalidUrl`] if `requested_name` is empty
    pub async fn new(
        client: HttpClient,
        requested_name: impl Into<String>,
        destination_path: impl Into<PathBuf>,
        chunk_size: usize,
    ) -> Result<Self, TransferError> {
        Self::with_options(
            client,
            requested_name,
            destination_path,
            chunk_size,
            TransferOptions::default(),
        )
        .await
    }

    /// Creates a transfer with explicit [`TransferOptions`].
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub async fn with_options(
        client: HttpClient,
        requested_name: impl Into<String>,
        destination_path: impl Into<PathBuf>,
        chunk_size: usize,
        options: TransferOptions,
    ) -> Result<Self, TransferError> {
        if chunk_size == 0 {
            return Err(TransferError::InvalidChunkSize);
        }
        let requested_name = requested_name.into();
        let destination_path = destination_path.into();

        let expected_length = client.probe_length(&requested_name).await?;
        debug!(
            name = %requested_name,
            path = %destination_path.display(),
            chunk_size,
            %expected_length,
            "transfer created"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                client,
                descriptor: TransferDescriptor {
                    requested_name,
                    destination_path,
                    chunk_size,
                    expected_length,
                },
                options,
                state: TransferState::new(),
                resolved_length: OnceLock::new(),
            }),
        })
    }

    /// The immutable descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &TransferDescriptor {
        &self.inner.descriptor
    }

    /// Expected length, including a length adopted from the GET response.
    #[must_use]
    pub fn expected_length(&self) -> ExpectedLength {
        match self.inner.descriptor.expected_length {
            ExpectedLength::Known(n) => ExpectedLength::Known(n),
            ExpectedLength::Unknown => self
                .inner
                .resolved_length
                .get()
                .map_or(ExpectedLength::Unknown, |n| ExpectedLength::Known(*n)),
        }
    }

    /// Bytes written to the sink so far.
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.inner.state.bytes_written()
    }

    /// Number of chunk writes performed.
    #[must_use]
    pub fn chunks_written(&self) -> u64 {
        self.inner.state.chunks_written()
    }

    /// True once `start` has been claimed, even if it has already returned.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.inner.state.is_started()
    }

    /// True while the loop owns the destination.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner.state.is_active()
    }

    /// True once the loop has returned [`TransferOutcome::Completed`].
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.inner.state.is_completed()
    }

    /// Runs the loop on a new tokio task and returns its handle.
    #[must_use = "the join handle carries the transfer outcome"]
    pub fn spawn(&self) -> JoinHandle<Result<TransferOutcome, TransferError>> {
        let transfer = self.clone();
        tokio::spawn(async move { transfer.start().await })
    }

    /// Runs the transfer loop to a terminal outcome.
    ///
    /// May be invoked at most once. The destination is opened in create+append
    /// mode only after a successful fetch, and is flushed and closed before
    /// this returns on every path.
    ///
    /// # Errors
    ///
    /// - [`TransferError::AlreadyStarted`] on a second call
    /// - [`TransferError::Network`] if the fetch fails at the transport level
    /// - [`TransferError::Stream`] if the body fails mid-transfer
    /// - [`TransferError::Io`] if the sink cannot be opened, written or closed
    /// - [`TransferError::Incomplete`] if a known-length body ends early.
    ///   This is not one of the three [`TransferOutcome`]s: the bytes received
    ///   stay on disk, and callers should surface it as a failed download
    ///   rather than a completion.
    #[instrument(skip(self), fields(name = %self.inner.descriptor.requested_name))]
    pub async fn start(&self) -> Result<TransferOutcome, TransferError> {
        let inner = &*self.inner;
        let state = &inner.state;
        let descriptor = &inner.descriptor;

        if !state.claim_start() {
            return Err(TransferError::already_started(&descriptor.requested_name));
        }
        // Dropped last: the sink is always closed before loop_active clears.
        let _active = state.activate();

        if state.is_stop_requested() {
            info!("stop requested before start; no request sent");
            return Ok(TransferOutcome::Stopped);
        }

        let response = match inner.client.fetch(&descriptor.requested_name).await? {
            FetchResponse::Body(response) => response,
            FetchResponse::Missing { status } => {
                info!(status, "resource not found");
                return Ok(TransferOutcome::ResourceNotFound);
            }
        };
        let length = self.resolve_length(&response);

        if state.is_stop_requested() {
            info!("stop requested during fetch; no sink created");
            return Ok(TransferOutcome::Stopped);
        }

        let path = descriptor.destination_path.as_path();
        let mut sink = Sink::open(path).await?;
        state.mark_sink_opened();
        debug!(path = %path.display(), %length, "sink opened");

        let looped = self.run_loop(&mut sink, response, length).await;
        let closed = sink.close().await;
        let exit = looped?;
        closed?;

        let written = state.bytes_written();
        if state.is_stop_requested() {
            info!(bytes = written, "transfer stopped");
            return Ok(TransferOutcome::Stopped);
        }

        if let ExpectedLength::Known(expected) = length
            && written < expected
        {
            warn!(expected, received = written, ?exit, "body ended before expected length");
            return Err(TransferError::incomplete(path, expected, written));
        }

        state.mark_completed();
        info!(bytes = written, chunks = state.chunks_written(), "transfer completed");
        Ok(TransferOutcome::Completed)
    }

    /// Adopts the response's `Content-Length` when the probe found none.
    fn resolve_length(&self, response: &reqwest::Response) -> ExpectedLength {
        let probed = self.inner.descriptor.expected_length;
        if probed != ExpectedLength::Unknown {
            return probed;
        }
        match content_length_header(response.headers()) {
            Some(n) => {
                let _ = self.inner.resolved_length.set(n);
                debug!(bytes = n, "length resolved from fetch response");
                ExpectedLength::Known(n)
            }
            None => ExpectedLength::Unknown,
        }
    }

    async fn run_loop(
        &self,
        sink: &mut Sink,
        response: reqwest::Response,
        length: ExpectedLength,
    ) -> Result<LoopExit, TransferError> {
        let state = &self.inner.state;
        let chunk_size = self.inner.descriptor.chunk_size;
        let url = response.url().to_string();

        let reader = body_reader(response);
        tokio::pin!(reader);
        let mut buffer = vec![0u8; chunk_size];

        loop {
            if state.is_stop_requested() {
                return Ok(LoopExit::StopObserved);
            }
            let written = state.bytes_written();
            if length.is_reached_by(written) {
                return Ok(LoopExit::LengthReached);
            }
            if state.is_paused() {
                state
                    .wait_while_paused(self.inner.options.pause_poll_interval)
                    .await;
                continue;
            }

            // Never read past a known length, so bytes_written <= expected.
            let want = match length.bytes() {
                Some(expected) => {
                    usize::try_from(expected - written).map_or(chunk_size, |rest| rest.min(chunk_size))
                }
                None => chunk_size,
            };

            let read = fill_chunk(&mut reader, &mut buffer[..want])
                .await
                .map_err(|e| TransferError::stream(&url, e))?;
            if read == 0 {
                return Ok(LoopExit::EndOfStream);
            }

            sink.write_chunk(&buffer[..read]).await?;
            state.record_chunk(read as u64);
            trace!(chunk = read, total = state.bytes_written(), "chunk written");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::test_support::socket_guard::start_mock_server_or_skip;

    async fn mount_file(server: &MockServer, name: &str, body: &[u8]) {
        let route = format!("/files/{name}");
        Mock::given(method("HEAD"))
            .and(path(route.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path(route.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_new_rejects_zero_chunk_size() {
        let client = HttpClient::new("http://127.0.0.1:9").unwrap();
        let result = Transfer::new(client, "a.bin", "/tmp/a.bin", 0).await;
        assert!(matches!(result, Err(TransferError::InvalidChunkSize)));
    }

    #[tokio::test]
    async fn test_start_writes_exact_chunks() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        let body: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        mount_file(&server, "data.bin", &body).await;
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("data.bin");

        let client = HttpClient::new(&server.uri()).unwrap();
        let transfer = Transfer::new(client, "data.bin", &dest, 4096).await.unwrap();
        assert_eq!(transfer.descriptor().expected_length(), ExpectedLength::Known(10_000));

        let outcome = transfer.start().await.unwrap();
        assert_eq!(outcome, TransferOutcome::Completed);
        assert_eq!(transfer.bytes_written(), 10_000);
        assert_eq!(transfer.chunks_written(), 3);
        assert!(transfer.is_done());
        assert!(!transfer.is_active());
        assert_eq!(std::fs::read(&dest).unwrap(), body);
    }

    #[tokio::test]
    async fn test_start_twice_is_rejected() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        mount_file(&server, "small.bin", b"hello").await;
        let dir = TempDir::new().unwrap();

        let client = HttpClient::new(&server.uri()).unwrap();
        let transfer = Transfer::new(client, "small.bin", dir.path().join("small.bin"), 2)
            .await
            .unwrap();
        assert_eq!(transfer.start().await.unwrap(), TransferOutcome::Completed);

        let second = transfer.start().await;
        assert!(matches!(second, Err(TransferError::AlreadyStarted { .. })));
        assert_eq!(transfer.bytes_written(), 5);
    }

    #[tokio::test]
    async fn test_unknown_probe_adopts_fetch_length() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        // No HEAD route: the probe sees 404 and reports an unknown length.
        Mock::given(method("GET"))
            .and(path("/files/nohead.bin"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 300]))
            .mount(&server)
            .await;
        let dir = TempDir::new().unwrap();

        let client = HttpClient::new(&server.uri()).unwrap();
        let transfer = Transfer::new(client, "nohead.bin", dir.path().join("nohead.bin"), 128)
            .await
            .unwrap();
        assert_eq!(transfer.expected_length(), ExpectedLength::Unknown);

        assert_eq!(transfer.start().await.unwrap(), TransferOutcome::Completed);
        assert_eq!(transfer.expected_length(), ExpectedLength::Known(300));
        assert_eq!(transfer.bytes_written(), 300);
        assert_eq!(transfer.chunks_written(), 3);
    }

    #[tokio::test]
    async fn test_zero_length_resource_completes_with_empty_file() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        mount_file(&server, "empty.bin", b"").await;
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("empty.bin");

        let client = HttpClient::new(&server.uri()).unwrap();
        let transfer = Transfer::new(client, "empty.bin", &dest, 16).await.unwrap();

        assert_eq!(transfer.start().await.unwrap(), TransferOutcome::Completed);
        assert_eq!(transfer.bytes_written(), 0);
        assert_eq!(transfer.chunks_written(), 0);
        assert_eq!(std::fs::metadata(&dest).unwrap().len(), 0);
    }
}
