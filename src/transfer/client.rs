//! HTTP client wrapper for the collaborator file endpoint.
//!
//! The endpoint serves `GET {base}/files/{name}` with a `Content-Length`
//! header and a `HEAD` variant carrying the same header without a body.
//! [`HttpClient`] probes the length with `HEAD` and opens the full `GET`;
//! the chunked loop in [`super::engine`] consumes the response body.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::{CONTENT_LENGTH, HeaderMap};
use tracing::{debug, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, FILES_ROUTE, READ_TIMEOUT_SECS};
use super::error::TransferError;
use super::outcome::ExpectedLength;

/// HTTP client bound to one file server.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: Url,
}

/// Result of the full fetch request.
#[derive(Debug)]
pub enum FetchResponse {
    /// Success status; the body is ready to stream.
    Body(reqwest::Response),
    /// Non-success status. The transfer reports `ResourceNotFound`.
    Missing {
        /// The HTTP status code returned.
        status: u16,
    },
}

impl HttpClient {
    /// Creates a client for `base_url` with default timeouts.
    ///
    /// Default configuration:
    /// - Connect timeout: 30 seconds
    /// - Read timeout: 5 minutes between body reads
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::InvalidUrl`] if `base_url` does not parse or
    /// cannot carry path segments, and [`TransferError::ClientBuild`] if the
    /// reqwest builder fails.
    pub fn new(base_url: &str) -> Result<Self, TransferError> {
        Self::with_timeouts(base_url, CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a client with explicit timeout values.
    ///
    /// The read timeout applies per body read, not to the whole transfer, so a
    /// long pause does not expire an otherwise healthy download.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    #[instrument(level = "debug")]
    pub fn with_timeouts(
        base_url: &str,
        connect_timeout_secs: u64,
        read_timeout_secs: u64,
    ) -> Result<Self, TransferError> {
        let base_url =
            Url::parse(base_url).map_err(|_| TransferError::invalid_url(base_url.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(TransferError::invalid_url(base_url.to_string()));
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .read_timeout(Duration::from_secs(read_timeout_secs))
            .user_agent(concat!("filetransfer/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| TransferError::ClientBuild { source })?;

        Ok(Self { client, base_url })
    }

    /// Returns the server base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Builds `{base}/files/{name}`, encoding `name` as a single path segment.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::InvalidUrl`] for an empty name.
    pub fn resource_url(&self, name: &str) -> Result<Url, TransferError> {
        if name.is_empty() {
            return Err(TransferError::invalid_url(format!(
                "{}/{FILES_ROUTE}/",
                self.base_url.as_str().trim_end_matches('/')
            )));
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| TransferError::invalid_url(self.base_url.to_string()))?
            .pop_if_empty()
            .push(FILES_ROUTE)
            .push(name);
        Ok(url)
    }

    /// Determines the expected length with a metadata-only `HEAD` request.
    ///
    /// A reachable server that answers with a non-success status yields
    /// [`ExpectedLength::Unknown`]; the subsequent full fetch then reports the
    /// missing resource on its own.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Probe`] on transport failure (DNS, refused
    /// connection, timeout).
    #[instrument(skip(self), fields(base = %self.base_url))]
    pub async fn probe_length(&self, name: &str) -> Result<ExpectedLength, TransferError> {
        let url = self.resource_url(name)?;

        let response = self
            .client
            .head(url.clone())
            .send()
            .await
            .map_err(|e| TransferError::probe(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            debug!(status = status.as_u16(), "probe returned non-success status");
            return Ok(ExpectedLength::Unknown);
        }

        let length = content_length_header(response.headers())
            .map_or(ExpectedLength::Unknown, ExpectedLength::Known);
        debug!(%length, "probed expected length");
        Ok(length)
    }

    /// Issues the full `GET` for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Network`] on transport failure. A non-success
    /// status is not an error; it comes back as [`FetchResponse::Missing`].
    #[instrument(skip(self), fields(base = %self.base_url))]
    pub async fn fetch(&self, name: &str) -> Result<FetchResponse, TransferError> {
        let url = self.resource_url(name)?;

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| TransferError::network(url.as_str(), e))?;

        let status = response.status();
        if status.is_success() {
            Ok(FetchResponse::Body(response))
        } else {
            debug!(status = status.as_u16(), "fetch returned non-success status");
            Ok(FetchResponse::Missing {
                status: status.as_u16(),
            })
        }
    }
}

/// Reads `Content-Length` straight from the headers.
///
/// `Response::content_length` reports the body size hint, which is zero for
/// `HEAD` responses, so the header is parsed directly.
pub(crate) fn content_length_header(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
}
