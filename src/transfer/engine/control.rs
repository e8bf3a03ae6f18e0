//! Pause, resume, state query and the stop rendezvous.

use std::io::ErrorKind;

use tracing::{debug, info, instrument};

use super::Transfer;
use crate::transfer::error::TransferError;
use crate::transfer::outcome::DownloadState;

impl Transfer {
    /// Pauses the loop at the next chunk boundary.
    ///
    /// Ignored unless the loop is active, so a stale UI command can never
    /// leave a flag behind for a later start. A pause that races the loop's
    /// exit is withdrawn, and the loop clears `paused` when it exits.
    pub fn pause(&self) {
        let name = &self.inner.descriptor.requested_name;
        if self.inner.state.try_pause() {
            debug!(%name, "pause requested");
        } else {
            debug!(%name, "pause ignored: loop not active");
        }
    }

    /// Resumes a paused loop. Ignored unless the loop is active.
    pub fn resume(&self) {
        let name = &self.inner.descriptor.requested_name;
        if self.inner.state.try_resume() {
            debug!(%name, "resume requested");
        } else {
            debug!(%name, "resume ignored: loop not active");
        }
    }

    /// Live state from the control flags. Never blocks.
    ///
    /// Once the loop has exited this is `Running`, or `Stopped` if a stop was
    /// requested; never `Paused`.
    #[must_use]
    pub fn state(&self) -> DownloadState {
        let state = &self.inner.state;
        DownloadState::from_flags(state.is_paused(), state.is_stop_requested())
    }

    /// Requests a stop and waits until the loop has closed the sink.
    ///
    /// Only after the loop has quiesced is the partially written destination
    /// deleted and `bytes_written` reset to zero. Works before `start` (the
    /// later `start` returns `Stopped` without touching the network) and is a
    /// no-op once the transfer has completed.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Io`] if the partial file exists but cannot be
    /// deleted.
    #[instrument(skip(self), fields(name = %self.inner.descriptor.requested_name))]
    pub async fn stop(&self) -> Result<(), TransferError> {
        let state = &self.inner.state;
        if state.is_completed() {
            debug!("stop ignored: transfer already completed");
            return Ok(());
        }

        state.request_stop();
        state
            .wait_quiesced(self.inner.options.stop_poll_interval)
            .await;

        // The loop may have finished the last chunk before seeing the flag.
        if state.is_completed() {
            debug!("transfer completed before observing stop; keeping file");
            return Ok(());
        }

        if state.is_sink_opened() {
            let path = self.inner.descriptor.destination_path.as_path();
            match tokio::fs::remove_file(path).await {
                Ok(()) => info!(path = %path.display(), "partial file deleted"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(TransferError::io(path, e)),
            }
        }
        state.reset_bytes();
        Ok(())
    }
}
