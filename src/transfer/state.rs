//! Runtime state shared between the transfer loop and the control surface.
//!
//! Every flag has a single writer:
//! - the loop writes `bytes_written`, `chunks_written`, `loop_active`,
//!   `sink_opened` and `completed`
//! - the control surface writes `paused` and `stop_requested`; the loop only
//!   clears `paused` on exit, after `loop_active`
//!
//! `stop` resets `bytes_written` only after the loop has quiesced, so the two
//! writers never overlap. All accesses use `SeqCst`: `start` publishes
//! `loop_active` before reading `stop_requested`, and `stop` publishes
//! `stop_requested` before reading `loop_active`, so at least one side always
//! sees the other.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::Notify;

#[derive(Debug, Default)]
pub(crate) struct TransferState {
    bytes_written: AtomicU64,
    chunks_written: AtomicU64,
    paused: AtomicBool,
    stop_requested: AtomicBool,
    loop_active: AtomicBool,
    started: AtomicBool,
    sink_opened: AtomicBool,
    completed: AtomicBool,
    /// Wakes a paused loop on resume or stop.
    wake: Notify,
    /// Wakes `stop` callers once the loop has exited.
    quiesced: Notify,
}

impl TransferState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    // ---- loop side ----

    /// Claims the single `start` for this transfer. Returns false if taken.
    pub(crate) fn claim_start(&self) -> bool {
        !self.started.swap(true, Ordering::SeqCst)
    }

    /// Marks the loop active until the returned guard drops.
    pub(crate) fn activate(&self) -> ActiveGuard<'_> {
        self.loop_active.store(true, Ordering::SeqCst);
        ActiveGuard { state: self }
    }

    pub(crate) fn mark_sink_opened(&self) {
        self.sink_opened.store(true, Ordering::SeqCst);
    }

    pub(crate) fn mark_completed(&self) {
        self.completed.store(true, Ordering::SeqCst);
    }

    pub(crate) fn record_chunk(&self, bytes: u64) {
        self.bytes_written.fetch_add(bytes, Ordering::SeqCst);
        self.chunks_written.fetch_add(1, Ordering::SeqCst);
    }

    /// Sleeps until resumed, stopped, or `poll` elapses, whichever is first.
    pub(crate) async fn wait_while_paused(&self, poll: Duration) {
        let notified = self.wake.notified();
        if !self.is_paused() || self.is_stop_requested() {
            return;
        }
        let _ = tokio::time::timeout(poll, notified).await;
    }

    // ---- control side ----

    /// Sets `paused` if the loop is active. Returns false when ignored.
    ///
    /// The flag is re-checked after the store: if the loop exited in between,
    /// the pause is withdrawn so it never outlives the loop.
    pub(crate) fn try_pause(&self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.paused.store(true, Ordering::SeqCst);
        if self.is_active() {
            return true;
        }
        self.paused.store(false, Ordering::SeqCst);
        false
    }

    /// Clears `paused` if the loop is active and wakes it. Returns false when
    /// ignored.
    pub(crate) fn try_resume(&self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.paused.store(false, Ordering::SeqCst);
        self.wake.notify_waiters();
        true
    }

    pub(crate) fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
        self.wake.notify_waiters();
    }

    /// Returns once the loop is no longer active.
    ///
    /// Relies on the quiesce notification but re-checks every `poll`, so a
    /// missed wake-up costs at most one interval.
    pub(crate) async fn wait_quiesced(&self, poll: Duration) {
        loop {
            let notified = self.quiesced.notified();
            if !self.is_active() {
                return;
            }
            let _ = tokio::time::timeout(poll, notified).await;
        }
    }

    pub(crate) fn reset_bytes(&self) {
        self.bytes_written.store(0, Ordering::SeqCst);
    }

    // ---- readers ----

    pub(crate) fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::SeqCst)
    }

    pub(crate) fn chunks_written(&self) -> u64 {
        self.chunks_written.load(Ordering::SeqCst)
    }

    pub(crate) fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub(crate) fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    pub(crate) fn is_active(&self) -> bool {
        self.loop_active.load(Ordering::SeqCst)
    }

    pub(crate) fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub(crate) fn is_sink_opened(&self) -> bool {
        self.sink_opened.load(Ordering::SeqCst)
    }

    pub(crate) fn is_completed(&self) -> bool {
        self.completed.load(Ordering::SeqCst)
    }
}

/// Clears `loop_active`, then `paused`, and wakes `stop` callers when dropped.
///
/// Declared before the sink in `start`, so it drops after the sink on every
/// path, including errors. `paused` is cleared after `loop_active` so a
/// `try_pause` that saw the loop active cannot leave the flag set.
#[derive(Debug)]
pub(crate) struct ActiveGuard<'a> {
    state: &'a TransferState,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.state.loop_active.store(false, Ordering::SeqCst);
        self.state.paused.store(false, Ordering::SeqCst);
        self.state.quiesced.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_start_only_once() {
        let state = TransferState::new();
        assert!(state.claim_start());
        assert!(!state.claim_start());
        assert!(state.is_started());
    }

    #[test]
    fn test_active_guard_clears_flag_on_drop() {
        let state = TransferState::new();
        {
            let _guard = state.activate();
            assert!(state.is_active());
        }
        assert!(!state.is_active());
    }

    #[test]
    fn test_record_chunk_accumulates() {
        let state = TransferState::new();
        state.record_chunk(4096);
        state.record_chunk(1808);
        assert_eq!(state.bytes_written(), 5904);
        assert_eq!(state.chunks_written(), 2);

        state.reset_bytes();
        assert_eq!(state.bytes_written(), 0);
        assert_eq!(state.chunks_written(), 2);
    }

    #[test]
    fn test_stop_request_is_idempotent() {
        let state = TransferState::new();
        state.request_stop();
        state.request_stop();
        assert!(state.is_stop_requested());
    }

    #[tokio::test]
    async fn test_wait_quiesced_returns_immediately_when_inactive() {
        let state = TransferState::new();
        tokio::time::timeout(Duration::from_secs(1), state.wait_quiesced(Duration::from_secs(10)))
            .await
            .unwrap_or_else(|_| panic!("wait_quiesced blocked on an inactive loop"));
    }

    #[tokio::test]
    async fn test_wait_quiesced_wakes_on_guard_drop() {
        let state = std::sync::Arc::new(TransferState::new());
        let guard_state = std::sync::Arc::clone(&state);
        let (ready_tx, ready_rx) = tokio::sync::oneshot::channel::<()>();

        let loop_task = tokio::spawn(async move {
            let _guard = guard_state.activate();
            let _ = ready_tx.send(());
            tokio::time::sleep(Duration::from_millis(50)).await;
        });

        let _ = ready_rx.await;
        // Poll interval far above the test timeout: only the notification can wake it.
        tokio::time::timeout(Duration::from_secs(2), state.wait_quiesced(Duration::from_secs(60)))
            .await
            .unwrap_or_else(|_| panic!("quiesce notification was not delivered"));
        assert!(!state.is_active());
        loop_task.await.unwrap_or_else(|e| panic!("loop task failed: {e}"));
    }

    #[test]
    fn test_pause_ignored_while_inactive() {
        let state = TransferState::new();
        assert!(!state.try_pause());
        assert!(!state.is_paused());
        assert!(!state.try_resume());
    }

    #[test]
    fn test_loop_exit_clears_pause() {
        let state = TransferState::new();
        {
            let _guard = state.activate();
            assert!(state.try_pause());
            assert!(state.is_paused());
        }
        assert!(!state.is_active());
        assert!(!state.is_paused());
    }

    #[tokio::test]
    async fn test_wait_while_paused_wakes_on_resume() {
        let state = std::sync::Arc::new(TransferState::new());
        let _guard = state.activate();
        assert!(state.try_pause());

        let waiter_state = std::sync::Arc::clone(&state);
        let waiter = tokio::spawn(async move {
            waiter_state.wait_while_paused(Duration::from_secs(60)).await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(state.try_resume());
        tokio::time::timeout(Duration::from_secs(2), waiter)
            .await
            .unwrap_or_else(|_| panic!("resume did not wake the paused loop"))
            .unwrap_or_else(|e| panic!("waiter failed: {e}"));
    }
}
