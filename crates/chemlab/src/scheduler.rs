//! Debounced Analysis Scheduler
//!
//! Owns the single pending debounce timer and the latest request id. Every
//! armed timer carries a token; a timer whose token is no longer current does
//! nothing when it wakes, even if its abort raced with the wake-up.
//!
//! Calls already in flight are never cancelled by a newer trigger. They run to
//! completion and their result is dropped unless their id is still the latest.

use chemlab_common::RequestId;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

struct PendingTimer {
    token: u64,
    handle: JoinHandle<()>,
}

/// What to do with a settled request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Latest request: apply its outcome
    Apply,
    /// Superseded by a newer request or a cancellation: discard
    Stale,
}

pub struct AnalysisScheduler {
    window: Duration,
    pending: Option<PendingTimer>,
    next_token: u64,
    latest_request_id: u64,
    outstanding: Option<RequestId>,
    in_flight: Vec<JoinHandle<()>>,
}

impl AnalysisScheduler {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
            next_token: 0,
            latest_request_id: 0,
            outstanding: None,
            in_flight: Vec::new(),
        }
    }

    /// (Re)start the debounce timer, cancelling any previous one.
    ///
    /// `spawn` receives the new token and the window and returns the timer task.
    pub fn arm<F>(&mut self, spawn: F) -> u64
    where
        F: FnOnce(u64, Duration) -> JoinHandle<()>,
    {
        if let Some(previous) = self.pending.take() {
            debug!("Debounce timer {} superseded", previous.token);
            previous.handle.abort();
        }

        self.next_token += 1;
        let token = self.next_token;
        let handle = spawn(token, self.window);
        self.pending = Some(PendingTimer { token, handle });
        token
    }

    /// Called by a timer when it elapses. True if it is still the current
    /// timer, in which case it is disarmed and the caller should proceed.
    pub fn take_if_current(&mut self, token: u64) -> bool {
        match &self.pending {
            Some(p) if p.token == token => {
                // The caller is this task; dropping the handle detaches it
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    /// A debounce timer is waiting to fire
    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// Allocate the next request id and mark it outstanding
    pub fn issue(&mut self) -> RequestId {
        self.latest_request_id += 1;
        let id = RequestId(self.latest_request_id);
        self.outstanding = Some(id);
        id
    }

    /// Keep a handle on an in-flight call so teardown can abort it
    pub fn track(&mut self, handle: JoinHandle<()>) {
        self.in_flight.retain(|h| !h.is_finished());
        self.in_flight.push(handle);
    }

    pub fn is_latest(&self, id: RequestId) -> bool {
        id.0 == self.latest_request_id
    }

    pub fn latest_request_id(&self) -> RequestId {
        RequestId(self.latest_request_id)
    }

    /// Record that a request settled (success or failure)
    pub fn settle(&mut self, id: RequestId) -> Settlement {
        if self.is_latest(id) {
            self.outstanding = None;
            Settlement::Apply
        } else {
            Settlement::Stale
        }
    }

    /// The latest request has not settled yet
    pub fn is_analyzing(&self) -> bool {
        self.outstanding.is_some()
    }

    /// The displayed result may lag the flask: a timer is armed or a call is out
    pub fn is_pending(&self) -> bool {
        self.is_armed() || self.is_analyzing()
    }

    /// Cancel the pending timer and supersede every issued request id.
    ///
    /// In-flight calls keep running; their results will settle as stale.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            debug!("Debounce timer {} cancelled", pending.token);
            pending.handle.abort();
        }
        // No request carries this id, so every outstanding one is now stale
        self.latest_request_id += 1;
        self.outstanding = None;
    }

    /// Cancel and also abort every in-flight call
    pub fn shutdown(&mut self) {
        self.cancel();
        for handle in self.in_flight.drain(..) {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idle_task() -> JoinHandle<()> {
        tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        })
    }

    #[tokio::test]
    async fn test_rearm_supersedes_previous_timer() {
        let mut scheduler = AnalysisScheduler::new(Duration::from_millis(1000));
        let first = scheduler.arm(|_, _| idle_task());
        let second = scheduler.arm(|_, _| idle_task());

        assert_ne!(first, second);
        assert!(!scheduler.take_if_current(first));
        assert!(scheduler.take_if_current(second));
        assert!(!scheduler.is_armed());
        // A token fires at most once
        assert!(!scheduler.take_if_current(second));
    }

    #[tokio::test]
    async fn test_arm_passes_window() {
        let mut scheduler = AnalysisScheduler::new(Duration::from_millis(1200));
        scheduler.arm(|token, window| {
            assert_eq!(token, 1);
            assert_eq!(window, Duration::from_millis(1200));
            idle_task()
        });
        assert!(scheduler.is_armed());
        assert!(scheduler.is_pending());
    }

    #[test]
    fn test_only_latest_request_applies() {
        let mut scheduler = AnalysisScheduler::new(Duration::from_millis(1000));
        let a = scheduler.issue();
        let b = scheduler.issue();
        assert!(scheduler.is_analyzing());

        // B lands first and clears the analyzing flag
        assert_eq!(scheduler.settle(b), Settlement::Apply);
        assert!(!scheduler.is_analyzing());

        // A lands late and is stale
        assert_eq!(scheduler.settle(a), Settlement::Stale);
        assert!(!scheduler.is_analyzing());
    }

    #[test]
    fn test_stale_settle_keeps_analyzing() {
        let mut scheduler = AnalysisScheduler::new(Duration::from_millis(1000));
        let a = scheduler.issue();
        let _b = scheduler.issue();

        assert_eq!(scheduler.settle(a), Settlement::Stale);
        assert!(scheduler.is_analyzing());
    }

    #[tokio::test]
    async fn test_cancel_supersedes_everything() {
        let mut scheduler = AnalysisScheduler::new(Duration::from_millis(1000));
        let token = scheduler.arm(|_, _| idle_task());
        let a = scheduler.issue();

        scheduler.cancel();
        assert!(!scheduler.is_armed());
        assert!(!scheduler.is_analyzing());
        assert!(!scheduler.take_if_current(token));
        assert_eq!(scheduler.settle(a), Settlement::Stale);

        // Ids keep increasing past the cancellation
        let next = scheduler.issue();
        assert!(next > a);
        assert_eq!(scheduler.settle(next), Settlement::Apply);
    }

    #[tokio::test]
    async fn test_shutdown_aborts_in_flight() {
        let mut scheduler = AnalysisScheduler::new(Duration::from_millis(1000));
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        scheduler.track(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            let _ = tx.send(());
        }));

        scheduler.shutdown();
        // Sender is dropped unsent when the task is aborted
        assert!(rx.await.is_err());
    }
}
