use sc_core::{Error, Result};
use std::future::Future;
use tokio::sync::watch;

/// In-flight and last-failure state a store exposes to its views.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestStatus {
    pub loading: bool,
    pub error: Option<String>,
    in_flight: usize,
}

impl RequestStatus {
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }
}

/// Publishes a store's [`RequestStatus`].
///
/// `loading` is derived from a count of in-flight calls, so overlapping
/// actions on one store cannot clear each other's flag.
#[derive(Debug)]
pub struct StatusTracker {
    tx: watch::Sender<RequestStatus>,
}

impl StatusTracker {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(RequestStatus::default());
        Self { tx }
    }

    pub fn current(&self) -> RequestStatus {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RequestStatus> {
        self.tx.subscribe()
    }

    /// Marks one call as started. The call counts as finished when the
    /// returned guard is dropped, on every exit path.
    pub fn begin(&self, reset_error: bool) -> Pending<'_> {
        self.tx.send_modify(|status| {
            status.in_flight += 1;
            status.loading = true;
            if reset_error {
                status.error = None;
            }
        });
        Pending { tracker: self }
    }

    pub fn fail(&self, message: String) {
        self.tx.send_modify(|status| status.error = Some(message));
    }

    pub fn clear_error(&self) {
        self.tx.send_if_modified(|status| status.error.take().is_some());
    }

    /// Runs `action` as one tracked call, recording `describe(err)` on failure.
    pub async fn track<T, F, D>(&self, reset_error: bool, describe: D, action: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
        D: FnOnce(&Error) -> String,
    {
        let _pending = self.begin(reset_error);
        let result = action.await;
        if let Err(err) = &result {
            self.fail(describe(err));
        }
        result
    }
}

impl Default for StatusTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[must_use = "the call is finished as soon as the guard is dropped"]
#[derive(Debug)]
pub struct Pending<'a> {
    tracker: &'a StatusTracker,
}

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        self.tracker.tx.send_modify(|status| {
            status.in_flight = status.in_flight.saturating_sub(1);
            status.loading = status.in_flight > 0;
        });
    }
}
