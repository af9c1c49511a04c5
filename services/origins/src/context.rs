//! Deadline and cancellation for one fetch

use crate::error::{OriginError, Result};
use std::future::{pending, Future};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Cancels every [`FetchContext`] derived from it
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<bool>);

impl CancelHandle {
    pub fn cancel(&self) {
        // receivers may all be gone already
        let _ = self.0.send(true);
    }
}

/// Bounds a fetch in time and lets the caller abandon it
///
/// Every chain read goes through [`FetchContext::run`], so a cancelled or expired
/// context surfaces as [`OriginError::Cancelled`] or [`OriginError::DeadlineExceeded`]
/// at the next await point.
#[derive(Debug, Clone, Default)]
pub struct FetchContext {
    deadline: Option<Instant>,
    cancel: Option<watch::Receiver<bool>>,
}

impl FetchContext {
    /// No deadline and no cancellation
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
            cancel: None,
        }
    }

    /// Attach a cancellation signal, returning the handle that fires it
    pub fn cancellable(mut self) -> (Self, CancelHandle) {
        let (sender, receiver) = watch::channel(false);
        self.cancel = Some(receiver);
        (self, CancelHandle(sender))
    }

    /// Same cancellation, deadline moved no later than `timeout` from now
    pub fn with_budget(&self, timeout: Duration) -> Self {
        let budget = Instant::now() + timeout;
        Self {
            deadline: Some(self.deadline.map_or(budget, |deadline| deadline.min(budget))),
            cancel: self.cancel.clone(),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|cancel| *cancel.borrow())
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Drive `future` until it completes, the context is cancelled or the deadline passes
    pub async fn run<F: Future>(&self, future: F) -> Result<F::Output> {
        let cancelled = async {
            match self.cancel.clone() {
                Some(mut cancel) => loop {
                    if *cancel.borrow_and_update() {
                        return;
                    }
                    if cancel.changed().await.is_err() {
                        // handle dropped without cancelling
                        pending::<()>().await;
                    }
                },
                None => pending::<()>().await,
            }
        };
        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancelled => Err(OriginError::Cancelled),
            _ = expired => Err(OriginError::DeadlineExceeded),
            output = future => Ok(output),
        }
    }
}
