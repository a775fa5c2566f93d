//! Deadline scopes for endpoint handlers.
//!
//! # Responsibilities
//! - Derive a cancellable, time-bounded scope from an endpoint's timeout
//! - Tie the scope to the lifetime of the in-flight request
//! - Let backend work observe cancellation cooperatively
//!
//! # Design Decisions
//! - A zero timeout is the "no deadline" sentinel, not an immediate expiry
//! - Expiry cancels the scope; nothing is forcibly aborted
//! - Uses Tokio's timer facilities and `tokio_util`'s `CancellationToken`

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Cancellable execution scope shared by a handler and its backend task.
#[derive(Debug, Clone)]
pub struct DeadlineScope {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl DeadlineScope {
    /// Build a scope from a configured timeout.
    ///
    /// `Duration::ZERO` installs no timer at all: the scope then ends only
    /// when it is cancelled, i.e. when the request itself goes away.
    pub fn from_timeout(timeout: Duration) -> Self {
        if timeout.is_zero() {
            Self::unbounded()
        } else {
            Self::until(Instant::now() + timeout)
        }
    }

    /// A scope without a deadline.
    pub fn unbounded() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// A scope that expires at `deadline`.
    pub fn until(deadline: Instant) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(deadline),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` when unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the scope is cancelled or its deadline passes.
    ///
    /// Backend work selects on this to wind down on its own.
    pub async fn done(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }

    /// Cancel the scope when the returned guard is dropped.
    ///
    /// The handler holds this for the duration of the request, so a client
    /// disconnect (which drops the handler future) cancels the backend too.
    pub fn cancel_on_drop(&self) -> DropGuard {
        self.token.clone().drop_guard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_timeout_means_no_deadline() {
        let scope = DeadlineScope::from_timeout(Duration::ZERO);
        assert!(scope.deadline().is_none());
        assert!(scope.remaining().is_none());
        assert!(!scope.is_cancelled());
    }

    #[tokio::test]
    async fn test_positive_timeout_sets_deadline() {
        let before = Instant::now();
        let scope = DeadlineScope::from_timeout(Duration::from_millis(250));
        let deadline = scope.deadline().unwrap();
        assert!(deadline >= before + Duration::from_millis(250));
        assert!(scope.remaining().unwrap() <= Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_done_fires_at_deadline() {
        let scope = DeadlineScope::from_timeout(Duration::from_millis(20));
        let start = Instant::now();
        scope.done().await;
        assert!(start.elapsed() >= Duration::from_millis(15));
    }

    #[tokio::test]
    async fn test_done_fires_on_cancel_without_deadline() {
        let scope = DeadlineScope::unbounded();
        let observer = scope.clone();
        let waiter = tokio::spawn(async move { observer.done().await });

        scope.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("cancellation was not observed")
            .unwrap();
        assert!(scope.is_cancelled());
    }

    #[test]
    fn test_guard_cancels_on_drop() {
        let scope = DeadlineScope::unbounded();
        let guard = scope.cancel_on_drop();
        assert!(!scope.is_cancelled());
        drop(guard);
        assert!(scope.is_cancelled());
    }
}
