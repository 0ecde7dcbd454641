//! Per-call deadlines.
//!
//! A [`Deadline`] pairs an optional expiry instant with a cancellation token.
//! Cancellation is cooperative: the dispatcher checks it between hooks and
//! before invoking the service, and waiters select on [`Deadline::expired`].

use crate::error::{ServiceError, ServiceResult};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Default time an inbound call may run before its caller gets `Timeout`.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Default)]
pub struct Deadline {
    expires_at: Option<Instant>,
    token: CancellationToken,
}

impl Deadline {
    /// A deadline that never expires on its own.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn after(timeout: Duration) -> Self {
        Self {
            expires_at: Some(Instant::now() + timeout),
            token: CancellationToken::new(),
        }
    }

    /// Same expiry, child token: cancelling the parent cancels the child but
    /// not the other way round.
    pub fn child(&self) -> Self {
        Self {
            expires_at: self.expires_at,
            token: self.token.child_token(),
        }
    }

    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_expired(&self) -> bool {
        self.is_cancelled() || self.expires_at.is_some_and(|at| Instant::now() >= at)
    }

    /// Fails with `Timeout` once the deadline has passed or was cancelled.
    pub fn check(&self) -> ServiceResult<()> {
        if self.is_expired() {
            Err(ServiceError::timeout("Call deadline exceeded"))
        } else {
            Ok(())
        }
    }

    /// Resolves when the deadline passes or the token is cancelled.
    pub async fn expired(&self) {
        match self.expires_at {
            Some(at) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = tokio::time::sleep_until(at) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }
}
