//! Cancellation and deadlines for storage round-trips.
//!
//! Every repository method takes an [`ExecContext`]. The storage future is raced against the
//! context's cancellation token and deadline; whichever loses is dropped, which aborts the
//! in-flight query.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::errors::ApiError;

/// Execution context for one logical request.
#[derive(Debug, Clone, Default)]
pub struct ExecContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl ExecContext {
    /// A context that never times out and is only cancelled through [`cancel`](Self::cancel).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing token, e.g. one tied to server shutdown.
    #[must_use]
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Tighten the deadline to `timeout` from now. An earlier deadline is kept.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Tighten the deadline to `deadline`. An earlier deadline is kept.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(self.deadline.map_or(deadline, |current| current.min(deadline)));
        self
    }

    /// A context cancelled together with this one, sharing its deadline.
    /// Cancelling the child leaves the parent running.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Drive `fut` to completion unless the context is cancelled or its deadline passes first.
    ///
    /// `operation` names the call in errors and logs.
    ///
    /// # Errors
    ///
    /// [`ApiError::Cancelled`] on cancellation, [`ApiError::Timeout`] when the deadline passes,
    /// otherwise whatever `fut` fails with, converted into [`ApiError`].
    pub async fn run<T, E, F>(&self, operation: &str, fut: F) -> Result<T, ApiError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<ApiError>,
    {
        if self.token.is_cancelled() {
            tracing::debug!(operation, "Skipping storage call on cancelled context");
            return Err(ApiError::cancelled(operation));
        }

        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;

            () = self.token.cancelled() => {
                tracing::debug!(operation, "Storage call cancelled");
                Err(ApiError::cancelled(operation))
            }
            () = deadline => {
                tracing::warn!(operation, "Storage call exceeded its deadline");
                Err(ApiError::timeout(operation))
            }
            result = fut => result.map_err(Into::into),
        }
    }
}
