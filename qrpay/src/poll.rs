//! Fixed-interval polling with optional attempt cap and cancellation.
//!
//! [`Poller`] repeatedly runs an async check until it yields a value. Between
//! attempts it sleeps for a fixed interval; there is no backoff. Sleeping goes
//! through [`tokio::time`], so tests can pause the clock and let it
//! auto-advance instead of waiting in real time.

use std::future::Future;
use std::num::NonZeroU32;
use std::ops::ControlFlow;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Reasons a poll ended without producing a value.
#[derive(Debug, thiserror::Error)]
pub enum PollError<E> {
    /// The check itself failed.
    #[error(transparent)]
    Check(E),

    /// The attempt cap was reached.
    #[error("gave up after {attempts} attempts")]
    Exhausted {
        /// Number of checks performed.
        attempts: u32,
    },

    /// The cancellation token fired.
    #[error("cancelled after {attempts} attempts")]
    Cancelled {
        /// Number of checks performed.
        attempts: u32,
    },
}

/// Polling loop configuration.
#[derive(Debug, Clone)]
pub struct Poller {
    interval: Duration,
    max_attempts: Option<NonZeroU32>,
    cancellation: Option<CancellationToken>,
}

impl Poller {
    /// Creates an unbounded poller sleeping `interval` between attempts.
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
            cancellation: None,
        }
    }

    /// Caps the number of checks.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: Option<NonZeroU32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Stops polling when `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Returns the sleep interval between attempts.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs `check` until it returns [`ControlFlow::Break`].
    ///
    /// `check` receives the 1-based attempt number. Returning
    /// [`ControlFlow::Continue`] schedules another attempt after the interval.
    ///
    /// # Errors
    ///
    /// - [`PollError::Check`] if `check` fails; polling stops immediately.
    /// - [`PollError::Exhausted`] once the attempt cap is reached.
    /// - [`PollError::Cancelled`] if the cancellation token fires before or
    ///   while sleeping.
    pub async fn run<T, E, F, Fut>(&self, mut check: F) -> Result<T, PollError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<ControlFlow<T>, E>>,
    {
        let mut attempts: u32 = 0;
        loop {
            if self.is_cancelled() {
                return Err(PollError::Cancelled { attempts });
            }

            attempts = attempts.saturating_add(1);
            if let ControlFlow::Break(value) = check(attempts).await.map_err(PollError::Check)? {
                return Ok(value);
            }

            if let Some(max) = self.max_attempts {
                if attempts >= max.get() {
                    return Err(PollError::Exhausted { attempts });
                }
            }

            if !self.sleep().await {
                return Err(PollError::Cancelled { attempts });
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// Sleeps one interval. Returns `false` if cancelled first.
    async fn sleep(&self) -> bool {
        match &self.cancellation {
            Some(token) => {
                tokio::select! {
                    () = token.cancelled() => false,
                    () = tokio::time::sleep(self.interval) => true,
                }
            }
            None => {
                tokio::time::sleep(self.interval).await;
                true
            }
        }
    }
}
