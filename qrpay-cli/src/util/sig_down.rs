//! Shutdown signal handling.
//!
//! [`SigDown`] spawns a background task that listens for OS signals and
//! triggers a [`CancellationToken`] when one arrives. The token is handed to
//! the payment flow, so the balance and status polls stop at their next
//! sleep instead of leaving the process to be killed mid-run.
//!
//! On Unix, it listens for SIGTERM and SIGINT. On Windows, it listens for Ctrl+C.

#[cfg(unix)]
use tokio::signal::unix::SignalKind;
#[cfg(unix)]
use tokio::signal::unix::signal;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Cancels a token on SIGTERM or SIGINT.
///
/// # Example
///
/// ```ignore
/// use qrpay_cli::util::SigDown;
///
/// let sig_down = SigDown::try_new()?;
/// let flow = PaymentFlow::new(api, wait_control, settings)
///     .with_cancellation(sig_down.cancellation_token());
/// ```
#[allow(missing_debug_implementations)] // TaskTracker doesn't impl Debug
pub struct SigDown {
    task_tracker: TaskTracker,
    cancellation_token: CancellationToken,
}

impl SigDown {
    /// Installs the signal handlers. Must be called inside a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an [`std::io::Error`] if signal registration fails.
    #[allow(clippy::unnecessary_wraps)] // Result needed on Unix for signal registration
    pub fn try_new() -> Result<Self, std::io::Error> {
        let inner = CancellationToken::new();
        let outer = inner.clone();
        let task_tracker = TaskTracker::new();

        #[cfg(unix)]
        {
            let mut sigterm = signal(SignalKind::terminate())?;
            let mut sigint = signal(SignalKind::interrupt())?;
            task_tracker.spawn(async move {
                tokio::select! {
                    _ = sigterm.recv() => {
                        tracing::info!("Received SIGTERM, stopping payment flow");
                    },
                    _ = sigint.recv() => {
                        tracing::info!("Received SIGINT, stopping payment flow");
                    },
                    () = inner.cancelled() => return,
                }
                inner.cancel();
            });
        }

        #[cfg(windows)]
        {
            task_tracker.spawn(async move {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("Received Ctrl-C, stopping payment flow");
                        inner.cancel();
                    },
                    () = inner.cancelled() => {},
                }
            });
        }

        task_tracker.close();
        Ok(Self {
            task_tracker,
            cancellation_token: outer,
        })
    }

    /// Returns a clone of the cancellation token.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Stops listening and waits for the handler task to finish.
    ///
    /// Cancels the token if no signal arrived yet.
    pub async fn shutdown(self) {
        self.cancellation_token.cancel();
        self.task_tracker.wait().await;
    }
}
