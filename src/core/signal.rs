//! Single-fire completion signal for terminal subscribers.

use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::core::error::{Error, Result};

/// How a stream ended.
#[derive(Debug, Clone)]
pub enum Termination {
    /// The stream completed normally
    Completed,
    /// The stream failed with an error
    Failed(Error),
}

impl Termination {
    /// Convert into a `Result`, mapping `Failed` to its error
    pub fn into_result(self) -> Result<()> {
        match self {
            Termination::Completed => Ok(()),
            Termination::Failed(e) => Err(e),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Termination::Completed)
    }
}

struct SignalInner {
    outcome: OnceLock<Termination>,
    released: CancellationToken,
}

/// A one-shot latch released when a stream terminates.
///
/// Clones share the same latch. Only the first `release` has an effect;
/// every waiter wakes at once when it happens.
#[derive(Clone)]
pub struct CompletionSignal {
    inner: Arc<SignalInner>,
}

impl CompletionSignal {
    /// Create an unreleased signal
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SignalInner {
                outcome: OnceLock::new(),
                released: CancellationToken::new(),
            }),
        }
    }

    /// Release the signal with an outcome.
    ///
    /// Returns `true` for the call that released it and `false` for every
    /// later call, whose outcome is discarded.
    pub fn release(&self, outcome: Termination) -> bool {
        if self.inner.outcome.set(outcome).is_ok() {
            self.inner.released.cancel();
            true
        } else {
            false
        }
    }

    /// Whether the signal has been released
    pub fn is_released(&self) -> bool {
        self.inner.released.is_cancelled()
    }

    /// The outcome, if released
    pub fn outcome(&self) -> Option<Termination> {
        self.inner.outcome.get().cloned()
    }

    /// Wait until the signal is released and return its outcome
    pub async fn wait(&self) -> Termination {
        loop {
            // the outcome is stored before the token is cancelled
            if let Some(outcome) = self.inner.outcome.get() {
                return outcome.clone();
            }
            self.inner.released.cancelled().await;
        }
    }

    /// Wait with an upper bound, failing with `Error::Timeout`
    pub async fn wait_timeout(&self, timeout: Duration) -> Result<Termination> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| Error::timeout(timeout.as_millis() as u64))
    }
}

impl Default for CompletionSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CompletionSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionSignal")
            .field("outcome", &self.inner.outcome.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_fires_once() {
        let signal = CompletionSignal::new();
        assert!(!signal.is_released());

        assert!(signal.release(Termination::Completed));
        assert!(!signal.release(Termination::Failed(Error::Closed)));
        assert!(!signal.clone().release(Termination::Completed));

        assert!(signal.is_released());
        assert!(signal.outcome().unwrap().is_completed());
    }

    #[tokio::test]
    async fn all_waiters_wake_together() {
        let signal = CompletionSignal::new();
        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let signal = signal.clone();
                tokio::spawn(async move { signal.wait().await })
            })
            .collect();

        signal.release(Termination::Failed(Error::custom("stage broke")));

        for waiter in waiters {
            let outcome = waiter.await.unwrap();
            assert!(matches!(outcome, Termination::Failed(Error::Custom(ref m)) if m == "stage broke"));
        }
    }

    #[tokio::test]
    async fn wait_timeout_expires_when_never_released() {
        let signal = CompletionSignal::new();
        let result = signal.wait_timeout(Duration::from_millis(20)).await;
        assert!(matches!(result, Err(Error::Timeout { duration_ms: 20 })));
    }
}
