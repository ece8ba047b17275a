//! Deadlines and cancellation for outgoing requests.

use std::future::{Future, pending};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::TransportError;

/// Governs every network call made on behalf of one logical operation.
///
/// A receipt verification may issue two calls; both run under the same
/// context, and the second is never started once the context is done.
///
/// # Example
/// ```rust,ignore
/// let (ctx, cancel) = RequestContext::with_timeout(Duration::from_secs(5)).with_cancel();
/// tokio::spawn(async move { shutdown.await; cancel.cancel(); });
/// let response = receipts.verify(&ctx, &request).await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    deadline: Option<Instant>,
    cancelled: Option<watch::Receiver<bool>>,
}

/// Cancels the [`RequestContext`] it was created with, and all its clones.
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<bool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }
}

impl RequestContext {
    /// A context that never expires and cannot be cancelled.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::background().with_deadline(Instant::now() + timeout)
    }

    /// Keeps the earlier of the current deadline and `deadline`.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        });
        self
    }

    /// Makes the context cancellable. Replaces any previous cancel handle.
    pub fn with_cancel(mut self) -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        self.cancelled = Some(rx);
        (self, CancelHandle(tx))
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Why the context is done, or `None` if calls may still be made.
    pub fn err(&self) -> Option<TransportError> {
        if self.is_cancelled() {
            return Some(TransportError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(TransportError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Runs `call` unless the context is already done, aborting it on
    /// cancellation or when the deadline passes.
    pub async fn run<F, T>(&self, call: F) -> Result<T, TransportError>
    where
        F: Future<Output = Result<T, TransportError>>,
    {
        if let Some(err) = self.err() {
            return Err(err);
        }

        let cancelled = async {
            match self.cancelled.clone() {
                Some(mut rx) => {
                    let sender_dropped = rx.wait_for(|cancelled| *cancelled).await.is_err();
                    if sender_dropped {
                        pending::<()>().await;
                    }
                }
                None => pending::<()>().await,
            }
        };

        let bounded = async {
            match self.deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, call).await {
                    Ok(result) => result,
                    Err(_) => Err(TransportError::DeadlineExceeded),
                },
                None => call.await,
            }
        };

        tokio::select! {
            biased;
            _ = cancelled => Err(TransportError::Cancelled),
            result = bounded => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_background_runs_call() {
        let ctx = RequestContext::background();
        assert!(ctx.err().is_none());

        let result = ctx.run(async { Ok::<_, TransportError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_cancelled_context_skips_call() {
        let (ctx, cancel) = RequestContext::background().with_cancel();
        cancel.cancel();

        let mut called = false;
        let result = ctx
            .run(async {
                called = true;
                Ok::<_, TransportError>(())
            })
            .await;

        assert!(matches!(result, Err(TransportError::Cancelled)));
        assert!(!called);
        assert!(ctx.clone().is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_aborts_in_flight_call() {
        let (ctx, cancel) = RequestContext::background().with_cancel();

        let call = async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, TransportError>(())
        };
        let (result, _) = tokio::join!(ctx.run(call), async { cancel.cancel() });

        assert!(matches!(result, Err(TransportError::Cancelled)));
    }

    #[tokio::test]
    async fn test_deadline_exceeded() {
        let ctx = RequestContext::with_timeout(Duration::from_millis(50));

        let result = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok::<_, TransportError>(())
            })
            .await;

        assert!(matches!(result, Err(TransportError::DeadlineExceeded)));
        assert!(matches!(ctx.err(), Some(TransportError::DeadlineExceeded)));
    }

    #[tokio::test]
    async fn test_dropped_handle_does_not_cancel() {
        let (ctx, cancel) = RequestContext::background().with_cancel();
        drop(cancel);

        let result = ctx.run(async { Ok::<_, TransportError>(1) }).await;
        assert_eq!(result.unwrap(), 1);
    }

    #[test]
    fn test_with_deadline_keeps_earliest() {
        let now = Instant::now();
        let ctx = RequestContext::background()
            .with_deadline(now + Duration::from_secs(10))
            .with_deadline(now + Duration::from_secs(20));

        assert_eq!(ctx.deadline(), Some(now + Duration::from_secs(10)));
    }
}
