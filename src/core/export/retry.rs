//! Retry policy for store queries

use crate::config::ExportConfig;
use crate::domain::{PulseError, Result, StoreError};
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;

/// How often and how patiently a failed store query is retried
///
/// The delay before retry `n` (starting at 1) is the `n`th configured backoff,
/// or the last one once the list is exhausted. A shutdown signal cuts the
/// backoff short and returns the last error.
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    max_retries: usize,
    backoff: Vec<Duration>,
    shutdown: Option<watch::Receiver<bool>>,
}

impl RetryPolicy {
    pub fn new(max_retries: usize, backoff: Vec<Duration>) -> Self {
        Self {
            max_retries,
            backoff,
            shutdown: None,
        }
    }

    /// Stop waiting between attempts once `shutdown` turns true
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Policy that never retries
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ExportConfig) -> Self {
        Self::new(
            config.max_retries,
            config
                .retry_backoff_ms
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect(),
        )
    }

    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    fn delay_for(&self, retry: usize) -> Duration {
        self.backoff
            .get(retry.saturating_sub(1))
            .or_else(|| self.backoff.last())
            .copied()
            .unwrap_or_default()
    }

    /// Run `operation`, retrying transient store failures
    ///
    /// Authorization errors and corrupt records are returned immediately.
    pub async fn run<T, F, Fut>(&self, what: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut retry = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if is_transient(&e) && retry < self.max_retries => {
                    retry += 1;
                    let delay = self.delay_for(retry);
                    tracing::warn!(
                        operation = what,
                        attempt = retry,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying store query after error"
                    );
                    if !self.sleep_unless_shutdown(delay).await {
                        tracing::warn!(operation = what, "Shutdown requested, abandoning retries");
                        return Err(e);
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Sleep for `delay`; `false` if shutdown was requested first
    async fn sleep_unless_shutdown(&self, delay: Duration) -> bool {
        let Some(shutdown) = &self.shutdown else {
            tokio::time::sleep(delay).await;
            return true;
        };
        let mut shutdown = shutdown.clone();

        tokio::select! {
            _ = tokio::time::sleep(delay) => true,
            _ = wait_for_shutdown(&mut shutdown) => false,
        }
    }
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            // Sender gone: no shutdown can arrive any more
            std::future::pending::<()>().await;
        }
    }
}

fn is_transient(error: &PulseError) -> bool {
    matches!(
        error,
        PulseError::StoreQuery(
            StoreError::QueryFailed(_) | StoreError::Timeout(_) | StoreError::Unavailable(_)
        )
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SampleKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_delay_reuses_last_backoff() {
        let policy = RetryPolicy::new(
            5,
            vec![Duration::from_millis(10), Duration::from_millis(20)],
        );
        assert_eq!(policy.delay_for(1), Duration::from_millis(10));
        assert_eq!(policy.delay_for(2), Duration::from_millis(20));
        assert_eq!(policy.delay_for(5), Duration::from_millis(20));
        assert_eq!(RetryPolicy::none().delay_for(1), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_retries_transient_errors() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let policy = RetryPolicy::new(2, vec![Duration::ZERO]);

        let result = policy
            .run("count", move || async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(StoreError::QueryFailed("busy".into()).into())
                } else {
                    Ok(7)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let policy = RetryPolicy::new(1, vec![Duration::ZERO]);

        let result: Result<()> = policy
            .run("count", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(StoreError::Timeout("slow".into()).into())
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_shutdown_cuts_backoff_short() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let (tx, rx) = watch::channel(false);
        let policy = RetryPolicy::new(3, vec![Duration::from_secs(3600)]).with_shutdown(rx);

        let signal = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            tx.send(true).unwrap();
            tx
        });

        let result: Result<()> = tokio::time::timeout(
            Duration::from_secs(10),
            policy.run("count", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(StoreError::QueryFailed("busy".into()).into())
            }),
        )
        .await
        .expect("retry should stop on shutdown");

        assert!(matches!(
            result,
            Err(PulseError::StoreQuery(StoreError::QueryFailed(_)))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        drop(signal.await.unwrap());
    }

    #[tokio::test]
    async fn test_does_not_retry_authorization() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let policy = RetryPolicy::new(3, vec![Duration::ZERO]);

        let result: Result<()> = policy
            .run("count", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(PulseError::Authorization(SampleKind::HeartRate))
            })
            .await;

        assert!(matches!(result, Err(PulseError::Authorization(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
