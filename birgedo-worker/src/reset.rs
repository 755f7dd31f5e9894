/// Periodic assignment reset
///
/// Every task assignment goes back to "not done" once per interval (a day by
/// default), so members start each day with a fresh checklist.
///
/// # Schedule
///
/// The first reset runs one full interval after start, not at startup, so a
/// restart does not wipe the current day's progress. Ticks missed while a
/// reset is slow are delayed rather than replayed.
///
/// # Failure
///
/// A failed reset is logged and the job waits for the next tick.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use birgedo_worker::reset::DailyReset;
///
/// # async fn example(pool: sqlx::PgPool) {
/// let job = DailyReset::new(pool, Duration::from_secs(86400));
/// let report = job.run().await;
/// println!("{} resets, {} failed", report.runs, report.failures);
/// # }
/// ```

use std::future::Future;
use std::time::Duration;

use birgedo_shared::models::task::Task;
use birgedo_shared::models::DataError;
use sqlx::PgPool;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Counts of what the job did before it stopped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResetReport {
    /// Resets attempted
    pub runs: u64,

    /// Resets that returned an error
    pub failures: u64,

    /// Assignments set back to not done, over all runs
    pub assignments_reset: u64,
}

/// The daily reset job
pub struct DailyReset {
    pool: PgPool,
    interval: Duration,
    shutdown: CancellationToken,
}

impl DailyReset {
    pub fn new(pool: PgPool, interval: Duration) -> Self {
        DailyReset {
            pool,
            interval,
            shutdown: CancellationToken::new(),
        }
    }

    /// Token that stops [`run`](Self::run) when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Runs until the shutdown token is cancelled
    pub async fn run(self) -> ResetReport {
        tracing::info!(interval_secs = self.interval.as_secs(), "Assignment reset job started");

        let pool = self.pool;
        let report = run_periodically(self.interval, self.shutdown, || {
            Task::reset_all_assignments(&pool)
        })
        .await;

        tracing::info!(
            runs = report.runs,
            failures = report.failures,
            "Assignment reset job stopped"
        );
        report
    }
}

/// Calls `job` once per `period`, first after one full period, until
/// `shutdown` is cancelled
///
/// A reset in flight when shutdown arrives is allowed to finish.
pub async fn run_periodically<F, Fut>(
    period: Duration,
    shutdown: CancellationToken,
    mut job: F,
) -> ResetReport
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<u64, DataError>>,
{
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut report = ResetReport::default();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                report.runs += 1;
                match job().await {
                    Ok(count) => {
                        report.assignments_reset += count;
                        tracing::info!(assignments = count, "Reset all task assignments");
                    }
                    Err(e) => {
                        report.failures += 1;
                        tracing::error!(error = %e, "Failed to reset task assignments");
                    }
                }
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    const DAY: Duration = Duration::from_secs(86400);

    fn counting_job(calls: Arc<AtomicU64>) -> impl FnMut() -> std::future::Ready<Result<u64, DataError>> {
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(3))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_reset_at_startup() {
        let calls = Arc::new(AtomicU64::new(0));
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(run_periodically(DAY, shutdown.clone(), counting_job(calls.clone())));

        tokio::time::sleep(DAY - Duration::from_secs(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        shutdown.cancel();
        let report = handle.await.unwrap();
        assert_eq!(report, ResetReport::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_resets_once_per_period() {
        let calls = Arc::new(AtomicU64::new(0));
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(run_periodically(DAY, shutdown.clone(), counting_job(calls.clone())));

        tokio::time::sleep(DAY * 3 + Duration::from_secs(1)).await;
        shutdown.cancel();
        let report = handle.await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(report.runs, 3);
        assert_eq!(report.failures, 0);
        assert_eq!(report.assignments_reset, 9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_does_not_stop_job() {
        let calls = Arc::new(AtomicU64::new(0));
        let counter = calls.clone();
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(run_periodically(DAY, shutdown.clone(), move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(if n == 0 { Err(DataError::Timeout) } else { Ok(1) })
        }));

        tokio::time::sleep(DAY * 2 + Duration::from_secs(1)).await;
        shutdown.cancel();
        let report = handle.await.unwrap();

        assert_eq!(report.runs, 2);
        assert_eq!(report.failures, 1);
        assert_eq!(report.assignments_reset, 1);
    }

    #[tokio::test]
    async fn test_cancel_stops_immediately() {
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let report = run_periodically(DAY, shutdown, || std::future::ready(Ok(0))).await;

        assert_eq!(report.runs, 0);
    }
}
