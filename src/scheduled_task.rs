use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use chrono::{DateTime, Utc};
use rocket::tokio::{
    self,
    task::{JoinError, JoinHandle},
    time::Duration,
};

/// A task scheduled for a specific point in the future.
/// It runs automatically at that point, unless cancelled first.
pub struct ScheduledTask<T> {
    handle: JoinHandle<T>,
    run_at: DateTime<Utc>,
}

impl<T> ScheduledTask<T>
where
    T: Send + 'static,
{
    /// Schedule the given task to execute at time `run_at`.
    /// If `run_at` is in the past, the task executes immediately.
    pub fn new<Fut>(task: Fut, run_at: DateTime<Utc>) -> Self
    where
        Fut: Future<Output = T> + Send + 'static,
    {
        let delay = duration_until(run_at);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await
        });

        Self { handle, run_at }
    }

    /// When the task is due.
    pub fn run_at(&self) -> DateTime<Utc> {
        self.run_at
    }

    /// Has the task already run to completion (or been aborted)?
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancel the task. Returns true iff it had already completed before we could cancel it.
    pub async fn cancel(self) -> bool {
        self.handle.abort();
        self.handle.await.is_ok()
    }
}

/// Awaiting a `ScheduledTask` waits for it to run and yields its output.
impl<T> Future for ScheduledTask<T> {
    type Output = Result<T, JoinError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.handle).poll(cx)
    }
}

/// Time from now until `datetime`; zero if it has already passed.
fn duration_until(datetime: DateTime<Utc>) -> Duration {
    (datetime - Utc::now()).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use chrono::Duration as ChronoDuration;

    use super::*;

    #[rocket::async_test]
    async fn past_tasks_run_immediately() {
        let task = ScheduledTask::new(async { 7 }, Utc::now() - ChronoDuration::seconds(10));
        assert_eq!(task.await.unwrap(), 7);
    }

    #[rocket::async_test]
    async fn future_tasks_wait() {
        let run_at = Utc::now() + ChronoDuration::milliseconds(50);
        let task = ScheduledTask::new(async { "done" }, run_at);
        assert_eq!(task.run_at(), run_at);
        assert!(!task.is_finished());
        assert_eq!(task.await.unwrap(), "done");
    }

    #[rocket::async_test]
    async fn cancelled_tasks_never_run() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        let task = ScheduledTask::new(
            async move { flag.store(true, Ordering::SeqCst) },
            Utc::now() + ChronoDuration::milliseconds(50),
        );
        assert!(!task.cancel().await);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[test]
    fn past_durations_are_zero() {
        assert_eq!(
            duration_until(Utc::now() - ChronoDuration::hours(1)),
            Duration::ZERO
        );
        assert!(duration_until(Utc::now() + ChronoDuration::hours(1)) > Duration::from_secs(3500));
    }
}
