//! Trailing-edge debounce.

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::task::JoinHandle;

type Commit<T> = Arc<dyn Fn(T) -> BoxFuture<'static, ()> + Send + Sync>;

/// Delays a commit until `delay` has passed without a newer value being
/// scheduled. A burst of schedules commits once, with the last value.
///
/// Must be used from within a tokio runtime. Dropping the debounce discards
/// any pending value.
pub struct Debounce<T> {
    delay: Duration,
    commit: Commit<T>,
    pending: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Debounce<T> {
    pub fn new<F, Fut>(delay: Duration, commit: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self { delay, commit: Arc::new(move |value| commit(value).boxed()), pending: None }
    }

    /// Replace any pending value and restart the quiet period.
    pub fn schedule(&mut self, value: T) {
        self.cancel();

        let commit = Arc::clone(&self.commit);
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // a commit that has started is never cancelled by a reschedule
            tokio::spawn(commit(value));
        }));
    }

    /// Discard the pending value, if any.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|pending| !pending.is_finished())
    }
}

impl<T> Drop for Debounce<T> {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}

impl<T> std::fmt::Debug for Debounce<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debounce")
            .field("delay", &self.delay)
            .field("pending", &self.pending.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;

    use super::*;

    const DELAY: Duration = Duration::from_millis(350);

    fn recorder() -> (Arc<Mutex<Vec<u32>>>, Debounce<u32>) {
        let commits = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&commits);
        let debounce = Debounce::new(DELAY, move |value| {
            let sink = Arc::clone(&sink);
            async move { sink.lock().expect("should lock").push(value) }
        });
        (commits, debounce)
    }

    async fn settle(duration: Duration) {
        tokio::time::sleep(duration).await;
        tokio::task::yield_now().await;
    }

    #[tokio::test(start_paused = true)]
    async fn burst_commits_last() {
        let (commits, mut debounce) = recorder();

        for value in 1..=5 {
            debounce.schedule(value);
            settle(Duration::from_millis(100)).await;
        }
        assert!(commits.lock().expect("should lock").is_empty());
        assert!(debounce.is_pending());

        settle(DELAY).await;
        assert_eq!(*commits.lock().expect("should lock"), vec![5]);
        assert!(!debounce.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn separate_bursts() {
        let (commits, mut debounce) = recorder();

        debounce.schedule(1);
        settle(DELAY * 2).await;
        debounce.schedule(2);
        debounce.schedule(3);
        settle(DELAY * 2).await;

        assert_eq!(*commits.lock().expect("should lock"), vec![1, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_discards() {
        let (commits, mut debounce) = recorder();

        debounce.schedule(1);
        debounce.cancel();
        settle(DELAY * 2).await;

        assert!(commits.lock().expect("should lock").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn drop_discards() {
        let (commits, mut debounce) = recorder();

        debounce.schedule(1);
        drop(debounce);
        settle(DELAY * 2).await;

        assert!(commits.lock().expect("should lock").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn started_commit_survives_reschedule() {
        let commits = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&commits);
        let mut debounce = Debounce::new(DELAY, move |value: u32| {
            let sink = Arc::clone(&sink);
            async move {
                tokio::time::sleep(Duration::from_secs(1)).await;
                sink.lock().expect("should lock").push(value);
            }
        });

        debounce.schedule(1);
        settle(DELAY + Duration::from_millis(10)).await;
        debounce.schedule(2);
        settle(Duration::from_secs(2)).await;

        assert_eq!(*commits.lock().expect("should lock"), vec![1, 2]);
    }
}
