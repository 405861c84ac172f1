use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use futures::FutureExt;
use tokio::sync::Notify;

/// Future a job runs to completion. `Ok(Some(v))` buffers `v` for
/// `collect_results`; `Ok(None)` completes without a result.
pub type JobFuture<T> = Pin<Box<dyn Future<Output = anyhow::Result<Option<T>>> + Send>>;

/// Deferred job construction, so admission can happen after submission
/// once a slot frees up.
pub type JobFactory<T> = Box<dyn FnOnce() -> JobFuture<T> + Send>;

struct QueuedJob<T> {
    label: String,
    factory: JobFactory<T>,
}

struct Inner<T> {
    waiting: VecDeque<QueuedJob<T>>,
    running: usize,
    output: Vec<T>,
}

struct Shared<T> {
    limit: usize,
    state: Mutex<Inner<T>>,
    /// Signalled on every admission/retirement so `join_all` can re-check.
    changed: Notify,
}

/// Bounded-concurrency FIFO job queue over spawned tokio tasks.
///
/// Cloning is cheap and shares the queue, so a running job can submit
/// follow-up jobs. `join_all` must not be called from inside a job: a job
/// waiting on the barrier occupies the slot the barrier is waiting to
/// drain.
pub struct JobQueue<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for JobQueue<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + 'static> JobQueue<T> {
    /// Creates a queue admitting at most `limit` (>= 1) jobs at once.
    pub fn new(limit: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                limit: limit.max(1),
                state: Mutex::new(Inner {
                    waiting: VecDeque::new(),
                    running: 0,
                    output: Vec::new(),
                }),
                changed: Notify::new(),
            }),
        }
    }

    /// Submits a job. Starts it immediately if a slot is free, otherwise
    /// appends it to the waiting queue. Never blocks.
    pub fn submit(&self, factory: JobFactory<T>, label: impl Into<String>) {
        let job = QueuedJob {
            label: label.into(),
            factory,
        };
        let mut inner = self.shared.state.lock().expect("job queue lock poisoned");
        if inner.running < self.shared.limit {
            inner.running += 1;
            drop(inner);
            self.spawn_job(job);
        } else {
            inner.waiting.push_back(job);
        }
    }

    /// Runs `job` on the runtime. The caller has already counted it as running.
    fn spawn_job(&self, job: QueuedJob<T>) {
        let queue = self.clone();
        tokio::spawn(async move {
            let QueuedJob { label, factory } = job;
            // Catch panics as well as errors: a job that skips retirement
            // would wedge admission and deadlock join_all.
            let outcome = std::panic::AssertUnwindSafe((factory)())
                .catch_unwind()
                .await;
            let result = match outcome {
                Ok(Ok(value)) => value,
                Ok(Err(err)) => {
                    tracing::error!(job = %label, error = %format!("{err:#}"), "job failed");
                    None
                }
                Err(_) => {
                    tracing::error!(job = %label, "job panicked");
                    None
                }
            };
            queue.retire(result);
        });
    }

    /// Removes one running job, buffers its result, and admits the oldest
    /// waiting job if any. The sole admission trigger besides `submit`.
    fn retire(&self, result: Option<T>) {
        let next = {
            let mut inner = self.shared.state.lock().expect("job queue lock poisoned");
            inner.running -= 1;
            if let Some(value) = result {
                inner.output.push(value);
            }
            match inner.waiting.pop_front() {
                Some(job) => {
                    inner.running += 1;
                    Some(job)
                }
                None => None,
            }
        };
        if let Some(job) = next {
            self.spawn_job(job);
        }
        self.shared.changed.notify_waiters();
    }

    /// Waits until no job is running or waiting.
    ///
    /// The drained predicate is re-checked under the same lock that
    /// admission mutates. The `Notified` future must be `enable`d before
    /// the check: `notify_waiters` only reaches futures already polled or
    /// enabled, so a retirement landing between the check and the await
    /// would otherwise be missed.
    pub async fn join_all(&self) {
        loop {
            let notified = self.shared.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let inner = self.shared.state.lock().expect("job queue lock poisoned");
                if inner.running == 0 && inner.waiting.is_empty() {
                    return;
                }
            }
            notified.await;
        }
    }

    /// Drains and returns all results buffered since the last call. Does not block.
    pub fn collect_results(&self) -> Vec<T> {
        let mut inner = self.shared.state.lock().expect("job queue lock poisoned");
        std::mem::take(&mut inner.output)
    }

    /// Number of jobs currently running (diagnostics and tests).
    pub fn running(&self) -> usize {
        self.shared.state.lock().expect("job queue lock poisoned").running
    }

    /// Number of jobs waiting for admission (diagnostics and tests).
    pub fn waiting(&self) -> usize {
        self.shared
            .state
            .lock()
            .expect("job queue lock poisoned")
            .waiting
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn job<T, F>(fut: F) -> JobFactory<T>
    where
        F: Future<Output = anyhow::Result<Option<T>>> + Send + 'static,
    {
        Box::new(move || Box::pin(fut))
    }

    #[tokio::test]
    async fn runs_all_jobs_and_collects_results() {
        let queue: JobQueue<usize> = JobQueue::new(3);
        for i in 0..10 {
            queue.submit(job(async move { Ok(Some(i)) }), format!("job-{i}"));
        }
        queue.join_all().await;

        let mut results = queue.collect_results();
        results.sort_unstable();
        assert_eq!(results, (0..10).collect::<Vec<_>>());
        assert_eq!(queue.running(), 0);
        assert_eq!(queue.waiting(), 0);

        // Second drain is empty.
        assert!(queue.collect_results().is_empty());
    }

    #[tokio::test]
    async fn never_exceeds_concurrency_limit() {
        const LIMIT: usize = 4;
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let queue: JobQueue<()> = JobQueue::new(LIMIT);
        for i in 0..32 {
            let current = Arc::clone(&current);
            let peak = Arc::clone(&peak);
            queue.submit(
                job(async move {
                    let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    current.fetch_sub(1, Ordering::SeqCst);
                    Ok(None)
                }),
                format!("job-{i}"),
            );
        }
        queue.join_all().await;

        assert!(peak.load(Ordering::SeqCst) <= LIMIT);
        assert_eq!(current.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fifo_admission_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let queue: JobQueue<()> = JobQueue::new(1);
        for i in 0..8 {
            let order = Arc::clone(&order);
            queue.submit(
                job(async move {
                    order.lock().unwrap().push(i);
                    Ok(None)
                }),
                format!("job-{i}"),
            );
        }
        queue.join_all().await;
        assert_eq!(*order.lock().unwrap(), (0..8).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn failing_job_does_not_starve_the_queue() {
        let completed = Arc::new(AtomicUsize::new(0));
        let queue: JobQueue<()> = JobQueue::new(2);

        queue.submit(job(async { anyhow::bail!("boom") }), "bad");
        for i in 0..6 {
            let completed = Arc::clone(&completed);
            queue.submit(
                job(async move {
                    completed.fetch_add(1, Ordering::SeqCst);
                    Ok(None)
                }),
                format!("good-{i}"),
            );
        }
        queue.join_all().await;
        assert_eq!(completed.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn panicking_job_does_not_wedge_join_all() {
        let queue: JobQueue<u32> = JobQueue::new(1);
        queue.submit(job(async { panic!("job bug") }), "panics");
        queue.submit(job(async { Ok(Some(7)) }), "after");
        queue.join_all().await;
        assert_eq!(queue.collect_results(), vec![7]);
    }

    #[tokio::test]
    async fn join_all_waits_for_chain_submitted_jobs() {
        let queue: JobQueue<&'static str> = JobQueue::new(2);
        let chained = queue.clone();
        queue.submit(
            job(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                chained.submit(
                    Box::new(|| {
                        Box::pin(async {
                            tokio::time::sleep(Duration::from_millis(10)).await;
                            Ok(Some("second"))
                        })
                    }),
                    "second",
                );
                Ok(Some("first"))
            }),
            "first",
        );

        queue.join_all().await;
        let mut results = queue.collect_results();
        results.sort_unstable();
        assert_eq!(results, vec!["first", "second"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn join_all_sees_retirements_racing_the_drained_check() {
        // One instant job per round: the retirement fires while join_all
        // is between registering its waiter and checking the predicate.
        for round in 0..2_000 {
            let queue: JobQueue<u32> = JobQueue::new(2);
            queue.submit(job(async { Ok(Some(1)) }), format!("round-{round}"));
            tokio::time::timeout(Duration::from_secs(5), queue.join_all())
                .await
                .expect("join_all missed the final retirement");
            assert_eq!(queue.collect_results(), vec![1]);
        }
    }

    #[tokio::test]
    async fn join_all_on_empty_queue_returns_immediately() {
        let queue: JobQueue<()> = JobQueue::new(3);
        queue.join_all().await;
    }

    #[tokio::test]
    async fn limit_zero_is_clamped_to_one() {
        let queue: JobQueue<u8> = JobQueue::new(0);
        queue.submit(job(async { Ok(Some(1)) }), "only");
        queue.join_all().await;
        assert_eq!(queue.collect_results(), vec![1]);
    }
}
