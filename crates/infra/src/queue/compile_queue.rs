//! Worker pool that recompiles availability expressions off the request path.
//!
//! Runtime rules: join handles are tracked, cancellation is explicit and every
//! job runs under a timeout. Enqueueing an id that is already waiting is a
//! no-op, and two jobs for the same id never run at the same time.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use slotwise_core::{AvailabilityCompiler, AvailabilityService};
//! use slotwise_infra::memory_store::InMemoryScheduleStore;
//! use slotwise_infra::queue::{CompilationQueue, CompilationQueueConfig, QueueResult};
//!
//! # async fn example() -> QueueResult<()> {
//! let queue = Arc::new(CompilationQueue::new(CompilationQueueConfig::default()));
//! let service = Arc::new(AvailabilityService::new(
//!     Arc::new(InMemoryScheduleStore::new()),
//!     queue.clone(),
//!     AvailabilityCompiler::default(),
//! ));
//!
//! queue.start(service)?;
//! // ... expressions are edited, recompilation happens in the background ...
//! queue.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use parking_lot::Mutex;
use slotwise_core::{AvailabilityService, TaskQueue};
use slotwise_domain::{ExpressionId, Result as DomainResult, WorkerConfig};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::error::{QueueError, QueueResult};

/// Unit of work executed for each dequeued expression id.
#[async_trait]
pub trait RecompileJob: Send + Sync {
    async fn recompile(&self, expression_id: ExpressionId) -> DomainResult<usize>;
}

#[async_trait]
impl RecompileJob for AvailabilityService {
    async fn recompile(&self, expression_id: ExpressionId) -> DomainResult<usize> {
        AvailabilityService::recompile(self, expression_id).await
    }
}

/// Configuration for the compilation queue.
#[derive(Debug, Clone)]
pub struct CompilationQueueConfig {
    /// Number of worker tasks.
    pub concurrency: usize,
    /// Maximum number of ids waiting in the channel.
    pub capacity: usize,
    /// Timeout applied to a single recompilation.
    pub job_timeout: Duration,
    /// Timeout for each worker to finish after `stop`.
    pub join_timeout: Duration,
}

impl Default for CompilationQueueConfig {
    fn default() -> Self {
        Self::from(&WorkerConfig::default())
    }
}

impl From<&WorkerConfig> for CompilationQueueConfig {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            concurrency: config.concurrency.max(1),
            capacity: config.queue_capacity.max(1),
            job_timeout: Duration::from_secs(config.job_timeout_secs),
            join_timeout: Duration::from_secs(5),
        }
    }
}

/// Counters since the queue was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub enqueued: u64,
    pub coalesced: u64,
    pub completed: u64,
    pub failed: u64,
    pub timed_out: u64,
}

#[derive(Default)]
struct Counters {
    enqueued: AtomicU64,
    coalesced: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> QueueStats {
        QueueStats {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
        }
    }
}

/// State shared by the queue handle and its workers.
struct Shared {
    receiver: AsyncMutex<mpsc::Receiver<ExpressionId>>,
    pending: DashSet<ExpressionId>,
    flights: DashMap<ExpressionId, Arc<AsyncMutex<()>>>,
    counters: Counters,
    job_timeout: Duration,
}

impl Shared {
    async fn next(&self) -> Option<ExpressionId> {
        self.receiver.lock().await.recv().await
    }

    async fn process(&self, job: &dyn RecompileJob, expression_id: ExpressionId) {
        // Cleared before running so an edit made during this job queues
        // another pass.
        self.pending.remove(&expression_id);

        let flight = self.flights.entry(expression_id).or_insert_with(Default::default).clone();
        {
            let _single = flight.lock().await;
            match tokio::time::timeout(self.job_timeout, job.recompile(expression_id)).await {
                Ok(Ok(slots)) => {
                    Counters::bump(&self.counters.completed);
                    debug!(expression_id, slots, "Recompilation finished");
                }
                Ok(Err(err)) => {
                    Counters::bump(&self.counters.failed);
                    warn!(expression_id, error = %err, kind = err.kind(), "Recompilation failed");
                }
                Err(_) => {
                    Counters::bump(&self.counters.timed_out);
                    warn!(expression_id, timeout = ?self.job_timeout, "Recompilation timed out");
                }
            }
        }
        drop(flight);
        self.flights.remove_if(&expression_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Bounded, coalescing queue of expression ids drained by a worker pool.
pub struct CompilationQueue {
    config: CompilationQueueConfig,
    sender: mpsc::Sender<ExpressionId>,
    shared: Arc<Shared>,
    cancellation: Mutex<CancellationToken>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl CompilationQueue {
    /// Create a stopped queue. Ids enqueued before [`start`](Self::start)
    /// wait in the channel.
    pub fn new(config: CompilationQueueConfig) -> Self {
        let (sender, receiver) = mpsc::channel(config.capacity.max(1));
        let shared = Arc::new(Shared {
            receiver: AsyncMutex::new(receiver),
            pending: DashSet::new(),
            flights: DashMap::new(),
            counters: Counters::default(),
            job_timeout: config.job_timeout,
        });
        Self {
            config,
            sender,
            shared,
            cancellation: Mutex::new(CancellationToken::new()),
            workers: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &CompilationQueueConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        !self.workers.lock().is_empty()
    }

    pub fn stats(&self) -> QueueStats {
        self.shared.counters.snapshot()
    }

    /// Number of distinct ids waiting to be picked up.
    pub fn pending(&self) -> usize {
        self.shared.pending.len()
    }

    /// Spawn the worker tasks. Must be called inside a tokio runtime.
    #[instrument(skip(self, job), fields(concurrency = self.config.concurrency))]
    pub fn start(&self, job: Arc<dyn RecompileJob>) -> QueueResult<()> {
        let mut workers = self.workers.lock();
        if !workers.is_empty() {
            return Err(QueueError::AlreadyRunning);
        }

        let token = CancellationToken::new();
        *self.cancellation.lock() = token.clone();

        for worker in 0..self.config.concurrency.max(1) {
            let shared = Arc::clone(&self.shared);
            let job = Arc::clone(&job);
            let token = token.clone();
            workers.push(tokio::spawn(async move {
                loop {
                    let next = tokio::select! {
                        biased;
                        () = token.cancelled() => None,
                        id = shared.next() => id,
                    };
                    let Some(expression_id) = next else { break };
                    shared.process(job.as_ref(), expression_id).await;
                }
                debug!(worker, "Compilation worker stopped");
            }));
        }

        info!("Compilation queue started");
        Ok(())
    }

    /// Cancel the workers and wait for each to finish its current job.
    #[instrument(skip(self))]
    pub async fn stop(&self) -> QueueResult<()> {
        let handles = std::mem::take(&mut *self.workers.lock());
        if handles.is_empty() {
            return Err(QueueError::NotRunning);
        }
        self.cancellation.lock().cancel();

        let mut outcome = Ok(());
        for mut handle in handles {
            match tokio::time::timeout(self.config.join_timeout, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => outcome = Err(QueueError::JoinFailed(err.to_string())),
                Err(_) => {
                    handle.abort();
                    outcome = Err(QueueError::Timeout { duration: self.config.join_timeout });
                }
            }
        }

        info!(stats = ?self.stats(), "Compilation queue stopped");
        outcome
    }

    /// Queue `expression_id` unless it is already waiting.
    ///
    /// Returns `false` when the request was coalesced into a waiting one.
    pub fn submit(&self, expression_id: ExpressionId) -> QueueResult<bool> {
        if !self.shared.pending.insert(expression_id) {
            Counters::bump(&self.shared.counters.coalesced);
            debug!(expression_id, "Recompilation already pending");
            return Ok(false);
        }

        match self.sender.try_send(expression_id) {
            Ok(()) => {
                Counters::bump(&self.shared.counters.enqueued);
                Ok(true)
            }
            Err(err) => {
                self.shared.pending.remove(&expression_id);
                Err(match err {
                    TrySendError::Full(_) => QueueError::Full { capacity: self.config.capacity },
                    TrySendError::Closed(_) => QueueError::Closed,
                })
            }
        }
    }
}

impl Drop for CompilationQueue {
    fn drop(&mut self) {
        self.cancellation.get_mut().cancel();
    }
}

#[async_trait]
impl TaskQueue for CompilationQueue {
    async fn enqueue(&self, expression_id: ExpressionId) -> DomainResult<()> {
        self.submit(expression_id)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use slotwise_common::testing::poll_until;
    use slotwise_domain::SlotwiseError;

    use super::*;

    /// Fake job that sleeps, then fails for odd ids when `fail_odd` is set.
    #[derive(Default)]
    struct SleepyJob {
        delay: Duration,
        fail_odd: bool,
        running: DashMap<ExpressionId, usize>,
        max_overlap: AtomicUsize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RecompileJob for SleepyJob {
        async fn recompile(&self, expression_id: ExpressionId) -> DomainResult<usize> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let overlap = {
                let mut running = self.running.entry(expression_id).or_insert(0);
                *running += 1;
                *running
            };
            self.max_overlap.fetch_max(overlap, Ordering::SeqCst);

            tokio::time::sleep(self.delay).await;

            if let Some(mut running) = self.running.get_mut(&expression_id) {
                *running -= 1;
            }
            if self.fail_odd && expression_id % 2 == 1 {
                return Err(SlotwiseError::Range("bad window".into()));
            }
            Ok(1)
        }
    }

    fn config(concurrency: usize, capacity: usize, job_timeout: Duration) -> CompilationQueueConfig {
        CompilationQueueConfig { concurrency, capacity, job_timeout, join_timeout: Duration::from_secs(2) }
    }

    async fn wait_for(queue: &CompilationQueue, done: impl Fn(QueueStats) -> bool) -> bool {
        poll_until(Duration::from_secs(3), Duration::from_millis(5), || {
            let stats = queue.stats();
            let finished = done(stats);
            async move { finished }
        })
        .await
    }

    /// Validates that enqueued ids are compiled and failures are counted.
    ///
    /// Assertions:
    /// - Confirms even ids complete and odd ids fail.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_processes_and_counts_failures() {
        let queue = CompilationQueue::new(config(2, 16, Duration::from_secs(1)));
        let job = Arc::new(SleepyJob { fail_odd: true, ..SleepyJob::default() });
        queue.start(job.clone()).unwrap();

        for id in 1..=4 {
            queue.enqueue(id).await.unwrap();
        }

        assert!(wait_for(&queue, |s| s.completed + s.failed == 4).await);
        let stats = queue.stats();
        assert_eq!((stats.completed, stats.failed), (2, 2));
        queue.stop().await.unwrap();
    }

    /// Validates coalescing of ids that are already waiting.
    ///
    /// Assertions:
    /// - Confirms three enqueues before start run the job once.
    #[tokio::test]
    async fn test_coalesces_pending_duplicates() {
        let queue = CompilationQueue::new(config(1, 16, Duration::from_secs(1)));
        assert!(queue.submit(7).unwrap());
        assert!(!queue.submit(7).unwrap());
        assert!(!queue.submit(7).unwrap());
        assert_eq!(queue.pending(), 1);

        let job = Arc::new(SleepyJob::default());
        queue.start(job.clone()).unwrap();

        assert!(wait_for(&queue, |s| s.completed == 1).await);
        assert_eq!(job.calls.load(Ordering::SeqCst), 1);
        assert_eq!(queue.stats().coalesced, 2);
        queue.stop().await.unwrap();
    }

    /// Validates that one id never compiles twice at once.
    ///
    /// Assertions:
    /// - Confirms a re-enqueue during a running job waits for it.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_single_flight_per_expression() {
        let queue = CompilationQueue::new(config(4, 16, Duration::from_secs(2)));
        let job = Arc::new(SleepyJob { delay: Duration::from_millis(50), ..SleepyJob::default() });
        queue.start(job.clone()).unwrap();

        queue.enqueue(3).await.unwrap();
        let job_seen = job.clone();
        assert!(
            poll_until(Duration::from_secs(2), Duration::from_millis(1), || {
                let started = job_seen.calls.load(Ordering::SeqCst) == 1;
                async move { started }
            })
            .await
        );
        queue.enqueue(3).await.unwrap();

        assert!(wait_for(&queue, |s| s.completed == 2).await);
        assert_eq!(job.max_overlap.load(Ordering::SeqCst), 1);
        queue.stop().await.unwrap();
    }

    /// Validates the per-job timeout.
    ///
    /// Assertions:
    /// - Confirms a slow job is counted as timed out.
    #[tokio::test]
    async fn test_job_timeout() {
        let queue = CompilationQueue::new(config(1, 4, Duration::from_millis(10)));
        let job = Arc::new(SleepyJob { delay: Duration::from_millis(500), ..SleepyJob::default() });
        queue.start(job).unwrap();

        queue.enqueue(1).await.unwrap();
        assert!(wait_for(&queue, |s| s.timed_out == 1).await);
        queue.stop().await.unwrap();
    }

    /// Validates start/stop lifecycle errors and restart.
    ///
    /// Assertions:
    /// - Confirms double start and stop-when-stopped are rejected.
    /// - Confirms a stopped queue can be started again.
    #[tokio::test]
    async fn test_lifecycle() {
        let queue = CompilationQueue::new(config(2, 4, Duration::from_secs(1)));
        assert_eq!(queue.stop().await, Err(QueueError::NotRunning));

        let job: Arc<dyn RecompileJob> = Arc::new(SleepyJob::default());
        queue.start(job.clone()).unwrap();
        assert!(queue.is_running());
        assert_eq!(queue.start(job.clone()), Err(QueueError::AlreadyRunning));

        queue.stop().await.unwrap();
        assert!(!queue.is_running());

        queue.start(job).unwrap();
        queue.enqueue(2).await.unwrap();
        assert!(wait_for(&queue, |s| s.completed == 1).await);
        queue.stop().await.unwrap();
    }

    /// Validates backpressure on a full channel.
    ///
    /// Assertions:
    /// - Confirms the second distinct id is rejected with `Full`.
    /// - Confirms the rejected id is not left marked as pending.
    #[tokio::test]
    async fn test_full_channel_rejects() {
        let queue = CompilationQueue::new(config(1, 1, Duration::from_secs(1)));
        queue.submit(1).unwrap();

        assert_eq!(queue.submit(2), Err(QueueError::Full { capacity: 1 }));
        assert_eq!(queue.pending(), 1);
        assert!(matches!(queue.enqueue(2).await, Err(SlotwiseError::Internal(_))));
    }
}
