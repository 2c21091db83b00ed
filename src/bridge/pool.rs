use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use lazy_static::lazy_static;
use tokio::sync::mpsc;

use crate::config::BridgeConfig;
use crate::core::{DbError, Result};

pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// Bounded pool of dedicated worker threads for driving blocking sessions
/// from non-blocking callers.
///
/// Each worker owns a bounded job queue; when a queue is full, submissions
/// await capacity instead of growing a backlog or dropping work. A scope
/// leases one worker and ships every job to it, so a blocking handle is only
/// ever touched from that single thread for the scope's lifetime.
pub struct BlockingPool {
    workers: Vec<mpsc::Sender<Job>>,
    next: AtomicUsize,
    queue_depth: usize,
    counters: Arc<PoolCounters>,
}

#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    pub submitted: AtomicU64,
    pub completed: AtomicU64,
}

impl BlockingPool {
    pub fn new(config: &BridgeConfig) -> Result<Self> {
        if config.queue_depth == 0 {
            return Err(DbError::Config("queue_depth must be > 0".into()));
        }
        let workers = match config.workers {
            Some(0) => return Err(DbError::Config("workers must be > 0".into())),
            Some(n) => n,
            None => default_workers(),
        };
        let counters = Arc::new(PoolCounters::default());

        let mut senders = Vec::with_capacity(workers);
        for index in 0..workers {
            let (sender, receiver) = mpsc::channel::<Job>(config.queue_depth);
            spawn_worker(index, receiver, Arc::clone(&counters))?;
            senders.push(sender);
        }
        log::info!(
            "blocking pool started: {workers} workers, queue depth {}",
            config.queue_depth
        );

        Ok(Self {
            workers: senders,
            next: AtomicUsize::new(0),
            queue_depth: config.queue_depth,
            counters,
        })
    }

    /// Process-wide default pool with default sizing. Lives for the life of
    /// the process; workers idle when unused.
    pub fn shared() -> Arc<BlockingPool> {
        lazy_static! {
            static ref SHARED: Arc<BlockingPool> = Arc::new(
                BlockingPool::new(&BridgeConfig::default()).expect("default pool configuration")
            );
        }
        Arc::clone(&SHARED)
    }

    /// Pin the next scope to one worker, round-robin. Every job submitted
    /// through the lease runs on that worker in submission order.
    pub fn lease(&self) -> WorkerLease {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.workers.len();
        WorkerLease {
            index,
            sender: self.workers[index].clone(),
            counters: Arc::clone(&self.counters),
        }
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            workers: self.workers.len(),
            queue_depth: self.queue_depth,
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
        }
    }
}

fn spawn_worker(
    index: usize,
    mut receiver: mpsc::Receiver<Job>,
    counters: Arc<PoolCounters>,
) -> Result<()> {
    thread::Builder::new()
        .name(format!("duotx-worker-{index}"))
        .spawn(move || {
            let span = tracing::info_span!("duotx_worker", index);
            let _enter = span.enter();
            tracing::debug!("worker started");
            while let Some(job) = receiver.blocking_recv() {
                job();
                counters.completed.fetch_add(1, Ordering::Relaxed);
            }
            tracing::debug!("worker exiting");
        })
        .map(|_| ())
        .map_err(|e| DbError::Bridge(format!("failed to spawn worker {index}: {e}")))
}

/// Default worker count: `min(32, available_parallelism + 4)`.
pub fn default_workers() -> usize {
    let parallelism = thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1);
    usize::min(32, parallelism + 4)
}

/// A scope's claim on one worker. Cloning the sender keeps the worker alive
/// while any lease exists.
pub struct WorkerLease {
    index: usize,
    sender: mpsc::Sender<Job>,
    counters: Arc<PoolCounters>,
}

impl WorkerLease {
    pub fn worker_index(&self) -> usize {
        self.index
    }

    /// Queue a job on the leased worker, awaiting capacity when the queue
    /// is full.
    pub(crate) async fn submit(&self, job: Job) -> Result<()> {
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        self.sender
            .send(job)
            .await
            .map_err(|_| DbError::Bridge("worker pool is shut down".into()))
    }

    /// Best-effort submission from non-async contexts (teardown in `Drop`).
    /// Returns false when the queue is full or the worker is gone.
    pub(crate) fn try_submit(&self, job: Job) -> bool {
        match self.sender.try_send(job) {
            Ok(()) => {
                self.counters.submitted.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(_) => false,
        }
    }
}

/// Point-in-time pool counters.
#[derive(Debug, Clone)]
pub struct PoolStats {
    pub workers: usize,
    pub queue_depth: usize,
    pub submitted: u64,
    pub completed: u64,
}

impl std::fmt::Display for PoolStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Pool Stats: {} workers, queue depth {}, {} submitted, {} completed",
            self.workers, self.queue_depth, self.submitted, self.completed
        )
    }
}
