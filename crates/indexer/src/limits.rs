use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

pub(crate) const MAX_INDEX_CONCURRENCY: usize = 32;

pub const INDEX_CONCURRENCY_ENV: &str = "ASSEMBLY_INDEX_CONCURRENCY";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexConcurrencySnapshot {
    pub limit: usize,
    pub in_flight: usize,
    pub waiters: usize,
    pub peak_in_flight: usize,
}

fn default_index_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .clamp(1, MAX_INDEX_CONCURRENCY)
}

fn parse_index_concurrency(raw: Option<&str>, default_value: usize) -> usize {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default_value)
        .clamp(1, MAX_INDEX_CONCURRENCY)
}

/// Effective worker bound: environment first, then configuration, then CPU count
pub fn resolve_index_concurrency(configured: Option<usize>) -> usize {
    let raw = std::env::var(INDEX_CONCURRENCY_ENV).ok();
    let fallback = configured
        .unwrap_or_else(default_index_concurrency)
        .clamp(1, MAX_INDEX_CONCURRENCY);
    parse_index_concurrency(raw.as_deref(), fallback)
}

#[derive(Debug, Default)]
struct Counters {
    in_flight: AtomicUsize,
    waiters: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

/// Bounded pool of parse slots shared by one build
#[derive(Debug, Clone)]
pub(crate) struct WorkerPool {
    limit: usize,
    semaphore: Arc<Semaphore>,
    counters: Arc<Counters>,
}

impl WorkerPool {
    pub(crate) fn new(limit: usize) -> Self {
        let limit = limit.clamp(1, MAX_INDEX_CONCURRENCY);
        Self {
            limit,
            semaphore: Arc::new(Semaphore::new(limit)),
            counters: Arc::new(Counters::default()),
        }
    }

    pub(crate) fn snapshot(&self) -> IndexConcurrencySnapshot {
        IndexConcurrencySnapshot {
            limit: self.limit,
            in_flight: self.counters.in_flight.load(Ordering::Relaxed),
            waiters: self.counters.waiters.load(Ordering::Relaxed),
            peak_in_flight: self.counters.peak_in_flight.load(Ordering::Relaxed),
        }
    }

    pub(crate) async fn acquire(&self) -> IndexingPermit {
        // The semaphore is never closed; acquire failures are not expected.
        let waiter = WaiterGuard::new(&self.counters);
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .unwrap_or_else(|_| unreachable!("index concurrency semaphore closed"));
        drop(waiter);

        let now = self.counters.in_flight.fetch_add(1, Ordering::Relaxed) + 1;
        self.counters
            .peak_in_flight
            .fetch_max(now, Ordering::Relaxed);
        IndexingPermit {
            _permit: permit,
            counters: self.counters.clone(),
        }
    }
}

pub(crate) struct IndexingPermit {
    _permit: OwnedSemaphorePermit,
    counters: Arc<Counters>,
}

impl Drop for IndexingPermit {
    fn drop(&mut self) {
        self.counters.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}

struct WaiterGuard<'a> {
    counters: &'a Counters,
}

impl<'a> WaiterGuard<'a> {
    fn new(counters: &'a Counters) -> Self {
        counters.waiters.fetch_add(1, Ordering::Relaxed);
        Self { counters }
    }
}

impl Drop for WaiterGuard<'_> {
    fn drop(&mut self) {
        self.counters.waiters.fetch_sub(1, Ordering::Relaxed);
    }
}
