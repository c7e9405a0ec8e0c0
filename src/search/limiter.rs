use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use parking_lot::Mutex;
use tracing::debug;

use crate::types::SlotId;

/// Fixed set of permits bounding how many searches run at once.
///
/// A caller first tries every permit without blocking and takes the first free one. When
/// all are busy it commits to the permit at `(src + dst) mod permits` and waits for it.
/// Identical requests are not merged here; see [`Coalescer`](super::Coalescer) for that.
pub struct AdmissionLimiter {
    permits: Box<[Mutex<()>]>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    waited: AtomicU64,
}

/// Decrements the in-flight counter even if the admitted closure panics.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl AdmissionLimiter {
    /// Creates a limiter with `permits` slots (at least one).
    pub fn new(permits: usize) -> Self {
        let permits = permits.max(1);
        Self {
            permits: (0..permits).map(|_| Mutex::new(())).collect(),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            waited: AtomicU64::new(0),
        }
    }

    /// Runs `job` while holding a permit and returns its result.
    pub fn run<T>(&self, src: SlotId, dst: SlotId, job: impl FnOnce() -> T) -> T {
        for (permit, lock) in self.permits.iter().enumerate() {
            if let Some(_guard) = lock.try_lock() {
                debug!(permit, src = src.0, dst = dst.0, "limiter.admit");
                return self.execute(job);
            }
        }
        let permit = ((u64::from(src.0) + u64::from(dst.0)) % self.permits.len() as u64) as usize;
        debug!(permit, src = src.0, dst = dst.0, "limiter.wait");
        self.waited.fetch_add(1, Ordering::Relaxed);
        let _guard = self.permits[permit].lock();
        self.execute(job)
    }

    /// Number of permits.
    pub fn permits(&self) -> usize {
        self.permits.len()
    }

    /// Jobs currently holding a permit.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Highest number of jobs ever observed running at once.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Acquire)
    }

    /// Number of calls that found every permit busy and had to wait.
    pub fn waited(&self) -> u64 {
        self.waited.load(Ordering::Relaxed)
    }

    fn execute<T>(&self, job: impl FnOnce() -> T) -> T {
        let running = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak.fetch_max(running, Ordering::AcqRel);
        let _in_flight = InFlight(&self.in_flight);
        job()
    }
}

impl std::fmt::Debug for AdmissionLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionLimiter")
            .field("permits", &self.permits.len())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}
