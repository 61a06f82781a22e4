//! Job queue for deferred re-execution.
//!
//! Effects with a custom scheduler can hand their work to [`queue_job`]
//! instead of re-running inline. There are no microtasks here, so the queue
//! flushes synchronously as soon as nothing is holding it open: a flush
//! already in progress, or an enclosing [`batch`].
//!
//! Jobs are de-duplicated by identity while pending, so a component touched
//! by several writes in one batch re-renders once.

use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::error::ReactiveError;

use super::runtime::with_runtime;

/// Default number of times one job may re-queue itself within a flush.
const DEFAULT_RECURSION_LIMIT: usize = 100;

/// A unit of deferred work. Identity (the `Rc` allocation) is the dedup key.
pub type Job = Rc<dyn Fn()>;

/// Scheduler limits for the current thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Maximum runs of one job within a single flush.
    /// Default: 100
    pub recursion_limit: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }
}

impl SchedulerConfig {
    /// Create config with a custom recursion limit.
    pub fn new(recursion_limit: usize) -> Self {
        Self { recursion_limit }
    }
}

/// Replace the current thread's scheduler configuration.
pub fn configure_scheduler(config: SchedulerConfig) {
    with_runtime(|rt| rt.scheduler.set(config));
}

/// Current thread's scheduler configuration.
pub fn scheduler_config() -> SchedulerConfig {
    with_runtime(|rt| rt.scheduler.get())
}

#[inline]
fn job_key(job: &Job) -> *const () {
    Rc::as_ptr(job) as *const ()
}

/// Enqueue `job` unless it is already pending, then flush if possible.
pub fn queue_job(job: Job) {
    with_runtime(|rt| {
        let mut queue = rt.queue.borrow_mut();
        if !queue.iter().any(|j| Rc::ptr_eq(j, &job)) {
            queue.push_back(job);
        }
    });
    flush_jobs();
}

/// Whether any job is waiting to run.
pub fn has_pending_jobs() -> bool {
    with_runtime(|rt| !rt.queue.borrow().is_empty())
}

/// Run queued jobs until the queue is empty.
///
/// Returns immediately when a flush is already running or a batch is open;
/// the outer flush (or batch exit) will pick the jobs up.
pub fn flush_jobs() {
    let can_flush = with_runtime(|rt| !rt.flushing.get() && rt.batch_depth.get() == 0);
    if !can_flush {
        return;
    }
    with_runtime(|rt| rt.flushing.set(true));
    let _guard = FlushGuard;
    let limit = scheduler_config().recursion_limit;
    let mut runs: FxHashMap<*const (), usize> = FxHashMap::default();

    while let Some(job) = with_runtime(|rt| rt.queue.borrow_mut().pop_front()) {
        let count = runs.entry(job_key(&job)).or_insert(0);
        *count += 1;
        if *count > limit {
            let err = ReactiveError::RecursionLimit { limit };
            warn!(error = %err, "job dropped");
            continue;
        }
        job();
    }

    debug!(jobs = runs.len(), "flushed job queue");
}

/// Run `f` with job flushing deferred until the outermost batch exits.
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    with_runtime(|rt| rt.batch_depth.set(rt.batch_depth.get() + 1));
    let _guard = BatchGuard;
    f()
}

/// Clears the flushing flag on drop, including when a job panics.
struct FlushGuard;

impl Drop for FlushGuard {
    fn drop(&mut self) {
        with_runtime(|rt| rt.flushing.set(false));
    }
}

struct BatchGuard;

impl Drop for BatchGuard {
    fn drop(&mut self) {
        let depth = with_runtime(|rt| {
            let depth = rt.batch_depth.get().saturating_sub(1);
            rt.batch_depth.set(depth);
            depth
        });
        if depth == 0 {
            flush_jobs();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    fn counting_job(count: &Rc<Cell<u32>>) -> Job {
        let count = count.clone();
        Rc::new(move || count.set(count.get() + 1))
    }

    #[test]
    fn test_queue_flushes_immediately() {
        let runs = Rc::new(Cell::new(0));
        queue_job(counting_job(&runs));
        assert_eq!(runs.get(), 1);
        assert!(!has_pending_jobs());
    }

    #[test]
    fn test_batch_defers_and_dedups() {
        let runs = Rc::new(Cell::new(0));
        let job = counting_job(&runs);
        let value = batch(|| {
            queue_job(job.clone());
            queue_job(job.clone());
            assert_eq!(runs.get(), 0);
            assert!(has_pending_jobs());
            7
        });
        assert_eq!(value, 7);
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn test_nested_batches_flush_once_at_exit() {
        let runs = Rc::new(Cell::new(0));
        let job = counting_job(&runs);
        batch(|| {
            batch(|| queue_job(job.clone()));
            assert_eq!(runs.get(), 0);
        });
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn test_recursion_limit_stops_self_requeue() {
        configure_scheduler(SchedulerConfig::new(5));
        let runs = Rc::new(Cell::new(0));
        let slot: Rc<Cell<Option<Job>>> = Rc::new(Cell::new(None));
        let (r, s) = (runs.clone(), slot.clone());
        let job: Job = Rc::new(move || {
            r.set(r.get() + 1);
            if let Some(me) = s.take() {
                s.set(Some(me.clone()));
                queue_job(me);
            }
        });
        slot.set(Some(job.clone()));
        queue_job(job);
        assert_eq!(runs.get(), 5);
        assert!(!has_pending_jobs());

        slot.set(None);
        configure_scheduler(SchedulerConfig::default());
    }

    #[test]
    fn test_panicking_job_does_not_wedge_queue() {
        let failing: Job = Rc::new(|| panic!("job failed"));
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| queue_job(failing)));
        assert!(result.is_err());

        let runs = Rc::new(Cell::new(0));
        queue_job(counting_job(&runs));
        assert_eq!(runs.get(), 1);
        assert!(!has_pending_jobs());
    }
}
