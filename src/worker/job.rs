use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared "this job's work is done" flag.
///
/// The worker thread sets it once `run` has returned (or earlier, if the
/// job chooses to); the polling thread only ever reads it.
#[derive(Debug, Clone, Default)]
pub struct CompletionFlag(Arc<AtomicBool>);

impl CompletionFlag {
    /// A flag that is not yet complete.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the work as finished. Idempotent.
    pub fn complete(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether the work has finished.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Work to run on a worker thread.
pub type RunFn = Box<dyn FnOnce() + Send + 'static>;
/// Callback fired on the polling thread once the work is done.
pub type ReadyFn = Box<dyn FnOnce() + 'static>;

/// A unit of asynchronous work and its completion callback.
pub struct Job {
    pub(crate) run: RunFn,
    pub(crate) ready: ReadyFn,
    pub(crate) flag: CompletionFlag,
}

impl Job {
    /// Pair `run` (worker thread) with `ready` (polling thread). `flag`
    /// signals completion; the scheduler also sets it when `run` returns.
    pub fn new(
        run: impl FnOnce() + Send + 'static,
        ready: impl FnOnce() + 'static,
        flag: CompletionFlag,
    ) -> Self {
        Self {
            run: Box::new(run),
            ready: Box::new(ready),
            flag,
        }
    }

    /// The job's completion flag.
    #[must_use]
    pub fn flag(&self) -> &CompletionFlag {
        &self.flag
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("complete", &self.flag.is_complete())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_is_shared_between_clones() {
        let flag = CompletionFlag::new();
        let worker_side = flag.clone();
        assert!(!flag.is_complete());
        worker_side.complete();
        assert!(flag.is_complete());
        worker_side.complete();
        assert!(flag.is_complete());
    }

    #[test]
    fn job_exposes_its_flag() {
        let flag = CompletionFlag::new();
        let job = Job::new(|| {}, || {}, flag.clone());
        flag.complete();
        assert!(job.flag().is_complete());
        assert!(format!("{job:?}").contains("complete: true"));
    }
}
