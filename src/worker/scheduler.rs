use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};

use super::job::{CompletionFlag, Job, ReadyFn, RunFn};
use crate::error::SceneError;
use crate::options::WorkerOptions;

struct Active {
    ready: Option<ReadyFn>,
    flag: CompletionFlag,
}

/// Bounded pool of detached worker threads with cooperative completion.
///
/// At most [`Scheduler::capacity`] jobs run at once; the rest wait in FIFO
/// order. Work runs on its own thread, but every `ready` callback and all
/// scheduler bookkeeping happen on the thread that calls
/// [`Scheduler::poll`], so callbacks never race each other or `submit`.
///
/// There is no cancellation: every submitted job runs to completion and its
/// `ready` fires exactly once.
pub struct Scheduler {
    capacity: usize,
    active: Vec<Active>,
    awaiting: VecDeque<Job>,
    all_finished: bool,
    spawned: u64,
}

impl Scheduler {
    /// Scheduler running up to `capacity` jobs at once (at least 1).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        log::info!("worker scheduler started with {capacity} slot(s)");
        Self {
            capacity,
            active: Vec::with_capacity(capacity),
            awaiting: VecDeque::new(),
            all_finished: true,
            spawned: 0,
        }
    }

    /// Scheduler sized from the worker options.
    #[must_use]
    pub fn from_options(options: &WorkerOptions) -> Self {
        Self::with_capacity(options.resolved_workers())
    }

    /// Queue `run` for a worker thread and `ready` for the polling thread.
    ///
    /// Starts immediately when a slot is free, otherwise waits for one.
    /// Never fails.
    pub fn submit(
        &mut self,
        run: impl FnOnce() + Send + 'static,
        ready: impl FnOnce() + 'static,
        flag: CompletionFlag,
    ) {
        self.submit_job(Job::new(run, ready, flag));
    }

    /// Queue a prepared [`Job`].
    pub fn submit_job(&mut self, job: Job) {
        self.all_finished = false;
        if self.active.len() < self.capacity {
            let active = self.start(job);
            self.active.push(active);
        } else {
            self.awaiting.push_back(job);
        }
    }

    /// Run `work` on a worker and hand its result to `ready` on the polling
    /// thread.
    pub fn submit_task<T: Send + 'static>(
        &mut self,
        work: impl FnOnce() -> T + Send + 'static,
        ready: impl FnOnce(T) + 'static,
    ) {
        let slot: Arc<Mutex<Option<T>>> = Arc::new(Mutex::new(None));
        let writer = Arc::clone(&slot);
        self.submit(
            move || {
                let value = work();
                *writer.lock().unwrap_or_else(PoisonError::into_inner) = Some(value);
            },
            move || {
                let value = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
                match value {
                    Some(value) => ready(value),
                    None => log::warn!("task finished without producing a result"),
                }
            },
            CompletionFlag::new(),
        );
    }

    /// Fire `ready` for every finished job and start queued jobs in the
    /// freed slots. Never blocks. Returns how many callbacks fired.
    ///
    /// Must be called from the owning thread, not from inside a job.
    pub fn poll(&mut self) -> usize {
        let mut fired = 0;
        let mut i = 0;
        while i < self.active.len() {
            if !self.active[i].flag.is_complete() {
                i += 1;
                continue;
            }
            if let Some(ready) = self.active[i].ready.take() {
                ready();
                fired += 1;
            }
            match self.awaiting.pop_front() {
                Some(next) => {
                    self.active[i] = self.start(next);
                    i += 1;
                }
                None => {
                    drop(self.active.remove(i));
                }
            }
        }
        if self.active.is_empty() && self.awaiting.is_empty() {
            self.all_finished = true;
        }
        fired
    }

    /// Whether every submitted job has finished and been polled.
    #[must_use]
    pub fn all_finished(&self) -> bool {
        self.all_finished
    }

    /// Jobs currently occupying a slot.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Jobs waiting for a slot.
    #[must_use]
    pub fn queued_count(&self) -> usize {
        self.awaiting.len()
    }

    /// Maximum concurrent jobs.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn start(&mut self, job: Job) -> Active {
        let Job { run, ready, flag } = job;
        let worker_flag = flag.clone();
        // Shared so the work survives a failed spawn and can run inline.
        let work: Arc<Mutex<Option<RunFn>>> = Arc::new(Mutex::new(Some(run)));
        let thread_work = Arc::clone(&work);

        self.spawned += 1;
        let spawned = std::thread::Builder::new()
            .name(format!("sensorscope-worker-{}", self.spawned))
            .spawn(move || {
                let run = thread_work.lock().unwrap_or_else(PoisonError::into_inner).take();
                if let Some(run) = run {
                    run_guarded(run);
                }
                worker_flag.complete();
            });

        if let Err(error) = spawned {
            log::error!("{}; running job inline", SceneError::ThreadSpawn(error));
            let run = work.lock().unwrap_or_else(PoisonError::into_inner).take();
            if let Some(run) = run {
                run_guarded(run);
            }
            flag.complete();
        }
        Active {
            ready: Some(ready),
            flag,
        }
    }
}

/// Run a job body, containing any panic so its flag still completes.
fn run_guarded(run: RunFn) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(run)) {
        let message = payload
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
            .unwrap_or("non-string panic payload");
        log::error!("background job panicked: {message}");
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("capacity", &self.capacity)
            .field("active", &self.active.len())
            .field("awaiting", &self.awaiting.len())
            .field("all_finished", &self.all_finished)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use std::sync::mpsc;
    use std::time::Duration;

    use web_time::Instant;

    use super::*;

    /// Poll until `done` holds or a generous deadline passes.
    fn poll_until(scheduler: &mut Scheduler, done: impl Fn() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !done() && Instant::now() < deadline {
            let _ = scheduler.poll();
            std::thread::sleep(Duration::from_millis(1));
        }
        assert!(done(), "condition not reached before deadline");
    }

    struct Gated {
        release: mpsc::Sender<()>,
        started: mpsc::Receiver<()>,
        fired: Rc<Cell<usize>>,
    }

    /// Submit a job that reports when it starts and then waits for release.
    fn submit_gated(scheduler: &mut Scheduler) -> Gated {
        let (release, gate) = mpsc::channel::<()>();
        let (started_tx, started) = mpsc::channel::<()>();
        let fired = Rc::new(Cell::new(0));
        let counter = fired.clone();
        scheduler.submit(
            move || {
                let _ = started_tx.send(());
                let _ = gate.recv();
            },
            move || counter.set(counter.get() + 1),
            CompletionFlag::new(),
        );
        Gated {
            release,
            started,
            fired,
        }
    }

    #[test]
    fn panicking_job_still_frees_its_slot() {
        let mut scheduler = Scheduler::with_capacity(1);
        let first = Rc::new(Cell::new(false));
        let second = Rc::new(Cell::new(false));

        let flag = first.clone();
        scheduler.submit(
            || panic!("job body failed"),
            move || flag.set(true),
            CompletionFlag::new(),
        );
        let flag = second.clone();
        scheduler.submit(|| {}, move || flag.set(true), CompletionFlag::new());

        poll_until(&mut scheduler, || first.get() && second.get());
        assert!(scheduler.all_finished());
    }

    #[test]
    fn capacity_is_at_least_one() {
        assert_eq!(Scheduler::with_capacity(0).capacity(), 1);
        let options = WorkerOptions {
            max_workers: Some(3),
        };
        assert_eq!(Scheduler::from_options(&options).capacity(), 3);
    }

    #[test]
    fn extra_jobs_queue_and_promote_one_at_a_time() {
        let cores = 2;
        let mut scheduler = Scheduler::with_capacity(cores);
        let jobs: Vec<Gated> = (0..cores + 3).map(|_| submit_gated(&mut scheduler)).collect();
        assert_eq!(scheduler.active_count(), cores);
        assert_eq!(scheduler.queued_count(), 3);
        assert!(!scheduler.all_finished());

        let _ = jobs[0].release.send(());
        poll_until(&mut scheduler, || jobs[0].fired.get() == 1);
        assert_eq!(scheduler.active_count(), cores);
        assert_eq!(scheduler.queued_count(), 2);
        assert!(jobs[2].started.recv_timeout(Duration::from_secs(10)).is_ok());

        let _ = scheduler.poll();
        assert_eq!(jobs[0].fired.get(), 1);

        for job in &jobs {
            let _ = job.release.send(());
        }
        poll_until(&mut scheduler, || jobs.iter().all(|job| job.fired.get() == 1));
        assert!(scheduler.all_finished());
    }

    #[test]
    fn four_jobs_on_two_slots() {
        let mut scheduler = Scheduler::with_capacity(2);
        let [a, b, c, d] = [(); 4].map(|()| submit_gated(&mut scheduler));

        assert_eq!(scheduler.poll(), 0);
        assert_eq!(scheduler.active_count(), 2);
        assert_eq!(a.fired.get() + b.fired.get(), 0);

        let _ = a.release.send(());
        poll_until(&mut scheduler, || a.fired.get() == 1);
        assert!(c.started.recv_timeout(Duration::from_secs(10)).is_ok());
        assert_eq!(scheduler.active_count(), 2);

        let _ = b.release.send(());
        poll_until(&mut scheduler, || b.fired.get() == 1);
        assert!(d.started.recv_timeout(Duration::from_secs(10)).is_ok());
        assert!(!scheduler.all_finished());

        let _ = c.release.send(());
        let _ = d.release.send(());
        poll_until(&mut scheduler, || c.fired.get() == 1 && d.fired.get() == 1);
        assert_eq!(scheduler.active_count(), 0);
        assert!(scheduler.all_finished());
        assert_eq!(a.fired.get(), 1);
    }

    #[test]
    fn flag_completed_by_the_job_fires_ready() {
        let mut scheduler = Scheduler::with_capacity(1);
        let flag = CompletionFlag::new();
        let job_flag = flag.clone();
        let (release, gate) = mpsc::channel::<()>();
        let fired = Rc::new(Cell::new(false));
        let seen = fired.clone();
        scheduler.submit(
            move || {
                job_flag.complete();
                let _ = gate.recv();
            },
            move || seen.set(true),
            flag,
        );
        poll_until(&mut scheduler, || fired.get());
        assert!(scheduler.all_finished());
        drop(release);
    }

    #[test]
    fn task_results_reach_the_polling_thread() {
        let mut scheduler = Scheduler::with_capacity(2);
        let results = Rc::new(RefCell::new(Vec::new()));
        for n in 0..4u64 {
            let results = results.clone();
            scheduler.submit_task(move || (1..=n).product::<u64>(), move |value| {
                results.borrow_mut().push(value);
            });
        }
        poll_until(&mut scheduler, || results.borrow().len() == 4);
        let mut values = results.borrow().clone();
        values.sort_unstable();
        assert_eq!(values, vec![1, 1, 2, 6]);
        assert!(scheduler.all_finished());
    }
}
