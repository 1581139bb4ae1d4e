//! Background work with completion callbacks on the polling thread.
//!
//! Heavy preprocessing (building cloud vertex arrays, decoding frames) runs
//! on detached worker threads. The engine calls [`Scheduler::poll`] once per
//! frame; that is where finished jobs hand their results back and where
//! waiting jobs are started.

mod job;
mod scheduler;

pub use job::{CompletionFlag, Job, ReadyFn, RunFn};
pub use scheduler::Scheduler;
