//! Typed work queue for the engine's worker pool.
//!
//! Workers pop [`Task`] values from a shared channel; `Shutdown` is
//! pushed once per worker and consumed exactly once, so the pool drains
//! without busy-waiting and without workers knowing the sample count in
//! advance.

use crossbeam_channel::{unbounded, Receiver, Sender};
use iso_core::{ErrorInfo, QuantError};

/// One unit of work for a pool worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// Process the sample with this index.
    Sample(usize),
    /// Stop the worker that receives this task.
    Shutdown,
}

/// Unbounded multi-consumer dispatch queue.
///
/// Holds only the sending half; `new` hands the receiving half back to
/// the caller, who clones it once per worker and drops the original.
/// Once every worker has exited, further dispatches fail instead of
/// queueing work nobody will pop.
#[derive(Debug, Clone)]
pub struct TaskQueue {
    tx: Sender<Task>,
}

impl TaskQueue {
    /// Creates an empty queue and its worker-side receiver.
    pub fn new() -> (Self, Receiver<Task>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }

    /// Enqueues one sample index.
    pub fn dispatch(&self, index: usize) -> Result<(), QuantError> {
        self.send(Task::Sample(index))
    }

    /// Enqueues indices `0..count` in order.
    pub fn dispatch_all(&self, count: usize) -> Result<(), QuantError> {
        for index in 0..count {
            self.send(Task::Sample(index))?;
        }
        Ok(())
    }

    /// Enqueues one shutdown task per worker.
    pub fn shutdown_workers(&self, workers: usize) -> Result<(), QuantError> {
        for _ in 0..workers {
            self.send(Task::Shutdown)?;
        }
        Ok(())
    }

    fn send(&self, task: Task) -> Result<(), QuantError> {
        self.tx.send(task).map_err(|_| {
            QuantError::Lifecycle(ErrorInfo::new(
                "queue-disconnected",
                "dispatch queue has no remaining workers",
            ))
        })
    }
}

/// Runs one worker loop: handles sample tasks until a shutdown task or
/// a disconnected queue ends the loop.
pub fn run_worker<F>(tasks: &Receiver<Task>, mut handle: F)
where
    F: FnMut(usize),
{
    while let Ok(task) = tasks.recv() {
        match task {
            Task::Sample(index) => handle(index),
            Task::Shutdown => break,
        }
    }
}
