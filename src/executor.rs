// Task execution
// Inline and thread-pool executors behind one submit/join interface

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver};

use thiserror::Error;
use tokio::runtime::{Builder, Runtime};

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Invalid number of parallel jobs: {0}")]
    InvalidParallelism(i64),

    #[error("Failed to start worker pool: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("Task failed: {0}")]
    TaskFailed(String),
}

/// Anything that can run independent, owned tasks
pub trait TaskExecutor {
    /// Submit a task; its result is collected through the returned handle
    fn submit<T, F>(&self, task: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static;
}

/// Result of a submitted task
pub enum TaskHandle<T> {
    /// The task already ran on the submitting thread
    Ready(Result<T, ExecutorError>),

    /// The task runs on a pool thread and reports back over a channel
    Spawned(Receiver<Result<T, ExecutorError>>),
}

impl<T> TaskHandle<T> {
    /// Wait for the task to finish
    ///
    /// Blocks the calling thread, so it also works from inside an async context.
    pub fn join(self) -> Result<T, ExecutorError> {
        match self {
            TaskHandle::Ready(result) => result,
            TaskHandle::Spawned(receiver) => receiver.recv().unwrap_or_else(|_| {
                Err(ExecutorError::TaskFailed(
                    "worker pool shut down before the task finished".to_string(),
                ))
            }),
        }
    }
}

/// Run a task, turning a panic into `TaskFailed`
fn run_isolated<T, F>(task: F) -> Result<T, ExecutorError>
where
    F: FnOnce() -> T,
{
    panic::catch_unwind(AssertUnwindSafe(task))
        .map_err(|payload| ExecutorError::TaskFailed(panic_message(&*payload)))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked".to_string()
    }
}

/// Runs every task immediately on the caller's thread
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl TaskExecutor for InlineExecutor {
    fn submit<T, F>(&self, task: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        TaskHandle::Ready(run_isolated(task))
    }
}

/// Runs tasks on a bounded pool of blocking worker threads
pub struct ThreadPoolExecutor {
    runtime: Runtime,
    workers: usize,
}

impl ThreadPoolExecutor {
    pub fn new(workers: usize) -> Result<Self, ExecutorError> {
        if workers == 0 {
            return Err(ExecutorError::InvalidParallelism(0));
        }

        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(workers)
            .thread_name("kurtopick-worker")
            .build()?;

        Ok(ThreadPoolExecutor { runtime, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl TaskExecutor for ThreadPoolExecutor {
    fn submit<T, F>(&self, task: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel();
        self.runtime.spawn_blocking(move || {
            // The handle may already be gone; nobody is left to tell
            let _ = sender.send(run_isolated(task));
        });
        TaskHandle::Spawned(receiver)
    }
}

/// Executor chosen from a requested degree of parallelism
pub enum Executor {
    Inline(InlineExecutor),
    Pool(ThreadPoolExecutor),
}

impl Executor {
    /// `1` runs serially; larger values start a pool; `0` or less is an error
    pub fn for_jobs(parallel_jobs: i64) -> Result<Self, ExecutorError> {
        match parallel_jobs {
            1 => Ok(Executor::Inline(InlineExecutor)),
            n if n > 1 => Ok(Executor::Pool(ThreadPoolExecutor::new(n as usize)?)),
            n => Err(ExecutorError::InvalidParallelism(n)),
        }
    }
}

impl TaskExecutor for Executor {
    fn submit<T, F>(&self, task: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        match self {
            Executor::Inline(inline) => inline.submit(task),
            Executor::Pool(pool) => pool.submit(task),
        }
    }
}
