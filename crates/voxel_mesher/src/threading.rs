//! Worker pools for background meshing runs.
//!
//! A run is one opaque unit of work; parallelism lives at the granularity of
//! whole runs, never inside an algorithm.
//!
//! ```text
//! Global       rayon::spawn                  shared with the rest of the app
//! Dedicated    ThreadPool::spawn             caller-chosen thread count
//! PerTask      std::thread::Builder::spawn   one OS thread per run
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let pool = WorkerPool::dedicated(2)?;
//! let receiver = pool.submit(move || expensive_computation());
//!
//! // Poll each frame, or block:
//! let result = receiver.recv();
//! ```

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{self as channel, Receiver};
use tracing::warn;

use crate::error::Result;

/// Unique identifier for a spawned task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
  pub fn next() -> Self {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    Self(COUNTER.fetch_add(1, Ordering::Relaxed))
  }

  pub fn get(self) -> u64 {
    self.0
  }
}

/// Where background runs execute.
#[derive(Clone, Debug, Default)]
pub enum WorkerPool {
  /// rayon's global pool.
  #[default]
  Global,
  /// A private rayon pool.
  Dedicated(Arc<rayon::ThreadPool>),
  /// A fresh OS thread per submitted job.
  PerTask,
}

impl WorkerPool {
  pub fn global() -> Self {
    Self::Global
  }

  /// Private rayon pool with `threads` workers (0 lets rayon decide).
  pub fn dedicated(threads: usize) -> Result<Self> {
    let pool = rayon::ThreadPoolBuilder::new()
      .num_threads(threads)
      .thread_name(|index| format!("voxel-mesher-{index}"))
      .build()?;
    Ok(Self::Dedicated(Arc::new(pool)))
  }

  pub fn per_task() -> Self {
    Self::PerTask
  }

  /// Run `work` in the background (non-blocking).
  ///
  /// If a dedicated thread cannot be spawned the job is dropped and logged;
  /// [`Self::submit`] surfaces that as a disconnected channel.
  pub fn spawn<F>(&self, work: F)
  where
    F: FnOnce() + Send + 'static,
  {
    match self {
      Self::Global => rayon::spawn(work),
      Self::Dedicated(pool) => pool.spawn(work),
      Self::PerTask => {
        let id = TaskId::next();
        let spawned = std::thread::Builder::new()
          .name(format!("voxel-mesher-task-{}", id.get()))
          .spawn(work);
        if let Err(err) = spawned {
          warn!(%err, task = id.get(), "failed to spawn worker thread");
        }
      }
    }
  }

  /// Run `work` in the background and hand its result back through a
  /// channel. The channel disconnects without a value if the job panics or
  /// never starts.
  pub fn submit<F, T>(&self, work: F) -> Receiver<T>
  where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
  {
    let (sender, receiver) = channel::bounded(1);
    self.spawn(move || {
      // rayon aborts on panics that escape a spawned job.
      if let Ok(result) = panic::catch_unwind(AssertUnwindSafe(work)) {
        // Receiver dropped = nobody wants the result.
        let _ = sender.send(result);
      }
    });
    receiver
  }

  /// Number of threads available to concurrent jobs.
  pub fn num_threads(&self) -> usize {
    match self {
      Self::Global => rayon::current_num_threads(),
      Self::Dedicated(pool) => pool.current_num_threads(),
      Self::PerTask => std::thread::available_parallelism().map_or(1, |n| n.get()),
    }
  }
}

// =============================================================================
// Tests
// =============================================================================
