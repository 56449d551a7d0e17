//! Background meshing tasks.
//!
//! A [`MeshingTask`] is the body of one run; [`BackgroundTask`] owns it and
//! moves it onto a [`WorkerPool`] for every start.
//!
//! # Flow
//!
//! ```text
//! Caller                              Worker
//! ┌──────────────────┐
//! │ start()          │ validate (sync, Err => nothing spawned)
//! │  reset token     │
//! │  move task out ──┼───────────────► ┌────────────────────┐
//! └──────────────────┘                 │ body(&mut control) │
//! ┌──────────────────┐                 │  polls token       │
//! │ cancel()         │── token ──────► │  fires checkpoint  │
//! └──────────────────┘                 └─────────┬──────────┘
//! ┌──────────────────┐                           │ (task, result)
//! │ poll() / wait()  │◄──────────────────────────┘
//! │  task returns    │
//! └──────────────────┘
//! ```
//!
//! The task travels back with its result, so the same object can be started
//! again once the result has been collected.
//!
//! # Usage
//!
//! ```ignore
//! let job = GenerateVoxelDataTask::new(settings, options, Arc::new(source));
//! let mut task = BackgroundTask::new(job, WorkerPool::global());
//! task.start()?;
//!
//! // Poll each frame
//! if let Some(result) = task.poll() {
//!   let mesh = result?;
//! }
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, TryRecvError};
use tracing::{debug, debug_span};
use web_time::Instant;

use crate::assemble::assemble;
use crate::control::{CancellationToken, RunControl};
use crate::density::DensitySource;
use crate::error::{MesherError, Result};
use crate::extract::extract;
use crate::mesh::DynamicMesh;
use crate::threading::{TaskId, WorkerPool};
use crate::types::{AssemblyOptions, ExtractionOptions, MeshData, Settings};

/// Work performed by a background run.
pub trait MeshingTask: Send + 'static {
  type Output: Send + 'static;

  /// Checked synchronously by [`BackgroundTask::start`] before anything is
  /// spawned.
  fn validate(&self) -> Result<()> {
    Ok(())
  }

  /// The run itself. Must poll `control` regularly and return
  /// `Err(Cancelled)` once it is cancelled.
  fn body(&mut self, control: &mut RunControl) -> Result<Self::Output>;
}

/// Object-safe lifecycle of a background run, for hosts that keep tasks of
/// different kinds together.
pub trait TaskControl: Send {
  fn start(&mut self) -> Result<()>;
  fn cancel(&self);
  fn is_running(&self) -> bool;
}

type SharedCheckpoint = Arc<dyn Fn(usize) + Send + Sync>;
type Delivery<T> = (T, Result<<T as MeshingTask>::Output>);

/// Clears the running flag even if the body panics.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
  fn drop(&mut self) {
    self.0.store(false, Ordering::Release);
  }
}

/// Runs a [`MeshingTask`] on a worker pool.
pub struct BackgroundTask<T: MeshingTask> {
  id: TaskId,
  pool: WorkerPool,
  token: CancellationToken,
  checkpoint: Option<SharedCheckpoint>,
  running: Arc<AtomicBool>,
  /// Present while idle.
  task: Option<T>,
  /// Present from start until the result is collected.
  receiver: Option<Receiver<Delivery<T>>>,
}

impl<T: MeshingTask> BackgroundTask<T> {
  pub fn new(task: T, pool: WorkerPool) -> Self {
    Self {
      id: TaskId::next(),
      pool,
      token: CancellationToken::new(),
      checkpoint: None,
      running: Arc::new(AtomicBool::new(false)),
      task: Some(task),
      receiver: None,
    }
  }

  /// Callback fired every `reset_runaway_iteration_count` iterations of each
  /// run, on the worker thread.
  pub fn with_checkpoint(mut self, checkpoint: impl Fn(usize) + Send + Sync + 'static) -> Self {
    self.checkpoint = Some(Arc::new(checkpoint));
    self
  }

  pub fn id(&self) -> TaskId {
    self.id
  }

  /// Token shared with every run of this task.
  pub fn token(&self) -> &CancellationToken {
    &self.token
  }

  /// The task while idle; `None` during a run or after it was lost.
  pub fn task(&self) -> Option<&T> {
    self.task.as_ref()
  }

  pub fn task_mut(&mut self) -> Option<&mut T> {
    self.task.as_mut()
  }

  pub fn into_task(self) -> Option<T> {
    self.task
  }

  /// Validate and spawn one run.
  ///
  /// Fails with `AlreadyRunning` until the previous result has been
  /// collected, and with `TaskLost` if a previous run panicked.
  pub fn start(&mut self) -> Result<()> {
    if self.receiver.is_some() {
      return Err(MesherError::AlreadyRunning);
    }
    let mut task = self.task.take().ok_or(MesherError::TaskLost)?;
    if let Err(err) = task.validate() {
      self.task = Some(task);
      return Err(err);
    }

    self.token.reset();
    let mut control = RunControl::new(self.token.clone());
    if let Some(checkpoint) = self.checkpoint.clone() {
      control = control.with_checkpoint(move |i| checkpoint(i));
    }

    self.running.store(true, Ordering::Release);
    let guard = RunningGuard(Arc::clone(&self.running));
    let id = self.id;
    self.receiver = Some(self.pool.submit(move || {
      let _guard = guard;
      let span = debug_span!("task", id = id.get());
      let _enter = span.enter();
      let start = Instant::now();
      let result = task.body(&mut control);
      debug!(
        elapsed_us = start.elapsed().as_micros() as u64,
        ok = result.is_ok(),
        "task finished"
      );
      (task, result)
    }));
    Ok(())
  }

  /// Request cancellation of the current run.
  pub fn cancel(&self) {
    self.token.cancel();
  }

  /// True while the body executes.
  pub fn is_running(&self) -> bool {
    self.running.load(Ordering::Acquire)
  }

  /// True once a run has been started and its result not yet collected.
  pub fn is_pending(&self) -> bool {
    self.receiver.is_some()
  }

  /// Collect the result without blocking.
  ///
  /// `None` while running or when nothing was started.
  pub fn poll(&mut self) -> Option<Result<T::Output>> {
    let receiver = self.receiver.as_ref()?;
    match receiver.try_recv() {
      Ok(delivery) => Some(self.finish(delivery)),
      Err(TryRecvError::Empty) => None,
      Err(TryRecvError::Disconnected) => {
        self.receiver = None;
        Some(Err(MesherError::TaskLost))
      }
    }
  }

  /// Block until the current run finishes.
  pub fn wait(&mut self) -> Result<T::Output> {
    let receiver = self.receiver.as_ref().ok_or(MesherError::NotStarted)?;
    match receiver.recv() {
      Ok(delivery) => self.finish(delivery),
      Err(_) => {
        self.receiver = None;
        Err(MesherError::TaskLost)
      }
    }
  }

  fn finish(&mut self, (task, result): Delivery<T>) -> Result<T::Output> {
    self.receiver = None;
    self.task = Some(task);
    result
  }
}

impl<T: MeshingTask> TaskControl for BackgroundTask<T> {
  fn start(&mut self) -> Result<()> {
    BackgroundTask::start(self)
  }

  fn cancel(&self) {
    BackgroundTask::cancel(self)
  }

  fn is_running(&self) -> bool {
    BackgroundTask::is_running(self)
  }
}

impl<T: MeshingTask> fmt::Debug for BackgroundTask<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("BackgroundTask")
      .field("id", &self.id)
      .field("pool", &self.pool)
      .field("running", &self.is_running())
      .field("pending", &self.is_pending())
      .finish()
  }
}

// =============================================================================
// Tasks
// =============================================================================

/// Extraction run producing a [`DynamicMesh`].
pub struct GenerateVoxelDataTask<S: DensitySource + ?Sized + 'static> {
  pub settings: Settings,
  pub options: ExtractionOptions,
  pub source: Arc<S>,
}

impl<S: DensitySource + ?Sized + 'static> GenerateVoxelDataTask<S> {
  pub fn new(settings: Settings, options: ExtractionOptions, source: Arc<S>) -> Self {
    Self {
      settings,
      options,
      source,
    }
  }
}

impl<S: DensitySource + ?Sized + 'static> MeshingTask for GenerateVoxelDataTask<S> {
  type Output = DynamicMesh;

  fn validate(&self) -> Result<()> {
    self.settings.validate()?;
    Ok(())
  }

  fn body(&mut self, control: &mut RunControl) -> Result<DynamicMesh> {
    extract(&self.settings, &self.options, &*self.source, control)
  }
}

/// Assembly run turning an extracted mesh into per-LOD render data.
///
/// LODs are cumulative, so after a run the task's mesh holds the last LOD.
pub struct ConvertToMeshDataTask<S: DensitySource + ?Sized + 'static> {
  pub settings: Settings,
  pub options: AssemblyOptions,
  pub source: Arc<S>,
  pub mesh: DynamicMesh,
}

impl<S: DensitySource + ?Sized + 'static> ConvertToMeshDataTask<S> {
  pub fn new(
    settings: Settings,
    options: AssemblyOptions,
    source: Arc<S>,
    mesh: DynamicMesh,
  ) -> Self {
    Self {
      settings,
      options,
      source,
      mesh,
    }
  }
}

impl<S: DensitySource + ?Sized + 'static> MeshingTask for ConvertToMeshDataTask<S> {
  type Output = Vec<MeshData>;

  fn validate(&self) -> Result<()> {
    self.settings.validate()?;
    self.options.validate()?;
    Ok(())
  }

  fn body(&mut self, control: &mut RunControl) -> Result<Vec<MeshData>> {
    assemble(&self.settings, &self.options, &*self.source, &mut self.mesh, control)
  }
}

#[cfg(test)]
#[path = "task_test.rs"]
mod task_test;
