use std::sync::atomic::AtomicUsize;
use std::time::Duration;

use crossbeam_channel as channel;
use glam::IVec3;

use super::*;
use crate::samplers::SphereDensity;
use crate::test_utils::small_settings;
use crate::types::SimplifierSettings;

/// Blocks until released.
struct Gate {
  release: channel::Receiver<()>,
}

impl MeshingTask for Gate {
  type Output = u32;

  fn body(&mut self, _: &mut RunControl) -> Result<u32> {
    let _ = self.release.recv_timeout(Duration::from_secs(5));
    Ok(7)
  }
}

/// Counts up, one checkpoint per iteration.
struct Spin {
  iterations: usize,
}

impl MeshingTask for Spin {
  type Output = usize;

  fn body(&mut self, control: &mut RunControl) -> Result<usize> {
    for i in 0..self.iterations {
      control.step(i, 1)?;
      std::thread::sleep(Duration::from_micros(50));
    }
    Ok(self.iterations)
  }
}

struct Explode;

impl MeshingTask for Explode {
  type Output = ();

  fn body(&mut self, _: &mut RunControl) -> Result<()> {
    panic!("body failed")
  }
}

fn sphere_job() -> GenerateVoxelDataTask<SphereDensity> {
  let settings = small_settings();
  let source = Arc::new(SphereDensity::centered(settings.units, 3.0));
  GenerateVoxelDataTask::new(settings, ExtractionOptions::new(), source)
}

#[test]
fn test_generate_task_round_trip() {
  let mut task = BackgroundTask::new(sphere_job(), WorkerPool::global());
  assert!(task.poll().is_none());

  task.start().unwrap();
  assert!(task.is_pending());
  let mesh = task.wait().unwrap();

  assert!(mesh.triangle_count() > 0);
  assert!(!task.is_running());
  assert!(!task.is_pending());
  assert!(task.task().is_some());

  // Restartable once collected.
  task.start().unwrap();
  assert_eq!(task.wait().unwrap().positions(), mesh.positions());
}

#[test]
fn test_invalid_settings_fail_synchronously() {
  let mut job = sphere_job();
  job.settings = job.settings.with_resolution(0.0);
  let mut task = BackgroundTask::new(job, WorkerPool::per_task());

  assert!(matches!(task.start(), Err(MesherError::Config(_))));
  assert!(!task.is_pending());
  assert!(task.task().is_some());
  assert!(matches!(task.wait(), Err(MesherError::NotStarted)));
}

#[test]
fn test_second_start_is_rejected() {
  let (release, gate) = channel::bounded(1);
  let mut task = BackgroundTask::new(Gate { release: gate }, WorkerPool::per_task());

  task.start().unwrap();
  assert!(matches!(task.start(), Err(MesherError::AlreadyRunning)));
  assert!(task.task().is_none());

  release.send(()).unwrap();
  assert_eq!(task.wait().unwrap(), 7);
  assert!(!task.is_running());
}

#[test]
fn test_cancel_then_restart() {
  let mut task = BackgroundTask::new(Spin { iterations: 1_000_000 }, WorkerPool::dedicated(1).unwrap());

  task.start().unwrap();
  task.cancel();
  assert!(matches!(task.wait(), Err(MesherError::Cancelled)));

  // Start clears the token.
  task.task_mut().unwrap().iterations = 5;
  task.start().unwrap();
  assert_eq!(task.wait().unwrap(), 5);
}

#[test]
fn test_checkpoint_runs_on_worker() {
  let hits = Arc::new(AtomicUsize::new(0));
  let sink = Arc::clone(&hits);
  let mut task = BackgroundTask::new(Spin { iterations: 12 }, WorkerPool::global())
    .with_checkpoint(move |_| {
      sink.fetch_add(1, Ordering::Relaxed);
    });

  task.start().unwrap();
  task.wait().unwrap();
  assert_eq!(hits.load(Ordering::Relaxed), 12);
}

#[test]
fn test_panicking_body_loses_task() {
  let mut task = BackgroundTask::new(Explode, WorkerPool::global());
  task.start().unwrap();
  assert!(matches!(task.wait(), Err(MesherError::TaskLost)));
  assert!(!task.is_running());
  assert!(matches!(task.start(), Err(MesherError::TaskLost)));
}

#[test]
fn test_poll_until_done() {
  let mut task = BackgroundTask::new(sphere_job(), WorkerPool::per_task());
  task.start().unwrap();

  let mut result = None;
  for _ in 0..5000 {
    if let Some(r) = task.poll() {
      result = Some(r);
      break;
    }
    std::thread::sleep(Duration::from_millis(1));
  }
  assert!(result.unwrap().unwrap().triangle_count() > 0);
}

#[test]
fn test_extract_then_convert() {
  let settings = small_settings().with_units(IVec3::splat(16));
  let source: Arc<dyn DensitySource> = Arc::new(SphereDensity::centered(settings.units, 5.0));

  let job = GenerateVoxelDataTask::new(settings, ExtractionOptions::new(), Arc::clone(&source));
  let mut extraction = BackgroundTask::new(job, WorkerPool::global());
  extraction.start().unwrap();
  let mesh = extraction.wait().unwrap();
  let vertices = mesh.vertex_count();

  let options = AssemblyOptions::new()
    .with_lod(SimplifierSettings::new())
    .with_lod(SimplifierSettings::new().with_quality(0.5));
  let job = ConvertToMeshDataTask::new(settings, options, source, mesh);
  let mut conversion = BackgroundTask::new(job, WorkerPool::global());
  conversion.start().unwrap();
  let lods = conversion.wait().unwrap();

  assert_eq!(lods.len(), 2);
  assert_eq!(lods[0].vertex_count(), vertices);
  assert!(lods[1].vertex_count() <= vertices / 2);
  assert_eq!(conversion.task().unwrap().mesh.vertex_count(), lods[1].vertex_count());
}

#[test]
fn test_tasks_behind_one_interface() {
  let (release, gate) = channel::bounded(1);
  let mut tasks: Vec<Box<dyn TaskControl>> = vec![
    Box::new(BackgroundTask::new(sphere_job(), WorkerPool::global())),
    Box::new(BackgroundTask::new(Gate { release: gate }, WorkerPool::per_task())),
  ];
  for task in &mut tasks {
    task.start().unwrap();
  }
  assert!(matches!(tasks[1].start(), Err(MesherError::AlreadyRunning)));
  for task in &tasks {
    task.cancel();
  }
  release.send(()).unwrap();
}
