//! Cooperative cancellation and periodic checkpoints for long-running passes.
//!
//! Every loop in extraction, simplification and assembly polls the
//! [`CancellationToken`] once per item and reports its iteration index to
//! [`RunControl::checkpoint`], which forwards every Nth index to an optional
//! caller callback (watchdogs, progress bars).

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{MesherError, Result};

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn cancel(&self) {
    self.0.store(true, Ordering::Relaxed);
  }

  /// Clear the flag so the token can drive a fresh run.
  pub fn reset(&self) {
    self.0.store(false, Ordering::Relaxed);
  }

  #[inline]
  pub fn is_cancelled(&self) -> bool {
    self.0.load(Ordering::Relaxed)
  }

  /// `Err(Cancelled)` once the flag is set.
  #[inline]
  pub fn check(&self) -> Result<()> {
    if self.is_cancelled() {
      Err(MesherError::Cancelled)
    } else {
      Ok(())
    }
  }
}

type CheckpointFn = Box<dyn FnMut(usize) + Send>;

/// Cancellation token plus an optional "every N iterations" callback.
#[derive(Default)]
pub struct RunControl {
  token: CancellationToken,
  checkpoint: Option<CheckpointFn>,
}

impl RunControl {
  pub fn new(token: CancellationToken) -> Self {
    Self {
      token,
      checkpoint: None,
    }
  }

  /// Install the periodic callback; it receives the iteration index.
  pub fn with_checkpoint(mut self, checkpoint: impl FnMut(usize) + Send + 'static) -> Self {
    self.checkpoint = Some(Box::new(checkpoint));
    self
  }

  pub fn token(&self) -> &CancellationToken {
    &self.token
  }

  #[inline]
  pub fn check(&self) -> Result<()> {
    self.token.check()
  }

  /// Call the checkpoint when `iteration` is a multiple of `interval`.
  /// An interval of zero never fires.
  #[inline]
  pub fn checkpoint(&mut self, iteration: usize, interval: u32) {
    if interval == 0 || iteration % interval as usize != 0 {
      return;
    }
    if let Some(callback) = self.checkpoint.as_mut() {
      callback(iteration);
    }
  }

  /// Poll the token, then fire the checkpoint if due.
  #[inline]
  pub fn step(&mut self, iteration: usize, interval: u32) -> Result<()> {
    self.check()?;
    self.checkpoint(iteration, interval);
    Ok(())
  }
}

impl fmt::Debug for RunControl {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("RunControl")
      .field("token", &self.token)
      .field("checkpoint", &self.checkpoint.is_some())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use super::*;

  #[test]
  fn test_token_clones_share_state() {
    let token = CancellationToken::new();
    let other = token.clone();
    assert!(token.check().is_ok());

    other.cancel();
    assert!(token.is_cancelled());
    assert!(matches!(token.check(), Err(MesherError::Cancelled)));

    token.reset();
    assert!(!other.is_cancelled());
  }

  #[test]
  fn test_checkpoint_interval() {
    let hits = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&hits);
    let mut control =
      RunControl::default().with_checkpoint(move |i| sink.lock().unwrap().push(i));

    for i in 0..10 {
      control.step(i, 4).unwrap();
    }
    assert_eq!(*hits.lock().unwrap(), vec![0, 4, 8]);
  }

  #[test]
  fn test_zero_interval_never_fires() {
    let hits = Arc::new(Mutex::new(0));
    let sink = Arc::clone(&hits);
    let mut control = RunControl::default().with_checkpoint(move |_| *sink.lock().unwrap() += 1);

    for i in 0..10 {
      control.checkpoint(i, 0);
    }
    assert_eq!(*hits.lock().unwrap(), 0);
  }

  #[test]
  fn test_step_stops_on_cancel() {
    let token = CancellationToken::new();
    let mut control = RunControl::new(token.clone());
    assert!(control.step(0, 1).is_ok());
    token.cancel();
    assert!(matches!(control.step(1, 1), Err(MesherError::Cancelled)));
  }
}
