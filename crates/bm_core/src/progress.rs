//! Import progress reporting.

use std::ops::{Deref, DerefMut};

/// Receiver of a 0–100 progress signal.
pub trait ProgressSink {
    fn progress_begin(&mut self, min: f32, max: f32);
    fn progress_update(&mut self, value: f32);
    fn progress_end(&mut self);
}

/// Per-node progress counter.
///
/// One tick per visited node; a report is due every `step` ticks where
/// `step = total / 100`. Scenes with fewer than 100 nodes report on every
/// tick instead of dividing by zero.
#[derive(Clone, Debug)]
pub struct Progress {
    count: usize,
    step: usize,
}

impl Progress {
    pub fn new(total: usize) -> Self {
        Self {
            count: 0,
            step: (total / 100).max(1),
        }
    }

    /// Count one node. Returns the percentage to report, if one is due.
    pub fn tick(&mut self) -> Option<f32> {
        self.count += 1;
        if self.count % self.step == 0 {
            Some(((self.count / self.step) as f32).min(100.0))
        } else {
            None
        }
    }

    /// Nodes counted so far.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn step(&self) -> usize {
        self.step
    }
}

/// Keeps a progress indicator open for the lifetime of the scope.
///
/// The indicator is closed when the scope is dropped, so early returns and
/// `?` propagation never leave it running.
pub struct ProgressScope<'a, S: ProgressSink + ?Sized> {
    sink: &'a mut S,
}

impl<'a, S: ProgressSink + ?Sized> ProgressScope<'a, S> {
    pub fn begin(sink: &'a mut S) -> Self {
        sink.progress_begin(0.0, 100.0);
        Self { sink }
    }
}

impl<S: ProgressSink + ?Sized> Deref for ProgressScope<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.sink
    }
}

impl<S: ProgressSink + ?Sized> DerefMut for ProgressScope<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.sink
    }
}

impl<S: ProgressSink + ?Sized> Drop for ProgressScope<'_, S> {
    fn drop(&mut self) {
        self.sink.progress_end();
    }
}
