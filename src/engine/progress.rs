//! Progress reporting for a report run.
//!
//! The engine emits human-readable messages in order. Sinks are fire-and-forget:
//! they cannot influence the run, only cancellation can.
use crate::error::ReportError;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Prefix marking recoverable problems in the progress stream
pub const WARNING_PREFIX: &str = "warning: ";

pub trait ProgressSink {
    fn on_progress(&mut self, message: &str);
}

impl<F: FnMut(&str)> ProgressSink for F {
    fn on_progress(&mut self, message: &str) {
        self(message)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&mut self, _message: &str) {}
}

/// Cooperative cancellation flag, checked between independent steps
#[derive(Debug, Default, Clone)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub(crate) fn check(&self) -> Result<(), ReportError> {
        if self.is_cancelled() {
            Err(ReportError::CancelledError)?;
        }
        Ok(())
    }
}

/// Forwards messages to the caller's sink and mirrors them to the log
pub(crate) struct Reporter<'a> {
    sink: &'a mut dyn ProgressSink,
    warnings: usize,
}

impl<'a> Reporter<'a> {
    pub(crate) fn new(sink: &'a mut dyn ProgressSink) -> Self {
        Reporter { sink, warnings: 0 }
    }

    pub(crate) fn info(&mut self, message: &str) {
        log::info!("{}", message);
        self.sink.on_progress(message);
    }

    pub(crate) fn warn(&mut self, message: &str) {
        log::warn!("{}", message);
        self.warnings += 1;
        self.sink.on_progress(&format!("{}{}", WARNING_PREFIX, message));
    }

    pub(crate) fn warnings(&self) -> usize {
        self.warnings
    }
}
