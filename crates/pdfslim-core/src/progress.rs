//! Progress reporting for compression calls.
//!
//! Each call owns one [`ProgressReporter`]. The reporter clamps the
//! percentage so the emitted sequence is non-decreasing even when a
//! fallback path restarts its own stage range.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::types::ExecutionMethod;

/// Pipeline stage, in forward order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStage {
    Analyzing,
    Uploading,
    Processing,
    Downloading,
    Complete,
}

impl ProgressStage {
    pub fn as_str(self) -> &'static str {
        match self {
            ProgressStage::Analyzing => "analyzing",
            ProgressStage::Uploading => "uploading",
            ProgressStage::Processing => "processing",
            ProgressStage::Downloading => "downloading",
            ProgressStage::Complete => "complete",
        }
    }
}

/// One progress update delivered to the caller's callback.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub stage: ProgressStage,
    /// 0..=100, non-decreasing within a single call.
    pub progress: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<ExecutionMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<String>,
}

/// Caller-supplied progress callback. Invoked synchronously at await
/// boundaries; must not block.
pub type ProgressFn = dyn Fn(&ProgressEvent) + Send + Sync;

/// Per-call progress sink with monotonicity enforcement.
#[derive(Clone)]
pub struct ProgressReporter {
    callback: Option<Arc<ProgressFn>>,
    last: Arc<AtomicU8>,
}

impl ProgressReporter {
    pub fn new(callback: Option<Arc<ProgressFn>>) -> Self {
        Self {
            callback,
            last: Arc::new(AtomicU8::new(0)),
        }
    }

    /// Report a stage update with just a message.
    pub fn report(&self, stage: ProgressStage, progress: u8, message: impl Into<String>) {
        self.report_event(ProgressEvent {
            stage,
            progress,
            message: message.into(),
            method: None,
            estimated_time: None,
        });
    }

    /// Report a fully-populated event. The percentage is clamped to 100 and
    /// to the highest value seen so far in this call.
    pub fn report_event(&self, mut event: ProgressEvent) {
        let next = event.progress.min(100);
        let prev = self.last.fetch_max(next, Ordering::SeqCst);
        event.progress = prev.max(next);
        if let Some(callback) = &self.callback {
            callback(&event);
        }
    }

    /// Highest percentage emitted so far.
    pub fn last(&self) -> u8 {
        self.last.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn collecting_reporter() -> (ProgressReporter, Arc<Mutex<Vec<ProgressEvent>>>) {
        let events: Arc<Mutex<Vec<ProgressEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let reporter = ProgressReporter::new(Some(Arc::new(move |event: &ProgressEvent| {
            sink.lock().unwrap().push(event.clone());
        })));
        (reporter, events)
    }

    #[test]
    fn test_progress_is_clamped_monotonic() {
        let (reporter, events) = collecting_reporter();

        reporter.report(ProgressStage::Analyzing, 10, "a");
        reporter.report(ProgressStage::Processing, 60, "b");
        // A fallback restarting its range must not move the bar backwards.
        reporter.report(ProgressStage::Uploading, 40, "c");
        reporter.report(ProgressStage::Complete, 100, "d");

        let seen: Vec<u8> = events.lock().unwrap().iter().map(|e| e.progress).collect();
        assert_eq!(seen, vec![10, 60, 60, 100]);
    }

    #[test]
    fn test_progress_caps_at_100() {
        let (reporter, events) = collecting_reporter();
        reporter.report(ProgressStage::Processing, 250, "overflow");
        assert_eq!(events.lock().unwrap()[0].progress, 100);
    }

    #[test]
    fn test_no_callback_is_a_noop() {
        let reporter = ProgressReporter::new(None);
        reporter.report(ProgressStage::Analyzing, 10, "silent");
        assert_eq!(reporter.last(), 10);
    }

    #[test]
    fn test_stage_wire_names() {
        assert_eq!(ProgressStage::Analyzing.as_str(), "analyzing");
        assert_eq!(ProgressStage::Complete.as_str(), "complete");
        let json = serde_json::to_string(&ProgressStage::Downloading).unwrap();
        assert_eq!(json, "\"downloading\"");
    }
}
