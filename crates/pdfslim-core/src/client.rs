//! Client-side executor: local compression with worker isolation.
//!
//! Execution order per call: probe whether worker threads can be spawned,
//! prefer the worker path, and fall back to the calling thread when the
//! worker cannot be created or dies mid-job. Worker *runtime* failures are
//! recovered here; failures the pipeline itself reports propagate to the
//! orchestrator so it can try the server instead.

use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use tracing::{debug, warn};

use crate::analyzer::PdfAnalysis;
use crate::error::CompressError;
use crate::pipeline;
use crate::progress::{ProgressReporter, ProgressStage};
use crate::types::{CompressionLevel, ExecutorResult};
use crate::worker::{self, WorkerOutcome, WorkerReply, WorkerRequest};

/// Local-compute executor.
#[derive(Debug, Clone, Default)]
pub struct ClientExecutor;

/// How a worker attempt went wrong.
enum WorkerFailure {
    /// The worker could not be created or died without a terminal reply;
    /// recovered by running on the calling thread.
    Runtime(String),
    /// The pipeline inside the worker reported a failure; the calling
    /// thread would fail the same way.
    Reported(CompressError),
}

impl ClientExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Compress locally. Blocking; run on a blocking-task thread when
    /// called from async code.
    pub fn compress(
        &self,
        data: &[u8],
        level: CompressionLevel,
        analysis: &PdfAnalysis,
        progress: &ProgressReporter,
    ) -> Result<ExecutorResult, CompressError> {
        if probe_worker_support() {
            match self.compress_in_worker(data, level, analysis, progress) {
                Ok(result) => return Ok(result),
                Err(WorkerFailure::Reported(e)) => return Err(e),
                Err(WorkerFailure::Runtime(msg)) => {
                    warn!("worker execution failed, retrying on the calling thread: {}", msg);
                }
            }
        } else {
            warn!("worker threads unavailable, compressing on the calling thread");
        }

        self.compress_in_place(data, level, analysis, progress)
    }

    fn compress_in_worker(
        &self,
        data: &[u8],
        level: CompressionLevel,
        analysis: &PdfAnalysis,
        progress: &ProgressReporter,
    ) -> Result<ExecutorResult, WorkerFailure> {
        let request = WorkerRequest::Compress {
            file: data.to_vec(),
            level,
            analysis: analysis.clone(),
            file_id: next_file_id(),
        };

        let rx = worker::run_worker(request).map_err(|e| WorkerFailure::Runtime(e.to_string()))?;

        loop {
            match rx.recv() {
                Ok(WorkerReply::Progress { progress: p }) => {
                    progress.report(
                        ProgressStage::Processing,
                        stage_progress(p),
                        "Compressing document...",
                    );
                }
                Ok(WorkerReply::Result { result }) => return Ok(result.into()),
                Ok(WorkerReply::Error { error }) => {
                    return Err(WorkerFailure::Reported(CompressError::ClientSide(error)))
                }
                Err(_) => {
                    return Err(WorkerFailure::Runtime(
                        "worker channel closed before a terminal reply".into(),
                    ))
                }
            }
        }
    }

    fn compress_in_place(
        &self,
        data: &[u8],
        level: CompressionLevel,
        analysis: &PdfAnalysis,
        progress: &ProgressReporter,
    ) -> Result<ExecutorResult, CompressError> {
        let original_size = data.len() as u64;

        let out = pipeline::compress_document(data, level, analysis, |fraction| {
            progress.report(
                ProgressStage::Processing,
                stage_progress((fraction * 100.0).round() as u8),
                "Compressing document...",
            );
        })
        .map_err(|e| CompressError::ClientSide(e.to_string()))?;

        let compressed_size = out.len() as u64;
        Ok(ExecutorResult {
            ratio: crate::types::savings_ratio(original_size, compressed_size),
            data: out,
            original_size,
            compressed_size,
        })
    }
}

impl From<WorkerOutcome> for ExecutorResult {
    fn from(outcome: WorkerOutcome) -> Self {
        Self {
            data: outcome.data,
            original_size: outcome.original_size,
            compressed_size: outcome.compressed_size,
            ratio: outcome.ratio,
        }
    }
}

/// Map pipeline progress (0..=100) into this stage's 40..=90 band.
fn stage_progress(pipeline_progress: u8) -> u8 {
    40 + (pipeline_progress.min(100) as u16 * 50 / 100) as u8
}

/// Cheap per-call check that this process may spawn threads at all.
/// No file bytes are touched here.
fn probe_worker_support() -> bool {
    let probe = thread::Builder::new()
        .name("pdfslim-probe".into())
        .spawn(|| {});
    match probe {
        Ok(handle) => handle.join().is_ok(),
        Err(e) => {
            debug!("worker probe failed: {}", e);
            false
        }
    }
}

fn next_file_id() -> String {
    static FILE_SEQ: AtomicU64 = AtomicU64::new(1);
    format!("file-{}", FILE_SEQ.fetch_add(1, Ordering::Relaxed))
}
