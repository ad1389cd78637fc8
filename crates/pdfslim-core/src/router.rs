//! Compression router - coordinates executors with intelligent fallback
//!
//! ## Flow
//!
//! 1. Analyze the document (never fails; degrades to a size heuristic)
//! 2. Pick the execution target from the file size alone
//! 3. Run the chosen executor, falling back to the other on failure
//! 4. Apply the size guard: never return a result that is not
//!    meaningfully smaller than the input

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::analyzer::PdfAnalysis;
use crate::client::ClientExecutor;
use crate::error::CompressError;
use crate::progress::{ProgressEvent, ProgressFn, ProgressReporter, ProgressStage};
use crate::remote::ServerExecutor;
use crate::types::{
    savings_percent, CompressionLevel, CompressionOutcome, ExecutionMethod, ExecutorResult, PdfType,
};

/// Files below this run locally; larger ones go to the server.
pub const CLIENT_SIDE_LIMIT_BYTES: u64 = 20 * 1024 * 1024;

/// Absolute ceiling for salvaging a server failure locally. Above this,
/// local compression risks freezing the host process.
pub const CLIENT_FALLBACK_CEILING_BYTES: u64 = 100 * 1024 * 1024;

/// Candidate results saving less than this are discarded in favor of the
/// original bytes.
pub const MIN_SAVINGS_PERCENT: f64 = 1.0;

/// Pick the execution target for a file of the given size.
pub fn select_method(file_size: u64) -> ExecutionMethod {
    if file_size < CLIENT_SIDE_LIMIT_BYTES {
        ExecutionMethod::ClientSide
    } else {
        ExecutionMethod::ServerSide
    }
}

/// Whether a server failure may be salvaged locally for this file size.
pub fn fits_client_fallback(file_size: u64) -> bool {
    file_size < CLIENT_FALLBACK_CEILING_BYTES
}

/// Configuration for the hybrid compressor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressorConfig {
    /// Compression endpoint consumed by the server executor.
    pub server_url: String,
}

impl Default for CompressorConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:3000/api/compress".to_string(),
        }
    }
}

/// Main compression entry point.
pub struct HybridCompressor {
    client: ClientExecutor,
    server: ServerExecutor,
}

impl HybridCompressor {
    pub fn new(config: CompressorConfig) -> Self {
        Self {
            client: ClientExecutor::new(),
            server: ServerExecutor::new(config.server_url),
        }
    }

    /// Access to the advisory server health probe.
    pub fn server(&self) -> &ServerExecutor {
        &self.server
    }

    /// Compress one file. Returns the final result or an error once every
    /// admissible execution strategy is exhausted.
    pub async fn compress(
        &self,
        file_name: &str,
        data: &[u8],
        level: CompressionLevel,
        on_progress: Option<Arc<ProgressFn>>,
    ) -> Result<CompressionOutcome, CompressError> {
        let started = Instant::now();
        let progress = ProgressReporter::new(on_progress);
        let file_size = data.len() as u64;

        progress.report(ProgressStage::Analyzing, 10, "Analyzing PDF structure...");
        let analysis = PdfAnalysis::analyze(data);
        progress.report(
            ProgressStage::Analyzing,
            30,
            format!(
                "{} detected ({} pages, {:.1} MB)",
                match analysis.pdf_type() {
                    PdfType::ImageHeavy => "Image-heavy PDF",
                    PdfType::TextHeavy => "Text-heavy PDF",
                },
                analysis.page_count,
                analysis.size_mb
            ),
        );

        let primary = select_method(file_size);
        info!(
            file = file_name,
            method = primary.as_str(),
            pages = analysis.page_count,
            "compression routed"
        );

        let (candidate, method) = self
            .execute_with_fallback(primary, file_name, data, level, &analysis, &progress)
            .await?;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let outcome = apply_size_guard(data, candidate, method, &analysis, elapsed_ms);

        progress.report_event(ProgressEvent {
            stage: ProgressStage::Complete,
            progress: 100,
            message: format!("Compression complete - {}% saved", outcome.ratio),
            method: Some(method),
            estimated_time: None,
        });

        Ok(outcome)
    }

    /// Run the primary executor, then the other one if the primary fails.
    /// The fallback order is data, not control flow, so it stays testable.
    async fn execute_with_fallback(
        &self,
        primary: ExecutionMethod,
        file_name: &str,
        data: &[u8],
        level: CompressionLevel,
        analysis: &PdfAnalysis,
        progress: &ProgressReporter,
    ) -> Result<(ExecutorResult, ExecutionMethod), CompressError> {
        let plan = execution_plan(primary);
        let file_size = data.len() as u64;
        let mut last_error: Option<CompressError> = None;

        for (attempt, method) in plan.into_iter().enumerate() {
            if attempt > 0 {
                // Salvaging a server failure locally is only safe below the
                // absolute size ceiling; client failures go to the server
                // at any size.
                if method == ExecutionMethod::ClientSide && !fits_client_fallback(file_size) {
                    warn!(
                        file = file_name,
                        size = file_size,
                        "server failed and file exceeds the local salvage ceiling"
                    );
                    return Err(CompressError::FileTooLarge);
                }
                warn!(file = file_name, fallback = method.as_str(), "switching executor");
            }

            match self
                .execute(method, file_name, data, level, analysis, progress)
                .await
            {
                Ok(result) => return Ok((result, method)),
                Err(e) => {
                    warn!(
                        file = file_name,
                        method = method.as_str(),
                        "compression attempt failed: {}",
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| CompressError::ClientSide("no execution strategy available".into())))
    }

    async fn execute(
        &self,
        method: ExecutionMethod,
        file_name: &str,
        data: &[u8],
        level: CompressionLevel,
        analysis: &PdfAnalysis,
        progress: &ProgressReporter,
    ) -> Result<ExecutorResult, CompressError> {
        match method {
            ExecutionMethod::ClientSide => {
                progress.report(
                    ProgressStage::Processing,
                    40,
                    "Compressing in this process...",
                );
                let client = self.client.clone();
                let data = data.to_vec();
                let analysis = analysis.clone();
                let progress = progress.clone();
                tokio::task::spawn_blocking(move || {
                    client.compress(&data, level, &analysis, &progress)
                })
                .await
                .map_err(|e| CompressError::ClientSide(format!("compression task aborted: {}", e)))?
            }
            ExecutionMethod::ServerSide => {
                self.server
                    .compress(file_name, data, level, analysis, progress)
                    .await
            }
        }
    }
}

/// Primary-then-fallback order for a placement decision.
fn execution_plan(primary: ExecutionMethod) -> [ExecutionMethod; 2] {
    match primary {
        ExecutionMethod::ClientSide => [ExecutionMethod::ClientSide, ExecutionMethod::ServerSide],
        ExecutionMethod::ServerSide => [ExecutionMethod::ServerSide, ExecutionMethod::ClientSide],
    }
}

/// Discard candidates that saved less than [`MIN_SAVINGS_PERCENT`] and
/// return the original bytes instead. Guarantees the returned
/// `compressed_size` never exceeds `original_size`.
fn apply_size_guard(
    original: &[u8],
    candidate: ExecutorResult,
    method: ExecutionMethod,
    analysis: &PdfAnalysis,
    elapsed_ms: u64,
) -> CompressionOutcome {
    let savings = savings_percent(candidate.original_size, candidate.compressed_size);

    if savings < MIN_SAVINGS_PERCENT {
        info!(
            "candidate saved {:.2}%, returning the original file unchanged",
            savings
        );
        let size = original.len() as u64;
        return CompressionOutcome {
            data: original.to_vec(),
            original_size: size,
            compressed_size: size,
            ratio: 0,
            method,
            processing_time_ms: elapsed_ms,
            pdf_type: analysis.pdf_type(),
            message: Some(
                "File is already optimized - returning the original to avoid a larger output."
                    .to_string(),
            ),
        };
    }

    CompressionOutcome {
        data: candidate.data,
        original_size: candidate.original_size,
        compressed_size: candidate.compressed_size,
        ratio: candidate.ratio.max(0) as u32,
        method,
        processing_time_ms: elapsed_ms,
        pdf_type: analysis.pdf_type(),
        message: None,
    }
}
