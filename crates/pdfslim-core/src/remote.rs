//! Remote executor: ships a file to the compression endpoint.
//!
//! Wire contract: multipart POST with `file`, `compressionLevel`, and
//! `pdfType` fields; the response body is the compressed bytes, with size
//! metadata in `X-Original-Size` / `X-Compressed-Size` /
//! `X-Compression-Ratio` headers. Absent headers fall back to values
//! computed from actual byte lengths.

use std::sync::OnceLock;

use reqwest::header::HeaderMap;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, info};

use crate::analyzer::PdfAnalysis;
use crate::error::CompressError;
use crate::progress::{ProgressEvent, ProgressReporter, ProgressStage};
use crate::types::{savings_ratio, CompressionLevel, ExecutionMethod, ExecutorResult};

pub const ORIGINAL_SIZE_HEADER: &str = "X-Original-Size";
pub const COMPRESSED_SIZE_HEADER: &str = "X-Compressed-Size";
pub const COMPRESSION_RATIO_HEADER: &str = "X-Compression-Ratio";

/// Process-wide HTTP client, initialized on first use and reused by every
/// call in this process.
fn http_client() -> &'static reqwest::Client {
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT.get_or_init(reqwest::Client::new)
}

/// Health report from the compression endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerHealth {
    pub status: String,
    #[serde(rename = "availableTools", default)]
    pub available_tools: ToolAvailability,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ToolAvailability {
    #[serde(default)]
    pub ghostscript: bool,
    #[serde(default)]
    pub qpdf: bool,
}

impl ServerHealth {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Remote-compute executor.
#[derive(Debug, Clone)]
pub struct ServerExecutor {
    endpoint: String,
}

impl ServerExecutor {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    pub async fn compress(
        &self,
        file_name: &str,
        data: &[u8],
        level: CompressionLevel,
        analysis: &PdfAnalysis,
        progress: &ProgressReporter,
    ) -> Result<ExecutorResult, CompressError> {
        let fallback_original = data.len() as u64;

        progress.report_event(ProgressEvent {
            stage: ProgressStage::Uploading,
            progress: 40,
            message: "Uploading to compression server...".into(),
            method: Some(ExecutionMethod::ServerSide),
            estimated_time: Some("10-30 seconds".into()),
        });

        let part = Part::bytes(data.to_vec())
            .file_name(file_name.to_string())
            .mime_str("application/pdf")
            .map_err(|e| CompressError::Network(e.to_string()))?;
        let form = Form::new()
            .part("file", part)
            .text("compressionLevel", level.as_str())
            .text("pdfType", analysis.pdf_type().as_str());

        debug!(endpoint = %self.endpoint, size = data.len(), "posting compression job");
        let response = http_client()
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| CompressError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error)
                .unwrap_or_else(|| format!("Server error: {}", status.as_u16()));
            return Err(CompressError::ServerSide(message));
        }

        progress.report(
            ProgressStage::Processing,
            70,
            "Server is compressing the document...",
        );

        progress.report(
            ProgressStage::Downloading,
            90,
            "Downloading compressed file...",
        );

        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| CompressError::Network(e.to_string()))?;

        let (original_size, compressed_size, ratio) =
            read_size_metadata(&headers, fallback_original, body.len() as u64);
        info!(original_size, compressed_size, ratio, "server compression done");

        Ok(ExecutorResult {
            data: body.to_vec(),
            original_size,
            compressed_size,
            ratio,
        })
    }

    /// Lightweight advisory probe; never called on the compression path.
    pub async fn check_health(&self) -> Result<ServerHealth, CompressError> {
        let response = http_client()
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| CompressError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CompressError::ServerSide(format!(
                "Server error: {}",
                status.as_u16()
            )));
        }

        response
            .json::<ServerHealth>()
            .await
            .map_err(|e| CompressError::Network(e.to_string()))
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Size metadata from response headers, with computed fallbacks.
fn read_size_metadata(headers: &HeaderMap, fallback_original: u64, body_len: u64) -> (u64, u64, i64) {
    let original = header_number(headers, ORIGINAL_SIZE_HEADER).unwrap_or(fallback_original);
    let compressed = header_number(headers, COMPRESSED_SIZE_HEADER).unwrap_or(body_len);
    let ratio = header_number(headers, COMPRESSION_RATIO_HEADER)
        .map(|r| r as i64)
        .unwrap_or_else(|| savings_ratio(original, compressed));
    (original, compressed, ratio)
}

fn header_number(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
}
