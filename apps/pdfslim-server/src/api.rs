//! API handlers for the pdfslim server
//!
//! One endpoint, two verbs:
//! - `POST /api/compress` - multipart compression job
//! - `GET /api/compress` - health and tool availability probe

use std::process::{Command, Stdio};

use axum::extract::{Multipart, State};
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{debug, info};

use pdfslim_core::{
    pipeline, savings_percent, savings_ratio, CompressionLevel, PdfAnalysis, PdfType,
    MIN_SAVINGS_PERCENT,
};

use crate::error::ServerError;
use crate::AppState;

/// External tools found on `PATH` at startup. Advisory only: this server
/// compresses with its built-in pipeline and never shells out.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AvailableTools {
    pub ghostscript: bool,
    pub qpdf: bool,
}

/// Probe `PATH` for the tools clients may ask about.
pub fn detect_tools() -> AvailableTools {
    AvailableTools {
        ghostscript: tool_on_path("gs"),
        qpdf: tool_on_path("qpdf"),
    }
}

fn tool_on_path(name: &str) -> bool {
    Command::new(name)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    #[serde(rename = "availableTools")]
    pub available_tools: AvailableTools,
}

/// Handler: GET /api/compress
pub async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "pdfslim-server",
        version: env!("CARGO_PKG_VERSION"),
        available_tools: state.tools,
    })
}

/// Handler: POST /api/compress
///
/// Multipart fields: `file` (required), `compressionLevel`, `pdfType`.
/// Responds with the compressed bytes and size metadata in
/// `X-Original-Size` / `X-Compressed-Size` / `X-Compression-Ratio`.
pub async fn handle_compress(mut multipart: Multipart) -> Result<Response, ServerError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut level = CompressionLevel::Medium;
    let mut declared_type: Option<PdfType> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::InvalidRequest(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload.pdf").to_string();
                let bytes = field.bytes().await.map_err(|e| {
                    ServerError::InvalidRequest(format!("Failed to read file field: {}", e))
                })?;
                file = Some((file_name, bytes.to_vec()));
            }
            "compressionLevel" => {
                let text = field.text().await.map_err(|e| {
                    ServerError::InvalidRequest(format!("Failed to read compressionLevel: {}", e))
                })?;
                level = parse_level(&text)?;
            }
            "pdfType" => {
                let text = field.text().await.map_err(|e| {
                    ServerError::InvalidRequest(format!("Failed to read pdfType: {}", e))
                })?;
                declared_type = Some(parse_pdf_type(&text)?);
            }
            _ => {}
        }
    }

    let (file_name, data) =
        file.ok_or_else(|| ServerError::InvalidRequest("Missing 'file' field".to_string()))?;
    if data.is_empty() {
        return Err(ServerError::InvalidRequest(
            "Uploaded file is empty".to_string(),
        ));
    }

    info!(
        file = %file_name,
        size = data.len(),
        level = level.as_str(),
        "compression request"
    );

    // Trust the client's classification when it sent one; otherwise
    // analyze the upload here.
    let analysis = match declared_type {
        Some(pdf_type) => PdfAnalysis::assumed(pdf_type, data.len() as u64),
        None => PdfAnalysis::analyze(&data),
    };

    let (data, result) = tokio::task::spawn_blocking(move || {
        let result = pipeline::compress_document(&data, level, &analysis, |_| {});
        (data, result)
    })
    .await
    .map_err(|e| ServerError::Internal(format!("Compression task aborted: {}", e)))?;

    let compressed = result.map_err(|e| ServerError::CompressionFailed(e.to_string()))?;

    // Same guard as the client side: never respond with a result that is
    // not meaningfully smaller than the upload.
    let original_size = data.len() as u64;
    let candidate_size = compressed.len() as u64;
    let (body, compressed_size, ratio) =
        if savings_percent(original_size, candidate_size) < MIN_SAVINGS_PERCENT {
            debug!(file = %file_name, "negligible saving, returning original bytes");
            (data, original_size, 0u32)
        } else {
            let ratio = savings_ratio(original_size, candidate_size).max(0) as u32;
            (compressed, candidate_size, ratio)
        };

    info!(
        file = %file_name,
        original_size,
        compressed_size,
        ratio,
        "compression response"
    );

    let mut response = (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/pdf")],
        body,
    )
        .into_response();
    let headers = response.headers_mut();
    headers.insert(
        HeaderName::from_static("x-original-size"),
        HeaderValue::from(original_size),
    );
    headers.insert(
        HeaderName::from_static("x-compressed-size"),
        HeaderValue::from(compressed_size),
    );
    headers.insert(
        HeaderName::from_static("x-compression-ratio"),
        HeaderValue::from(ratio),
    );
    Ok(response)
}

/// Parse the `compressionLevel` form field.
pub(crate) fn parse_level(value: &str) -> Result<CompressionLevel, ServerError> {
    match value.to_lowercase().as_str() {
        "light" => Ok(CompressionLevel::Light),
        "medium" => Ok(CompressionLevel::Medium),
        other => Err(ServerError::InvalidRequest(format!(
            "Unknown compression level '{}'. Supported: light, medium",
            other
        ))),
    }
}

/// Parse the `pdfType` form field.
pub(crate) fn parse_pdf_type(value: &str) -> Result<PdfType, ServerError> {
    match value.to_lowercase().as_str() {
        "image-heavy" => Ok(PdfType::ImageHeavy),
        "text-heavy" => Ok(PdfType::TextHeavy),
        other => Err(ServerError::InvalidRequest(format!(
            "Unknown pdfType '{}'. Supported: image-heavy, text-heavy",
            other
        ))),
    }
}
