//! Shared types for the compression pipeline.

use serde::{Deserialize, Serialize};

/// Compression aggressiveness preset.
///
/// Presets tune serialization batching (how many objects are processed
/// between progress ticks), not visual quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    Light,
    Medium,
}

impl CompressionLevel {
    /// Objects processed per serialization tick.
    pub fn objects_per_tick(self) -> usize {
        match self {
            CompressionLevel::Light => 100,
            CompressionLevel::Medium => 200,
        }
    }

    /// Wire form, as sent in the `compressionLevel` form field.
    pub fn as_str(self) -> &'static str {
        match self {
            CompressionLevel::Light => "light",
            CompressionLevel::Medium => "medium",
        }
    }
}

/// Document classification, derived from the image ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PdfType {
    ImageHeavy,
    TextHeavy,
}

impl PdfType {
    /// Wire form, as sent in the `pdfType` form field.
    pub fn as_str(self) -> &'static str {
        match self {
            PdfType::ImageHeavy => "image-heavy",
            PdfType::TextHeavy => "text-heavy",
        }
    }
}

/// Where a compression job actually ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionMethod {
    ClientSide,
    ServerSide,
}

impl ExecutionMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionMethod::ClientSide => "client-side",
            ExecutionMethod::ServerSide => "server-side",
        }
    }
}

/// Raw output of a single executor attempt, before the size guard runs.
///
/// `ratio` may be negative here if the attempt grew the file; the guard
/// replaces such results with the original bytes.
#[derive(Debug, Clone)]
pub struct ExecutorResult {
    pub data: Vec<u8>,
    pub original_size: u64,
    pub compressed_size: u64,
    pub ratio: i64,
}

/// Final result returned to the caller.
#[derive(Debug, Clone)]
pub struct CompressionOutcome {
    pub data: Vec<u8>,
    pub original_size: u64,
    pub compressed_size: u64,
    /// Integer percent saved, always in 0..=100.
    pub ratio: u32,
    /// The method that produced the result, after any fallback.
    pub method: ExecutionMethod,
    pub processing_time_ms: u64,
    pub pdf_type: PdfType,
    pub message: Option<String>,
}

/// Percent saved by `compressed` relative to `original`. Negative when the
/// candidate grew.
pub fn savings_percent(original: u64, compressed: u64) -> f64 {
    if original == 0 {
        return 0.0;
    }
    (original as f64 - compressed as f64) / original as f64 * 100.0
}

/// `savings_percent` rounded to the nearest integer.
pub fn savings_ratio(original: u64, compressed: u64) -> i64 {
    savings_percent(original, compressed).round() as i64
}
