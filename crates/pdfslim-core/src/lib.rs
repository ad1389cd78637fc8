//! Hybrid PDF compression
//!
//! This crate decides where a PDF compression job should run and sees it
//! through: it classifies the document as image- or text-dominant, routes
//! it to local or remote execution by size, recovers from failures by
//! switching executors, and never returns an output larger than the input.
//!
//! The usual entry point is [`HybridCompressor::compress`]:
//!
//! ```no_run
//! use pdfslim_core::{CompressionLevel, CompressorConfig, HybridCompressor};
//!
//! # async fn run(bytes: Vec<u8>) -> Result<(), pdfslim_core::CompressError> {
//! let compressor = HybridCompressor::new(CompressorConfig::default());
//! let outcome = compressor
//!     .compress("report.pdf", &bytes, CompressionLevel::Medium, None)
//!     .await?;
//! assert!(outcome.compressed_size <= outcome.original_size);
//! # Ok(())
//! # }
//! ```

pub mod analyzer;
pub mod client;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod remote;
pub mod router;
pub mod types;
pub mod worker;

#[cfg(test)]
pub(crate) mod fixtures;

pub use analyzer::PdfAnalysis;
pub use client::ClientExecutor;
pub use error::CompressError;
pub use progress::{ProgressEvent, ProgressFn, ProgressReporter, ProgressStage};
pub use remote::{ServerExecutor, ServerHealth, ToolAvailability};
pub use router::{
    fits_client_fallback, select_method, CompressorConfig, HybridCompressor,
    CLIENT_FALLBACK_CEILING_BYTES, CLIENT_SIDE_LIMIT_BYTES, MIN_SAVINGS_PERCENT,
};
pub use types::{
    savings_percent, savings_ratio, CompressionLevel, CompressionOutcome, ExecutionMethod, PdfType,
};
