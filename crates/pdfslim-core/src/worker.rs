//! Worker-thread execution protocol.
//!
//! Compression can run in an isolated worker thread so a long serialization
//! pass never stalls the caller. The boundary is message-passing only:
//! a tagged request goes in, a stream of tagged replies comes out. Any
//! channel transport satisfies the contract as long as replies arrive in
//! order and errors are distinguishable from results.

use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analyzer::PdfAnalysis;
use crate::pipeline;
use crate::types::{savings_ratio, CompressionLevel};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkerRequest {
    Compress {
        file: Vec<u8>,
        level: CompressionLevel,
        analysis: PdfAnalysis,
        file_id: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkerReply {
    /// Serialization progress, 0..=100.
    Progress { progress: u8 },
    /// Terminal: compression finished.
    Result { result: WorkerOutcome },
    /// Terminal: the pipeline reported a failure.
    Error { error: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerOutcome {
    pub data: Vec<u8>,
    pub original_size: u64,
    pub compressed_size: u64,
    pub ratio: i64,
}

/// Spawn a compression worker for one request. Replies arrive on the
/// returned channel; the thread exits after sending a terminal reply.
///
/// Errors here are instantiation failures (the spawn itself); pipeline
/// failures come back as [`WorkerReply::Error`].
pub fn run_worker(request: WorkerRequest) -> io::Result<Receiver<WorkerReply>> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("pdfslim-compress".into())
        .spawn(move || worker_main(request, tx))?;
    Ok(rx)
}

fn worker_main(request: WorkerRequest, tx: Sender<WorkerReply>) {
    let WorkerRequest::Compress {
        file,
        level,
        analysis,
        file_id,
    } = request;

    debug!(file_id = %file_id, size = file.len(), "compression worker started");

    let original_size = file.len() as u64;
    let progress_tx = tx.clone();
    let result = pipeline::compress_document(&file, level, &analysis, move |fraction| {
        let progress = (fraction * 100.0).round() as u8;
        // The receiver may be gone if the caller already gave up.
        let _ = progress_tx.send(WorkerReply::Progress { progress });
    });

    let reply = match result {
        Ok(data) => {
            let compressed_size = data.len() as u64;
            WorkerReply::Result {
                result: WorkerOutcome {
                    ratio: savings_ratio(original_size, compressed_size),
                    data,
                    original_size,
                    compressed_size,
                },
            }
        }
        Err(e) => WorkerReply::Error {
            error: e.to_string(),
        },
    };
    let _ = tx.send(reply);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn request_for(file: Vec<u8>) -> WorkerRequest {
        let analysis = PdfAnalysis::analyze(&file);
        WorkerRequest::Compress {
            file,
            level: CompressionLevel::Medium,
            analysis,
            file_id: "file-1".into(),
        }
    }

    #[test]
    fn test_worker_streams_progress_then_result() {
        let rx = run_worker(request_for(fixtures::text_pdf(2))).unwrap();

        let mut saw_progress = false;
        loop {
            match rx.recv().expect("worker hung up without a terminal reply") {
                WorkerReply::Progress { progress } => {
                    assert!(progress <= 100);
                    saw_progress = true;
                }
                WorkerReply::Result { result } => {
                    assert_eq!(result.compressed_size, result.data.len() as u64);
                    assert!(result.original_size > 0);
                    break;
                }
                WorkerReply::Error { error } => panic!("unexpected worker error: {}", error),
            }
        }
        assert!(saw_progress);
    }

    #[test]
    fn test_worker_reports_pipeline_failure() {
        let rx = run_worker(request_for(b"definitely not a pdf".to_vec())).unwrap();

        let terminal = loop {
            match rx.recv().unwrap() {
                WorkerReply::Progress { .. } => continue,
                other => break other,
            }
        };
        assert!(matches!(terminal, WorkerReply::Error { .. }));
    }

    #[test]
    fn test_request_wire_format_is_tagged() {
        let request = request_for(fixtures::text_pdf(1));
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"type\":\"Compress\""));

        let reply = WorkerReply::Progress { progress: 42 };
        let json = serde_json::to_string(&reply).unwrap();
        assert_eq!(json, r#"{"type":"Progress","progress":42}"#);
    }
}
