use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompressError {
    #[error("Failed to parse PDF: {0}")]
    Parse(String),

    #[error("Client-side compression failed: {0}")]
    ClientSide(String),

    #[error("Server error: {0}")]
    ServerSide(String),

    #[error("Could not reach compression server: {0}")]
    Network(String),

    #[error("File too large and server unavailable")]
    FileTooLarge,

    #[error("Failed to serialize PDF: {0}")]
    Save(String),
}
