use std::path::PathBuf;
use thiserror::Error;

/// Failures the pipeline reports by kind rather than as opaque context chains.
#[derive(Debug, Error)]
pub enum CapScanError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("file not found: {0:?}")]
    NotFound(PathBuf),
    #[error("could not open video: {0:?}")]
    VideoOpen(PathBuf),
}

impl CapScanError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
