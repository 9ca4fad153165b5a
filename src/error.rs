//! Error type shared by the scan pipeline.
//!
//! None of these errors reach the end user directly. The pipeline logs them
//! and renders nothing, except `InvalidTimestamp` which only drops one case.

use std::time::Duration;

/// Custom error type for page scans
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("Required field '{0}' not found in page text")]
    MissingField(&'static str),
    #[error("Invalid occurred-at timestamp: '{0}'")]
    InvalidTimestamp(String),
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Copy control not found within {0:?}")]
    CopyControlTimeout(Duration),
    #[error("Copy control failed: {0}")]
    CopyControl(String),
    #[error("Copy control finished without writing to the clipboard")]
    NothingCopied,
    #[error("Rendering failed: {0}")]
    Render(#[from] std::io::Error),
}

/// Convenience alias used across the scan modules
pub type ScanResult<T> = std::result::Result<T, ScanError>;
