//! Reconciliation error types

use thiserror::Error;

/// Result type alias for reconciliation operations
pub type Result<T> = std::result::Result<T, ReconcileError>;

/// Errors surfaced by the reconciliation engine
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// An uploaded archive failed its integrity check (1-based slot)
    #[error("File {0} is not a valid ZIP file")]
    InvalidZip(u8),

    /// Neither archive produced a single indexed PDF
    #[error("No PDF files found in either ZIP file")]
    NoPdfsFound,

    /// Filesystem failure during extraction, copying or packaging
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ZIP read/write failure outside of upfront validation
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

impl ReconcileError {
    /// HTTP status code for this error
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::InvalidZip(_) => StatusCode::BAD_REQUEST,
            Self::NoPdfsFound => StatusCode::BAD_REQUEST,
            Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Zip(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
