//! Report errors
//!
//! Each downstream variant names the step that failed.

use so_core::Id;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Invalid destination: {0}")]
    InvalidDestination(String),

    #[error("service {0} not found")]
    OrderNotFound(Id),

    #[error("{0} delivery is not configured")]
    NotConfigured(&'static str),

    #[error("Report rendering failed: {0}")]
    Render(String),

    #[error("Report rendering timed out after {0}s")]
    RenderTimeout(u64),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Email delivery failed: {0}")]
    Email(String),

    #[error("Media upload failed: {0}")]
    MediaUpload(String),

    #[error("Media upload returned no media id")]
    MissingMediaId,

    #[error("Message send failed: {0}")]
    MessageSend(String),

    #[error("Store error: {0}")]
    Store(#[from] so_db::StoreError),
}

pub type ReportResult<T> = Result<T, ReportError>;

impl ReportError {
    /// Caused by the request rather than by a downstream system
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidDestination(_))
    }
}
