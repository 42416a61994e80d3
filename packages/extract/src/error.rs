//! Typed errors for the extraction library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.

use thiserror::Error;

/// Errors that can occur while calling the extraction API or interpreting
/// its response.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// No API credential was configured.
    #[error("no API key configured; set FIRECRAWL_API_KEY")]
    MissingCredential,

    /// HTTP transport failure (connect, TLS, timeout).
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The API answered with a non-success status.
    #[error("extraction API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The API reported failure in its response body.
    #[error("extraction API reported failure: {message}")]
    Failed { message: String },

    /// The response carried no top-level `data` field.
    #[error("no data received from the API")]
    MissingData,

    /// `data` was neither a record nor a list of records.
    #[error("unexpected data format received: {found}")]
    UnexpectedShape { found: &'static str },

    /// JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ExtractError {
    /// Whether this failure is plausibly a credential problem, used by
    /// callers to attach a "check your API key" hint.
    pub fn is_auth_related(&self) -> bool {
        matches!(
            self,
            ExtractError::MissingCredential | ExtractError::Api { status: 401 | 403, .. }
        )
    }
}

/// Errors that can occur while formatting extraction results for export.
#[derive(Debug, Error)]
pub enum FormatError {
    /// JSON serialization failure.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV writer failure.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// CSV buffer was not valid for export.
    #[error("CSV export error: {0}")]
    CsvIntoInner(String),
}

/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Result type alias for formatting operations.
pub type FormatResult<T> = std::result::Result<T, FormatError>;
