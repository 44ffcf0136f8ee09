//! Error types module
//!
//! Every failure in Mediaform maps to one named `AppError` kind. The enum is
//! `Clone` because a single transform failure is delivered to every caller
//! waiting on the same cache key.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for resource-protection aborts and bad media
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "INVALID_CROP")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid crop: {0}")]
    InvalidCrop(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Decode failed: {0}")]
    DecodeFailed(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Transform exceeded its {budget_ms} ms budget")]
    Timeout { budget_ms: u64 },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("File too large: {0}")]
    PayloadTooLarge(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(format!("{:#}", err))
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidRequest(format!("JSON parsing error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::InvalidRequest(_) => (
            400,
            "INVALID_REQUEST",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidCrop(_) => (
            400,
            "INVALID_CROP",
            false,
            Some("Keep crop coordinates inside the image bounds"),
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidOperation(_) => (
            400,
            "INVALID_OPERATION",
            false,
            Some("Check transformation parameter values"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the file ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::DecodeFailed(_) => (
            500,
            "DECODE_FAILED",
            false,
            Some("Re-upload the file; the stored bytes cannot be decoded"),
            false,
            LogLevel::Warn,
        ),
        AppError::UnsupportedOperation(_) => (
            500,
            "UNSUPPORTED_OPERATION",
            false,
            Some("Request a transformation supported for this media type"),
            false,
            LogLevel::Warn,
        ),
        AppError::UnsupportedFormat(_) => (
            500,
            "UNSUPPORTED_FORMAT",
            false,
            Some("Use a supported container or codec"),
            false,
            LogLevel::Warn,
        ),
        AppError::Timeout { .. } => (
            504,
            "TRANSFORM_TIMEOUT",
            true,
            Some("Request a smaller output or retry later"),
            false,
            LogLevel::Warn,
        ),
        AppError::Storage(_) => (
            500,
            "STORAGE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::PayloadTooLarge(_) => (
            413,
            "PAYLOAD_TOO_LARGE",
            false,
            Some("Reduce file size"),
            false,
            LogLevel::Debug,
        ),
        AppError::Internal(_) => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::InvalidRequest(_) => "InvalidRequest",
            AppError::InvalidCrop(_) => "InvalidCrop",
            AppError::InvalidOperation(_) => "InvalidOperation",
            AppError::NotFound(_) => "NotFound",
            AppError::DecodeFailed(_) => "DecodeFailed",
            AppError::UnsupportedOperation(_) => "UnsupportedOperation",
            AppError::UnsupportedFormat(_) => "UnsupportedFormat",
            AppError::Timeout { .. } => "Timeout",
            AppError::Storage(_) => "Storage",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::Internal(_) => "Internal",
        }
    }

    /// Whether the failure was raised before any transform work started
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.http_status_code())
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::InvalidRequest(ref msg)
            | AppError::InvalidCrop(ref msg)
            | AppError::InvalidOperation(ref msg)
            | AppError::NotFound(ref msg)
            | AppError::UnsupportedOperation(ref msg)
            | AppError::UnsupportedFormat(ref msg)
            | AppError::PayloadTooLarge(ref msg) => msg.clone(),
            AppError::DecodeFailed(_) => "Source media could not be decoded".to_string(),
            AppError::Timeout { budget_ms } => {
                format!("Transformation exceeded the {} ms time budget", budget_ms)
            }
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }
}
