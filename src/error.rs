//! Error types for the PDF form filler

use thiserror::Error;

/// Result type alias for the PDF form filler
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the PDF form filler
#[derive(Error, Debug)]
pub enum Error {
    /// Request is missing a template selector or form data, or names an unusable template
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    /// Template bytes are not a usable interactive-form PDF
    #[error("Malformed document: {reason}")]
    MalformedDocument { reason: String },

    /// The filled document could not be written out
    #[error("Failed to serialize document: {reason}")]
    Serialization { reason: String },

    /// Template store has no template with this name
    #[error("Template not found: {name}")]
    TemplateNotFound { name: String },

    /// Template fetch failed upstream
    #[error("Template transfer failed: {reason}")]
    Transfer { reason: String },

    /// Cache key not found
    #[error("Cache key not found: {key}")]
    CacheKeyNotFound { key: String },

    /// Base64 decode error
    #[error("Invalid base64 data: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// JSON decode/encode error
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Template path escapes the configured template directory
    #[error("Path access denied: {path}")]
    PathAccessDenied { path: String },

    /// SSRF blocked (URL resolves to private/reserved IP)
    #[error("SSRF blocked: {url}")]
    SsrfBlocked { url: String },

    /// Download too large
    #[error("Download too large: {size} bytes (max: {max_size} bytes)")]
    DownloadTooLarge { size: u64, max_size: u64 },

    /// Blocking fill task could not be joined
    #[error("Worker task failed: {reason}")]
    Worker { reason: String },
}

impl Error {
    /// Return a sanitized error message safe to send to clients.
    /// Internal details (paths, library errors, URLs) are omitted.
    /// Full details should be logged via tracing before calling this.
    pub fn client_message(&self) -> String {
        match self {
            Error::InvalidInput { reason } => reason.clone(),
            Error::MalformedDocument { .. } => "Template is not a valid PDF form".to_string(),
            Error::Serialization { .. } => "Failed to produce filled PDF".to_string(),
            Error::TemplateNotFound { name } => format!("Template not found: {}", name),
            Error::Transfer { .. } => "Failed to fetch template".to_string(),
            Error::CacheKeyNotFound { .. } => "Cache key not found".to_string(),
            Error::Base64Decode(_) => "Invalid base64 data".to_string(),
            Error::Json(_) => "Invalid JSON".to_string(),
            Error::HttpRequest(_) => "Failed to fetch template".to_string(),
            Error::Io(_) => "I/O error".to_string(),
            Error::PathAccessDenied { .. } => "Access denied".to_string(),
            Error::SsrfBlocked { .. } => "URL not allowed".to_string(),
            Error::DownloadTooLarge { max_size, .. } => {
                format!("Template exceeds maximum size of {} bytes", max_size)
            }
            Error::Worker { .. } => "Internal server error".to_string(),
        }
    }

    /// HTTP status code a transport should answer with for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::InvalidInput { .. } | Error::Base64Decode(_) | Error::Json(_) => 400,
            Error::PathAccessDenied { .. } | Error::SsrfBlocked { .. } => 403,
            Error::TemplateNotFound { .. } | Error::CacheKeyNotFound { .. } => 404,
            Error::DownloadTooLarge { .. } => 413,
            Error::Transfer { .. } | Error::HttpRequest(_) => 502,
            Error::MalformedDocument { .. }
            | Error::Serialization { .. }
            | Error::Io(_)
            | Error::Worker { .. } => 500,
        }
    }

    pub(crate) fn invalid_input(reason: impl Into<String>) -> Self {
        Error::InvalidInput {
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Error::MalformedDocument {
            reason: reason.into(),
        }
    }
}
