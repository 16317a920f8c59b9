use thiserror::Error;
use std::io;

/// Custom result type alias for the application
pub type Result<T> = std::result::Result<T, DocForgeError>;

/// Errors that can occur while collecting sources or generating documentation
#[derive(Debug, Error)]
pub enum DocForgeError {
    /// No readable file was selected for the request
    #[error("No files to analyze")]
    NoFilesFound,

    /// Completion backend failures (transport, auth, quota, non-success status)
    #[error("Backend error: {0}")]
    Backend(String),

    /// I/O errors
    #[error("IO error: {0}")]
    IO(#[from] io::Error),

    /// HTTP request/response errors outside the completion backend
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing/serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// ZIP archive errors
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Directory traversal errors
    #[error("Walkdir error: {0}")]
    Walkdir(#[from] walkdir::Error),

    /// URL parsing errors
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Configuration file could not be parsed
    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Input validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// GitHub API errors
    #[error("GitHub API error: {0}")]
    GitHubApi(String),

    /// `git` subprocess failures
    #[error("Git error: {0}")]
    Git(String),

    /// General message errors
    #[error("{0}")]
    Message(String),
}

impl DocForgeError {
    /// Creates a new error with the specified message
    pub fn new(message: &str) -> Self {
        Self::Message(message.to_string())
    }

    /// Returns true for failures raised by the completion backend
    pub fn is_backend(&self) -> bool {
        matches!(self, Self::Backend(_))
    }

    /// Returns true when the error was caused by the caller's input rather than the service
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::NoFilesFound | Self::Validation(_))
    }
}
