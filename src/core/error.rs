use thiserror::Error;

use crate::download::error::DownloadError;

/// Centralized error types for the application
///
/// Every failure a handler can hit is converted to this enum so the
/// conversation layer can map each kind to exactly one user-facing message.
/// Internal cause strings are logged, never shown to users.
#[derive(Error, Debug)]
pub enum AppError {
    /// The submitted URL does not belong to a supported platform
    #[error("unsupported platform")]
    UnsupportedPlatform,

    /// Metadata resolution failed (network, timeout, parse)
    #[error("metadata resolution failed: {0}")]
    Metadata(String),

    /// The source exposed no usable video or audio formats
    #[error("no formats available")]
    NoFormats,

    /// A callback arrived for a user with no live session
    #[error("session expired")]
    SessionExpired,

    /// Download engine failure
    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    /// Failed to hand the file to the chat transport
    #[error("delivery error: {0}")]
    Delivery(String),

    /// Callback token did not parse into a known event
    #[error("malformed callback: {0}")]
    MalformedCallback(String),

    /// Telegram API errors
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parsing errors
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// i18n key of the single user-facing message for this error kind.
    ///
    /// Telegram/IO failures have no dedicated message; they surface as the
    /// generic error, like any other unexpected failure mid-transition.
    pub fn user_message_key(&self) -> &'static str {
        match self {
            AppError::UnsupportedPlatform => "error-unsupported-platform",
            AppError::Metadata(_) | AppError::Url(_) => "error-metadata",
            AppError::NoFormats => "error-no-formats",
            AppError::SessionExpired => "error-session-expired",
            AppError::Download(_) => "error-download-failed",
            AppError::Delivery(_) => "error-download-failed",
            AppError::MalformedCallback(_) => "error-generic",
            AppError::Telegram(_) | AppError::Io(_) => "error-generic",
        }
    }
}
