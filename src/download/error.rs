use std::fmt;

/// Structured error type for download-engine operations.
///
/// Categorized variants instead of a single string so the handler layer and
/// logs can tell engine failures apart.
#[derive(Debug)]
pub enum DownloadError {
    /// yt-dlp specific failures (binary not found, bad exit code, bad JSON)
    YtDlp(String),
    /// Download or probe timed out
    Timeout(String),
    /// Expected file not found after the engine reported success
    FileNotFound(String),
    /// Process execution failure (spawn, exit code)
    Process(String),
    /// Catch-all for uncategorized errors
    Other(String),
}

impl fmt::Display for DownloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadError::YtDlp(msg)
            | DownloadError::Timeout(msg)
            | DownloadError::FileNotFound(msg)
            | DownloadError::Process(msg)
            | DownloadError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for DownloadError {}

impl DownloadError {
    /// Returns the subcategory label used in logs
    pub fn subcategory(&self) -> &'static str {
        match self {
            DownloadError::YtDlp(_) => "ytdlp",
            DownloadError::Timeout(_) => "timeout",
            DownloadError::FileNotFound(_) => "file_not_found",
            DownloadError::Process(_) => "process",
            DownloadError::Other(_) => "other",
        }
    }
}

impl From<String> for DownloadError {
    fn from(s: String) -> Self {
        DownloadError::Other(s)
    }
}

impl From<&str> for DownloadError {
    fn from(s: &str) -> Self {
        DownloadError::Other(s.to_string())
    }
}
