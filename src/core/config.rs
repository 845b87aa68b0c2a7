use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Configuration constants for the bot

/// Cached yt-dlp binary path
/// Read once at startup from YTDL_BIN environment variable or defaults to "yt-dlp"
pub static YTDL_BIN: Lazy<String> = Lazy::new(|| env::var("YTDL_BIN").unwrap_or_else(|_| "yt-dlp".to_string()));

/// Download folder for transient per-request files
/// Read from DOWNLOAD_FOLDER environment variable, defaults to ./downloads
/// Supports tilde (~) expansion for home directory
pub static DOWNLOAD_FOLDER: Lazy<String> = Lazy::new(|| {
    let raw = env::var("DOWNLOAD_FOLDER").unwrap_or_else(|_| "downloads".to_string());
    shellexpand::tilde(&raw).to_string()
});

/// Log file path
/// Read from LOG_FILE_PATH environment variable, defaults to baixabot.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "baixabot.log".to_string()));

/// Log level for both sinks
/// Read from LOG_LEVEL environment variable, defaults to "info"
pub static LOG_LEVEL: Lazy<String> = Lazy::new(|| env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()));

/// Download engine configuration
pub mod download {
    use super::Duration;

    /// Socket timeout passed to yt-dlp (in seconds)
    pub const SOCKET_TIMEOUT_SECS: u64 = 60;

    /// Retry budget passed to yt-dlp
    pub const RETRIES: u32 = 3;

    /// Hard timeout for a yt-dlp metadata probe (in seconds)
    pub const PROBE_TIMEOUT_SECS: u64 = 120;

    /// Hard timeout for a yt-dlp download (in seconds)
    pub const DOWNLOAD_TIMEOUT_SECS: u64 = 900; // 15 minutes

    /// Browser-like User-Agent sent by yt-dlp
    pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

    /// yt-dlp metadata probe timeout duration
    pub fn probe_timeout() -> Duration {
        Duration::from_secs(PROBE_TIMEOUT_SECS)
    }

    /// yt-dlp download timeout duration
    pub fn download_timeout() -> Duration {
        Duration::from_secs(DOWNLOAD_TIMEOUT_SECS)
    }
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for Telegram API requests (in seconds)
    /// Generous to cover large video uploads.
    pub const REQUEST_TIMEOUT_SECS: u64 = 900;

    /// Request timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}

/// Format negotiation configuration
pub mod formats {
    /// Fixed MP3 bitrate ladder offered to the user (kbps)
    pub const AUDIO_BITRATE_LADDER: [u32; 3] = [128, 256, 320];

    /// Bitrate used for the one-tap "extract audio" choice (kbps)
    pub const QUICK_AUDIO_BITRATE: u32 = 128;

    /// Default fps when the source does not report one
    pub const DEFAULT_FPS: u32 = 30;
}
