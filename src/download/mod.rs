//! Media engine abstraction and the download pipeline
//!
//! The bot talks to the extraction/download collaborator through the
//! `MediaEngine` trait; production uses the `yt-dlp` subprocess, tests use a
//! mock. The pipeline owns temp-file lifecycle and delivery.

pub mod error;
pub mod pipeline;
pub mod ytdlp;

use std::path::Path;

use async_trait::async_trait;
use url::Url;

use crate::format::RawFormat;
use error::DownloadError;

/// Result of a metadata-only query against the engine.
#[derive(Debug, Clone)]
pub struct Probe {
    pub title: String,
    /// Duration in whole seconds, when the source reports one
    pub duration: Option<u32>,
    pub uploader: String,
    /// Raw format records; empty for sources we never enumerate
    pub formats: Vec<RawFormat>,
}

/// What to fetch: a concrete negotiated format or a fixed best-effort spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatSelector {
    /// Concrete video format id (possibly a composite `video+audio` pair)
    Video { format_id: String },
    /// Fixed best-effort video spec for platforms without format enumeration
    VideoBest,
    /// Concrete audio source transcoded to MP3 at the target bitrate
    Audio { format_id: String, bitrate_kbps: u32 },
    /// Best available audio transcoded to MP3 at the target bitrate
    AudioBest { bitrate_kbps: u32 },
}

impl FormatSelector {
    pub fn is_audio(&self) -> bool {
        matches!(self, FormatSelector::Audio { .. } | FormatSelector::AudioBest { .. })
    }

    /// Container extension of the normalized output
    pub fn output_ext(&self) -> &'static str {
        if self.is_audio() {
            "mp3"
        } else {
            "mp4"
        }
    }

    /// Target MP3 bitrate for audio selections
    pub fn audio_bitrate(&self) -> Option<u32> {
        match self {
            FormatSelector::Audio { bitrate_kbps, .. } | FormatSelector::AudioBest { bitrate_kbps } => {
                Some(*bitrate_kbps)
            }
            _ => None,
        }
    }

    /// The `-f` argument handed to yt-dlp.
    pub fn format_arg(&self) -> String {
        match self {
            FormatSelector::Video { format_id } => format_id.clone(),
            FormatSelector::VideoBest => {
                "bestvideo[height<=1080][ext=mp4]+bestaudio[ext=m4a]/best[height<=1080][ext=mp4]/best".to_string()
            }
            FormatSelector::Audio { format_id, .. } => format_id.clone(),
            FormatSelector::AudioBest { .. } => "bestaudio/best".to_string(),
        }
    }
}

/// The metadata/download collaborator.
///
/// One synchronous call per request; the retry budget lives inside the
/// implementation (yt-dlp's own `--retries`).
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Resolves title, duration, uploader and raw format records without
    /// downloading anything.
    async fn probe(&self, url: &Url) -> Result<Probe, DownloadError>;

    /// Downloads the selected format, normalizing to MP4 (video) or MP3 at
    /// the requested bitrate (audio). The engine writes to `output` (the
    /// expected final path); callers must not assume it is the only file the
    /// engine touches in that directory.
    async fn download(&self, url: &Url, selector: &FormatSelector, output: &Path) -> Result<(), DownloadError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_format_args() {
        assert_eq!(
            FormatSelector::Video { format_id: "137+140".into() }.format_arg(),
            "137+140"
        );
        assert_eq!(FormatSelector::AudioBest { bitrate_kbps: 128 }.format_arg(), "bestaudio/best");
        assert!(FormatSelector::VideoBest.format_arg().starts_with("bestvideo[height<=1080]"));
    }

    #[test]
    fn selector_output_extensions() {
        assert_eq!(FormatSelector::VideoBest.output_ext(), "mp4");
        assert_eq!(
            FormatSelector::Audio { format_id: "a1".into(), bitrate_kbps: 256 }.output_ext(),
            "mp3"
        );
    }

    #[test]
    fn audio_bitrate_only_for_audio_selectors() {
        assert_eq!(
            FormatSelector::Audio { format_id: "a1".into(), bitrate_kbps: 256 }.audio_bitrate(),
            Some(256)
        );
        assert_eq!(FormatSelector::VideoBest.audio_bitrate(), None);
    }
}
