//! Typed callback-query payloads for the inline menus

use crate::core::error::AppError;

/// Parsed form of the `data` field carried by menu button presses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackEvent {
    /// Return to the top-level menu.
    Back,
    /// Open the video quality submenu.
    SelectVideoMenu,
    /// Open the audio quality submenu.
    SelectAudioMenu,
    /// One-tap best-effort video download (capped at 1080p).
    QuickVideoBest,
    /// One-tap best-effort MP3 extraction.
    QuickAudioBest,
    /// A specific rung of the video quality ladder.
    ChooseVideo { format_id: String },
    /// A specific rung of the MP3 bitrate ladder.
    ChooseAudio { format_id: String, bitrate_kbps: u32 },
}

impl CallbackEvent {
    /// Serializes the event into callback data (inverse of [`parse`](Self::parse)).
    pub fn as_data(&self) -> String {
        match self {
            Self::Back => "back".to_string(),
            Self::SelectVideoMenu => "select_video".to_string(),
            Self::SelectAudioMenu => "select_audio".to_string(),
            Self::QuickVideoBest => "video_best".to_string(),
            Self::QuickAudioBest => "audio_best".to_string(),
            Self::ChooseVideo { format_id } => format!("video:{format_id}"),
            Self::ChooseAudio { format_id, bitrate_kbps } => {
                format!("audio:{format_id}:{bitrate_kbps}")
            }
        }
    }

    /// Parses callback data back into an event.
    pub fn parse(data: &str) -> Result<Self, AppError> {
        match data {
            "back" => return Ok(Self::Back),
            "select_video" => return Ok(Self::SelectVideoMenu),
            "select_audio" => return Ok(Self::SelectAudioMenu),
            "video_best" => return Ok(Self::QuickVideoBest),
            "audio_best" => return Ok(Self::QuickAudioBest),
            _ => {}
        }

        if let Some(rest) = data.strip_prefix("video:") {
            if rest.is_empty() {
                return Err(AppError::MalformedCallback(data.to_string()));
            }
            return Ok(Self::ChooseVideo { format_id: rest.to_string() });
        }

        if let Some(rest) = data.strip_prefix("audio:") {
            // Bitrate is the last segment; format ids never contain ':'.
            let (format_id, bitrate) = rest
                .rsplit_once(':')
                .ok_or_else(|| AppError::MalformedCallback(data.to_string()))?;
            if format_id.is_empty() {
                return Err(AppError::MalformedCallback(data.to_string()));
            }
            let bitrate_kbps: u32 = bitrate
                .parse()
                .map_err(|_| AppError::MalformedCallback(data.to_string()))?;
            return Ok(Self::ChooseAudio {
                format_id: format_id.to_string(),
                bitrate_kbps,
            });
        }

        Err(AppError::MalformedCallback(data.to_string()))
    }
}
