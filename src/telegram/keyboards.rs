//! Inline keyboard builders for the download menus

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use unic_langid::LanguageIdentifier;

use crate::core::platform::Platform;
use crate::format::{AudioFormat, VideoFormat};
use crate::i18n::t;
use crate::telegram::callback::CallbackEvent;

/// Top-level menu shown right after a link is analyzed.
///
/// YouTube links get the full video/audio submenus; other platforms
/// only expose the one-tap best-effort actions.
pub fn top_menu(platform: Platform, lang: &LanguageIdentifier) -> InlineKeyboardMarkup {
    let row = if platform.has_quality_menu() {
        vec![
            InlineKeyboardButton::callback(
                t(lang, "btn-download-video"),
                CallbackEvent::SelectVideoMenu.as_data(),
            ),
            InlineKeyboardButton::callback(
                t(lang, "btn-download-audio"),
                CallbackEvent::SelectAudioMenu.as_data(),
            ),
        ]
    } else {
        vec![
            InlineKeyboardButton::callback(
                t(lang, "btn-video-best"),
                CallbackEvent::QuickVideoBest.as_data(),
            ),
            InlineKeyboardButton::callback(
                t(lang, "btn-audio-best"),
                CallbackEvent::QuickAudioBest.as_data(),
            ),
        ]
    };

    InlineKeyboardMarkup::new(vec![row])
}

/// Video quality submenu, one button per ladder rung plus a back row.
pub fn video_quality_menu(formats: &[VideoFormat], lang: &LanguageIdentifier) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = formats
        .iter()
        .map(|f| {
            vec![InlineKeyboardButton::callback(
                format!("📹 {}", f.label()),
                CallbackEvent::ChooseVideo { format_id: f.format_id.clone() }.as_data(),
            )]
        })
        .collect();
    rows.push(back_row(lang));

    InlineKeyboardMarkup::new(rows)
}

/// MP3 bitrate submenu plus a back row.
pub fn audio_quality_menu(formats: &[AudioFormat], lang: &LanguageIdentifier) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = formats
        .iter()
        .map(|f| {
            vec![InlineKeyboardButton::callback(
                format!("🎵 {}", f.label()),
                CallbackEvent::ChooseAudio {
                    format_id: f.format_id.clone(),
                    bitrate_kbps: f.bitrate_kbps,
                }
                .as_data(),
            )]
        })
        .collect();
    rows.push(back_row(lang));

    InlineKeyboardMarkup::new(rows)
}

fn back_row(lang: &LanguageIdentifier) -> Vec<InlineKeyboardButton> {
    vec![InlineKeyboardButton::callback(
        t(lang, "btn-back"),
        CallbackEvent::Back.as_data(),
    )]
}
