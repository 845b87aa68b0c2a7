//! Baixabot - Telegram bot for downloading media from YouTube, TikTok and Instagram
//!
//! This library provides the session and format-negotiation engine behind the
//! bot: platform classification, negotiation of raw yt-dlp format records into
//! user-facing quality ladders, per-user session state, and the download /
//! delivery pipeline with guaranteed temp-file cleanup.
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging, platform classification
//! - `format`: format negotiation (raw records -> ranked descriptors)
//! - `session`: ephemeral per-user session store
//! - `download`: media engine (yt-dlp) and the download pipeline
//! - `telegram`: bot integration, callback routing and menus

pub mod core;
pub mod download;
pub mod format;
pub mod i18n;
pub mod session;
pub mod telegram;

// Re-export commonly used types for convenience
pub use crate::core::{config, error::AppError, platform::Platform};
pub use crate::session::{Session, SessionStore};
pub use crate::telegram::{schema, HandlerDeps};
