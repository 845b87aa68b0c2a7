//! Telegram-side delivery of finished downloads

use std::path::Path;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{InputFile, MessageId};
use unic_langid::LanguageIdentifier;

use crate::core::error::AppError;
use crate::download::pipeline::Delivery;
use crate::i18n::t;
use crate::telegram::bot::Bot;

/// Sends downloaded files into the originating chat, updating the status
/// message to "sending" right before the upload starts.
pub struct TelegramDelivery {
    bot: Bot,
    chat_id: ChatId,
    /// Status message being edited through the conversation
    status_id: MessageId,
    lang: LanguageIdentifier,
}

impl TelegramDelivery {
    pub fn new(bot: Bot, chat_id: ChatId, status_id: MessageId, lang: LanguageIdentifier) -> Self {
        Self { bot, chat_id, status_id, lang }
    }

    async fn set_status(&self, key: &str) {
        // Best effort; a failed status edit must not abort the upload.
        if let Err(e) = self
            .bot
            .edit_message_text(self.chat_id, self.status_id, t(&self.lang, key))
            .await
        {
            log::warn!("Failed to edit status message in chat {}: {}", self.chat_id, e);
        }
    }
}

#[async_trait]
impl Delivery for TelegramDelivery {
    async fn deliver_video(&self, path: &Path, caption: &str) -> Result<(), AppError> {
        self.set_status("sending-video").await;

        self.bot
            .send_video(self.chat_id, InputFile::file(path))
            .caption(caption.to_string())
            .await
            .map_err(|e| AppError::Delivery(e.to_string()))?;

        Ok(())
    }

    async fn deliver_audio(&self, path: &Path, title: &str, performer: &str, caption: &str) -> Result<(), AppError> {
        self.set_status("sending-audio").await;

        self.bot
            .send_audio(self.chat_id, InputFile::file(path))
            .title(title.to_string())
            .performer(performer.to_string())
            .caption(caption.to_string())
            .await
            .map_err(|e| AppError::Delivery(e.to_string()))?;

        Ok(())
    }
}
