//! dptree handler schema wiring commands, messages and callback queries

use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;

use crate::i18n::{self, t};
use crate::telegram::bot::{Bot, Command};
use crate::telegram::handlers::{handle_callback, handle_message, HandlerDeps};

/// Error type used by the handler tree.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;
pub type HandlerResult = Result<(), HandlerError>;

/// Builds the update handler tree. Handler failures are logged and answered
/// with a generic error instead of bubbling into the dispatcher.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let message_deps = deps.clone();
    let callback_deps = deps;

    let command_branch = teloxide::filter_command::<Command, HandlerResult>().branch(
        dptree::case![Command::Start].endpoint(|bot: Bot, msg: Message| async move {
            let lang = i18n::lang_from_telegram(msg.from.as_ref().and_then(|u| u.language_code.as_deref()));
            bot.send_message(msg.chat.id, t(&lang, "greeting")).await?;
            Ok(())
        }),
    );

    let message_branch = Update::filter_message()
        .branch(command_branch)
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = message_deps.clone();
            async move {
                let chat_id = msg.chat.id;
                let user_id = msg.from.as_ref().map(|u| u.id.0 as i64).unwrap_or(chat_id.0);
                let lang = i18n::lang_from_telegram(msg.from.as_ref().and_then(|u| u.language_code.as_deref()));

                if let Err(e) = handle_message(bot.clone(), msg, deps.clone()).await {
                    log::error!("Message handler failed for user {}: {}", user_id, e);
                    // A session created during the failed flow must not
                    // outlive it.
                    deps.store.delete(user_id);
                    if let Err(send_err) = bot.send_message(chat_id, t(&lang, "error-generic")).await {
                        log::warn!("Failed to report handler error in chat {}: {}", chat_id, send_err);
                    }
                }
                Ok(())
            }
        });

    let callback_branch = Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let deps = callback_deps.clone();
        async move {
            let user_id = q.from.id.0 as i64;
            let lang = i18n::lang_from_telegram(q.from.language_code.as_deref());
            let target = q.message.as_ref().map(|m| (m.chat().id, m.id()));

            if let Err(e) = handle_callback(bot.clone(), q, deps.clone()).await {
                log::error!("Callback handler failed for user {}: {}", user_id, e);
                // Leave no half-finished conversation behind.
                deps.store.delete(user_id);
                if let Some((chat_id, message_id)) = target {
                    if let Err(edit_err) = bot
                        .edit_message_text(chat_id, message_id, t(&lang, "error-generic"))
                        .await
                    {
                        log::warn!("Failed to report handler error in chat {}: {}", chat_id, edit_err);
                    }
                }
            }
            Ok(())
        }
    });

    dptree::entry().branch(message_branch).branch(callback_branch)
}
