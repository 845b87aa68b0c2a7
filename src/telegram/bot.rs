//! Bot initialization and command definitions

use reqwest::ClientBuilder;
use teloxide::prelude::*;
use teloxide::types::BotCommand;
use teloxide::utils::command::BotCommands;

use crate::core::config;
use crate::i18n::{self, t};

/// Bot type used throughout the crate
pub type Bot = teloxide::Bot;

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase", description = "I can:")]
pub enum Command {
    #[command(description = "show the welcome message")]
    Start,
}

/// Creates a Bot instance with a long-upload-friendly HTTP client.
///
/// The token comes from the TELOXIDE_TOKEN environment variable.
///
/// # Returns
/// * `Ok(Bot)` - Successfully created bot instance
/// * `Err(anyhow::Error)` - Failed to build the HTTP client
pub fn create_bot() -> anyhow::Result<Bot> {
    let client = ClientBuilder::new().timeout(config::network::timeout()).build()?;
    Ok(Bot::from_env_with_client(client))
}

/// Registers the command list in the Telegram UI: the default list comes
/// straight from the [`Command`] enum, with localized descriptions layered on
/// top per supported language.
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    bot.set_my_commands(Command::bot_commands()).await?;

    for (code, _) in i18n::SUPPORTED_LANGS {
        let lang = i18n::lang_from_code(code);
        let localized: Vec<BotCommand> = Command::bot_commands()
            .into_iter()
            .map(|cmd| {
                let key = format!("cmd-{}", cmd.command.trim_start_matches('/'));
                BotCommand::new(cmd.command, t(&lang, &key))
            })
            .collect();
        bot.set_my_commands(localized).language_code((*code).to_string()).await?;
    }

    Ok(())
}
