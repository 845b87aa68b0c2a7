use std::sync::Arc;

use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use teloxide::update_listeners::Polling;

use baixabot::core::{config, logging};
use baixabot::download::ytdlp::{self, YtDlpEngine};
use baixabot::session::SessionStore;
use baixabot::telegram::{create_bot, schema, setup_bot_commands, HandlerDeps};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A panicking worker should take the process down loudly, not strand
    // half-finished conversations in a zombie bot.
    std::panic::set_hook(Box::new(|info| {
        log::error!("Panic: {}", info);
        eprintln!("Panic: {}", info);
        std::process::exit(1);
    }));

    dotenvy::dotenv().ok();
    logging::init_logger(&config::LOG_FILE_PATH)?;

    log::info!("Starting baixabot...");
    ytdlp::log_engine_version().await;

    let bot = create_bot()?;
    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to register bot commands: {}", e);
    }

    let deps = HandlerDeps {
        store: Arc::new(SessionStore::new()),
        engine: Arc::new(YtDlpEngine::new()),
    };

    // Old updates reference sessions that no longer exist after a restart.
    let listener = Polling::builder(bot.clone()).drop_pending_updates().build();

    Dispatcher::builder(bot, schema(deps))
        .enable_ctrlc_handler()
        .build()
        .dispatch_with_listener(listener, LoggingErrorHandler::with_custom_text("Update listener error"))
        .await;

    Ok(())
}
