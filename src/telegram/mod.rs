//! Telegram bot integration and handlers

pub mod bot;
pub mod callback;
pub mod delivery;
pub mod handlers;
pub mod keyboards;
pub mod schema;

// Re-exports for convenience
pub use bot::{create_bot, setup_bot_commands, Bot, Command};
pub use callback::CallbackEvent;
pub use handlers::{handle_callback, handle_message, HandlerDeps};
pub use schema::schema;
