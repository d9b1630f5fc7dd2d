//! Telegram transport: bot construction, dispatcher schema and message delivery

pub mod bot;
pub mod outbox;
pub mod schema;

pub use bot::{create_bot, setup_bot_commands};
pub use outbox::TelegramOutbox;
pub use schema::{schema, HandlerError};
pub use teloxide::Bot;
