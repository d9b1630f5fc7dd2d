//! Dispatcher handler tree
//!
//! Converts Telegram updates into transport-neutral events and hands them to the
//! request handler. Each update is processed on its own task so a slow download
//! never blocks other users.

use std::sync::Arc;

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::{Message, User};

use crate::handler::{IncomingEvent, Payload, PromptKind, RequestHandler, SenderMeta};

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub fn schema(handler: Arc<RequestHandler>) -> UpdateHandler<HandlerError> {
    dptree::entry()
        .branch(message_handler(Arc::clone(&handler)))
        .branch(callback_handler(handler))
}

fn sender_meta(user: &User) -> SenderMeta {
    let mut sender = SenderMeta::new(user.id.0);
    sender.username = user.username.clone();
    sender.first_name = Some(user.first_name.clone());
    sender.last_name = user.last_name.clone();
    sender
}

/// Builds an event from a private text message. Returns `None` for anything else.
pub fn message_event(msg: &Message) -> Option<IncomingEvent> {
    let user = msg.from.as_ref()?;
    let text = msg.text()?;
    let reply_to = msg
        .reply_to_message()
        .and_then(|replied| replied.text())
        .and_then(PromptKind::from_prompt_text);

    Some(IncomingEvent {
        sender: sender_meta(user),
        payload: Payload::Text(text.to_string()),
        reply_to,
    })
}

fn message_handler(handler: Arc<RequestHandler>) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.chat.is_private())
        .endpoint(move |msg: Message| {
            let handler = Arc::clone(&handler);
            async move {
                let Some(event) = message_event(&msg) else {
                    log::debug!("Ignoring non-text message {} in chat {}", msg.id.0, msg.chat.id);
                    return Ok(());
                };
                tokio::spawn(async move { handler.process(event).await });
                Ok::<_, HandlerError>(())
            }
        })
}

fn callback_handler(handler: Arc<RequestHandler>) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let handler = Arc::clone(&handler);
        async move {
            if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
                log::warn!("Failed to answer callback query {:?}: {}", q.id, e);
            }
            let Some(data) = q.data.clone() else {
                return Ok(());
            };
            let event = IncomingEvent::callback(sender_meta(&q.from), data);
            tokio::spawn(async move { handler.process(event).await });
            Ok::<_, HandlerError>(())
        }
    })
}
