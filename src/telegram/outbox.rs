//! Telegram rendering of outbound actions

use std::path::Path;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{
    ChatId, ForceReply, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, KeyboardButton, KeyboardMarkup,
    ReplyMarkup,
};

use crate::core::types::ChatTarget;
use crate::handler::{ButtonTarget, DeliveryError, FileKind, Keyboard, Outbox};

/// Delivers messages and files through the Bot API.
#[derive(Clone)]
pub struct TelegramOutbox {
    bot: Bot,
}

impl TelegramOutbox {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

pub fn chat_id(chat: &ChatTarget) -> Result<ChatId, DeliveryError> {
    chat.as_str()
        .trim()
        .parse::<i64>()
        .map(ChatId)
        .map_err(|_| DeliveryError::InvalidChat(chat.to_string()))
}

/// Converts a transport-neutral keyboard into Bot API markup.
pub fn render_keyboard(keyboard: &Keyboard) -> Result<ReplyMarkup, DeliveryError> {
    match keyboard {
        Keyboard::Reply(rows) => {
            let rows: Vec<Vec<KeyboardButton>> = rows
                .iter()
                .map(|row| row.iter().map(KeyboardButton::new).collect())
                .collect();
            Ok(ReplyMarkup::Keyboard(KeyboardMarkup::new(rows).resize_keyboard()))
        }
        Keyboard::Inline(rows) => {
            let mut markup_rows = Vec::with_capacity(rows.len());
            for row in rows {
                let mut buttons = Vec::with_capacity(row.len());
                for button in row {
                    let rendered = match &button.target {
                        ButtonTarget::Callback(data) => InlineKeyboardButton::callback(button.label.clone(), data.clone()),
                        ButtonTarget::Url(raw) => {
                            let url = url::Url::parse(raw).map_err(|e| DeliveryError::InvalidUrl {
                                url: raw.clone(),
                                reason: e.to_string(),
                            })?;
                            InlineKeyboardButton::url(button.label.clone(), url)
                        }
                    };
                    buttons.push(rendered);
                }
                markup_rows.push(buttons);
            }
            Ok(ReplyMarkup::InlineKeyboard(InlineKeyboardMarkup::new(markup_rows)))
        }
        Keyboard::ForceReply => Ok(ReplyMarkup::ForceReply(ForceReply::new())),
    }
}

#[async_trait]
impl Outbox for TelegramOutbox {
    async fn send_text(&self, chat: &ChatTarget, body: &str, keyboard: Option<&Keyboard>) -> Result<(), DeliveryError> {
        let chat_id = chat_id(chat)?;
        let request = self.bot.send_message(chat_id, body);
        match keyboard {
            Some(keyboard) => request.reply_markup(render_keyboard(keyboard)?).await?,
            None => request.await?,
        };
        Ok(())
    }

    async fn send_file(
        &self,
        chat: &ChatTarget,
        path: &Path,
        caption: Option<&str>,
        kind: FileKind,
    ) -> Result<(), DeliveryError> {
        let chat_id = chat_id(chat)?;
        let file = InputFile::file(path.to_path_buf());

        match kind {
            FileKind::Video => {
                let mut request = self.bot.send_video(chat_id, file).supports_streaming(true);
                if let Some(caption) = caption {
                    request = request.caption(caption);
                }
                request.await?;
            }
            FileKind::Document => {
                let mut request = self.bot.send_document(chat_id, file);
                if let Some(caption) = caption {
                    request = request.caption(caption);
                }
                request.await?;
            }
        }
        log::debug!("Sent {} to {}", path.display(), chat);
        Ok(())
    }
}
