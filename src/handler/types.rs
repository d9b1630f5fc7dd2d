//! Transport-neutral events, actions and the delivery seam

use crate::core::types::{ChatTarget, UserId};
use crate::storage::UserMeta;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Who sent an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderMeta {
    pub id: UserId,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl SenderMeta {
    pub fn new(id: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            username: None,
            first_name: None,
            last_name: None,
        }
    }

    pub fn meta(&self) -> UserMeta {
        UserMeta {
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    /// Data attached to a pressed inline button
    Callback(String),
}

/// Operator prompts that expect a free-text reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Ban,
    Premium,
    Broadcast,
}

impl PromptKind {
    pub const ALL: [PromptKind; 3] = [PromptKind::Ban, PromptKind::Premium, PromptKind::Broadcast];

    pub fn prompt_text(self) -> &'static str {
        match self {
            PromptKind::Ban => "Reply to this message with the user ID to ban:",
            PromptKind::Premium => "Reply to this message with the user ID to toggle Premium:",
            PromptKind::Broadcast => "Reply to this message with the broadcast text:",
        }
    }

    /// Recognises a prompt from the text of the message being replied to.
    pub fn from_prompt_text(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.prompt_text() == text.trim())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingEvent {
    pub sender: SenderMeta,
    pub payload: Payload,
    pub reply_to: Option<PromptKind>,
}

impl IncomingEvent {
    pub fn text(sender: SenderMeta, text: impl Into<String>) -> Self {
        Self {
            sender,
            payload: Payload::Text(text.into()),
            reply_to: None,
        }
    }

    pub fn callback(sender: SenderMeta, data: impl Into<String>) -> Self {
        Self {
            sender,
            payload: Payload::Callback(data.into()),
            reply_to: None,
        }
    }

    pub fn reply(sender: SenderMeta, prompt: PromptKind, text: impl Into<String>) -> Self {
        Self {
            sender,
            payload: Payload::Text(text.into()),
            reply_to: Some(prompt),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonTarget {
    Callback(String),
    Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub label: String,
    pub target: ButtonTarget,
}

impl InlineButton {
    pub fn callback(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            target: ButtonTarget::Callback(data.into()),
        }
    }

    pub fn url(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            target: ButtonTarget::Url(url.into()),
        }
    }
}

/// Keyboard attached to a text message, with labels already localized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyboard {
    /// Persistent reply keyboard, rows of button labels
    Reply(Vec<Vec<String>>),
    Inline(Vec<Vec<InlineButton>>),
    /// Ask the client to open a reply to this message
    ForceReply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Video,
    Document,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundAction {
    SendText {
        body: String,
        keyboard: Option<Keyboard>,
    },
    /// The file is temporary and removed once delivery was attempted.
    SendFile {
        path: PathBuf,
        caption: Option<String>,
        kind: FileKind,
    },
    /// Send `body` to every registered user, then report counts to the requester.
    Broadcast { body: String },
}

impl OutboundAction {
    pub fn text(body: impl Into<String>) -> Self {
        OutboundAction::SendText {
            body: body.into(),
            keyboard: None,
        }
    }

    pub fn text_with(body: impl Into<String>, keyboard: Keyboard) -> Self {
        OutboundAction::SendText {
            body: body.into(),
            keyboard: Some(keyboard),
        }
    }
}

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    #[error("invalid chat id: {0}")]
    InvalidChat(String),

    #[error("invalid button url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Outbound half of the chat transport.
#[async_trait]
pub trait Outbox: Send + Sync {
    async fn send_text(&self, chat: &ChatTarget, body: &str, keyboard: Option<&Keyboard>) -> Result<(), DeliveryError>;

    async fn send_file(
        &self,
        chat: &ChatTarget,
        path: &Path,
        caption: Option<&str>,
        kind: FileKind,
    ) -> Result<(), DeliveryError>;
}
