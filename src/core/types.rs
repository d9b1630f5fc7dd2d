//! Strongly-typed identities and enums shared across layers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque user identity. For Telegram this is the numeric user id rendered as a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Filesystem-safe form used in download file names.
    pub fn file_stem(&self) -> String {
        self.0
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<u64> for UserId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

/// Destination of an outbound message: a user's private chat or a configured channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChatTarget(String);

impl ChatTarget {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&UserId> for ChatTarget {
    fn from(user: &UserId) -> Self {
        Self(user.0.clone())
    }
}

impl fmt::Display for ChatTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Interface language chosen by a user. `None` in a profile means "not chosen yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "hy")]
    Armenian,
    #[serde(rename = "en")]
    English,
    #[serde(rename = "ru")]
    Russian,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Armenian, Language::English, Language::Russian];

    /// Language used for users who have not picked one.
    pub const DEFAULT: Language = Language::Russian;

    pub fn code(self) -> &'static str {
        match self {
            Language::Armenian => "hy",
            Language::English => "en",
            Language::Russian => "ru",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|lang| lang.code().eq_ignore_ascii_case(code.trim()))
    }

    /// Label of this language's button on the language picker keyboard.
    pub fn picker_label(self) -> &'static str {
        match self {
            Language::Armenian => "🇦🇲 Հայերեն",
            Language::English => "🇬🇧 English",
            Language::Russian => "🇷🇺 Русский",
        }
    }

    pub fn from_picker_label(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|lang| lang.picker_label() == text.trim())
    }
}

/// Account class controlling the size ceiling and the download quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Free,
    Premium,
}

impl Tier {
    pub fn from_premium(is_premium: bool) -> Self {
        if is_premium {
            Tier::Premium
        } else {
            Tier::Free
        }
    }
}

/// Supported video source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    TikTok,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Instagram, Platform::TikTok];

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Instagram => "instagram",
            Platform::TikTok => "tiktok",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Platform::Instagram => "Instagram",
            Platform::TikTok => "TikTok",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
