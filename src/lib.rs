//! Reelsaver - Telegram bot that re-hosts TikTok and Instagram videos
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging, quota policy and shared identifiers
//! - `storage`: durable user registry, usage statistics and state exports
//! - `download`: platform detection, option profiles and the extraction backend
//! - `handler`: per-event gating, operator panel and delivery of replies
//! - `housekeeping`: stale-file sweep and weekly export
//! - `telegram`: Bot API transport

pub mod cli;
pub mod core;
pub mod download;
pub mod handler;
pub mod housekeeping;
pub mod i18n;
pub mod storage;
pub mod telegram;

// Re-export commonly used types for convenience
pub use crate::core::{config, AppError, AppResult};
pub use crate::download::DownloadOrchestrator;
pub use handler::{HandlerSettings, RequestHandler};
pub use housekeeping::{Housekeeper, HousekeeperSettings};
pub use storage::{Storage, UsageStats, UserStore};
