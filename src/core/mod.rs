//! Core utilities, configuration, and common functionality

pub mod config;
pub mod error;
pub mod logging;
pub mod rate_limiter;
pub mod types;

// Re-exports for convenience
pub use error::{AppError, AppResult};
pub use logging::init_logger;
pub use rate_limiter::DownloadQuota;
pub use types::{ChatTarget, Language, Platform, Tier, UserId};
