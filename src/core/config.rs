use once_cell::sync::Lazy;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Reads an environment variable and parses it, falling back to `default` when the
/// variable is missing, blank, or unparsable.
fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}

/// Reads an environment variable, treating blank values as unset.
fn env_non_empty(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Bot token
/// Read from BOT_TOKEN, TOKEN or TELOXIDE_TOKEN environment variable
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    env_non_empty("BOT_TOKEN")
        .or_else(|| env_non_empty("TOKEN"))
        .or_else(|| env_non_empty("TELOXIDE_TOKEN"))
        .unwrap_or_default()
});

/// Cached yt-dlp binary path
/// Read once at startup from YTDL_BIN environment variable or defaults to "yt-dlp"
pub static YTDL_BIN: Lazy<String> = Lazy::new(|| env_non_empty("YTDL_BIN").unwrap_or_else(|| "yt-dlp".to_string()));

/// Directory that receives downloaded videos before they are re-hosted.
/// Read from DOWNLOAD_DIR, default: downloads
pub static DOWNLOAD_DIR: Lazy<String> =
    Lazy::new(|| env_non_empty("DOWNLOAD_DIR").unwrap_or_else(|| "downloads".to_string()));

/// Directory for log files
/// Read from LOG_DIR, default: logs
pub static LOG_DIR: Lazy<String> = Lazy::new(|| env_non_empty("LOG_DIR").unwrap_or_else(|| "logs".to_string()));

/// Operator (admin) configuration
pub mod admin {
    use super::{env_non_empty, Lazy};

    /// Operator user id, compared against the sender of every admin request.
    /// Read from ADMIN_ID. Unset means nobody can open the admin panel.
    pub static ADMIN_ID: Lazy<Option<String>> = Lazy::new(|| env_non_empty("ADMIN_ID"));

    /// Operator username used in the "contact admin" button
    /// Read from ADMIN_USERNAME
    pub static ADMIN_USERNAME: Lazy<String> = Lazy::new(|| env_non_empty("ADMIN_USERNAME").unwrap_or_default());

    /// Off-site archive chat that also receives weekly exports
    /// Read from BACKUP_CHAT_ID
    pub static BACKUP_CHAT_ID: Lazy<Option<String>> = Lazy::new(|| env_non_empty("BACKUP_CHAT_ID"));
}

/// Durable state documents
pub mod storage {
    use super::{env_non_empty, Lazy};

    /// User profiles, ban and premium sets
    /// Read from USER_DATA_FILE, default: data/user_data.json
    pub static USER_DATA_FILE: Lazy<String> =
        Lazy::new(|| env_non_empty("USER_DATA_FILE").unwrap_or_else(|| "data/user_data.json".to_string()));

    /// Usage statistics
    /// Read from STATS_FILE, default: data/stats.json
    pub static STATS_FILE: Lazy<String> =
        Lazy::new(|| env_non_empty("STATS_FILE").unwrap_or_else(|| "data/stats.json".to_string()));

    /// Where full-state exports are written before delivery
    /// Read from EXPORT_DIR, default: current directory
    pub static EXPORT_DIR: Lazy<String> = Lazy::new(|| env_non_empty("EXPORT_DIR").unwrap_or_else(|| ".".to_string()));
}

/// Tier limits
pub mod limits {
    use super::{env_parse, Lazy};

    /// Size ceiling for free users (MB)
    pub static MAX_FILE_SIZE_FREE_MB: Lazy<u64> = Lazy::new(|| env_parse("MAX_FILE_SIZE_FREE", 15));

    /// Size ceiling for premium users (MB)
    pub static MAX_FILE_SIZE_PREMIUM_MB: Lazy<u64> = Lazy::new(|| env_parse("MAX_FILE_SIZE_PREMIUM", 100));

    /// Successful downloads a free user gets before being turned away.
    /// Counted over the whole lifetime of the account, see `DownloadQuota`.
    pub static FREE_USER_DOWNLOAD_LIMIT: Lazy<u64> = Lazy::new(|| env_parse("FREE_USER_DOWNLOAD_LIMIT", 5));

    /// Monthly premium price in USD, shown in the premium info text
    pub static PREMIUM_PRICE: Lazy<u32> = Lazy::new(|| env_parse("PREMIUM_PRICE", 5));
}

/// Download configuration
pub mod download {
    use super::{env_parse, Duration, Lazy};

    /// How long a request waits for the extraction backend before giving up
    pub static TIMEOUT_SECS: Lazy<u64> = Lazy::new(|| env_parse("DOWNLOAD_TIMEOUT_SECS", 300));

    pub fn timeout() -> Duration {
        Duration::from_secs(*TIMEOUT_SECS)
    }
}

/// Housekeeping configuration
pub mod housekeeping {
    use super::{env_parse, Duration, Lazy};

    /// Age after which a downloaded file is reclaimed
    pub static FILE_RETENTION_SECS: Lazy<u64> = Lazy::new(|| env_parse("FILE_RETENTION_SECS", 3600));

    /// Interval between housekeeping ticks
    pub static INTERVAL_SECS: Lazy<u64> = Lazy::new(|| env_parse("HOUSEKEEPING_INTERVAL_SECS", 3600));

    /// Back-off after a failed tick
    pub const FAILURE_BACKOFF_SECS: u64 = 60;

    pub fn retention() -> Duration {
        Duration::from_secs(*FILE_RETENTION_SECS)
    }

    pub fn interval() -> Duration {
        Duration::from_secs(*INTERVAL_SECS)
    }

    pub fn failure_backoff() -> Duration {
        Duration::from_secs(FAILURE_BACKOFF_SECS)
    }
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for Bot API calls (in seconds)
    /// Large enough for 100 MB video uploads
    pub const REQUEST_TIMEOUT_SECS: u64 = 600;

    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }

    /// Delay between broadcast messages to stay under Telegram flood limits
    pub const BROADCAST_DELAY_MS: u64 = 50;

    pub fn broadcast_delay() -> Duration {
        Duration::from_millis(BROADCAST_DELAY_MS)
    }
}

/// Bot API server configuration
pub mod bot_api {
    /// Returns the BOT_API_URL environment variable if set.
    pub fn get_url() -> Option<String> {
        super::env_non_empty("BOT_API_URL")
    }
}
