//! Platform detection for submitted links

use crate::core::types::Platform;
use once_cell::sync::Lazy;
use regex::Regex;

/// Hostname patterns, deliberately permissive: any text mentioning a supported domain qualifies.
static SUPPORTED_URL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(tiktok\.com|instagram\.com)").expect("Failed to compile platform regex"));

/// Whether `text` contains a link to a supported platform.
pub fn is_supported_url(text: &str) -> bool {
    SUPPORTED_URL_REGEX.is_match(text)
}

/// Platform of the first supported hostname found in `url`.
pub fn resolve_platform(url: &str) -> Option<Platform> {
    let found = SUPPORTED_URL_REGEX.find(url)?;
    match found.as_str().to_ascii_lowercase().as_str() {
        "tiktok.com" => Some(Platform::TikTok),
        "instagram.com" => Some(Platform::Instagram),
        _ => None,
    }
}
