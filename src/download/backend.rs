//! Extraction backend abstraction.
//!
//! The orchestrator only knows this trait: URL + options bundle in, file at the given
//! path out. `YtDlpBackend` is the production implementation, tests plug in scripted stubs.

use crate::download::profile::OptionsProfile;
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Classified extraction failure. Every variant keeps the raw detail for the logs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// No stream matched the requested format selector
    #[error("requested format is not available: {0}")]
    FormatUnavailable(String),

    /// Private, removed or geo-blocked media
    #[error("video unavailable: {0}")]
    VideoUnavailable(String),

    /// Timeouts, DNS, refused connections
    #[error("network error: {0}")]
    Network(String),

    /// Extractor binary could not be started
    #[error("failed to start extractor: {0}")]
    Spawn(String),

    #[error("extraction failed: {0}")]
    Other(String),
}

impl BackendError {
    /// Classifies extractor stderr output.
    pub fn from_stderr(stderr: &str) -> Self {
        let lower = stderr.to_lowercase();
        let detail = stderr.trim().to_string();

        if lower.contains("requested format is not available") || lower.contains("requested format not available") {
            return BackendError::FormatUnavailable(detail);
        }

        if lower.contains("private video")
            || lower.contains("video unavailable")
            || lower.contains("this video is not available")
            || lower.contains("video is private")
            || lower.contains("has been removed")
            || lower.contains("does not exist")
            || lower.contains("login required")
        {
            return BackendError::VideoUnavailable(detail);
        }

        if lower.contains("timed out")
            || lower.contains("timeout")
            || lower.contains("connection")
            || lower.contains("network")
            || lower.contains("dns")
            || lower.contains("failed to connect")
        {
            return BackendError::Network(detail);
        }

        BackendError::Other(detail)
    }

    pub fn is_format_unavailable(&self) -> bool {
        matches!(self, BackendError::FormatUnavailable(_))
    }

    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            BackendError::FormatUnavailable(_) => "format_unavailable",
            BackendError::VideoUnavailable(_) => "video_unavailable",
            BackendError::Network(_) => "network",
            BackendError::Spawn(_) => "spawn",
            BackendError::Other(_) => "other",
        }
    }
}

/// Something that can fetch a video into a local file.
#[async_trait]
pub trait ExtractionBackend: Send + Sync {
    /// Human-readable name of this backend (e.g., "yt-dlp")
    fn name(&self) -> &str;

    /// Downloads `url` into `output` using `profile`. May take seconds.
    async fn extract(&self, url: &str, profile: &OptionsProfile, output: &Path) -> Result<(), BackendError>;
}
