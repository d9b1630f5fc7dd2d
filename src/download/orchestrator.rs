//! Turns a link into a local video file: platform, profile, extraction and format fallback

use crate::core::types::{Platform, Tier, UserId};
use crate::download::backend::{BackendError, ExtractionBackend};
use crate::download::platform::resolve_platform;
use crate::download::profile::{OptionsProfile, SizeCeilings};
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Where downloads land and how large they may be.
#[derive(Debug, Clone)]
pub struct DownloadPolicy {
    pub download_dir: PathBuf,
    pub ceilings: SizeCeilings,
}

impl DownloadPolicy {
    pub fn from_config() -> Self {
        use crate::core::config;
        Self {
            download_dir: PathBuf::from(config::DOWNLOAD_DIR.as_str()),
            ceilings: SizeCeilings {
                free_mb: *config::limits::MAX_FILE_SIZE_FREE_MB,
                premium_mb: *config::limits::MAX_FILE_SIZE_PREMIUM_MB,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub path: PathBuf,
    pub platform: Platform,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DownloadFailure {
    #[error("unsupported platform")]
    UnsupportedPlatform,

    #[error("backend failure: {detail}")]
    BackendFailure { detail: String },

    #[error("extraction produced an empty or missing file")]
    EmptyOutput,

    #[error("download timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

pub type DownloadResult = Result<DownloadedFile, DownloadFailure>;

/// Turns a link into a local file: platform → options profile → backend → fallback → verification.
///
/// Holds no lock while the backend runs, so downloads for different users proceed concurrently.
pub struct DownloadOrchestrator {
    backend: Arc<dyn ExtractionBackend>,
    policy: DownloadPolicy,
    seq: AtomicU64,
}

impl DownloadOrchestrator {
    pub fn new(backend: Arc<dyn ExtractionBackend>, policy: DownloadPolicy) -> Self {
        Self {
            backend,
            policy,
            seq: AtomicU64::new(0),
        }
    }

    pub fn download_dir(&self) -> &Path {
        &self.policy.download_dir
    }

    /// `<download_dir>/<id>_<unix millis>_<seq>.mp4`, unique within the process.
    fn output_path(&self, requester: &UserId) -> PathBuf {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let millis = chrono::Utc::now().timestamp_millis();
        self.policy
            .download_dir
            .join(format!("{}_{}_{}.mp4", requester.file_stem(), millis, seq))
    }

    /// Downloads `url` for `requester`. Every backend error, panic included, comes back
    /// as a `DownloadFailure`.
    pub async fn download(&self, url: &str, requester: &UserId, tier: Tier) -> DownloadResult {
        let Some(platform) = resolve_platform(url) else {
            return Err(DownloadFailure::UnsupportedPlatform);
        };

        if let Err(e) = fs_err::tokio::create_dir_all(&self.policy.download_dir).await {
            log::error!("Cannot prepare download directory: {}", e);
            return Err(DownloadFailure::BackendFailure { detail: e.to_string() });
        }

        let profile = OptionsProfile::for_platform(platform, self.policy.ceilings.for_tier(tier));
        let output = self.output_path(requester);
        log::info!(
            "Downloading {} link for user {} ({:?}) via {} -> {}",
            platform.display_name(),
            requester,
            tier,
            self.backend.name(),
            output.display()
        );

        let mut outcome = self.run_backend(url, &profile, &output).await;

        if platform == Platform::TikTok {
            if let Err(e) = &outcome {
                if e.is_format_unavailable() {
                    log::warn!("Requested format unavailable for {}, retrying with generic profile", url);
                    outcome = self.run_backend(url, &OptionsProfile::generic(), &output).await;
                }
            }
        }

        if let Err(e) = outcome {
            log::warn!("Download failed for user {} [{}]: {}", requester, e.kind(), e);
            remove_if_present(&output).await;
            return Err(DownloadFailure::BackendFailure { detail: e.to_string() });
        }

        match fs_err::tokio::metadata(&output).await {
            Ok(meta) if meta.len() > 0 => {
                log::info!(
                    "Downloaded {} ({:.2} MB) for user {}",
                    output.display(),
                    meta.len() as f64 / (1024.0 * 1024.0),
                    requester
                );
                Ok(DownloadedFile { path: output, platform })
            }
            _ => {
                log::warn!("Backend reported success but {} is empty or missing", output.display());
                remove_if_present(&output).await;
                Err(DownloadFailure::EmptyOutput)
            }
        }
    }

    async fn run_backend(&self, url: &str, profile: &OptionsProfile, output: &Path) -> Result<(), BackendError> {
        match AssertUnwindSafe(self.backend.extract(url, profile, output))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                log::error!("Extraction backend panicked: {}", message);
                Err(BackendError::Other(format!("backend panicked: {}", message)))
            }
        }
    }

    /// Best-effort delete of a delivered or abandoned file.
    pub async fn cleanup(&self, path: &Path) {
        match fs_err::tokio::remove_file(path).await {
            Ok(()) => log::debug!("Removed {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Failed to remove {}: {}", path.display(), e),
        }
    }
}

async fn remove_if_present(path: &Path) {
    if let Err(e) = fs_err::tokio::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("Failed to remove leftover {}: {}", path.display(), e);
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
