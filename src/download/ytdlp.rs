//! yt-dlp powered extraction backend

use crate::download::backend::{BackendError, ExtractionBackend};
use crate::download::profile::OptionsProfile;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Runs the yt-dlp binary as a child process.
///
/// The child is not killed when the caller stops waiting: a download abandoned
/// by a timeout keeps writing its file until yt-dlp exits on its own.
pub struct YtDlpBackend {
    bin: String,
}

impl YtDlpBackend {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }
}

impl Default for YtDlpBackend {
    fn default() -> Self {
        Self::new(crate::core::config::YTDL_BIN.as_str())
    }
}

#[async_trait]
impl ExtractionBackend for YtDlpBackend {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn extract(&self, url: &str, profile: &OptionsProfile, output: &Path) -> Result<(), BackendError> {
        let args = profile.to_args(output);
        log::debug!("{} {} {}", self.bin, args.join(" "), url);

        let result = Command::new(&self.bin)
            .args(&args)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        let output = match result {
            Ok(o) => o,
            Err(e) => {
                log::error!("Failed to spawn {}: {}", self.bin, e);
                return Err(BackendError::Spawn(e.to_string()));
            }
        };

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let excerpt: String = stderr.chars().take(500).collect();
        log::warn!("yt-dlp failed for {} ({}): {}", url, output.status, excerpt);

        Err(BackendError::from_stderr(&stderr))
    }
}
