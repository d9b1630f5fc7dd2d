//! Periodic maintenance: stale download sweep and the weekly state export
//!
//! Runs as one background task. A failed or panicking tick is logged and retried after a
//! short back-off; the loop itself only stops on cancellation.

use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Datelike, Local, NaiveDate, Timelike, Weekday};
use futures_util::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::core::config;
use crate::core::error::AppResult;
use crate::core::types::ChatTarget;
use crate::download::orchestrator::panic_message;
use crate::handler::{FileKind, Outbox};
use crate::storage::SnapshotExporter;

#[derive(Debug, Clone)]
pub struct HousekeeperSettings {
    pub download_dir: PathBuf,
    /// Files older than this are removed by the sweep
    pub retention: Duration,
    pub interval: Duration,
    pub failure_backoff: Duration,
    pub export_weekday: Weekday,
    /// Local hour in which the weekly export runs
    pub export_hour: u32,
}

impl HousekeeperSettings {
    pub fn from_config() -> Self {
        Self {
            download_dir: PathBuf::from(config::DOWNLOAD_DIR.as_str()),
            retention: config::housekeeping::retention(),
            interval: config::housekeeping::interval(),
            failure_backoff: config::housekeeping::failure_backoff(),
            export_weekday: Weekday::Mon,
            export_hour: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepReport {
    pub removed: usize,
    pub failed: usize,
}

pub struct Housekeeper {
    settings: HousekeeperSettings,
    exporter: SnapshotExporter,
    delivery: Arc<dyn Outbox>,
    recipients: Vec<ChatTarget>,
    last_export: Mutex<Option<NaiveDate>>,
    clock: fn() -> DateTime<Local>,
}

impl Housekeeper {
    /// `recipients` receive the weekly export; duplicates are dropped.
    pub fn new(
        settings: HousekeeperSettings,
        exporter: SnapshotExporter,
        delivery: Arc<dyn Outbox>,
        recipients: impl IntoIterator<Item = ChatTarget>,
    ) -> Self {
        let mut unique: Vec<ChatTarget> = Vec::new();
        for chat in recipients {
            if !unique.contains(&chat) {
                unique.push(chat);
            }
        }
        Self {
            settings,
            exporter,
            delivery,
            recipients: unique,
            last_export: Mutex::new(None),
            clock: Local::now,
        }
    }

    /// Replaces the wall clock used to decide the export window.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Local>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &HousekeeperSettings {
        &self.settings
    }

    /// Removes regular files in the download directory whose mtime is older than the
    /// retention window. A missing directory is not an error.
    pub fn sweep_stale_files(&self, now: SystemTime) -> AppResult<SweepReport> {
        let mut report = SweepReport::default();
        let dir = &self.settings.download_dir;
        if !dir.is_dir() {
            return Ok(report);
        }

        for entry in fs_err::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) => {
                    log::warn!("Cannot stat {}: {}", path.display(), e);
                    report.failed += 1;
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }

            let modified = match metadata.modified() {
                Ok(modified) => modified,
                Err(e) => {
                    log::warn!("Cannot read mtime of {}: {}", path.display(), e);
                    report.failed += 1;
                    continue;
                }
            };
            let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
            if age <= self.settings.retention {
                continue;
            }

            match fs_err::remove_file(&path) {
                Ok(()) => {
                    log::info!("Removed stale download {} ({}s old)", path.display(), age.as_secs());
                    report.removed += 1;
                }
                Err(e) => {
                    log::warn!("Failed to remove stale download: {}", e);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Exports full state when `now` falls in the weekly window, at most once per date.
    ///
    /// The file is deleted once every recipient received it and kept otherwise.
    pub async fn maybe_export(&self, now: DateTime<Local>) -> AppResult<Option<PathBuf>> {
        if !in_export_window(&self.settings, &now) {
            return Ok(None);
        }
        let today = now.date_naive();
        {
            let last = self.last_export.lock().unwrap_or_else(PoisonError::into_inner);
            if *last == Some(today) {
                return Ok(None);
            }
        }

        let path = self.exporter.export(now)?;
        *self.last_export.lock().unwrap_or_else(PoisonError::into_inner) = Some(today);

        let caption = format!("Weekly backup {}", now.format("%Y%m%d"));
        let delivered = self.deliver_export(&path, &caption).await;

        if delivered {
            if let Err(e) = fs_err::tokio::remove_file(&path).await {
                log::warn!("Failed to remove delivered export: {}", e);
            }
        } else {
            log::warn!("Weekly export kept at {}", path.display());
        }

        Ok(Some(path))
    }

    async fn deliver_export(&self, path: &Path, caption: &str) -> bool {
        if self.recipients.is_empty() {
            log::warn!("No export recipients configured");
            return false;
        }

        let mut delivered = true;
        for chat in &self.recipients {
            match self
                .delivery
                .send_file(chat, path, Some(caption), FileKind::Document)
                .await
            {
                Ok(()) => log::info!("Weekly export sent to {}", chat),
                Err(e) => {
                    log::error!("Failed to send weekly export to {}: {}", chat, e);
                    delivered = false;
                }
            }
        }
        delivered
    }

    /// One maintenance pass.
    pub async fn tick(&self) -> AppResult<()> {
        let report = self.sweep_stale_files(SystemTime::now())?;
        if report.removed > 0 || report.failed > 0 {
            log::info!(
                "Download sweep: {} removed, {} failed",
                report.removed,
                report.failed
            );
        }
        self.maybe_export((self.clock)()).await?;
        Ok(())
    }

    /// Ticks until `cancel` fires.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        log::info!(
            "Housekeeper started (every {}s, retention {}s)",
            self.settings.interval.as_secs(),
            self.settings.retention.as_secs()
        );

        loop {
            let delay = match AssertUnwindSafe(self.tick()).catch_unwind().await {
                Ok(Ok(())) => self.settings.interval,
                Ok(Err(e)) => {
                    log::error!("Housekeeping tick failed: {}", e);
                    self.settings.failure_backoff
                }
                Err(payload) => {
                    log::error!("Housekeeping tick panicked: {}", panic_message(payload.as_ref()));
                    self.settings.failure_backoff
                }
            };

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        log::info!("Housekeeper stopped");
    }
}

fn in_export_window(settings: &HousekeeperSettings, now: &DateTime<Local>) -> bool {
    now.weekday() == settings.export_weekday && now.hour() == settings.export_hour
}
