use crate::storage::document::StorageError;
use crate::storage::stats::{StatsDocument, UsageStats};
use crate::storage::users::{UserDocument, UserStore};
use chrono::{DateTime, Local, Utc};
use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Full durable state in one file, restorable by hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub user_data: UserDocument,
    pub stats: StatsDocument,
    pub exported_at: DateTime<Utc>,
}

/// Writes timestamped full-state exports into a directory.
#[derive(Clone)]
pub struct SnapshotExporter {
    users: Arc<UserStore>,
    stats: Arc<UsageStats>,
    export_dir: PathBuf,
}

impl SnapshotExporter {
    pub fn new(users: Arc<UserStore>, stats: Arc<UsageStats>, export_dir: impl Into<PathBuf>) -> Self {
        Self {
            users,
            stats,
            export_dir: export_dir.into(),
        }
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    /// Export file name for a given day: `backup_YYYYMMDD.json`.
    pub fn file_name(at: DateTime<Local>) -> String {
        format!("backup_{}.json", at.format("%Y%m%d"))
    }

    /// Captures both documents and writes them as one pretty-printed JSON file.
    pub fn export(&self, at: DateTime<Local>) -> Result<PathBuf, StorageError> {
        let snapshot = StateSnapshot {
            user_data: self.users.snapshot(),
            stats: self.stats.snapshot(),
            exported_at: at.with_timezone(&Utc),
        };

        fs::create_dir_all(&self.export_dir)?;
        let path = self.export_dir.join(Self::file_name(at));
        let body = serde_json::to_vec_pretty(&snapshot).map_err(StorageError::Serialize)?;
        fs::write(&path, body)?;

        log::info!(
            "Exported state snapshot: {} ({} users)",
            path.display(),
            snapshot.user_data.users.len()
        );
        Ok(path)
    }
}
