//! Durable state: user registry, usage statistics and full-state exports

pub mod document;
pub mod snapshot;
pub mod stats;
pub mod users;

use std::path::Path;
use std::sync::Arc;

// Re-exports for convenience
pub use document::StorageError;
pub use snapshot::{SnapshotExporter, StateSnapshot};
pub use stats::{AttemptOutcome, GlobalSnapshot, UsageStats, UserUsage};
pub use users::{UserCounts, UserMeta, UserProfile, UserStore, UserStoreError};

/// Both state documents, shared by the request handler and the housekeeper.
#[derive(Clone)]
pub struct Storage {
    pub users: Arc<UserStore>,
    pub stats: Arc<UsageStats>,
}

impl Storage {
    pub fn open(user_data: impl AsRef<Path>, stats: impl AsRef<Path>) -> Result<Self, StorageError> {
        Ok(Self {
            users: Arc::new(UserStore::open(user_data.as_ref())?),
            stats: Arc::new(UsageStats::open(stats.as_ref())?),
        })
    }

    /// Writes both documents, used on shutdown.
    pub fn flush(&self) -> Result<(), StorageError> {
        self.users.flush()?;
        self.stats.flush()?;
        log::info!("State flushed to disk");
        Ok(())
    }

    pub fn exporter(&self, export_dir: impl AsRef<Path>) -> SnapshotExporter {
        SnapshotExporter::new(
            Arc::clone(&self.users),
            Arc::clone(&self.stats),
            export_dir.as_ref(),
        )
    }
}
