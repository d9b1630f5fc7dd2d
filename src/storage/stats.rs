//! Download counters: global, per-day, per-user and per-platform.

use crate::core::types::{Platform, UserId};
use crate::storage::document::{JsonDocument, Outcome, StorageError};
use crate::storage::users::UserStore;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyBucket {
    pub success: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUsage {
    pub downloads: u64,
    pub failed: u64,
    #[serde(rename = "platforms", default)]
    pub per_platform: BTreeMap<Platform, u64>,
}

/// On-disk layout of the statistics document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsDocument {
    #[serde(default)]
    pub total_downloads: u64,
    #[serde(default)]
    pub daily: BTreeMap<NaiveDate, DailyBucket>,
    #[serde(default)]
    pub users: BTreeMap<UserId, UserUsage>,
    #[serde(default)]
    pub platforms: BTreeMap<Platform, u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success { platform: Platform },
    Failure,
}

/// Aggregate view for the operator panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlobalSnapshot {
    pub total_downloads: u64,
    pub per_platform: BTreeMap<Platform, u64>,
    pub total_users: usize,
    pub premium_users: usize,
    pub banned_users: usize,
}

pub struct UsageStats {
    doc: JsonDocument<StatsDocument>,
}

impl UsageStats {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        Ok(Self {
            doc: JsonDocument::open(path)?,
        })
    }

    /// Records one finished attempt under today's local date.
    pub fn record_attempt(&self, user: &UserId, outcome: AttemptOutcome) -> Result<(), StorageError> {
        self.record_attempt_on(user, outcome, Local::now().date_naive())
    }

    pub fn record_attempt_on(
        &self,
        user: &UserId,
        outcome: AttemptOutcome,
        day: NaiveDate,
    ) -> Result<(), StorageError> {
        self.doc.mutate(|doc| {
            let bucket = doc.daily.entry(day).or_default();
            let usage = doc.users.entry(user.clone()).or_default();
            match outcome {
                AttemptOutcome::Success { platform } => {
                    doc.total_downloads += 1;
                    bucket.success += 1;
                    usage.downloads += 1;
                    *usage.per_platform.entry(platform).or_insert(0) += 1;
                    *doc.platforms.entry(platform).or_insert(0) += 1;
                }
                AttemptOutcome::Failure => {
                    bucket.failed += 1;
                    usage.failed += 1;
                }
            }
            Outcome::Changed(())
        })
    }

    /// Counters for `user`, all zero when the user never downloaded anything.
    pub fn stats_for(&self, user: &UserId) -> UserUsage {
        self.doc.read(|doc| doc.users.get(user).cloned().unwrap_or_default())
    }

    pub fn daily(&self, day: NaiveDate) -> DailyBucket {
        self.doc.read(|doc| doc.daily.get(&day).copied().unwrap_or_default())
    }

    /// Totals joined with the live user counts. Every platform is listed, zero or not.
    pub fn global_snapshot(&self, users: &UserStore) -> GlobalSnapshot {
        let (total_downloads, per_platform) = self.doc.read(|doc| {
            let per_platform = Platform::ALL
                .into_iter()
                .map(|p| (p, doc.platforms.get(&p).copied().unwrap_or(0)))
                .collect();
            (doc.total_downloads, per_platform)
        });
        let counts = users.counts();

        GlobalSnapshot {
            total_downloads,
            per_platform,
            total_users: counts.total,
            premium_users: counts.premium,
            banned_users: counts.banned,
        }
    }

    pub fn snapshot(&self) -> StatsDocument {
        self.doc.snapshot()
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        self.doc.flush()
    }
}
