//! Free-tier slot reservation for downloads that are still running.

use crate::core::rate_limiter::DownloadQuota;
use crate::core::types::{Tier, UserId};
use crate::storage::{AttemptOutcome, StorageError, UsageStats};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Per-user count of downloads that passed the quota check and have not finished.
///
/// The check and the final record both happen under this lock, so a user's
/// recorded successes plus in-flight downloads never exceed the free limit.
#[derive(Debug, Default)]
pub(crate) struct InFlightDownloads {
    per_user: Mutex<HashMap<UserId, u64>>,
}

impl InFlightDownloads {
    fn lock(&self) -> MutexGuard<'_, HashMap<UserId, u64>> {
        self.per_user.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes one slot for `user`, or returns the number of slots already used.
    pub(crate) fn reserve<'a>(
        &'a self,
        stats: &'a UsageStats,
        quota: &DownloadQuota,
        user: &UserId,
        tier: Tier,
    ) -> Result<QuotaSlot<'a>, u64> {
        let mut pending = self.lock();
        let running = pending.get(user).copied().unwrap_or(0);
        let used = stats.stats_for(user).downloads + running;
        if !quota.allows(tier, used) {
            return Err(used);
        }
        *pending.entry(user.clone()).or_insert(0) += 1;
        Ok(QuotaSlot {
            owner: self,
            stats,
            user: user.clone(),
            settled: false,
        })
    }

    #[cfg(test)]
    pub(crate) fn running(&self, user: &UserId) -> u64 {
        self.lock().get(user).copied().unwrap_or(0)
    }

    fn release(pending: &mut HashMap<UserId, u64>, user: &UserId) {
        if let Some(count) = pending.get_mut(user) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                pending.remove(user);
            }
        }
    }
}

/// A reserved download slot. Dropping it without [`QuotaSlot::settle`] frees the slot
/// and records nothing.
pub(crate) struct QuotaSlot<'a> {
    owner: &'a InFlightDownloads,
    stats: &'a UsageStats,
    user: UserId,
    settled: bool,
}

impl QuotaSlot<'_> {
    /// Records the attempt and frees the slot in one step.
    pub(crate) fn settle(mut self, outcome: AttemptOutcome) -> Result<(), StorageError> {
        let mut pending = self.owner.lock();
        let recorded = self.stats.record_attempt(&self.user, outcome);
        InFlightDownloads::release(&mut pending, &self.user);
        self.settled = true;
        recorded
    }
}

impl Drop for QuotaSlot<'_> {
    fn drop(&mut self) {
        if !self.settled {
            InFlightDownloads::release(&mut self.owner.lock(), &self.user);
        }
    }
}
