use crate::core::types::Tier;

/// Download quota check.
///
/// Premium users are never limited. Free users are allowed while their count of
/// successful downloads is below `free_limit`. The count is taken over the whole
/// account lifetime, failed attempts do not count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadQuota {
    free_limit: u64,
}

impl DownloadQuota {
    pub fn new(free_limit: u64) -> Self {
        Self { free_limit }
    }

    pub fn free_limit(&self) -> u64 {
        self.free_limit
    }

    /// Whether a user of `tier` with `successful_downloads` so far may start another download.
    pub fn allows(&self, tier: Tier, successful_downloads: u64) -> bool {
        match tier {
            Tier::Premium => true,
            Tier::Free => successful_downloads < self.free_limit,
        }
    }

    /// Downloads a free user has left, `None` for premium.
    pub fn remaining(&self, tier: Tier, successful_downloads: u64) -> Option<u64> {
        match tier {
            Tier::Premium => None,
            Tier::Free => Some(self.free_limit.saturating_sub(successful_downloads)),
        }
    }
}

impl Default for DownloadQuota {
    fn default() -> Self {
        Self::new(*crate::core::config::limits::FREE_USER_DOWNLOAD_LIMIT)
    }
}
