use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Epoch-keyed store for resolved sync duties.
///
/// `set` replaces whatever was stored for the epoch. Expired entries are
/// reported as absent.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
pub trait DutyCache: Send + Sync {
    fn get(&self, epoch: u64) -> Option<Vec<String>>;

    fn set(&self, epoch: u64, validators: Vec<String>, ttl: Duration);
}

#[derive(Debug, Clone)]
struct CacheEntry {
    validators: Vec<String>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// In-process [`DutyCache`] with per-entry expiry.
///
/// Concurrent misses for the same epoch are not coalesced; the last `set`
/// wins.
#[derive(Debug, Default)]
pub struct TtlDutyCache {
    entries: RwLock<HashMap<u64, CacheEntry>>,
}

impl TtlDutyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included until the next `set`.
    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.read().len()
    }
}

impl DutyCache for TtlDutyCache {
    fn get(&self, epoch: u64) -> Option<Vec<String>> {
        let entries = self.entries.read();
        entries
            .get(&epoch)
            .filter(|entry| entry.is_live(Instant::now()))
            .map(|entry| entry.validators.clone())
    }

    fn set(&self, epoch: u64, validators: Vec<String>, ttl: Duration) {
        let now = Instant::now();
        // A ttl too large to represent never expires in practice
        let expires_at = now.checked_add(ttl).unwrap_or(now + Duration::from_secs(u32::MAX as u64));

        let mut entries = self.entries.write();
        entries.retain(|_, entry| entry.is_live(now));
        entries.insert(epoch, CacheEntry { validators, expires_at });
    }
}
