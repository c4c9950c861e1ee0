//! Decision cache for access-control checks, grounded on the teacher's
//! `DecisionCache` (`r2e-openfga/src/cache.rs`) — lazy TTL eviction swept at
//! most once per minute, fail-open on overflow.

use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

const DEFAULT_MAX_ENTRIES: usize = 10_000;
const EVICTION_CHECK_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct CacheKey {
    pub originator: String,
    pub target_ri: String,
    pub required: u8,
}

impl CacheKey {
    pub fn new(originator: &str, target_ri: &str, required: u8) -> Self {
        Self {
            originator: originator.to_string(),
            target_ri: target_ri.to_string(),
            required,
        }
    }
}

struct CachedDecision {
    allowed: bool,
    expires_at: Instant,
}

pub struct DecisionCache {
    entries: DashMap<CacheKey, CachedDecision>,
    ttl: Duration,
    max_entries: usize,
    len: AtomicUsize,
    last_eviction: std::sync::Mutex<Instant>,
}

impl DecisionCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, DEFAULT_MAX_ENTRIES)
    }

    pub fn with_capacity(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_entries,
            len: AtomicUsize::new(0),
            last_eviction: std::sync::Mutex::new(Instant::now()),
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<bool> {
        self.entries.get(key).and_then(|entry| {
            if entry.expires_at > Instant::now() {
                Some(entry.allowed)
            } else {
                None
            }
        })
    }

    pub fn set(&self, key: CacheKey, allowed: bool) {
        self.maybe_evict();
        if self.len.load(Ordering::Relaxed) >= self.max_entries {
            self.evict_expired();
            if self.len.load(Ordering::Relaxed) >= self.max_entries {
                return;
            }
        }
        let was_absent = self
            .entries
            .insert(
                key,
                CachedDecision {
                    allowed,
                    expires_at: Instant::now() + self.ttl,
                },
            )
            .is_none();
        if was_absent {
            self.len.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Invalidate every cached decision for a target, used when its `acpi`
    /// or a referenced ACP's rules change (§4.1 step 6 roll-forward).
    pub fn invalidate_target(&self, target_ri: &str) {
        self.entries.retain(|k, _| {
            let keep = k.target_ri != target_ri;
            if !keep {
                self.len.fetch_sub(1, Ordering::Relaxed);
            }
            keep
        });
    }

    pub fn clear(&self) {
        self.entries.clear();
        self.len.store(0, Ordering::Relaxed);
    }

    pub fn evict_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, v| {
            let keep = v.expires_at > now;
            if !keep {
                self.len.fetch_sub(1, Ordering::Relaxed);
            }
            keep
        });
        if let Ok(mut last) = self.last_eviction.lock() {
            *last = Instant::now();
        }
    }

    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn maybe_evict(&self) {
        let should = self
            .last_eviction
            .lock()
            .map(|last| last.elapsed() >= EVICTION_CHECK_INTERVAL)
            .unwrap_or(false);
        if should {
            self.evict_expired();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_returns_cached_decision() {
        let cache = DecisionCache::new(Duration::from_secs(30));
        let key = CacheKey::new("CAdmin", "ri1", 2);
        cache.set(key.clone(), true);
        assert_eq!(cache.get(&key), Some(true));
    }

    #[test]
    fn invalidate_target_drops_all_its_entries() {
        let cache = DecisionCache::new(Duration::from_secs(30));
        cache.set(CacheKey::new("CAdmin", "ri1", 2), true);
        cache.set(CacheKey::new("CAdmin", "ri1", 4), false);
        cache.set(CacheKey::new("CAdmin", "ri2", 2), true);
        cache.invalidate_target("ri1");
        assert_eq!(cache.len(), 1);
    }
}
