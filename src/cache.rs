//! TTL + LRU cache of materialised views.
//!
//! One mutex guards the whole table. Entries expire on read once older than
//! the TTL; inserts past capacity evict the least recently used entry.

use std::sync::Arc;
use std::time::{Duration, Instant};

use hashbrown::HashMap;
use parking_lot::Mutex;
use serde::Serialize;

use crate::config::CacheConfig;
use crate::engine::ViewEdit;
use crate::view::{HierarchicalViewData, MembershipMode};

/// Anything holding derived views should implement this.
pub trait InvalidateCache {
    /// Drop every cached entry so future requests recompute.
    fn invalidate_cache(&mut self);
}

impl<T: InvalidateCache + ?Sized> InvalidateCache for Box<T> {
    #[inline]
    fn invalidate_cache(&mut self) {
        (**self).invalidate_cache();
    }
}

/// Every request parameter that changes the resulting view.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ViewCacheKey {
    pub granularity: Option<usize>,
    pub budget: usize,
    pub ego: Option<String>,
    /// Order matters: the same edits in another order can give another view.
    pub edits: Vec<ViewEdit>,
    /// `f64::to_bits` of the Louvain weight.
    pub louvain_weight: u64,
    pub expand_depth: usize,
    pub signal_weights: (u64, u64),
    pub membership: MembershipMode,
    /// Bumped whenever engine-wide settings change.
    pub epoch: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
}

struct Entry {
    view: Arc<HierarchicalViewData>,
    created_at: Instant,
    last_access: u64,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<ViewCacheKey, Entry>,
    tick: u64,
    stats: CacheStats,
}

pub struct ViewCache {
    inner: Mutex<Inner>,
    capacity: usize,
    ttl: Duration,
}

impl ViewCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            capacity: config.capacity,
            ttl: Duration::from_secs(config.ttl_secs),
        }
    }

    pub fn get(&self, key: &ViewCacheKey) -> Option<Arc<HierarchicalViewData>> {
        self.get_at(key, Instant::now())
    }

    pub(crate) fn get_at(&self, key: &ViewCacheKey, now: Instant) -> Option<Arc<HierarchicalViewData>> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let expired = match inner.entries.get(key) {
            None => {
                inner.stats.misses += 1;
                return None;
            }
            Some(e) => now.saturating_duration_since(e.created_at) > self.ttl,
        };
        if expired {
            inner.entries.remove(key);
            inner.stats.expirations += 1;
            inner.stats.misses += 1;
            return None;
        }
        inner.tick += 1;
        let tick = inner.tick;
        inner.stats.hits += 1;
        let entry = inner.entries.get_mut(key)?;
        entry.last_access = tick;
        Some(Arc::clone(&entry.view))
    }

    pub fn insert(&self, key: ViewCacheKey, view: Arc<HierarchicalViewData>) {
        self.insert_at(key, view, Instant::now());
    }

    pub(crate) fn insert_at(&self, key: ViewCacheKey, view: Arc<HierarchicalViewData>, now: Instant) {
        if self.capacity == 0 {
            return;
        }
        let mut inner = self.inner.lock();
        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.capacity {
            let ttl = self.ttl;
            let before = inner.entries.len();
            inner
                .entries
                .retain(|_, e| now.saturating_duration_since(e.created_at) <= ttl);
            let purged = (before - inner.entries.len()) as u64;
            inner.stats.expirations += purged;
            if inner.entries.len() >= self.capacity {
                let lru = inner
                    .entries
                    .iter()
                    .min_by_key(|(_, e)| e.last_access)
                    .map(|(k, _)| k.clone());
                if let Some(lru) = lru {
                    inner.entries.remove(&lru);
                    inner.stats.evictions += 1;
                }
            }
        }
        inner.tick += 1;
        let last_access = inner.tick;
        inner.entries.insert(
            key,
            Entry {
                view,
                created_at: now,
                last_access,
            },
        );
    }

    pub fn invalidate_all(&self) {
        let mut inner = self.inner.lock();
        let dropped = inner.entries.len();
        inner.entries.clear();
        log::info!("view cache invalidated ({dropped} entries dropped)");
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.lock().stats
    }
}

impl InvalidateCache for ViewCache {
    fn invalidate_cache(&mut self) {
        self.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Positions;

    fn key(g: usize) -> ViewCacheKey {
        ViewCacheKey {
            granularity: Some(g),
            budget: 25,
            ego: None,
            edits: Vec::new(),
            louvain_weight: 0f64.to_bits(),
            expand_depth: 1,
            signal_weights: (1f64.to_bits(), 0f64.to_bits()),
            membership: MembershipMode::Hard,
            epoch: 0,
        }
    }

    fn view(total: usize) -> Arc<HierarchicalViewData> {
        Arc::new(HierarchicalViewData {
            clusters: Vec::new(),
            edges: Vec::new(),
            ego_cluster_id: None,
            total_nodes: total,
            total_clusters: 0,
            positions: Positions::new(),
            expanded: Vec::new(),
            collapsed: Vec::new(),
            budget: 25,
            budget_remaining: 25,
            alignment: None,
            soft_membership: None,
        })
    }

    fn cache(capacity: usize, ttl_secs: u64) -> ViewCache {
        ViewCache::new(&CacheConfig { capacity, ttl_secs })
    }

    #[test]
    fn hit_then_expire() {
        let c = cache(4, 10);
        let t0 = Instant::now();
        c.insert_at(key(3), view(1), t0);
        assert_eq!(c.get_at(&key(3), t0 + Duration::from_secs(5)).unwrap().total_nodes, 1);
        assert!(c.get_at(&key(3), t0 + Duration::from_secs(11)).is_none());
        assert!(c.get_at(&key(4), t0).is_none());
        let s = c.stats();
        assert_eq!((s.hits, s.misses, s.expirations), (1, 2, 1));
        assert!(c.is_empty());
    }

    #[test]
    fn evicts_least_recently_used() {
        let c = cache(2, 100);
        let t0 = Instant::now();
        c.insert_at(key(1), view(1), t0);
        c.insert_at(key(2), view(2), t0);
        // touch 1 so 2 becomes the eviction candidate
        assert!(c.get_at(&key(1), t0).is_some());
        c.insert_at(key(3), view(3), t0);
        assert_eq!(c.len(), 2);
        assert!(c.get_at(&key(2), t0).is_none());
        assert!(c.get_at(&key(1), t0).is_some());
        assert_eq!(c.stats().evictions, 1);

        // overwriting a live key never evicts
        c.insert_at(key(3), view(30), t0);
        assert_eq!(c.stats().evictions, 1);
        assert_eq!(c.get_at(&key(3), t0).unwrap().total_nodes, 30);
    }

    #[test]
    fn key_distinguishes_edit_order() {
        let c = cache(4, 100);
        let mut edited = key(3);
        edited.edits.push(ViewEdit::Expand("d_9".into()));
        edited.edits.push(ViewEdit::Reveal("acct4".into()));
        let mut reordered = key(3);
        reordered.edits = edited.edits.iter().rev().cloned().collect();
        c.insert_at(key(3), view(1), Instant::now());
        c.insert_at(edited.clone(), view(2), Instant::now());
        assert!(c.get(&reordered).is_none());
        assert_eq!(c.get(&edited).unwrap().total_nodes, 2);
        assert_eq!(c.get(&key(3)).unwrap().total_nodes, 1);
    }

    #[test]
    fn invalidate_through_trait() {
        let mut boxed: Box<ViewCache> = Box::new(cache(4, 100));
        boxed.insert(key(1), view(1));
        boxed.invalidate_cache();
        assert!(boxed.is_empty());

        let zero = cache(0, 100);
        zero.insert(key(1), view(1));
        assert!(zero.is_empty());
    }
}
