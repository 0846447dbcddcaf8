//! Rendered-page cache for the index feed.
//!
//! Entries expire after a fixed lifetime; writes do not evict them.
//! [`PageCache::clear`] is the invalidation hook when fresh content is
//! required.

use moka::sync::Cache;
use std::time::Duration;
use yatube_service::PageRequest;

/// Upper bound on rendered pages kept at once.
pub const MAX_CACHED_PAGES: u64 = 1_000;

/// Route, requested page and who is looking, since pages embed the
/// viewer's navigation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub route: String,
    pub page: PageRequest,
    pub viewer: Option<String>,
}

impl CacheKey {
    pub fn new(route: &str, page: PageRequest, viewer: Option<&str>) -> Self {
        Self {
            route: route.to_owned(),
            page,
            viewer: viewer.map(str::to_owned),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PageCache {
    ttl: Duration,
    entries: Cache<CacheKey, String>,
}

impl PageCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, MAX_CACHED_PAGES)
    }

    pub fn with_capacity(ttl: Duration, max_capacity: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();
        Self { ttl, entries }
    }

    pub fn get(&self, key: &CacheKey) -> Option<String> {
        let body = self.entries.get(key);
        if body.is_some() {
            tracing::debug!(route = %key.route, page = ?key.page, "page cache hit");
        }
        body
    }

    pub fn insert(&self, key: CacheKey, body: String) {
        if self.ttl.is_zero() {
            return;
        }
        self.entries.insert(key, body);
    }

    /// Drop every cached page.
    pub fn clear(&self) {
        tracing::debug!(entries = self.entries.entry_count(), "clearing page cache");
        self.entries.invalidate_all();
    }

    /// Number of live entries, after pending evictions are applied.
    pub fn len(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
