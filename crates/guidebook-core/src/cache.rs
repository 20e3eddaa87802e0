//! # Context Cache
//!
//! Memoizes assembled contexts by `(page, locale, content hash)`.
//!
//! The content hash covers every bundle the render can read, the page
//! declaration and the classifier's sentinels. A changed bundle therefore
//! produces a new key instead of a stale hit; [`ContextCache::reset`] only
//! reclaims memory.
//!
//! Capacity is bounded. When full, the smallest key is evicted, which keeps
//! eviction deterministic.

use crate::bundle::{ContentHash, LocaleBundleProvider};
use crate::context::{ContextAssembler, PageContext};
use crate::locale::RequestLocale;
use crate::page::PageDeclaration;
use crate::primitives::MAX_CACHE_ENTRIES;
use crate::types::LocaleTag;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Identity of one rendered context.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CacheKey {
    pub page: String,
    pub locale: LocaleTag,
    pub content: ContentHash,
}

/// Hit and miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Bounded map of assembled contexts.
#[derive(Debug, Clone)]
pub struct ContextCache {
    entries: BTreeMap<CacheKey, Arc<PageContext>>,
    capacity: usize,
    hits: u64,
    misses: u64,
}

impl Default for ContextCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextCache {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(MAX_CACHE_ENTRIES)
    }

    /// Cache holding at most `capacity` contexts (at least one).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            capacity: capacity.max(1),
            hits: 0,
            misses: 0,
        }
    }

    pub fn get(&mut self, key: &CacheKey) -> Option<Arc<PageContext>> {
        let hit = self.entries.get(key).cloned();
        if hit.is_some() {
            self.hits = self.hits.saturating_add(1);
        } else {
            self.misses = self.misses.saturating_add(1);
        }
        hit
    }

    pub fn insert(&mut self, key: CacheKey, context: Arc<PageContext>) {
        if !self.entries.contains_key(&key) {
            while self.entries.len() >= self.capacity {
                if self.entries.pop_first().is_none() {
                    break;
                }
            }
        }
        self.entries.insert(key, context);
    }

    /// Return the cached context, assembling and storing it on a miss.
    pub fn get_or_assemble<P: LocaleBundleProvider + ?Sized>(
        &mut self,
        assembler: &ContextAssembler<'_, P>,
        page: &PageDeclaration,
        request: &RequestLocale,
    ) -> Arc<PageContext> {
        let locales = assembler.locales(request);
        let key = CacheKey {
            page: page.key().to_string(),
            locale: locales.target.clone(),
            content: assembler.content_hash(page, &locales),
        };
        if let Some(hit) = self.get(&key) {
            return hit;
        }
        let context = Arc::new(assembler.assemble_for(page, &locales));
        self.insert(key, Arc::clone(&context));
        context
    }

    /// Drop every entry for one page. Returns how many were removed.
    pub fn invalidate_page(&mut self, page: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| key.page != page);
        before.saturating_sub(self.entries.len())
    }

    /// Drop every entry and zero the counters.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            capacity: self.capacity,
            hits: self.hits,
            misses: self.misses,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
