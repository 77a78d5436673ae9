//! In-memory cache for ranked results.
//!
//! Caches the final filtered, deduplicated, ranked results keyed by search
//! mode, normalised query options and a fingerprint of the configuration.
//! Uses [`moka`] for async-friendly caching with configurable TTL and
//! automatic eviction.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;
use std::time::Duration;

use moka::future::Cache;

use crate::config::SearchConfig;
use crate::types::{PriceFilter, RankedResult, SearchQuery, StoreScope};

/// Maximum number of cached result sets.
const MAX_CACHE_ENTRIES: u64 = 256;

/// Global process-wide result cache.
///
/// Lazily initialised on first access. TTL is set when first created
/// and cannot be changed after initialisation.
static CACHE: OnceLock<Cache<CacheKey, Vec<RankedResult>>> = OnceLock::new();

/// Which pipeline produced a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchMode {
    Assets,
    Docs,
}

/// Composite cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    mode: SearchMode,
    /// Lowercased, whitespace-collapsed query text.
    text: String,
    kind: Option<String>,
    only: StoreScope,
    price: PriceFilter,
    license: Option<String>,
    /// Hash of the serialised config, so searches against different
    /// upstreams or weights never share entries.
    config_hash: u64,
}

impl CacheKey {
    /// Build a deterministic cache key.
    ///
    /// Text options are lowercased and whitespace-collapsed so that
    /// `"Sword  Animations"` and `"sword animations"` share an entry.
    pub fn new(mode: SearchMode, query: &SearchQuery, config: &SearchConfig) -> Self {
        Self {
            mode,
            text: normalise(&query.text),
            kind: query.kind.as_deref().map(normalise),
            only: query.only,
            price: query.price,
            license: query.license.as_deref().map(normalise),
            config_hash: hash_config(config),
        }
    }
}

/// Get or initialise the global cache with the given TTL.
///
/// The TTL is only used on the **first** call; subsequent calls reuse
/// the existing cache regardless of the TTL argument.
fn get_or_init_cache(ttl_seconds: u64) -> &'static Cache<CacheKey, Vec<RankedResult>> {
    CACHE.get_or_init(|| {
        Cache::builder()
            .max_capacity(MAX_CACHE_ENTRIES)
            .time_to_live(Duration::from_secs(ttl_seconds))
            .build()
    })
}

/// Look up cached results for the given key.
///
/// Returns `Some(results)` on cache hit, `None` on miss.
pub async fn get(key: &CacheKey, ttl_seconds: u64) -> Option<Vec<RankedResult>> {
    let cache = get_or_init_cache(ttl_seconds);
    cache.get(key).await
}

/// Insert ranked results into the cache.
pub async fn insert(key: CacheKey, results: Vec<RankedResult>, ttl_seconds: u64) {
    let cache = get_or_init_cache(ttl_seconds);
    cache.insert(key, results).await;
}

fn normalise(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

fn hash_config(config: &SearchConfig) -> u64 {
    let serialised = serde_json::to_string(config).unwrap_or_default();
    let mut hasher = DefaultHasher::new();
    serialised.hash(&mut hasher);
    hasher.finish()
}
