//! Caching layer for oracle judgments.
//!
//! Re-analyzing a lease (or a lease that shares boilerplate with another)
//! sends the same text pairs again. Successful judgments are cached by pair
//! text; failures are never cached.

use moka::future::Cache;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::time::Duration;

use crate::config::CacheConfig;
use crate::providers::Judgment;

/// Cache key for one ordered text pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PairKey {
    premise_hash: u64,
    hypothesis_hash: u64,
}

impl PairKey {
    pub fn new(premise: &str, hypothesis: &str) -> Self {
        Self {
            premise_hash: hash_text(premise),
            hypothesis_hash: hash_text(hypothesis),
        }
    }
}

/// Judgment cache using moka.
pub struct JudgmentCache {
    cache: Cache<PairKey, Judgment>,
}

impl JudgmentCache {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        Self { cache }
    }

    /// Build from config; `None` when caching is disabled.
    pub fn from_config(config: &CacheConfig) -> Option<Self> {
        config
            .enabled
            .then(|| Self::new(config.max_entries, config.ttl))
    }

    pub async fn get(&self, key: &PairKey) -> Option<Judgment> {
        self.cache.get(key).await
    }

    pub async fn insert(&self, key: PairKey, judgment: Judgment) {
        self.cache.insert(key, judgment).await;
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for JudgmentCache {
    fn default() -> Self {
        let config = CacheConfig::default();
        Self::new(config.max_entries, config.ttl)
    }
}

fn hash_text(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::NliLabel;

    #[tokio::test]
    async fn test_cache_operations() {
        let cache = JudgmentCache::default();
        let key = PairKey::new("Tenant may sublet.", "No subletting.");
        let judgment = Judgment::new([(NliLabel::Contradiction, 0.93)]).unwrap();

        assert!(cache.get(&key).await.is_none());

        cache.insert(key, judgment.clone()).await;
        assert_eq!(cache.get(&key).await, Some(judgment));
    }

    #[test]
    fn test_key_is_order_sensitive() {
        assert_eq!(PairKey::new("a", "b"), PairKey::new("a", "b"));
        assert_ne!(PairKey::new("a", "b"), PairKey::new("b", "a"));
    }

    #[test]
    fn test_disabled_cache() {
        let config = CacheConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(JudgmentCache::from_config(&config).is_none());
        assert!(JudgmentCache::from_config(&CacheConfig::default()).is_some());
    }
}
