use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use super::address::AddressParser;
use super::domain::{ParsedAddress, ProviderSuggestion, UtilityCategory};

pub const DEFAULT_TTL_DAYS: i64 = 30;

/// Cache key for a raw address, coarsened to state plus ZIP3 (or city) so that
/// neighbouring properties share one entry.
pub fn suggestion_cache_key(address: &str, category: UtilityCategory) -> String {
    cache_key_for(&AddressParser::parse(address), category)
}

pub fn cache_key_for(address: &ParsedAddress, category: UtilityCategory) -> String {
    let region = match (address.zip_prefix(), address.city.as_deref()) {
        (Some(prefix), _) => prefix.to_string(),
        (None, Some(city)) => normalize_city(city),
        (None, None) => "UNKNOWN".to_string(),
    };

    format!(
        "suggestions:{}:{}:{}",
        address.state.unwrap_or("DEFAULT"),
        region,
        category
    )
}

fn normalize_city(city: &str) -> String {
    city.replace(':', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: String,
    pub suggestions: Vec<ProviderSuggestion>,
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now.signed_duration_since(self.created_at) > ttl
    }
}

/// Time-bounded store of resolved suggestion sets.
///
/// Writes replace whole entries, so readers never observe a partially updated
/// set and a poisoned lock still guards consistent data.
#[derive(Debug)]
pub struct SuggestionCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl Default for SuggestionCache {
    fn default() -> Self {
        Self::new(Duration::days(DEFAULT_TTL_DAYS))
    }
}

impl SuggestionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &str) -> Option<Vec<ProviderSuggestion>> {
        self.get_at(key, Utc::now())
    }

    /// Entries older than the TTL read as absent even before the sweep runs.
    pub fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<Vec<ProviderSuggestion>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(key)
            .filter(|entry| !entry.is_expired(now, self.ttl))
            .map(|entry| entry.suggestions.clone())
    }

    pub fn put(&self, key: impl Into<String>, suggestions: Vec<ProviderSuggestion>) {
        self.put_at(key, suggestions, Utc::now());
    }

    pub fn put_at(
        &self,
        key: impl Into<String>,
        suggestions: Vec<ProviderSuggestion>,
        created_at: DateTime<Utc>,
    ) {
        let key = key.into();
        let entry = CacheEntry {
            key: key.clone(),
            suggestions,
            created_at,
        };
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key, entry);
    }

    pub fn evict_expired(&self) -> usize {
        self.evict_expired_at(Utc::now())
    }

    pub fn evict_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now, self.ttl));
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Start a background sweep that drops expired entries every `every`.
    /// The task exits once the cache itself has been dropped.
    pub fn spawn_eviction(self: &Arc<Self>, every: std::time::Duration) -> JoinHandle<()> {
        let cache = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(cache) = cache.upgrade() else {
                    break;
                };

                let evicted = cache.evict_expired();
                if evicted > 0 {
                    debug!(evicted, remaining = cache.len(), "evicted expired suggestion sets");
                }
            }
        })
    }
}
