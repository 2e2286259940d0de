use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::future::{join_all, BoxFuture, FutureExt, Shared};
use tracing::{debug, info, warn};

use super::address::AddressParser;
use super::cache::{cache_key_for, SuggestionCache};
use super::domain::{ParsedAddress, ProviderSuggestion, UtilityCategory};
use super::fallback::FallbackCatalog;
use super::generator::{
    build_prompt, CandidateGenerator, GenerationFailure, GenerationResult, MAX_CANDIDATES,
};
use super::validator::validate_candidate;

pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(6);

type PendingSuggestions = Shared<BoxFuture<'static, Vec<ProviderSuggestion>>>;

enum Lookup {
    Cached(Vec<ProviderSuggestion>),
    Pending(PendingSuggestions),
}

/// Produces the pre-filled provider list for one address and category.
///
/// Resolution order is cache, then generator, then fallback catalog. Callers
/// that miss the cache for the same key while a generation is running wait on
/// that generation instead of starting their own.
#[derive(Clone)]
pub struct SuggestionResolver {
    inner: Arc<ResolverInner>,
}

struct ResolverInner {
    generator: Option<Arc<dyn CandidateGenerator>>,
    cache: Arc<SuggestionCache>,
    fallback: FallbackCatalog,
    generation_timeout: Duration,
    in_flight: Mutex<HashMap<String, PendingSuggestions>>,
}

impl SuggestionResolver {
    pub fn new(
        cache: Arc<SuggestionCache>,
        generator: Option<Arc<dyn CandidateGenerator>>,
        generation_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(ResolverInner {
                generator,
                cache,
                fallback: FallbackCatalog,
                generation_timeout,
                in_flight: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Resolver that only ever serves fallback data.
    pub fn fallback_only(cache: Arc<SuggestionCache>) -> Self {
        Self::new(cache, None, DEFAULT_GENERATION_TIMEOUT)
    }

    pub fn cache(&self) -> &Arc<SuggestionCache> {
        &self.inner.cache
    }

    pub fn has_generator(&self) -> bool {
        self.inner.generator.is_some()
    }

    /// Up to three suggestions, highest confidence first. Never fails: every
    /// generation problem degrades to the fallback catalog.
    pub async fn resolve(&self, address: &str, category: UtilityCategory) -> Vec<ProviderSuggestion> {
        let parsed = AddressParser::parse(address);
        if let Some(resolution) = parsed.state_resolution.as_ref().filter(|r| r.is_ambiguous()) {
            debug!(
                state = parsed.state,
                alternatives = ?resolution.alternatives,
                "address matched more than one state"
            );
        }

        let key = cache_key_for(&parsed, category);
        if let Some(cached) = self.inner.cache.get(&key) {
            debug!(%key, "suggestion cache hit");
            return cached;
        }

        match self.lookup(key, address, parsed, category) {
            Lookup::Cached(suggestions) => suggestions,
            Lookup::Pending(pending) => pending.await,
        }
    }

    /// Resolve each distinct category concurrently.
    pub async fn resolve_all(
        &self,
        address: &str,
        categories: &[UtilityCategory],
    ) -> BTreeMap<UtilityCategory, Vec<ProviderSuggestion>> {
        let unique: BTreeSet<UtilityCategory> = categories.iter().copied().collect();
        let lookups = unique
            .into_iter()
            .map(|category| async move { (category, self.resolve(address, category).await) });

        join_all(lookups).await.into_iter().collect()
    }

    fn lookup(
        &self,
        key: String,
        address: &str,
        parsed: ParsedAddress,
        category: UtilityCategory,
    ) -> Lookup {
        let mut in_flight = self
            .inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // The leader writes the cache before leaving the in-flight map, so a
        // second check under the lock closes the gap between the two.
        if let Some(cached) = self.inner.cache.get(&key) {
            return Lookup::Cached(cached);
        }

        if let Some(pending) = in_flight.get(&key) {
            debug!(%key, "joining in-flight suggestion request");
            return Lookup::Pending(pending.clone());
        }

        debug!(%key, "suggestion cache miss");
        let pending = self.start_resolution(key.clone(), address.to_string(), parsed, category);
        in_flight.insert(key, pending.clone());
        Lookup::Pending(pending)
    }

    fn start_resolution(
        &self,
        key: String,
        address: String,
        parsed: ParsedAddress,
        category: UtilityCategory,
    ) -> PendingSuggestions {
        let inner = Arc::clone(&self.inner);
        let state = parsed.state;

        // Spawned so the generation finishes and fills the cache even if
        // every waiting caller goes away.
        let task = tokio::spawn(async move {
            let suggestions = inner.resolve_uncached(&address, &parsed, category).await;
            inner.cache.put(key.clone(), suggestions.clone());
            inner
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&key);
            suggestions
        });

        let fallback = self.inner.fallback;
        async move {
            match task.await {
                Ok(suggestions) => suggestions,
                Err(err) => {
                    warn!(error = %err, %category, "suggestion task aborted, using fallback catalog");
                    bounded(fallback.suggestions(state, category))
                }
            }
        }
        .boxed()
        .shared()
    }
}

impl std::fmt::Debug for SuggestionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuggestionResolver")
            .field("has_generator", &self.has_generator())
            .field("generation_timeout", &self.inner.generation_timeout)
            .field("cached_entries", &self.inner.cache.len())
            .finish_non_exhaustive()
    }
}

impl ResolverInner {
    async fn resolve_uncached(
        &self,
        address: &str,
        parsed: &ParsedAddress,
        category: UtilityCategory,
    ) -> Vec<ProviderSuggestion> {
        let Some(generator) = &self.generator else {
            debug!(%category, "candidate generator not configured, using fallback catalog");
            return bounded(self.fallback.suggestions(parsed.state, category));
        };

        let prompt = build_prompt(address, parsed, category);
        let outcome = tokio::time::timeout(self.generation_timeout, generator.generate(&prompt))
            .await
            .unwrap_or(GenerationResult::Failed(GenerationFailure::TimedOut(
                self.generation_timeout,
            )));

        match accept_candidates(outcome, category) {
            Ok(suggestions) => {
                info!(%category, count = suggestions.len(), "generated provider suggestions");
                suggestions
            }
            Err(failure) => {
                warn!(%category, error = %failure, "candidate generation failed, using fallback catalog");
                bounded(self.fallback.suggestions(parsed.state, category))
            }
        }
    }
}

/// Validated generator output, or the reason it cannot be used. Generated and
/// fallback suggestions are never mixed.
fn accept_candidates(
    outcome: GenerationResult,
    category: UtilityCategory,
) -> Result<Vec<ProviderSuggestion>, GenerationFailure> {
    let candidates = match outcome {
        GenerationResult::Ok(candidates) => candidates,
        GenerationResult::Failed(failure) => return Err(failure),
    };

    let total = candidates.len();
    let mut suggestions: Vec<ProviderSuggestion> = candidates
        .iter()
        .filter(|candidate| candidate.is_structurally_acceptable())
        .filter_map(|candidate| validate_candidate(candidate, category).ok())
        .collect();

    if suggestions.len() < total {
        debug!(
            %category,
            dropped = total - suggestions.len(),
            "dropped malformed candidates"
        );
    }

    if suggestions.is_empty() {
        return Err(GenerationFailure::Malformed(
            "no structurally acceptable candidates".to_string(),
        ));
    }

    suggestions.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    suggestions.truncate(MAX_CANDIDATES);
    Ok(suggestions)
}

fn bounded(mut suggestions: Vec<ProviderSuggestion>) -> Vec<ProviderSuggestion> {
    suggestions.truncate(MAX_CANDIDATES);
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::utilities::validator::RawCandidate;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const ADDRESS: &str = "123 Main St, Philadelphia, PA 19103";

    struct ScriptedGenerator {
        calls: AtomicUsize,
        delay: Duration,
        response: GenerationResult,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        fn new(response: GenerationResult) -> Self {
            Self::delayed(response, Duration::ZERO)
        }

        fn delayed(response: GenerationResult, delay: Duration) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay,
                response,
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CandidateGenerator for ScriptedGenerator {
        async fn generate(&self, prompt: &str) -> GenerationResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().expect("prompt mutex").push(prompt.to_string());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.response.clone()
        }
    }

    fn candidates(values: serde_json::Value) -> GenerationResult {
        let items = values.as_array().expect("array").clone();
        GenerationResult::Ok(items.into_iter().filter_map(RawCandidate::from_value).collect())
    }

    fn resolver_with(generator: Arc<ScriptedGenerator>) -> SuggestionResolver {
        SuggestionResolver::new(
            Arc::new(SuggestionCache::default()),
            Some(generator),
            DEFAULT_GENERATION_TIMEOUT,
        )
    }

    #[tokio::test]
    async fn generated_candidates_are_validated_sorted_and_bounded() {
        let generator = Arc::new(ScriptedGenerator::new(candidates(json!([
            { "display_name": "PPL Electric Utilities", "confidence": 0.4 },
            { "display_name": "PECO", "confidence": 1.7, "contact_website": "peco.com" },
            { "display_name": "Constellation", "confidence": 0.6 },
            { "display_name": "Direct Energy", "confidence": 0.5 },
        ]))));
        let resolver = resolver_with(generator.clone());

        let suggestions = resolver.resolve(ADDRESS, UtilityCategory::Electric).await;
        let names: Vec<&str> = suggestions.iter().map(|s| s.display_name.as_str()).collect();
        assert_eq!(names, vec!["PECO", "Constellation", "Direct Energy"]);
        assert_eq!(suggestions[0].confidence, 1.0);
        assert!(suggestions[0].contact_website.is_none());
        assert_eq!(generator.calls(), 1);

        let prompts = generator.prompts.lock().expect("prompt mutex");
        assert!(prompts[0].contains("electric"));
        assert!(prompts[0].contains(ADDRESS));
    }

    #[tokio::test]
    async fn second_request_is_served_from_cache() {
        let generator = Arc::new(ScriptedGenerator::new(candidates(json!([
            { "display_name": "PECO", "confidence": 0.9 },
        ]))));
        let resolver = resolver_with(generator.clone());

        let first = resolver.resolve(ADDRESS, UtilityCategory::Electric).await;
        let second = resolver
            .resolve("900 Walnut St, Philadelphia, PA 19107", UtilityCategory::Electric)
            .await;

        assert_eq!(first, second);
        assert_eq!(generator.calls(), 1);
        assert!(resolver.cache().get("suggestions:PA:191:electric").is_some());
    }

    #[tokio::test]
    async fn failed_generation_falls_back_without_merging() {
        let generator = Arc::new(ScriptedGenerator::new(GenerationResult::Failed(
            GenerationFailure::Transport("connection reset".to_string()),
        )));
        let resolver = resolver_with(generator);

        let suggestions = resolver.resolve(ADDRESS, UtilityCategory::Gas).await;
        let names: Vec<&str> = suggestions.iter().map(|s| s.display_name.as_str()).collect();
        assert_eq!(names, vec!["Philadelphia Gas Works", "PECO", "Columbia Gas of Pennsylvania"]);
        assert_eq!(suggestions[0].confidence, 0.95);
        assert_eq!(suggestions[0].rationale_short, "Common gas provider in PA");
    }

    #[tokio::test]
    async fn zero_acceptable_candidates_is_treated_as_failure() {
        let generator = Arc::new(ScriptedGenerator::new(candidates(json!([
            { "display_name": "PECO", "confidence": "very high" },
            { "display_name": "", "confidence": 0.9 },
            { "confidence": 0.8 },
        ]))));
        let resolver = resolver_with(generator);

        let suggestions = resolver.resolve(ADDRESS, UtilityCategory::Electric).await;
        assert_eq!(suggestions[0].display_name, "PECO");
        assert_eq!(suggestions[0].rationale_short, "Common electric provider in PA");
        assert_eq!(suggestions.len(), 3);
    }

    #[tokio::test]
    async fn malformed_candidates_are_dropped_individually() {
        let generator = Arc::new(ScriptedGenerator::new(candidates(json!([
            { "display_name": "PECO", "confidence": "very high" },
            { "display_name": "PPL Electric Utilities", "confidence": 0.7 },
        ]))));
        let resolver = resolver_with(generator);

        let suggestions = resolver.resolve(ADDRESS, UtilityCategory::Electric).await;
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].display_name, "PPL Electric Utilities");
    }

    #[tokio::test(start_paused = true)]
    async fn slow_generation_times_out_to_fallback() {
        let generator = Arc::new(ScriptedGenerator::delayed(
            candidates(json!([{ "display_name": "Too Late Power", "confidence": 0.99 }])),
            Duration::from_secs(30),
        ));
        let resolver = SuggestionResolver::new(
            Arc::new(SuggestionCache::default()),
            Some(generator.clone()),
            Duration::from_secs(5),
        );

        let suggestions = resolver.resolve(ADDRESS, UtilityCategory::Water).await;
        assert_eq!(suggestions[0].display_name, "Philadelphia Water Department");
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn missing_generator_uses_fallback() {
        let resolver = SuggestionResolver::fallback_only(Arc::new(SuggestionCache::default()));
        assert!(!resolver.has_generator());

        let suggestions = resolver.resolve("somewhere quiet", UtilityCategory::Propane).await;
        assert_eq!(suggestions[0].display_name, "AmeriGas");
        assert_eq!(suggestions[0].rationale_short, "Common propane provider");
        assert!(resolver
            .cache()
            .get("suggestions:DEFAULT:UNKNOWN:propane")
            .is_some());
    }

    #[tokio::test]
    async fn concurrent_requests_share_one_generation() {
        let generator = Arc::new(ScriptedGenerator::delayed(
            candidates(json!([{ "display_name": "PECO", "confidence": 0.9 }])),
            Duration::from_millis(50),
        ));
        let resolver = resolver_with(generator.clone());

        let requests = (0..8).map(|_| resolver.resolve(ADDRESS, UtilityCategory::Electric));
        let results = join_all(requests).await;

        assert_eq!(generator.calls(), 1);
        assert!(results.iter().all(|result| result == &results[0]));
        assert_eq!(results[0][0].display_name, "PECO");
        assert!(resolver.inner.in_flight.lock().expect("map").is_empty());
    }

    #[tokio::test]
    async fn resolve_all_covers_each_category_once() {
        let generator = Arc::new(ScriptedGenerator::new(candidates(json!([
            { "display_name": "Local Provider", "confidence": 0.7 },
        ]))));
        let resolver = resolver_with(generator.clone());

        let categories = [
            UtilityCategory::Electric,
            UtilityCategory::Gas,
            UtilityCategory::Electric,
            UtilityCategory::Internet,
        ];
        let results = resolver.resolve_all(ADDRESS, &categories).await;

        assert_eq!(results.len(), 3);
        assert!(results.contains_key(&UtilityCategory::Internet));
        assert_eq!(generator.calls(), 3);
    }
}
