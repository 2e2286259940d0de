//! End-to-end resolution through the public service facade: cache behavior,
//! request coalescing, and degradation to the fallback catalog.

mod common {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::Value;

    use utility_providers::workflows::utilities::generator::parse_candidates;
    use utility_providers::workflows::utilities::{
        CandidateGenerator, GenerationResult, ProviderRegistry, ProviderSuggestionService,
        SearchMatcher, SuggestionCache, SuggestionResolver,
    };

    /// Answers every prompt with the same JSON text after an optional delay.
    pub(super) struct CannedGenerator {
        calls: AtomicUsize,
        delay: Duration,
        body: Value,
    }

    impl CannedGenerator {
        pub(super) fn new(body: Value, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                delay,
                body,
            })
        }

        pub(super) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CandidateGenerator for CannedGenerator {
        async fn generate(&self, _prompt: &str) -> GenerationResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            parse_candidates(&self.body.to_string())
        }
    }

    pub(super) fn service_with(
        generator: Arc<CannedGenerator>,
        timeout: Duration,
    ) -> ProviderSuggestionService {
        let cache = Arc::new(SuggestionCache::default());
        let resolver = SuggestionResolver::new(cache, Some(generator), timeout);
        let registry = ProviderRegistry::standard().expect("bundled registry parses");
        ProviderSuggestionService::new(resolver, SearchMatcher::new(Arc::new(registry)))
    }
}

use std::time::Duration;

use serde_json::json;
use utility_providers::workflows::utilities::{suggestion_cache_key, UtilityCategory};

use common::{service_with, CannedGenerator};

const PHILADELPHIA: &str = "123 Main St, Philadelphia, PA 19103";

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_misses_trigger_a_single_generation() {
    let generator = CannedGenerator::new(
        json!([
            { "display_name": "PECO", "confidence": 0.92, "rationale_short": "Serves Philadelphia" },
            { "display_name": "Constellation", "confidence": 0.41 },
        ]),
        Duration::from_millis(100),
    );
    let service = std::sync::Arc::new(service_with(generator.clone(), Duration::from_secs(6)));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .get_suggestions(PHILADELPHIA, UtilityCategory::Electric)
                    .await
            })
        })
        .collect();

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.expect("task completes"));
    }

    assert_eq!(generator.calls(), 1);
    assert!(results.iter().all(|result| result == &results[0]));
    assert_eq!(results[0].len(), 2);
    assert_eq!(results[0][0].display_name, "PECO");
    assert_eq!(results[0][0].rationale_short, "Serves Philadelphia");
    assert_eq!(
        results[0][1].rationale_short,
        "electric provider for this area"
    );
}

#[tokio::test]
async fn cached_results_are_shared_across_nearby_addresses() {
    let generator = CannedGenerator::new(
        json!([{ "display_name": "Philadelphia Water Department", "confidence": 0.9 }]),
        Duration::ZERO,
    );
    let service = service_with(generator.clone(), Duration::from_secs(6));

    let first = service
        .get_suggestions(PHILADELPHIA, UtilityCategory::Water)
        .await;
    let second = service
        .get_suggestions("1 S Broad St, Philadelphia, Pennsylvania 19107", UtilityCategory::Water)
        .await;

    assert_eq!(first, second);
    assert_eq!(generator.calls(), 1);
    assert_eq!(
        suggestion_cache_key(PHILADELPHIA, UtilityCategory::Water),
        "suggestions:PA:191:water"
    );
    assert!(service
        .resolver()
        .cache()
        .get("suggestions:PA:191:water")
        .is_some());
}

#[tokio::test(start_paused = true)]
async fn generator_timeout_serves_fallback_catalog() {
    let generator = CannedGenerator::new(
        json!([{ "display_name": "Eventually Electric", "confidence": 0.99 }]),
        Duration::from_secs(60),
    );
    let service = service_with(generator, Duration::from_secs(6));

    let suggestions = service
        .get_suggestions(PHILADELPHIA, UtilityCategory::Electric)
        .await;

    let names: Vec<&str> = suggestions.iter().map(|s| s.display_name.as_str()).collect();
    assert_eq!(names, vec!["PECO", "PPL Electric Utilities", "Duquesne Light"]);
    let confidences: Vec<f64> = suggestions.iter().map(|s| s.confidence).collect();
    assert_eq!(confidences, vec![0.95, 0.8, 0.65]);
}

#[tokio::test]
async fn unusable_output_never_surfaces_as_an_error() {
    let generator = CannedGenerator::new(json!({ "answer": "call the city" }), Duration::ZERO);
    let service = service_with(generator, Duration::from_secs(6));

    let suggestions = service
        .get_suggestions("somewhere without commas", UtilityCategory::Trash)
        .await;

    assert!(!suggestions.is_empty());
    assert!(suggestions.len() <= 3);
    assert!(suggestions
        .iter()
        .all(|s| s.rationale_short == "Common trash provider"));
}

#[tokio::test]
async fn batch_lookup_returns_every_requested_category() {
    let generator = CannedGenerator::new(
        json!([
            { "display_name": "Regional Utility", "confidence": 0.7, "contact_phone": "(215) 555-0100" },
            { "display_name": "Bad Contact Co", "confidence": 0.6, "contact_phone": "123", "contact_website": "example.com" },
        ]),
        Duration::ZERO,
    );
    let service = service_with(generator.clone(), Duration::from_secs(6));

    let results = service
        .get_all_suggestions(PHILADELPHIA, &UtilityCategory::ALL)
        .await;

    assert_eq!(results.len(), UtilityCategory::ALL.len());
    assert_eq!(generator.calls(), UtilityCategory::ALL.len());
    for suggestions in results.values() {
        assert_eq!(suggestions[0].contact_phone.as_deref(), Some("(215) 555-0100"));
        assert!(suggestions[1].contact_phone.is_none());
        assert!(suggestions[1].contact_website.is_none());
    }
}
