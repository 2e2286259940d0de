use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

use super::cache::SuggestionCache;
use super::domain::{ProviderSuggestion, UtilityCategory};
use super::generator::CandidateGenerator;
use super::openai::OpenAiCandidateGenerator;
use super::registry::{ProviderRegistry, RegistryLoadError};
use super::resolver::SuggestionResolver;
use super::search::SearchMatcher;
use crate::config::SuggestionsConfig;

/// Entry point used by the onboarding form: suggestions for a new property
/// and live search while the user types a provider name.
#[derive(Debug, Clone)]
pub struct ProviderSuggestionService {
    resolver: SuggestionResolver,
    matcher: SearchMatcher,
    sweep_interval: Duration,
}

impl ProviderSuggestionService {
    pub fn new(resolver: SuggestionResolver, matcher: SearchMatcher) -> Self {
        Self {
            resolver,
            matcher,
            sweep_interval: SuggestionsConfig::default().sweep_interval,
        }
    }

    /// Wire the cache, generator, and provider directory from configuration.
    /// Only the registry load can fail.
    pub fn from_config(config: &SuggestionsConfig) -> Result<Self, RegistryLoadError> {
        let registry = match &config.registry_path {
            Some(path) => {
                info!(path = %path.display(), "loading provider registry from disk");
                ProviderRegistry::from_path(path)?
            }
            None => ProviderRegistry::standard()?,
        };

        let cache = Arc::new(SuggestionCache::new(chrono::Duration::days(
            config.cache_ttl_days,
        )));

        let generator = OpenAiCandidateGenerator::from_config(config)
            .map(|generator| Arc::new(generator) as Arc<dyn CandidateGenerator>);
        match &generator {
            Some(_) => info!(model = %config.model, "candidate generation enabled"),
            None => info!("no generator API key configured, serving fallback suggestions only"),
        }

        info!(
            providers = registry.len(),
            ttl_days = config.cache_ttl_days,
            "provider suggestion service ready"
        );

        let resolver = SuggestionResolver::new(cache, generator, config.timeout);
        let matcher = SearchMatcher::new(Arc::new(registry));

        Ok(Self {
            resolver,
            matcher,
            sweep_interval: config.sweep_interval,
        })
    }

    /// Up to three suggestions for one category, highest confidence first.
    pub async fn get_suggestions(
        &self,
        address: &str,
        category: UtilityCategory,
    ) -> Vec<ProviderSuggestion> {
        self.resolver.resolve(address, category).await
    }

    /// Suggestions for every requested category, resolved concurrently.
    pub async fn get_all_suggestions(
        &self,
        address: &str,
        categories: &[UtilityCategory],
    ) -> BTreeMap<UtilityCategory, Vec<ProviderSuggestion>> {
        self.resolver.resolve_all(address, categories).await
    }

    pub fn search_providers(
        &self,
        query: &str,
        category: Option<UtilityCategory>,
    ) -> Vec<ProviderSuggestion> {
        self.matcher.search(query, category)
    }

    /// Start the periodic cache sweep. Must be called inside a tokio runtime.
    pub fn spawn_cache_eviction(&self) -> JoinHandle<()> {
        self.resolver.cache().spawn_eviction(self.sweep_interval)
    }

    pub fn resolver(&self) -> &SuggestionResolver {
        &self.resolver
    }
}
