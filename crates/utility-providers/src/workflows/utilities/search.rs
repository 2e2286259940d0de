use std::sync::Arc;

use super::domain::{ProviderSuggestion, UtilityCategory};
use super::registry::{normalize_name, CanonicalProviderRecord, ProviderRegistry};

pub const SEARCH_CONFIDENCE: f64 = 1.0;

/// Live lookup for what the user types into the provider field. Never touches
/// the generator or the suggestion cache.
#[derive(Debug, Clone)]
pub struct SearchMatcher {
    registry: Arc<ProviderRegistry>,
}

impl SearchMatcher {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self { registry }
    }

    /// Case-insensitive substring match against names and aliases, in
    /// registry order. Blank queries match nothing.
    pub fn search(&self, query: &str, category: Option<UtilityCategory>) -> Vec<ProviderSuggestion> {
        let needle = normalize_name(query);
        if needle.is_empty() {
            return Vec::new();
        }

        self.registry
            .records()
            .iter()
            .filter(|record| category.map_or(true, |category| record.serves(category)))
            .filter(|record| matches_query(record, &needle))
            .map(to_suggestion)
            .collect()
    }
}

fn matches_query(record: &CanonicalProviderRecord, needle: &str) -> bool {
    record.normalized_name.contains(needle)
        || record.aliases.iter().any(|alias| alias.contains(needle))
}

fn to_suggestion(record: &CanonicalProviderRecord) -> ProviderSuggestion {
    let services = record
        .service_types
        .iter()
        .map(|category| category.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    ProviderSuggestion {
        display_name: record.display_name.clone(),
        confidence: SEARCH_CONFIDENCE,
        rationale_short: format!("Provider directory match ({services})"),
        contact_phone: None,
        contact_website: None,
        canonical_id: Some(record.id.clone()),
    }
}
