use super::domain::{ProviderSuggestion, UtilityCategory};

/// Static provider lists used whenever generation cannot produce an answer.
///
/// Every category has a nationwide default, so [`FallbackCatalog::providers`]
/// never returns an empty list.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackCatalog;

impl FallbackCatalog {
    pub fn providers(&self, state: Option<&str>, category: UtilityCategory) -> &'static [&'static str] {
        state
            .and_then(|code| state_providers(&code.to_ascii_uppercase(), category))
            .unwrap_or_else(|| default_providers(category))
    }

    /// Provider names scored by list position.
    pub fn suggestions(
        &self,
        state: Option<&str>,
        category: UtilityCategory,
    ) -> Vec<ProviderSuggestion> {
        let rationale = match state {
            Some(code) => format!("Common {category} provider in {code}"),
            None => format!("Common {category} provider"),
        };

        self.providers(state, category)
            .iter()
            .enumerate()
            .map(|(rank, name)| ProviderSuggestion::new(*name, rank_confidence(rank), rationale.clone()))
            .collect()
    }
}

/// 0.95 for the first name, 0.15 less for each one after it, never below 0.6.
pub fn rank_confidence(rank: usize) -> f64 {
    let hundredths = 95_i64.saturating_sub(15_i64.saturating_mul(rank as i64)).max(60);
    hundredths as f64 / 100.0
}

fn default_providers(category: UtilityCategory) -> &'static [&'static str] {
    use UtilityCategory::*;

    match category {
        Electric => &["Local electric utility", "Constellation", "Direct Energy"],
        Gas => &["Local natural gas utility", "Constellation", "Direct Energy"],
        Water => &["Municipal water department", "American Water", "Aqua"],
        Sewer => &["Municipal sewer authority", "American Water"],
        Trash => &[
            "Waste Management",
            "Republic Services",
            "Municipal sanitation department",
        ],
        Propane => &["AmeriGas", "Ferrellgas", "Suburban Propane"],
        Oil => &["Local heating oil supplier", "Petro Home Services"],
        Internet => &["Xfinity", "Spectrum", "AT&T Internet"],
        Cable => &["Xfinity", "Spectrum", "DIRECTV"],
    }
}

fn state_providers(state: &str, category: UtilityCategory) -> Option<&'static [&'static str]> {
    use UtilityCategory::*;

    let providers: &'static [&'static str] = match (state, category) {
        ("AZ", Electric) => &[
            "Arizona Public Service",
            "Salt River Project",
            "Tucson Electric Power",
        ],
        ("AZ", Gas) => &["Southwest Gas"],
        ("AZ", Internet) => &["Cox Communications", "CenturyLink", "Xfinity"],

        ("CA", Electric) => &[
            "Pacific Gas and Electric",
            "Southern California Edison",
            "San Diego Gas & Electric",
            "Los Angeles Department of Water and Power",
        ],
        ("CA", Gas) => &[
            "Pacific Gas and Electric",
            "SoCalGas",
            "San Diego Gas & Electric",
        ],
        ("CA", Water) => &[
            "Los Angeles Department of Water and Power",
            "California Water Service",
            "San Francisco Public Utilities Commission",
        ],
        ("CA", Internet) => &["Spectrum", "AT&T Internet", "Xfinity"],

        ("CO", Electric) => &["Xcel Energy", "Colorado Springs Utilities", "Black Hills Energy"],
        ("CO", Gas) => &["Xcel Energy", "Black Hills Energy", "Atmos Energy"],
        ("CO", Water) => &["Denver Water", "Colorado Springs Utilities"],

        ("DC", Electric) => &["Pepco"],
        ("DC", Gas) => &["Washington Gas"],
        ("DC", Water) => &["DC Water"],
        ("DC", Sewer) => &["DC Water"],

        ("FL", Electric) => &[
            "Florida Power & Light",
            "Duke Energy Florida",
            "Tampa Electric",
        ],
        ("FL", Gas) => &["Peoples Gas", "Florida City Gas", "TECO Peoples Gas"],
        ("FL", Internet) => &["Spectrum", "Xfinity", "AT&T Internet"],

        ("GA", Electric) => &["Georgia Power", "Georgia EMC"],
        ("GA", Gas) => &["Georgia Natural Gas", "SCANA Energy", "Atlanta Gas Light"],
        ("GA", Water) => &["Atlanta Department of Watershed Management"],

        ("IA", Electric) => &["MidAmerican Energy", "Alliant Energy"],
        ("IA", Gas) => &["MidAmerican Energy", "Black Hills Energy", "Alliant Energy"],
        ("IA", Water) => &["Des Moines Water Works", "Iowa American Water"],

        ("IL", Electric) => &["ComEd", "Ameren Illinois"],
        ("IL", Gas) => &["Nicor Gas", "Peoples Gas", "Ameren Illinois"],
        ("IL", Water) => &["Chicago Department of Water Management", "Illinois American Water"],

        ("MA", Electric) => &["Eversource", "National Grid", "Unitil"],
        ("MA", Gas) => &["National Grid", "Eversource", "Liberty Utilities"],
        ("MA", Oil) => &["Petro Home Services", "Local heating oil supplier"],

        ("MI", Electric) => &["DTE Energy", "Consumers Energy"],
        ("MI", Gas) => &["DTE Energy", "Consumers Energy", "SEMCO Energy Gas"],

        ("NC", Electric) => &[
            "Duke Energy Carolinas",
            "Duke Energy Progress",
            "Dominion Energy North Carolina",
        ],
        ("NC", Gas) => &["Piedmont Natural Gas", "Dominion Energy North Carolina"],

        ("NJ", Electric) => &["PSE&G", "JCP&L", "Atlantic City Electric"],
        ("NJ", Gas) => &["PSE&G", "New Jersey Natural Gas", "South Jersey Gas"],
        ("NJ", Water) => &["New Jersey American Water", "Veolia Water New Jersey"],
        ("NJ", Internet) => &["Optimum", "Xfinity", "Verizon Fios"],

        ("NY", Electric) => &["Con Edison", "National Grid", "NYSEG", "Central Hudson"],
        ("NY", Gas) => &["Con Edison", "National Grid", "NYSEG"],
        ("NY", Water) => &["NYC Department of Environmental Protection"],
        ("NY", Oil) => &["Petro Home Services", "Local heating oil supplier"],
        ("NY", Internet) => &["Spectrum", "Verizon Fios", "Optimum"],

        ("OH", Electric) => &["AEP Ohio", "Ohio Edison", "Duke Energy Ohio"],
        ("OH", Gas) => &[
            "Columbia Gas of Ohio",
            "Dominion Energy Ohio",
            "Duke Energy Ohio",
        ],

        ("PA", Electric) => &[
            "PECO",
            "PPL Electric Utilities",
            "Duquesne Light",
            "Met-Ed",
        ],
        ("PA", Gas) => &[
            "Philadelphia Gas Works",
            "PECO",
            "Columbia Gas of Pennsylvania",
            "UGI Utilities",
        ],
        ("PA", Water) => &[
            "Philadelphia Water Department",
            "Pennsylvania American Water",
            "Aqua Pennsylvania",
        ],
        ("PA", Sewer) => &["Philadelphia Water Department", "Pennsylvania American Water"],
        ("PA", Oil) => &["Petro Home Services", "Local heating oil supplier"],
        ("PA", Internet) => &["Xfinity", "Verizon Fios", "RCN"],

        ("TX", Electric) => &["Oncor", "CenterPoint Energy", "TXU Energy", "Reliant Energy"],
        ("TX", Gas) => &["Atmos Energy", "CenterPoint Energy", "Texas Gas Service"],
        ("TX", Internet) => &["Spectrum", "AT&T Internet", "Xfinity"],

        ("VA", Electric) => &["Dominion Energy Virginia", "Appalachian Power"],
        ("VA", Gas) => &["Washington Gas", "Columbia Gas of Virginia", "Virginia Natural Gas"],

        ("WA", Electric) => &["Puget Sound Energy", "Seattle City Light", "Avista"],
        ("WA", Gas) => &["Puget Sound Energy", "Cascade Natural Gas", "Avista"],
        ("WA", Water) => &["Seattle Public Utilities"],

        _ => return None,
    };

    Some(providers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_category_has_providers_for_known_and_unknown_states() {
        let catalog = FallbackCatalog;
        for category in UtilityCategory::ALL {
            for state in [Some("PA"), Some("ZZ"), None] {
                assert!(
                    !catalog.providers(state, category).is_empty(),
                    "{category} fallback empty for {state:?}"
                );
            }
        }
    }

    #[test]
    fn state_lists_take_precedence_over_defaults() {
        let catalog = FallbackCatalog;
        assert_eq!(catalog.providers(Some("PA"), UtilityCategory::Electric)[0], "PECO");
        assert_eq!(catalog.providers(Some("pa"), UtilityCategory::Electric)[0], "PECO");
        assert_eq!(
            catalog.providers(Some("PA"), UtilityCategory::Propane),
            default_providers(UtilityCategory::Propane)
        );
    }

    #[test]
    fn confidence_steps_down_and_floors() {
        assert_eq!(rank_confidence(0), 0.95);
        assert_eq!(rank_confidence(1), 0.8);
        assert_eq!(rank_confidence(2), 0.65);
        assert_eq!(rank_confidence(3), 0.6);
        assert_eq!(rank_confidence(40), 0.6);
    }

    #[test]
    fn rationale_mentions_state_when_known() {
        let catalog = FallbackCatalog;
        let with_state = catalog.suggestions(Some("NY"), UtilityCategory::Gas);
        assert_eq!(with_state[0].display_name, "Con Edison");
        assert_eq!(with_state[0].rationale_short, "Common gas provider in NY");

        let without_state = catalog.suggestions(None, UtilityCategory::Trash);
        assert_eq!(without_state[0].rationale_short, "Common trash provider");
        assert_eq!(without_state[2].confidence, 0.65);
    }
}
