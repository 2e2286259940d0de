use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Utility service types collected during property intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UtilityCategory {
    Electric,
    Gas,
    Water,
    Sewer,
    Trash,
    Propane,
    Oil,
    Internet,
    Cable,
}

impl UtilityCategory {
    pub const ALL: [UtilityCategory; 9] = [
        UtilityCategory::Electric,
        UtilityCategory::Gas,
        UtilityCategory::Water,
        UtilityCategory::Sewer,
        UtilityCategory::Trash,
        UtilityCategory::Propane,
        UtilityCategory::Oil,
        UtilityCategory::Internet,
        UtilityCategory::Cable,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            UtilityCategory::Electric => "electric",
            UtilityCategory::Gas => "gas",
            UtilityCategory::Water => "water",
            UtilityCategory::Sewer => "sewer",
            UtilityCategory::Trash => "trash",
            UtilityCategory::Propane => "propane",
            UtilityCategory::Oil => "oil",
            UtilityCategory::Internet => "internet",
            UtilityCategory::Cable => "cable",
        }
    }
}

impl fmt::Display for UtilityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown utility category '{0}'")]
pub struct UnknownCategory(pub String);

impl FromStr for UtilityCategory {
    type Err = UnknownCategory;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        UtilityCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == normalized)
            .ok_or_else(|| UnknownCategory(value.trim().to_string()))
    }
}

/// Validated provider candidate ready for display in the intake wizard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSuggestion {
    pub display_name: String,
    pub confidence: f64,
    pub rationale_short: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_id: Option<String>,
}

impl ProviderSuggestion {
    pub(crate) fn new(
        display_name: impl Into<String>,
        confidence: f64,
        rationale_short: impl Into<String>,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            confidence: clamp_confidence(confidence),
            rationale_short: rationale_short.into(),
            contact_phone: None,
            contact_website: None,
            canonical_id: None,
        }
    }
}

pub(crate) fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Best-effort breakdown of a free-form street address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedAddress {
    pub state: Option<&'static str>,
    pub city: Option<String>,
    pub zip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_resolution: Option<StateResolution>,
}

impl ParsedAddress {
    /// First three digits of the ZIP code, the coarse region used for caching.
    pub fn zip_prefix(&self) -> Option<&str> {
        self.zip.as_deref().and_then(|zip| zip.get(..3))
    }
}

/// How the parser settled on a state, kept so cache-key collisions between
/// similarly named places can be traced back to the rule that fired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateResolution {
    pub rule: StateRule,
    /// Other states whose code or name also appeared in the address.
    pub alternatives: Vec<&'static str>,
}

impl StateResolution {
    pub fn is_ambiguous(&self) -> bool {
        !self.alternatives.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StateRule {
    /// Two-letter postal code or district marker such as "D.C.".
    Code,
    /// Full state name.
    Name,
}
