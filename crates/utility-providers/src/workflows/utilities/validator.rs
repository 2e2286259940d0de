use serde::Deserialize;
use serde_json::{Map, Value};
use url::Url;

use super::domain::{clamp_confidence, ProviderSuggestion, UtilityCategory};

const MAX_NAME_CHARS: usize = 120;
const MAX_RATIONALE_CHARS: usize = 200;
const PHONE_SEPARATORS: [char; 6] = [' ', '-', '.', '(', ')', '+'];

/// Provider record exactly as the generator returned it. Nothing here is
/// trusted until it has been through [`validate_candidate`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct RawCandidate(Map<String, Value>);

impl RawCandidate {
    /// Only JSON objects can become candidates.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    fn text(&self, name: &str) -> Option<&str> {
        self.field(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// A usable record names a provider and carries a numeric confidence.
    pub fn is_structurally_acceptable(&self) -> bool {
        self.text("display_name").is_some()
            && self.field("confidence").is_some_and(Value::is_number)
    }
}

impl From<Map<String, Value>> for RawCandidate {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedCandidate {
    #[error("candidate is missing a display name")]
    MissingDisplayName,
}

/// Turn an untrusted record into a suggestion. Each field is checked on its
/// own: a bad phone number drops the phone, not the provider.
pub fn validate_candidate(
    raw: &RawCandidate,
    category: UtilityCategory,
) -> Result<ProviderSuggestion, MalformedCandidate> {
    let display_name = raw
        .text("display_name")
        .map(|name| truncate_chars(name, MAX_NAME_CHARS))
        .ok_or(MalformedCandidate::MissingDisplayName)?;

    let confidence = raw
        .field("confidence")
        .and_then(Value::as_f64)
        .map(clamp_confidence)
        .unwrap_or(0.0);

    let rationale_short = raw
        .text("rationale_short")
        .map(|rationale| truncate_chars(rationale, MAX_RATIONALE_CHARS))
        .unwrap_or_else(|| format!("{category} provider for this area"));

    Ok(ProviderSuggestion {
        display_name,
        confidence,
        rationale_short,
        contact_phone: raw.text("contact_phone").and_then(sanitize_phone),
        contact_website: raw.text("contact_website").and_then(sanitize_website),
        canonical_id: raw.text("canonical_id").map(str::to_string),
    })
}

/// Accepts 10 digits, or 11 with a leading country code of 1.
fn sanitize_phone(raw: &str) -> Option<String> {
    if !raw
        .chars()
        .all(|c| c.is_ascii_digit() || PHONE_SEPARATORS.contains(&c))
    {
        return None;
    }

    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    match digits.len() {
        10 => Some(raw.to_string()),
        11 if digits.starts_with('1') => Some(raw.to_string()),
        _ => None,
    }
}

fn sanitize_website(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    let web_scheme = matches!(url.scheme(), "http" | "https");
    let has_host = url.host_str().is_some_and(|host| !host.is_empty());
    (web_scheme && has_host).then(|| raw.to_string())
}

fn truncate_chars(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((cut, _)) => value[..cut].trim_end().to_string(),
        None => value.to_string(),
    }
}
