use std::fmt::Write as _;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::domain::{ParsedAddress, UtilityCategory};
use super::validator::RawCandidate;

/// Outcome of one generation attempt. Validation only ever sees `Ok`.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationResult {
    Ok(Vec<RawCandidate>),
    Failed(GenerationFailure),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationFailure {
    #[error("candidate generator is not configured")]
    Unavailable,
    #[error("candidate generation timed out after {0:?}")]
    TimedOut(Duration),
    #[error("candidate generator transport error: {0}")]
    Transport(String),
    #[error("candidate generator returned status {status}: {body}")]
    Api { status: u16, body: String },
    #[error("candidate generator returned malformed output: {0}")]
    Malformed(String),
}

/// External capability that proposes providers for a prompt. Implementations
/// report every problem as [`GenerationResult::Failed`] instead of erroring.
#[async_trait]
pub trait CandidateGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> GenerationResult;
}

pub const MAX_CANDIDATES: usize = 3;

/// Prompt scoped to one address and one utility category.
pub fn build_prompt(address: &str, parsed: &ParsedAddress, category: UtilityCategory) -> String {
    let mut prompt = String::new();
    writeln!(
        prompt,
        "Identify up to {MAX_CANDIDATES} {category} service providers that plausibly serve this property."
    )
    .expect("write prompt intro");
    writeln!(prompt, "Address: {}", address.trim()).expect("write prompt address");

    let mut location = Vec::new();
    if let Some(city) = &parsed.city {
        location.push(format!("city {city}"));
    }
    if let Some(state) = parsed.state {
        location.push(format!("state {state}"));
    }
    if let Some(zip) = &parsed.zip {
        location.push(format!("ZIP {zip}"));
    }
    if !location.is_empty() {
        writeln!(prompt, "Parsed location: {}", location.join(", ")).expect("write prompt location");
    }

    writeln!(
        prompt,
        "Respond with only a JSON array of 1 to {MAX_CANDIDATES} objects, ordered by descending confidence. \
Each object must have \"display_name\" (string), \"confidence\" (number between 0 and 1), \
and \"rationale_short\" (string under 100 characters)."
    )
    .expect("write prompt format");
    write!(
        prompt,
        "Only include providers that actually offer {category} service at this location."
    )
    .expect("write prompt constraint");
    prompt
}

/// Interpret generator text as candidates. Anything other than an array of
/// objects (optionally fenced, or wrapped in a single object field) fails.
pub fn parse_candidates(text: &str) -> GenerationResult {
    let body = strip_code_fence(text.trim());
    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(err) => return GenerationResult::Failed(GenerationFailure::Malformed(err.to_string())),
    };

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            let wrapped = ["providers", "suggestions", "candidates"]
                .iter()
                .find_map(|field| match map.remove(*field) {
                    Some(Value::Array(items)) => Some(items),
                    _ => None,
                });
            match wrapped {
                Some(items) => items,
                None => {
                    return GenerationResult::Failed(GenerationFailure::Malformed(
                        "expected a JSON array of candidates".to_string(),
                    ))
                }
            }
        }
        other => {
            return GenerationResult::Failed(GenerationFailure::Malformed(format!(
                "expected a JSON array of candidates, got {}",
                json_kind(&other)
            )))
        }
    };

    let candidates: Vec<RawCandidate> = items.into_iter().filter_map(RawCandidate::from_value).collect();
    if candidates.is_empty() {
        return GenerationResult::Failed(GenerationFailure::Malformed(
            "no candidate objects in response".to_string(),
        ));
    }

    GenerationResult::Ok(candidates)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
