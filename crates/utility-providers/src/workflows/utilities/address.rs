use std::sync::OnceLock;

use regex::Regex;

use super::domain::{ParsedAddress, StateResolution, StateRule};

struct StateEntry {
    code: &'static str,
    name: &'static str,
    markers: &'static [&'static str],
}

const fn state(code: &'static str, name: &'static str) -> StateEntry {
    StateEntry {
        code,
        name,
        markers: &[],
    }
}

/// Lookup order is alphabetical by full name, with West Virginia ahead of
/// Virginia so the longer name is tried first. The first entry that matches
/// anywhere in the address wins.
const STATES: [StateEntry; 51] = [
    state("AL", "alabama"),
    state("AK", "alaska"),
    state("AZ", "arizona"),
    state("AR", "arkansas"),
    state("CA", "california"),
    state("CO", "colorado"),
    state("CT", "connecticut"),
    state("DE", "delaware"),
    StateEntry {
        code: "DC",
        name: "district of columbia",
        markers: &["d c"],
    },
    state("FL", "florida"),
    state("GA", "georgia"),
    state("HI", "hawaii"),
    state("ID", "idaho"),
    state("IL", "illinois"),
    state("IN", "indiana"),
    state("IA", "iowa"),
    state("KS", "kansas"),
    state("KY", "kentucky"),
    state("LA", "louisiana"),
    state("ME", "maine"),
    state("MD", "maryland"),
    state("MA", "massachusetts"),
    state("MI", "michigan"),
    state("MN", "minnesota"),
    state("MS", "mississippi"),
    state("MO", "missouri"),
    state("MT", "montana"),
    state("NE", "nebraska"),
    state("NV", "nevada"),
    state("NH", "new hampshire"),
    state("NJ", "new jersey"),
    state("NM", "new mexico"),
    state("NY", "new york"),
    state("NC", "north carolina"),
    state("ND", "north dakota"),
    state("OH", "ohio"),
    state("OK", "oklahoma"),
    state("OR", "oregon"),
    state("PA", "pennsylvania"),
    state("RI", "rhode island"),
    state("SC", "south carolina"),
    state("SD", "south dakota"),
    state("TN", "tennessee"),
    state("TX", "texas"),
    state("UT", "utah"),
    state("VT", "vermont"),
    state("WV", "west virginia"),
    state("VA", "virginia"),
    state("WA", "washington"),
    state("WI", "wisconsin"),
    state("WY", "wyoming"),
];

impl StateEntry {
    fn match_rule(&self, tokens: &[String]) -> Option<StateRule> {
        let code_hit = tokens
            .iter()
            .any(|token| token.eq_ignore_ascii_case(self.code));
        if code_hit || self.markers.iter().any(|marker| contains_phrase(tokens, marker)) {
            return Some(StateRule::Code);
        }

        contains_phrase(tokens, self.name).then_some(StateRule::Name)
    }

    fn is_exactly(&self, tokens: &[String]) -> bool {
        let phrase_equals = |phrase: &str| {
            let parts: Vec<&str> = phrase.split(' ').collect();
            parts.len() == tokens.len()
                && parts
                    .iter()
                    .zip(tokens)
                    .all(|(part, token)| token.as_str() == *part)
        };

        (tokens.len() == 1 && tokens[0].eq_ignore_ascii_case(self.code))
            || phrase_equals(self.name)
            || self.markers.iter().any(|marker| phrase_equals(marker))
    }
}

/// Heuristic parser for US street addresses typed into the intake wizard.
pub struct AddressParser;

impl AddressParser {
    /// Extract state, city, and ZIP. Every field degrades to `None`
    /// independently; parsing never fails.
    pub fn parse(raw: &str) -> ParsedAddress {
        let segments: Vec<&str> = raw
            .split(',')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .collect();

        let zip = extract_zip(raw);
        let zip_segment = zip.as_deref().and_then(|zip| {
            segments
                .iter()
                .rposition(|segment| segment.contains(zip))
        });

        let tokens = tokenize(raw);
        let matched = resolve_state(&tokens);

        let state_segment = matched.as_ref().and_then(|(entry, _)| {
            segments
                .iter()
                .rposition(|segment| entry.match_rule(&tokenize(segment)).is_some())
        });

        let city = extract_city(
            &segments,
            zip_segment.or(state_segment),
            matched.as_ref().map(|(entry, _)| *entry),
        );

        ParsedAddress {
            state: matched.as_ref().map(|(entry, _)| entry.code),
            city,
            zip,
            state_resolution: matched.map(|(_, resolution)| resolution),
        }
    }
}

fn zip_pattern() -> &'static Regex {
    static ZIP: OnceLock<Regex> = OnceLock::new();
    ZIP.get_or_init(|| Regex::new(r"\b(\d{5})(?:-\d{4})?\b").expect("zip pattern compiles"))
}

// The postal code trails the street number, so the last match wins.
fn extract_zip(raw: &str) -> Option<String> {
    zip_pattern()
        .captures_iter(raw)
        .last()
        .and_then(|captures| captures.get(1))
        .map(|zip| zip.as_str().to_string())
}

fn resolve_state(tokens: &[String]) -> Option<(&'static StateEntry, StateResolution)> {
    let mut hits = STATES
        .iter()
        .filter_map(|entry| entry.match_rule(tokens).map(|rule| (entry, rule)));

    let (winner, rule) = hits.next()?;
    let winner_tokens = tokenize(winner.name);
    let alternatives = hits
        .filter(|(entry, rule)| {
            // "virginia" inside "west virginia" is not a competing state.
            !(rule == &StateRule::Name && contains_phrase(&winner_tokens, entry.name))
        })
        .map(|(entry, _)| entry.code)
        .collect();

    Some((winner, StateResolution { rule, alternatives }))
}

fn extract_city(
    segments: &[&str],
    anchor: Option<usize>,
    state: Option<&StateEntry>,
) -> Option<String> {
    if segments.len() < 2 {
        return None;
    }

    let end = anchor.unwrap_or(segments.len());
    for segment in segments[..end].iter().rev() {
        if segment.chars().any(|c| c.is_ascii_digit()) {
            return None;
        }

        let tokens = tokenize(segment);
        if tokens.is_empty() || state.is_some_and(|entry| entry.is_exactly(&tokens)) {
            continue;
        }

        return Some(segment.split_whitespace().collect::<Vec<_>>().join(" "));
    }

    None
}

fn tokenize(value: &str) -> Vec<String> {
    value
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_ascii_lowercase)
        .collect()
}

fn contains_phrase(tokens: &[String], phrase: &str) -> bool {
    let parts: Vec<&str> = phrase.split(' ').collect();
    tokens
        .windows(parts.len())
        .any(|window| window.iter().zip(&parts).all(|(token, part)| token == part))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_standard_street_address() {
        let parsed = AddressParser::parse("123 Main St, Philadelphia, PA 19103");
        assert_eq!(parsed.state, Some("PA"));
        assert_eq!(parsed.zip.as_deref(), Some("19103"));
        assert_eq!(parsed.city.as_deref(), Some("Philadelphia"));
        let resolution = parsed.state_resolution.expect("resolution recorded");
        assert_eq!(resolution.rule, StateRule::Code);
        assert!(!resolution.is_ambiguous());
    }

    #[test]
    fn zip_plus_four_keeps_five_digit_prefix() {
        let parsed = AddressParser::parse("500 Elm Ave, Denver, CO 80202-1234");
        assert_eq!(parsed.zip.as_deref(), Some("80202"));
        assert_eq!(parsed.zip_prefix(), Some("802"));
    }

    #[test]
    fn five_digit_house_number_does_not_shadow_zip() {
        let parsed = AddressParser::parse("12345 Ranch Rd, Austin, TX 78701");
        assert_eq!(parsed.zip.as_deref(), Some("78701"));
        assert_eq!(parsed.city.as_deref(), Some("Austin"));
    }

    #[test]
    fn full_state_names_match_case_insensitively() {
        let parsed = AddressParser::parse("42 Lake Shore Dr, Chicago, ILLINOIS");
        assert_eq!(parsed.state, Some("IL"));
        assert_eq!(parsed.city.as_deref(), Some("Chicago"));
        assert_eq!(
            parsed.state_resolution.map(|resolution| resolution.rule),
            Some(StateRule::Name)
        );
    }

    #[test]
    fn multi_word_names_prefer_the_longer_state() {
        let parsed = AddressParser::parse("9 Capitol St, Charleston, West Virginia 25301");
        assert_eq!(parsed.state, Some("WV"));
        let resolution = parsed.state_resolution.expect("resolution");
        assert!(resolution.alternatives.is_empty());
    }

    #[test]
    fn district_marker_beats_washington_state_name() {
        let parsed = AddressParser::parse("1600 Pennsylvania Ave NW, Washington, D.C. 20500");
        assert_eq!(parsed.state, Some("DC"));
        assert_eq!(parsed.city.as_deref(), Some("Washington"));
        let resolution = parsed.state_resolution.expect("resolution");
        assert_eq!(resolution.rule, StateRule::Code);
        assert!(resolution.alternatives.contains(&"WA"));
        assert!(resolution.alternatives.contains(&"PA"));
    }

    #[test]
    fn table_order_decides_city_named_after_state() {
        let parsed = AddressParser::parse("200 Grand Blvd, Kansas City, MO 64105");
        assert_eq!(parsed.state, Some("KS"));
        assert_eq!(parsed.city.as_deref(), Some("Kansas City"));
        let resolution = parsed.state_resolution.expect("resolution");
        assert!(resolution.is_ambiguous());
        assert_eq!(resolution.alternatives, vec!["MO"]);
    }

    #[test]
    fn state_only_segment_is_skipped_when_finding_city() {
        let parsed = AddressParser::parse("77 Broad St, Philadelphia, PA, 19107");
        assert_eq!(parsed.state, Some("PA"));
        assert_eq!(parsed.city.as_deref(), Some("Philadelphia"));
    }

    #[test]
    fn no_delimiters_leave_city_empty() {
        let parsed = AddressParser::parse("Philadelphia PA 19103");
        assert_eq!(parsed.state, Some("PA"));
        assert_eq!(parsed.zip.as_deref(), Some("19103"));
        assert!(parsed.city.is_none());
    }

    #[test]
    fn street_line_is_never_reported_as_city() {
        let parsed = AddressParser::parse("88 Harbor Way, GA 30303");
        assert_eq!(parsed.state, Some("GA"));
        assert!(parsed.city.is_none());
    }

    #[test]
    fn unrecognized_input_degrades_to_empty_fields() {
        assert_eq!(AddressParser::parse(""), ParsedAddress::default());

        let parsed = AddressParser::parse("somewhere over the rainbow");
        assert!(parsed.state.is_none());
        assert!(parsed.zip.is_none());
        assert!(parsed.city.is_none());
    }

    #[test]
    fn city_falls_back_to_last_segment_without_state_or_zip() {
        let parsed = AddressParser::parse("12 Orchard Ln, Springfield");
        assert!(parsed.state.is_none());
        assert_eq!(parsed.city.as_deref(), Some("Springfield"));
    }
}
