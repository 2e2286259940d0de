use std::collections::{BTreeSet, HashSet};
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use super::domain::{UnknownCategory, UtilityCategory};

const STANDARD_REGISTRY: &str = include_str!("../../../data/provider_registry.csv");

/// Reference entry for a known provider, matched by name or alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalProviderRecord {
    pub id: String,
    pub display_name: String,
    pub normalized_name: String,
    pub aliases: BTreeSet<String>,
    pub service_types: BTreeSet<UtilityCategory>,
}

impl CanonicalProviderRecord {
    pub fn serves(&self, category: UtilityCategory) -> bool {
        self.service_types.contains(&category)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryLoadError {
    #[error("failed to read provider registry: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid provider registry CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("provider '{id}' lists an unknown service type: {source}")]
    UnknownServiceType {
        id: String,
        #[source]
        source: UnknownCategory,
    },
    #[error("provider id '{0}' appears more than once")]
    DuplicateId(String),
    #[error("provider registry is empty")]
    Empty,
}

/// Ordered, read-only provider directory.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    records: Vec<CanonicalProviderRecord>,
}

impl ProviderRegistry {
    /// Directory bundled with the crate.
    pub fn standard() -> Result<Self, RegistryLoadError> {
        Self::from_reader(STANDARD_REGISTRY.as_bytes())
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, RegistryLoadError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, RegistryLoadError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut seen = HashSet::new();
        let mut records = Vec::new();
        for row in csv_reader.deserialize::<RegistryRow>() {
            let record = row?.into_record()?;
            if !seen.insert(record.id.clone()) {
                return Err(RegistryLoadError::DuplicateId(record.id));
            }
            records.push(record);
        }

        if records.is_empty() {
            return Err(RegistryLoadError::Empty);
        }

        Ok(Self { records })
    }

    pub fn records(&self) -> &[CanonicalProviderRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct RegistryRow {
    id: String,
    display_name: String,
    #[serde(default)]
    aliases: String,
    service_types: String,
}

impl RegistryRow {
    fn into_record(self) -> Result<CanonicalProviderRecord, RegistryLoadError> {
        let service_types = split_list(&self.service_types)
            .map(|value| {
                value
                    .parse::<UtilityCategory>()
                    .map_err(|source| RegistryLoadError::UnknownServiceType {
                        id: self.id.clone(),
                        source,
                    })
            })
            .collect::<Result<BTreeSet<_>, _>>()?;

        Ok(CanonicalProviderRecord {
            normalized_name: normalize_name(&self.display_name),
            aliases: split_list(&self.aliases).map(normalize_name).collect(),
            service_types,
            id: self.id,
            display_name: self.display_name,
        })
    }
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value
        .split('|')
        .map(str::trim)
        .filter(|item| !item.is_empty())
}

pub(crate) fn normalize_name(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.to_lowercase()
}
