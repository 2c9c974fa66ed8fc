//! Dataset keys and the static dataset registry
//!
//! A dataset key names one sheet tab. The registry maps each key to the range
//! the fetcher retrieves and the keyword table the classifier applies.
//! Registries are static: built once at startup, from the reference table or
//! from a TOML file, and shared read-only afterwards.

use crate::{CategoryKeywords, ConfigError, KeywordConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Identifier of one logical table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetKey(String);

impl DatasetKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatasetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DatasetKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for DatasetKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl AsRef<str> for DatasetKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Reference datasets: (key, A1 range).
pub const REFERENCE_DATASETS: [(&str, &str); 4] = [
    ("강남월세", "'[강남월세]'!A5:T"),
    ("강남전세", "'[강남전세]'!A5:T"),
    ("송파월세", "'[송파월세]'!A5:T"),
    ("송파전세", "'[송파전세]'!A5:T"),
];

/// Everything needed to fetch and classify one dataset.
#[derive(Debug, Clone)]
pub struct DatasetSpec {
    pub key: DatasetKey,
    /// Opaque range specification handed to the source (A1 notation for sheets).
    pub range: String,
    pub keywords: CategoryKeywords,
}

impl DatasetSpec {
    pub fn new(key: impl Into<DatasetKey>, range: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            range: range.into(),
            keywords: CategoryKeywords::default(),
        }
    }

    pub fn with_keywords(mut self, keywords: CategoryKeywords) -> Self {
        self.keywords = keywords;
        self
    }
}

// ============================================================================
// FILE FORMAT
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
struct RegistryFile {
    #[serde(default, rename = "dataset")]
    datasets: Vec<DatasetEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct DatasetEntry {
    key: String,
    range: String,
    #[serde(default)]
    keywords: Option<KeywordConfig>,
}

// ============================================================================
// REGISTRY
// ============================================================================

/// Ordered, validated table of configured datasets.
#[derive(Debug, Clone)]
pub struct DatasetRegistry {
    specs: Vec<DatasetSpec>,
    index: HashMap<DatasetKey, usize>,
}

impl DatasetRegistry {
    /// Build a registry, rejecting duplicate keys and blank keys or ranges.
    pub fn new(specs: Vec<DatasetSpec>) -> Result<Self, ConfigError> {
        let mut index = HashMap::with_capacity(specs.len());
        for (position, spec) in specs.iter().enumerate() {
            if spec.key.as_str().trim().is_empty() {
                return Err(ConfigError::invalid(
                    "dataset.key",
                    spec.key.as_str(),
                    "dataset key must not be blank",
                ));
            }
            if spec.range.trim().is_empty() {
                return Err(ConfigError::invalid(
                    format!("dataset.{}.range", spec.key),
                    spec.range.as_str(),
                    "range must not be blank",
                ));
            }
            if index.insert(spec.key.clone(), position).is_some() {
                return Err(ConfigError::invalid(
                    "dataset.key",
                    spec.key.as_str(),
                    "duplicate dataset key",
                ));
            }
        }
        Ok(Self { specs, index })
    }

    /// Parse a registry from TOML text.
    ///
    /// ```toml
    /// [[dataset]]
    /// key = "강남월세"
    /// range = "'[강남월세]'!A5:T"
    ///
    /// [dataset.keywords]
    /// gamma = ["갠매", "직거래"]
    /// ```
    ///
    /// Datasets without a `keywords` table use the reference keywords; a
    /// partial table leaves the omitted categories empty (disabled).
    pub fn from_toml_str(source_name: &str, text: &str) -> Result<Self, ConfigError> {
        let file: RegistryFile = toml::from_str(text).map_err(|e| ConfigError::Parse {
            source_name: source_name.to_string(),
            reason: e.to_string(),
        })?;
        if file.datasets.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "dataset".to_string(),
            });
        }

        let mut specs = Vec::with_capacity(file.datasets.len());
        for entry in file.datasets {
            let keywords = match &entry.keywords {
                Some(config) => CategoryKeywords::compile(config)?,
                None => CategoryKeywords::default(),
            };
            specs.push(DatasetSpec::new(entry.key, entry.range).with_keywords(keywords));
        }
        Self::new(specs)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            source_name: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&path.display().to_string(), &text)
    }

    pub fn get(&self, key: &DatasetKey) -> Option<&DatasetSpec> {
        self.index.get(key).map(|&position| &self.specs[position])
    }

    pub fn contains(&self, key: &DatasetKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DatasetSpec> {
        self.specs.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &DatasetKey> {
        self.specs.iter().map(|spec| &spec.key)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl Default for DatasetRegistry {
    fn default() -> Self {
        let specs: Vec<DatasetSpec> = REFERENCE_DATASETS
            .iter()
            .map(|(key, range)| DatasetSpec::new(*key, *range))
            .collect();
        let index = specs
            .iter()
            .enumerate()
            .map(|(position, spec)| (spec.key.clone(), position))
            .collect();
        Self { specs, index }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Category;

    #[test]
    fn test_default_registry_has_reference_datasets() {
        let registry = DatasetRegistry::default();
        assert_eq!(registry.len(), 4);
        let spec = registry.get(&DatasetKey::new("송파전세")).unwrap();
        assert_eq!(spec.range, "'[송파전세]'!A5:T");
        assert!(!registry.contains(&DatasetKey::new("부산월세")));
    }

    #[test]
    fn test_default_registry_preserves_order() {
        let registry = DatasetRegistry::default();
        let keys: Vec<&str> = registry.keys().map(DatasetKey::as_str).collect();
        assert_eq!(keys, vec!["강남월세", "강남전세", "송파월세", "송파전세"]);
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let err = DatasetRegistry::new(vec![
            DatasetSpec::new("a", "A1:T"),
            DatasetSpec::new("a", "B1:T"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_blank_range_rejected() {
        let err = DatasetRegistry::new(vec![DatasetSpec::new("a", "  ")]).unwrap_err();
        assert!(err.to_string().contains("range"));
    }

    #[test]
    fn test_from_toml_with_partial_keywords() {
        let text = r#"
            [[dataset]]
            key = "강남월세"
            range = "'[강남월세]'!A5:T"

            [[dataset]]
            key = "송파월세"
            range = "'[송파월세]'!A5:T"

            [dataset.keywords]
            gamma = ["갠매", "re:직\\s*거래"]
        "#;
        let registry = DatasetRegistry::from_toml_str("inline", text).unwrap();
        assert_eq!(registry.len(), 2);

        let gangnam = registry.get(&DatasetKey::new("강남월세")).unwrap();
        assert_eq!(gangnam.keywords.classify("", "공클", ""), Category::Beta);

        let songpa = registry.get(&DatasetKey::new("송파월세")).unwrap();
        assert_eq!(songpa.keywords.classify("", "", "직 거래"), Category::Gamma);
        // alpha and beta were omitted, so they are disabled for this dataset
        assert_eq!(songpa.keywords.classify("온하", "공클", ""), Category::Unclassified);
    }

    #[test]
    fn test_from_toml_blank_pattern_rejected() {
        let text = r#"
            [[dataset]]
            key = "송파월세"
            range = "'[송파월세]'!A5:T"

            [dataset.keywords]
            gamma = ["갠매", "re: "]
        "#;
        let err = DatasetRegistry::from_toml_str("inline", text).unwrap_err();
        assert!(err.to_string().contains("blank"));
    }

    #[test]
    fn test_from_toml_empty_file_is_missing_required() {
        let err = DatasetRegistry::from_toml_str("inline", "").unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired { .. }));
    }

    #[test]
    fn test_from_toml_syntax_error() {
        let err = DatasetRegistry::from_toml_str("broken.toml", "[[dataset]\nkey=").unwrap_err();
        match err {
            ConfigError::Parse { source_name, .. } => assert_eq!(source_name, "broken.toml"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("datasets.toml");
        std::fs::write(&path, "[[dataset]]\nkey = \"x\"\nrange = \"X!A1:T\"\n").unwrap();
        let registry = DatasetRegistry::from_toml_file(&path).unwrap();
        assert!(registry.contains(&DatasetKey::new("x")));
    }
}
