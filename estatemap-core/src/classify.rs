//! Status classification
//!
//! Each record carries three status columns (R, S, T). A record belongs to the
//! first category, in precedence order Alpha > Beta > Gamma, whose column
//! holds a positive mark for that category's keywords. Matching is
//! deliberately generous because the sheets are filled in by hand:
//!
//! - cells are trimmed, stripped of non-breaking spaces and case-folded
//! - a keyword matches on equality or as a substring of the cell
//! - boolean-style marks (`o`, `yes`, `1`, `true`, `y`, `예`, `네`) count as
//!   positive for whichever category owns the column
//!
//! Keyword entries prefixed with `re:` are compiled as case-insensitive
//! regular expressions instead of literals.

use crate::{Category, ConfigError, DatasetKey, DatasetRegistry, StatusCells};
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Prefix marking a keyword entry as a regular expression.
pub const PATTERN_PREFIX: &str = "re:";

const NON_BREAKING_SPACES: [char; 4] = ['\u{00A0}', '\u{2007}', '\u{202F}', '\u{FEFF}'];

static TRUTHY_MARKERS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["o", "yes", "1", "true", "y", "예", "네"].into_iter().collect());

/// Canonical comparison form of a cell or keyword.
pub fn normalize_cell(value: &str) -> String {
    value
        .chars()
        .filter(|c| !NON_BREAKING_SPACES.contains(c))
        .collect::<String>()
        .trim()
        .to_lowercase()
}

/// Whether an already-normalized value is a boolean-style positive mark.
pub fn is_truthy_marker(normalized: &str) -> bool {
    TRUTHY_MARKERS.contains(normalized)
}

// ============================================================================
// KEYWORDS
// ============================================================================

#[derive(Debug, Clone)]
enum KeywordMatcher {
    Literal(String),
    Pattern(Regex),
}

impl KeywordMatcher {
    fn matches(&self, normalized: &str) -> bool {
        match self {
            KeywordMatcher::Literal(keyword) => {
                normalized == keyword || normalized.contains(keyword.as_str())
            }
            KeywordMatcher::Pattern(regex) => regex.is_match(normalized),
        }
    }
}

/// Compiled synonyms accepted for one category.
#[derive(Debug, Clone, Default)]
pub struct KeywordSet {
    sources: Vec<String>,
    matchers: Vec<KeywordMatcher>,
}

impl KeywordSet {
    /// Compile a keyword list. `field` names the list in error messages.
    pub fn compile(field: &str, keywords: &[String]) -> Result<Self, ConfigError> {
        let mut matchers = Vec::with_capacity(keywords.len());
        for raw in keywords {
            let matcher = if let Some(pattern) = raw.strip_prefix(PATTERN_PREFIX) {
                let pattern = pattern.trim();
                if pattern.is_empty() {
                    // An empty pattern matches every non-empty cell.
                    return Err(ConfigError::invalid(
                        field,
                        raw.as_str(),
                        "pattern must not be blank",
                    ));
                }
                let regex = RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| ConfigError::invalid(field, raw.as_str(), e.to_string()))?;
                KeywordMatcher::Pattern(regex)
            } else {
                let keyword = normalize_cell(raw);
                if keyword.is_empty() {
                    // An empty literal would be a substring of every cell.
                    return Err(ConfigError::invalid(
                        field,
                        raw.as_str(),
                        "keyword must not be blank",
                    ));
                }
                KeywordMatcher::Literal(keyword)
            };
            matchers.push(matcher);
        }
        Ok(Self {
            sources: keywords.to_vec(),
            matchers,
        })
    }

    /// Keyword list as configured.
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    /// Positive-mark predicate for an already-normalized cell.
    ///
    /// An empty set never matches, not even truthy markers.
    pub fn is_positive(&self, normalized: &str) -> bool {
        if self.matchers.is_empty() || normalized.is_empty() {
            return false;
        }
        is_truthy_marker(normalized) || self.matchers.iter().any(|m| m.matches(normalized))
    }
}

/// Raw keyword configuration, as read from a registry file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordConfig {
    #[serde(default)]
    pub alpha: Vec<String>,
    #[serde(default)]
    pub beta: Vec<String>,
    #[serde(default)]
    pub gamma: Vec<String>,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            alpha: vec![Category::Alpha.label().to_string()],
            beta: vec![Category::Beta.label().to_string()],
            gamma: vec![Category::Gamma.label().to_string()],
        }
    }
}

/// Compiled keyword table for one dataset.
#[derive(Debug, Clone)]
pub struct CategoryKeywords {
    alpha: KeywordSet,
    beta: KeywordSet,
    gamma: KeywordSet,
}

impl CategoryKeywords {
    pub fn compile(config: &KeywordConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            alpha: KeywordSet::compile("keywords.alpha", &config.alpha)?,
            beta: KeywordSet::compile("keywords.beta", &config.beta)?,
            gamma: KeywordSet::compile("keywords.gamma", &config.gamma)?,
        })
    }

    pub fn for_category(&self, category: Category) -> Option<&KeywordSet> {
        match category {
            Category::Alpha => Some(&self.alpha),
            Category::Beta => Some(&self.beta),
            Category::Gamma => Some(&self.gamma),
            Category::Unclassified => None,
        }
    }

    /// Classify three raw status cells.
    pub fn classify(&self, alpha: &str, beta: &str, gamma: &str) -> Category {
        if self.alpha.is_positive(&normalize_cell(alpha)) {
            return Category::Alpha;
        }
        if self.beta.is_positive(&normalize_cell(beta)) {
            return Category::Beta;
        }
        if self.gamma.is_positive(&normalize_cell(gamma)) {
            return Category::Gamma;
        }
        Category::Unclassified
    }
}

impl Default for CategoryKeywords {
    fn default() -> Self {
        let config = KeywordConfig::default();
        Self {
            alpha: KeywordSet::compile("keywords.alpha", &config.alpha).unwrap_or_default(),
            beta: KeywordSet::compile("keywords.beta", &config.beta).unwrap_or_default(),
            gamma: KeywordSet::compile("keywords.gamma", &config.gamma).unwrap_or_default(),
        }
    }
}

// ============================================================================
// CLASSIFIER
// ============================================================================

/// Dataset-aware status classifier.
///
/// Column mapping and precedence are the same for every dataset; only the
/// keyword sets differ. Keys without a table use the reference keywords.
#[derive(Debug, Clone, Default)]
pub struct StatusClassifier {
    tables: HashMap<DatasetKey, CategoryKeywords>,
    fallback: CategoryKeywords,
}

impl StatusClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_registry(registry: &DatasetRegistry) -> Self {
        let tables = registry
            .iter()
            .map(|spec| (spec.key.clone(), spec.keywords.clone()))
            .collect();
        Self {
            tables,
            fallback: CategoryKeywords::default(),
        }
    }

    pub fn with_table(mut self, key: DatasetKey, keywords: CategoryKeywords) -> Self {
        self.tables.insert(key, keywords);
        self
    }

    pub fn keywords_for(&self, key: &DatasetKey) -> &CategoryKeywords {
        self.tables.get(key).unwrap_or(&self.fallback)
    }

    pub fn classify(&self, alpha: &str, beta: &str, gamma: &str, key: &DatasetKey) -> Category {
        self.keywords_for(key).classify(alpha, beta, gamma)
    }

    pub fn classify_cells(&self, cells: &StatusCells, key: &DatasetKey) -> Category {
        self.classify(&cells.alpha, &cells.beta, &cells.gamma, key)
    }
}
