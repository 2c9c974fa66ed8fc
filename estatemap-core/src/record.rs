//! Row and record types

use crate::DatasetKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Listing page template; the record id is appended as the article number.
pub const HYPERLINK_PREFIX: &str = "https://new.land.naver.com/houses?articleNo=";

// ============================================================================
// RAW ROWS
// ============================================================================

/// One unparsed row as delivered by the source.
///
/// Source rows are ragged: trailing empty cells are usually omitted, so the
/// row length says nothing about which columns exist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRow(Vec<String>);

impl RawRow {
    pub fn new(cells: Vec<String>) -> Self {
        Self(cells)
    }

    /// Cell at `index`, or `None` when the row is shorter than that.
    pub fn cell(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn cells(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for RawRow {
    fn from(cells: Vec<String>) -> Self {
        Self(cells)
    }
}

impl<'a> From<Vec<&'a str>> for RawRow {
    fn from(cells: Vec<&'a str>) -> Self {
        Self(cells.into_iter().map(str::to_string).collect())
    }
}

impl FromIterator<String> for RawRow {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ============================================================================
// CATEGORY
// ============================================================================

/// Classification outcome of a record.
///
/// Precedence is fixed: Alpha > Beta > Gamma. `Unclassified` records never
/// leave the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    /// Column R
    #[serde(rename = "온하")]
    Alpha,
    /// Column S
    #[serde(rename = "공클")]
    Beta,
    /// Column T
    #[serde(rename = "갠매")]
    Gamma,
    #[serde(rename = "미분류")]
    Unclassified,
}

impl Category {
    /// The three exposable categories in precedence order.
    pub const RANKED: [Category; 3] = [Category::Alpha, Category::Beta, Category::Gamma];

    pub fn label(&self) -> &'static str {
        match self {
            Category::Alpha => "온하",
            Category::Beta => "공클",
            Category::Gamma => "갠매",
            Category::Unclassified => "미분류",
        }
    }

    pub fn is_classified(&self) -> bool {
        !matches!(self, Category::Unclassified)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "온하" | "alpha" | "Alpha" => Ok(Category::Alpha),
            "공클" | "beta" | "Beta" => Ok(Category::Beta),
            "갠매" | "gamma" | "Gamma" => Ok(Category::Gamma),
            "미분류" | "unclassified" | "Unclassified" => Ok(Category::Unclassified),
            other => Err(format!("Unknown category: {}", other)),
        }
    }
}

/// Per-category tallies for one classified batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub alpha: usize,
    pub beta: usize,
    pub gamma: usize,
}

impl CategoryCounts {
    pub fn record(&mut self, category: Category) {
        match category {
            Category::Alpha => self.alpha += 1,
            Category::Beta => self.beta += 1,
            Category::Gamma => self.gamma += 1,
            Category::Unclassified => {}
        }
    }

    pub fn get(&self, category: Category) -> usize {
        match category {
            Category::Alpha => self.alpha,
            Category::Beta => self.beta,
            Category::Gamma => self.gamma,
            Category::Unclassified => 0,
        }
    }

    pub fn total(&self) -> usize {
        self.alpha + self.beta + self.gamma
    }
}

// ============================================================================
// RECORD
// ============================================================================

/// The three raw status cells a record is classified from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusCells {
    pub alpha: String,
    pub beta: String,
    pub gamma: String,
}

/// A normalized, classified listing.
///
/// Field names on the wire follow the map front end (`sheet_type` carries the
/// dataset key).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub reg_date: String,
    pub location: String,
    #[serde(rename = "sheet_type")]
    pub dataset_key: DatasetKey,
    pub status: Category,
    pub deposit: String,
    pub monthly_rent: String,
    pub hyperlink: String,
}

impl Record {
    /// Listing URL for a record id.
    pub fn hyperlink_for(id: &str) -> String {
        format!("{}{}", HYPERLINK_PREFIX, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_row_out_of_range_is_none() {
        let row = RawRow::from(vec!["a", "b"]);
        assert_eq!(row.cell(1), Some("b"));
        assert_eq!(row.cell(2), None);
        assert_eq!(row.cell(100), None);
    }

    #[test]
    fn test_category_serializes_as_label() {
        let json = serde_json::to_string(&Category::Beta).unwrap();
        assert_eq!(json, "\"공클\"");
        let back: Category = serde_json::from_str("\"갠매\"").unwrap();
        assert_eq!(back, Category::Gamma);
    }

    #[test]
    fn test_category_from_str_accepts_labels_and_names() {
        assert_eq!("온하".parse::<Category>().unwrap(), Category::Alpha);
        assert_eq!("beta".parse::<Category>().unwrap(), Category::Beta);
        assert!("매매".parse::<Category>().is_err());
    }

    #[test]
    fn test_category_counts() {
        let mut counts = CategoryCounts::default();
        counts.record(Category::Alpha);
        counts.record(Category::Gamma);
        counts.record(Category::Gamma);
        counts.record(Category::Unclassified);
        assert_eq!(counts.get(Category::Gamma), 2);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn test_record_wire_field_names() {
        let record = Record {
            id: "2401".to_string(),
            reg_date: "2024-01-05".to_string(),
            location: "역삼동 123".to_string(),
            dataset_key: DatasetKey::new("강남월세"),
            status: Category::Alpha,
            deposit: "1000".to_string(),
            monthly_rent: "80".to_string(),
            hyperlink: Record::hyperlink_for("2401"),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["sheet_type"], "강남월세");
        assert_eq!(value["status"], "온하");
        assert_eq!(
            value["hyperlink"],
            "https://new.land.naver.com/houses?articleNo=2401"
        );
    }
}
