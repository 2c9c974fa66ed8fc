//! Row normalization
//!
//! Source rows are ragged and positional. [`RowCells`] is the only place that
//! indexes into a [`RawRow`]; everything after it works on a fixed-width shape
//! where a missing cell is simply an empty string.

use crate::{Category, DatasetKey, RawRow, Record, RowError, StatusCells};

/// Zero-based column positions in a dataset range starting at column A.
pub mod columns {
    /// A
    pub const ID: usize = 0;
    /// B
    pub const REG_DATE: usize = 1;
    /// K
    pub const DEPOSIT: usize = 10;
    /// L
    pub const MONTHLY_RENT: usize = 11;
    /// Q
    pub const LOCATION: usize = 16;
    /// R
    pub const STATUS_ALPHA: usize = 17;
    /// S
    pub const STATUS_BETA: usize = 18;
    /// T
    pub const STATUS_GAMMA: usize = 19;
}

/// Fixed-width, trimmed view of the columns a record is built from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowCells {
    pub id: String,
    pub reg_date: String,
    pub deposit: String,
    pub monthly_rent: String,
    pub location: String,
    pub status: StatusCells,
}

impl RowCells {
    pub fn from_raw(row: &RawRow) -> Self {
        let take = |index: usize| row.cell(index).map(str::trim).unwrap_or_default().to_string();
        Self {
            id: take(columns::ID),
            reg_date: take(columns::REG_DATE),
            deposit: take(columns::DEPOSIT),
            monthly_rent: take(columns::MONTHLY_RENT),
            location: take(columns::LOCATION),
            status: StatusCells {
                alpha: take(columns::STATUS_ALPHA),
                beta: take(columns::STATUS_BETA),
                gamma: take(columns::STATUS_GAMMA),
            },
        }
    }
}

/// A row that passed normalization but has not been classified yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRow {
    /// Record with `status` still `Unclassified`.
    pub record: Record,
    pub status_cells: StatusCells,
}

impl NormalizedRow {
    /// Attach a category. Unclassified rows are discarded.
    pub fn into_classified(self, category: Category) -> Option<Record> {
        if !category.is_classified() {
            return None;
        }
        let mut record = self.record;
        record.status = category;
        Some(record)
    }
}

/// Converts raw rows into records. Total: never panics on short or odd rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordNormalizer;

impl RecordNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Normalize a row, or `None` when id or location is empty.
    pub fn normalize(&self, row: &RawRow, key: &DatasetKey) -> Option<NormalizedRow> {
        self.try_normalize(row, key).ok()
    }

    /// Same as [`normalize`](Self::normalize), naming the missing field.
    pub fn try_normalize(&self, row: &RawRow, key: &DatasetKey) -> Result<NormalizedRow, RowError> {
        let cells = RowCells::from_raw(row);
        if cells.id.is_empty() {
            return Err(RowError::MalformedRow { field: "id" });
        }
        if cells.location.is_empty() {
            return Err(RowError::MalformedRow { field: "location" });
        }

        let hyperlink = Record::hyperlink_for(&cells.id);
        Ok(NormalizedRow {
            record: Record {
                id: cells.id,
                reg_date: cells.reg_date,
                location: cells.location,
                dataset_key: key.clone(),
                status: Category::Unclassified,
                deposit: cells.deposit,
                monthly_rent: cells.monthly_rent,
                hyperlink,
            },
            status_cells: cells.status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key() -> DatasetKey {
        DatasetKey::new("강남월세")
    }

    fn full_row(id: &str, location: &str, r: &str, s: &str, t: &str) -> RawRow {
        let mut cells = vec![String::new(); 20];
        cells[columns::ID] = id.to_string();
        cells[columns::REG_DATE] = " 2024-03-01 ".to_string();
        cells[columns::DEPOSIT] = "5000".to_string();
        cells[columns::MONTHLY_RENT] = " 120".to_string();
        cells[columns::LOCATION] = location.to_string();
        cells[columns::STATUS_ALPHA] = r.to_string();
        cells[columns::STATUS_BETA] = s.to_string();
        cells[columns::STATUS_GAMMA] = t.to_string();
        RawRow::new(cells)
    }

    #[test]
    fn test_normalize_full_row() {
        let row = full_row(" 1234 ", " 역삼동 ", "", " 공클 ", "");
        let normalized = RecordNormalizer::new().normalize(&row, &key()).unwrap();
        let record = &normalized.record;
        assert_eq!(record.id, "1234");
        assert_eq!(record.reg_date, "2024-03-01");
        assert_eq!(record.location, "역삼동");
        assert_eq!(record.deposit, "5000");
        assert_eq!(record.monthly_rent, "120");
        assert_eq!(record.dataset_key, key());
        assert_eq!(record.status, Category::Unclassified);
        assert_eq!(record.hyperlink, "https://new.land.naver.com/houses?articleNo=1234");
        assert_eq!(normalized.status_cells.beta, "공클");
    }

    #[test]
    fn test_missing_id_or_location_dropped() {
        let normalizer = RecordNormalizer::new();
        assert!(normalizer.normalize(&full_row("  ", "역삼동", "o", "", ""), &key()).is_none());
        assert!(normalizer.normalize(&full_row("1", "", "o", "", ""), &key()).is_none());
        assert_eq!(
            normalizer.try_normalize(&full_row("1", " ", "", "", ""), &key()),
            Err(RowError::MalformedRow { field: "location" })
        );
    }

    #[test]
    fn test_short_row_fills_empty_cells() {
        // Row ends at the location column; no status columns at all.
        let mut cells = vec![String::new(); 17];
        cells[columns::ID] = "77".to_string();
        cells[columns::LOCATION] = "잠실동".to_string();
        let normalized = RecordNormalizer::new()
            .normalize(&RawRow::new(cells), &key())
            .unwrap();
        assert_eq!(normalized.status_cells, StatusCells::default());
        assert_eq!(normalized.record.reg_date, "");
    }

    #[test]
    fn test_empty_row_dropped() {
        assert!(RecordNormalizer::new().normalize(&RawRow::default(), &key()).is_none());
    }

    #[test]
    fn test_into_classified_discards_unclassified() {
        let normalized = RecordNormalizer::new()
            .normalize(&full_row("1", "역삼동", "", "", ""), &key())
            .unwrap();
        assert!(normalized.clone().into_classified(Category::Unclassified).is_none());
        let record = normalized.into_classified(Category::Gamma).unwrap();
        assert_eq!(record.status, Category::Gamma);
    }

    proptest! {
        #[test]
        fn prop_normalize_is_total(cells in proptest::collection::vec(".{0,8}", 0..25)) {
            let row = RawRow::new(cells);
            let _ = RecordNormalizer::new().normalize(&row, &key());
        }

        #[test]
        fn prop_nonempty_id_and_location_always_kept(
            id in "[0-9]{1,6}",
            location in "[가-힣]{1,4}",
            len in 17usize..25,
            statuses in proptest::collection::vec(".{0,4}", 3),
        ) {
            let mut cells = vec![String::new(); len];
            cells[columns::ID] = id;
            cells[columns::LOCATION] = location;
            for (offset, value) in statuses.into_iter().enumerate() {
                if columns::STATUS_ALPHA + offset < len {
                    cells[columns::STATUS_ALPHA + offset] = value;
                }
            }
            prop_assert!(RecordNormalizer::new().normalize(&RawRow::new(cells), &key()).is_some());
        }
    }
}
