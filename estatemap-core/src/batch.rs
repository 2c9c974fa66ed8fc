//! Batch pipeline: normalize, classify, filter.

use crate::{CategoryCounts, DatasetKey, RawRow, Record, RecordNormalizer, StatusClassifier};

/// Output of one pass over a fetched row set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedBatch {
    /// Classified records in source order.
    pub records: Vec<Record>,
    pub counts: CategoryCounts,
    /// Rows rejected by the normalizer (missing id or location).
    pub dropped: usize,
    /// Rows that normalized but matched no category.
    pub excluded: usize,
}

impl ClassifiedBatch {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Run every row through the normalizer and classifier.
///
/// Malformed rows are skipped without aborting the batch.
pub fn classify_rows(
    rows: &[RawRow],
    key: &DatasetKey,
    normalizer: &RecordNormalizer,
    classifier: &StatusClassifier,
) -> ClassifiedBatch {
    let mut batch = ClassifiedBatch {
        records: Vec::with_capacity(rows.len()),
        ..Default::default()
    };

    for row in rows {
        let Some(normalized) = normalizer.normalize(row, key) else {
            batch.dropped += 1;
            continue;
        };
        let category = classifier.classify_cells(&normalized.status_cells, key);
        match normalized.into_classified(category) {
            Some(record) => {
                batch.counts.record(category);
                batch.records.push(record);
            }
            None => batch.excluded += 1,
        }
    }

    batch
}
