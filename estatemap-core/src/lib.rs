//! Estatemap Core - Dataset, Record and Classification Types
//!
//! Pure domain logic with no I/O. The cache and API crates depend on this.
//!
//! Pipeline for one fetched dataset:
//!
//! ```text
//! RawRow --RecordNormalizer--> NormalizedRow --StatusClassifier--> Record
//!          (drops rows without       (Alpha > Beta > Gamma,
//!           id or location)            Unclassified is dropped)
//! ```

pub mod batch;
pub mod classify;
pub mod dataset;
pub mod error;
pub mod normalize;
pub mod record;

pub use batch::{classify_rows, ClassifiedBatch};
pub use classify::{
    is_truthy_marker, normalize_cell, CategoryKeywords, KeywordConfig, KeywordSet,
    StatusClassifier, PATTERN_PREFIX,
};
pub use dataset::{DatasetKey, DatasetRegistry, DatasetSpec, REFERENCE_DATASETS};
pub use error::{ConfigError, EstateError, EstateResult, FetchError, RowError};
pub use normalize::{columns, NormalizedRow, RecordNormalizer, RowCells};
pub use record::{Category, CategoryCounts, RawRow, Record, StatusCells, HYPERLINK_PREFIX};
