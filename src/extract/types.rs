// src/extract/types.rs

use serde::{Deserialize, Serialize};
use std::fmt;

/// Gross floor applied after cleaning: only films above this are emitted.
pub const DEFAULT_MIN_GROSS: u64 = 1_000_000_000;

/// Year used when the year cell holds no 19xx/20xx token.
pub const FALLBACK_YEAR: &str = "2023";

/// A single normalized row of the highest-grossing films table.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Hash)]
pub struct MovieRecord {
    pub title: String,
    pub worldwide_gross: u64,
    pub year: String,
}

impl MovieRecord {
    /// Year as an integer, for sinks that store it numerically.
    pub fn year_number(&self) -> Option<i64> {
        self.year.parse().ok()
    }
}

/// Knobs for the row normalizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Cap on data rows considered (header excluded). `None` means unbounded.
    pub max_rows: Option<usize>,
    /// Records must gross strictly more than this.
    pub min_gross: u64,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            max_rows: None,
            min_gross: DEFAULT_MIN_GROSS,
        }
    }
}

/// Why a row was dropped.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
pub enum SkipReason {
    /// Fewer than three cells.
    TooFewCells(usize),
    EmptyTitle,
    /// Gross cell had no ASCII digits at all.
    NoGrossDigits,
    /// Gross digit string shorter than nine characters.
    GrossTooShort(usize),
    /// Digit string did not fit in a u64.
    GrossUnparseable,
    BelowThreshold(u64),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::TooFewCells(n) => write!(f, "only {} cells", n),
            SkipReason::EmptyTitle => write!(f, "empty title"),
            SkipReason::NoGrossDigits => write!(f, "no digits in gross"),
            SkipReason::GrossTooShort(n) => write!(f, "gross has only {} digits", n),
            SkipReason::GrossUnparseable => write!(f, "gross does not fit an integer"),
            SkipReason::BelowThreshold(g) => write!(f, "gross {} below threshold", g),
        }
    }
}

/// A dropped row and its position in the table (0 is the header row).
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
pub struct SkippedRow {
    pub row: usize,
    pub reason: SkipReason,
}

/// Outcome of normalizing a located table.
///
/// An empty `records` with a non-zero `rows_seen` means the table was found
/// but nothing qualified, which is not the same as `ExtractError::TableNotFound`.
#[derive(Debug, Serialize, PartialEq, Eq, Clone, Default)]
pub struct ExtractReport {
    pub records: Vec<MovieRecord>,
    pub skipped: Vec<SkippedRow>,
    /// Data rows considered, after `max_rows`.
    pub rows_seen: usize,
}

impl ExtractReport {
    pub fn skip_count(&self, pred: impl Fn(&SkipReason) -> bool) -> usize {
        self.skipped.iter().filter(|s| pred(&s.reason)).count()
    }
}

/// Failure of a whole extraction call.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("no wikitable found in document")]
    TableNotFound,
}

/// Diagnostic view of one candidate table.
#[derive(Debug, Serialize, PartialEq, Eq, Clone)]
pub struct TableSummary {
    pub index: usize,
    pub caption: Option<String>,
    pub headers: Vec<String>,
    pub sample_rows: Vec<Vec<String>>,
}
