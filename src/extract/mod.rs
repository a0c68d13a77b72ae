// src/extract/mod.rs
//
// Locates the highest-grossing films table on a parsed page and normalizes
// its rows into `MovieRecord`s. Pure: no I/O, no state between calls.

pub mod clean;
pub mod inspect;
pub mod locate;
pub mod normalize;
pub mod types;

use scraper::Html;
use tracing::{info, instrument};

pub use clean::{clean_title, extract_year, gross_digits, parse_gross};
pub use inspect::describe_tables;
pub use locate::locate_table;
pub use normalize::{normalize_rows, ColumnMap};
pub use types::{
    ExtractError, ExtractOptions, ExtractReport, MovieRecord, SkipReason, SkippedRow,
    TableSummary, DEFAULT_MIN_GROSS, FALLBACK_YEAR,
};

/// Locate the films table in `doc` and normalize its rows.
#[instrument(level = "info", skip(doc))]
pub fn extract(doc: &Html, opts: &ExtractOptions) -> Result<ExtractReport, ExtractError> {
    let table = locate_table(doc)?;
    let report = normalize_rows(table, opts);
    info!(
        rows = report.rows_seen,
        accepted = report.records.len(),
        skipped = report.skipped.len(),
        "extraction finished"
    );
    Ok(report)
}

/// Parse raw HTML and run [`extract`] over it.
pub fn extract_html(html: &str, opts: &ExtractOptions) -> Result<ExtractReport, ExtractError> {
    let doc = Html::parse_document(html);
    extract(&doc, opts)
}
