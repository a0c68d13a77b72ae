// src/extract/inspect.rs

use scraper::{Html, Selector};

use super::locate::{caption_text, text_of, wikitables};
use super::types::TableSummary;

const SAMPLE_ROWS: usize = 2;
const CELL_PREVIEW_CHARS: usize = 50;

fn preview(text: &str) -> String {
    text.trim().chars().take(CELL_PREVIEW_CHARS).collect()
}

/// Summarize the first `limit` wikitables: caption, header cells and a
/// couple of data rows. Used to see how the page layout has drifted.
pub fn describe_tables(doc: &Html, limit: usize) -> Vec<TableSummary> {
    let row_sel = Selector::parse("tr").expect("row selector should parse");
    let cell_sel = Selector::parse("th, td").expect("cell selector should parse");

    wikitables(doc)
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(index, table)| {
            let mut rows = table.select(&row_sel).map(|r| {
                r.select(&cell_sel)
                    .map(|c| preview(&text_of(c)))
                    .collect::<Vec<_>>()
            });
            let headers = rows.next().unwrap_or_default();
            let sample_rows = rows.take(SAMPLE_ROWS).collect();
            TableSummary {
                index,
                caption: caption_text(table).map(|c| c.trim().to_string()),
                headers,
                sample_rows,
            }
        })
        .collect()
}
