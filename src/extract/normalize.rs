// src/extract/normalize.rs

use scraper::{ElementRef, Selector};
use tracing::{debug, instrument, trace};

use super::clean::{clean_title, extract_year, parse_gross};
use super::locate::text_of;
use super::types::{ExtractOptions, ExtractReport, MovieRecord, SkipReason, SkippedRow};

/// Rows shorter than this are decorative or malformed.
pub const MIN_CELLS: usize = 3;

/// Cell positions for title, gross and year within one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub title: usize,
    pub gross: usize,
    pub year: usize,
}

impl ColumnMap {
    /// Position-based mapping tolerant of both page layouts.
    ///
    /// Five or more cells follow "Rank, Peak, Title, Gross, Year". Three or
    /// four cells keep the last three as title, gross, year. Indices are
    /// clipped to the last cell.
    pub fn for_width(n: usize) -> Option<Self> {
        if n < MIN_CELLS {
            return None;
        }
        let last = n - 1;
        let (title, gross, year) = if n >= 5 {
            (2, 3, 4)
        } else {
            (n - 3, n - 2, n - 1)
        };
        Some(Self {
            title: title.min(last),
            gross: gross.min(last),
            year: year.min(last),
        })
    }
}

/// Title text: first link's text when there is one, else the whole cell.
fn title_text(cell: ElementRef<'_>) -> String {
    let link = Selector::parse("a").expect("link selector should parse");
    match cell.select(&link).next() {
        Some(a) => text_of(a),
        None => text_of(cell),
    }
}

/// Turn one row's cells into a record, or the reason it was dropped.
pub fn normalize_cells(
    cells: &[ElementRef<'_>],
    opts: &ExtractOptions,
) -> Result<MovieRecord, SkipReason> {
    let map = ColumnMap::for_width(cells.len()).ok_or(SkipReason::TooFewCells(cells.len()))?;

    let title = clean_title(&title_text(cells[map.title]));
    if title.is_empty() {
        return Err(SkipReason::EmptyTitle);
    }

    let worldwide_gross = parse_gross(&text_of(cells[map.gross]))?;
    let year = extract_year(&text_of(cells[map.year]));

    if worldwide_gross <= opts.min_gross {
        return Err(SkipReason::BelowThreshold(worldwide_gross));
    }

    Ok(MovieRecord {
        title,
        worldwide_gross,
        year,
    })
}

/// Convert every data row of `table` into records, recording each skip.
#[instrument(level = "debug", skip(table))]
pub fn normalize_rows(table: ElementRef<'_>, opts: &ExtractOptions) -> ExtractReport {
    let row_sel = Selector::parse("tr").expect("row selector should parse");
    let cell_sel = Selector::parse("td, th").expect("cell selector should parse");

    let mut report = ExtractReport::default();
    let rows = table
        .select(&row_sel)
        .enumerate()
        .skip(1)
        .take(opts.max_rows.unwrap_or(usize::MAX));

    for (idx, row) in rows {
        report.rows_seen += 1;
        let cells: Vec<ElementRef<'_>> = row.select(&cell_sel).collect();
        match normalize_cells(&cells, opts) {
            Ok(record) => {
                trace!(
                    row = idx,
                    title = %record.title,
                    gross = record.worldwide_gross,
                    "accepted"
                );
                report.records.push(record);
            }
            Err(reason) => {
                debug!(row = idx, %reason, "skipping row");
                report.skipped.push(SkippedRow { row: idx, reason });
            }
        }
    }

    debug!(
        rows = report.rows_seen,
        accepted = report.records.len(),
        skipped = report.skipped.len(),
        "normalized table"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::locate::locate_table;
    use scraper::Html;

    fn table_doc(rows: &str) -> Html {
        Html::parse_document(&format!(
            r#"<html><body><table class="wikitable"><tr><th>Rank</th><th>Peak</th><th>Title</th><th>Worldwide gross</th><th>Year</th></tr>{}</table></body></html>"#,
            rows
        ))
    }

    fn run(doc: &Html, opts: &ExtractOptions) -> ExtractReport {
        normalize_rows(locate_table(doc).unwrap(), opts)
    }

    #[test]
    fn canonical_row() {
        let doc = table_doc(
            "<tr><td>1</td><td>1</td><td>Avatar[3]</td><td>$2,923,710,708</td><td>2009 (re-release)</td></tr>",
        );
        let report = run(&doc, &ExtractOptions::default());
        assert_eq!(
            report.records,
            vec![MovieRecord {
                title: "Avatar".into(),
                worldwide_gross: 2_923_710_708,
                year: "2009".into(),
            }]
        );
        assert!(report.skipped.is_empty());
        assert_eq!(report.rows_seen, 1);
    }

    #[test]
    fn title_prefers_link_text() {
        let doc = table_doc(
            r##"<tr><td>2</td><th>1</th><th scope="row"><i><a href="/wiki/Avengers:_Endgame">Avengers: Endgame</a></i><sup><a href="#cite">[4]</a></sup></th><td>$2,797,501,328</td><td>2019</td></tr>"##,
        );
        let report = run(&doc, &ExtractOptions::default());
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].title, "Avengers: Endgame");
        assert_eq!(report.records[0].year, "2019");
    }

    #[test]
    fn short_rows_are_skipped() {
        let doc = table_doc(
            "<tr><td>Total</td><td>$99,000,000,000</td></tr>\
             <tr><td colspan=\"5\">Notes</td></tr>",
        );
        let report = run(&doc, &ExtractOptions::default());
        assert!(report.records.is_empty());
        assert_eq!(
            report.skipped,
            vec![
                SkippedRow {
                    row: 1,
                    reason: SkipReason::TooFewCells(2),
                },
                SkippedRow {
                    row: 2,
                    reason: SkipReason::TooFewCells(1),
                },
            ]
        );
    }

    #[test]
    fn three_and_four_cell_layouts() {
        let doc = table_doc(
            "<tr><td>Titanic</td><td>$2,264,750,694</td><td>1997</td></tr>\
             <tr><td>5</td><td>Star Wars: The Force Awakens</td><td>$2,071,310,218</td><td>2015</td></tr>",
        );
        let report = run(&doc, &ExtractOptions::default());
        let titles: Vec<_> = report.records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Titanic", "Star Wars: The Force Awakens"]);
        assert_eq!(report.records[0].year, "1997");
        assert_eq!(report.records[1].worldwide_gross, 2_071_310_218);
    }

    #[test]
    fn column_map_clips_to_row() {
        assert_eq!(ColumnMap::for_width(2), None);
        assert_eq!(
            ColumnMap::for_width(3),
            Some(ColumnMap {
                title: 0,
                gross: 1,
                year: 2,
            })
        );
        assert_eq!(
            ColumnMap::for_width(4),
            Some(ColumnMap {
                title: 1,
                gross: 2,
                year: 3,
            })
        );
        assert_eq!(
            ColumnMap::for_width(7),
            Some(ColumnMap {
                title: 2,
                gross: 3,
                year: 4,
            })
        );
    }

    #[test]
    fn bad_gross_and_threshold() {
        let doc = table_doc(
            "<tr><td>1</td><td>1</td><td>Tiny</td><td>$50</td><td>2001</td></tr>\
             <tr><td>2</td><td>2</td><td>Exactly</td><td>$1,000,000,000</td><td>2002</td></tr>\
             <tr><td>3</td><td>3</td><td>Mid</td><td>$812,000,000</td><td>2003</td></tr>\
             <tr><td>4</td><td>4</td><td>[1]</td><td>$1,500,000,000</td><td>2004</td></tr>\
             <tr><td>5</td><td>5</td><td>Unknown</td><td>TBD</td><td>2005</td></tr>\
             <tr><td>6</td><td>6</td><td>Just over</td><td>$1,000,000,001</td><td>—</td></tr>",
        );
        let report = run(&doc, &ExtractOptions::default());
        assert_eq!(
            report.records,
            vec![MovieRecord {
                title: "Just over".into(),
                worldwide_gross: 1_000_000_001,
                year: "2023".into(),
            }]
        );
        let reasons: Vec<_> = report.skipped.iter().map(|s| s.reason).collect();
        assert_eq!(
            reasons,
            vec![
                SkipReason::GrossTooShort(2),
                SkipReason::BelowThreshold(1_000_000_000),
                SkipReason::BelowThreshold(812_000_000),
                SkipReason::EmptyTitle,
                SkipReason::NoGrossDigits,
            ]
        );
        assert_eq!(report.rows_seen, 6);
    }

    #[test]
    fn max_rows_caps_data_rows() {
        let rows: String = (1..=5)
            .map(|i| {
                format!(
                    "<tr><td>{i}</td><td>{i}</td><td>Film {i}</td><td>$2,000,000,00{i}</td><td>201{i}</td></tr>"
                )
            })
            .collect();
        let doc = table_doc(&rows);
        let opts = ExtractOptions {
            max_rows: Some(3),
            ..ExtractOptions::default()
        };
        let report = run(&doc, &opts);
        assert_eq!(report.rows_seen, 3);
        assert_eq!(report.records.len(), 3);
        assert_eq!(report.records[2].title, "Film 3");
    }

    #[test]
    fn custom_threshold() {
        let doc = table_doc(
            "<tr><td>1</td><td>1</td><td>Mid</td><td>$812,000,000</td><td>2003</td></tr>",
        );
        let opts = ExtractOptions {
            min_gross: 500_000_000,
            ..ExtractOptions::default()
        };
        assert_eq!(run(&doc, &opts).records.len(), 1);
    }

    #[test]
    fn normalizing_twice_is_identical() {
        let doc = table_doc(
            "<tr><td>1</td><td>1</td><td>Avatar[3]</td><td>$2,923,710,708</td><td>2009</td></tr>\
             <tr><td>x</td></tr>\
             <tr><td>2</td><td>1</td><td>Titanic</td><td>$2,264,750,694</td><td>1997</td></tr>",
        );
        let opts = ExtractOptions::default();
        assert_eq!(run(&doc, &opts), run(&doc, &opts));
    }
}
