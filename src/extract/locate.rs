// src/extract/locate.rs

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};

use super::types::ExtractError;

const CAPTION_NEEDLE: &str = "highest-grossing films";
const HEADER_NEEDLES: &[&str] = &["worldwide", "gross"];

pub(crate) fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>()
}

/// All `<table class="wikitable">` elements, in document order.
pub fn wikitables(doc: &Html) -> Vec<ElementRef<'_>> {
    let sel = Selector::parse("table.wikitable").expect("wikitable selector should parse");
    doc.select(&sel).collect()
}

pub(crate) fn caption_text(table: ElementRef<'_>) -> Option<String> {
    let sel = Selector::parse("caption").expect("caption selector should parse");
    table.select(&sel).next().map(text_of)
}

pub(crate) fn first_row(table: ElementRef<'_>) -> Option<ElementRef<'_>> {
    let sel = Selector::parse("tr").expect("row selector should parse");
    table.select(&sel).next()
}

/// Pick the table holding the highest-grossing films.
///
/// Caption match wins, then a header row mentioning worldwide/gross, then the
/// first wikitable on the page.
#[instrument(level = "debug", skip(doc))]
pub fn locate_table(doc: &Html) -> Result<ElementRef<'_>, ExtractError> {
    let tables = wikitables(doc);
    debug!(candidates = tables.len(), "wikitables found");

    if let Some((i, t)) = tables.iter().enumerate().find(|(_, t)| {
        caption_text(**t)
            .map(|c| c.to_lowercase().contains(CAPTION_NEEDLE))
            .unwrap_or(false)
    }) {
        debug!(index = i, "selected by caption");
        return Ok(*t);
    }

    if let Some((i, t)) = tables.iter().enumerate().find(|(_, t)| {
        first_row(**t)
            .map(|r| {
                let header = text_of(r).to_lowercase();
                HEADER_NEEDLES.iter().any(|n| header.contains(n))
            })
            .unwrap_or(false)
    }) {
        debug!(index = i, "selected by header row");
        return Ok(*t);
    }

    match tables.first() {
        Some(t) => {
            debug!("falling back to first wikitable");
            Ok(*t)
        }
        None => Err(ExtractError::TableNotFound),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id_of(t: ElementRef<'_>) -> Option<&str> {
        t.value().attr("id")
    }

    #[test]
    fn no_wikitable_is_not_found() {
        let doc = Html::parse_document(
            r#"<html><body>
                <table class="infobox"><tr><td>Worldwide gross</td></tr></table>
                <p>nothing here</p>
            </body></html>"#,
        );
        assert!(matches!(
            locate_table(&doc),
            Err(ExtractError::TableNotFound)
        ));
    }

    #[test]
    fn caption_beats_earlier_tables() {
        let doc = Html::parse_document(
            r#"<html><body>
                <table class="wikitable" id="a"><tr><th>Rank</th><th>Worldwide gross</th></tr></table>
                <table class="wikitable sortable" id="b">
                    <caption>Highest-Grossing Films worldwide</caption>
                    <tr><th>Rank</th></tr>
                </table>
            </body></html>"#,
        );
        let t = locate_table(&doc).unwrap();
        assert_eq!(id_of(t), Some("b"));
    }

    #[test]
    fn header_row_used_when_no_caption_matches() {
        let doc = Html::parse_document(
            r#"<html><body>
                <table class="wikitable" id="a"><caption>Timeline</caption><tr><th>Year</th><th>Title</th></tr></table>
                <table class="wikitable" id="b"><tr><th>Rank</th><th>Title</th><th>GROSS</th></tr></table>
                <table class="wikitable" id="c"><tr><th>Worldwide gross</th></tr></table>
            </body></html>"#,
        );
        let t = locate_table(&doc).unwrap();
        assert_eq!(id_of(t), Some("b"));
    }

    #[test]
    fn falls_back_to_first_wikitable() {
        let doc = Html::parse_document(
            r#"<html><body>
                <table class="navbox" id="nav"><tr><td>Gross</td></tr></table>
                <table class="wikitable" id="first"><tr><th>Decade</th></tr></table>
                <table class="wikitable" id="second"><tr><th>Franchise</th></tr></table>
            </body></html>"#,
        );
        let t = locate_table(&doc).unwrap();
        assert_eq!(id_of(t), Some("first"));
    }
}
