// src/run.rs
//
// The stages of a scrape run that touch the outside world, each leaving one
// history entry behind whatever happens.

use anyhow::{bail, Result};
use scraper::Html;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::extract::{self, ExtractError, ExtractReport};
use crate::fetch;
use crate::history::{History, RunOutcome, RunRecord};
use crate::store::{MovieStore, SqliteStore};

/// Append a run to `history`. A failed write is logged, not returned.
pub fn record(
    history: &History,
    url: &str,
    outcome: RunOutcome,
    report: Option<&ExtractReport>,
) {
    if let Err(e) = history.record_run(&RunRecord::now(url, outcome, report)) {
        error!("failed to record run history: {:#}", e);
    }
}

/// Fetch the configured page, recording `fetch_failed` on any error.
pub async fn fetch_html(cfg: &Config, history: &History) -> Result<String> {
    info!(url = %cfg.url, "fetching page");
    let fetched = match fetch::build_client(&cfg.user_agent) {
        Ok(client) => {
            fetch::fetch_page(&client, &cfg.url, cfg.fetch_retries, cfg.fetch_backoff_ms).await
        }
        Err(e) => Err(e),
    };
    if fetched.is_err() {
        record(history, &cfg.url, RunOutcome::FetchFailed, None);
    }
    fetched
}

/// Extract records from `html`, recording `table_not_found` when there is no table.
pub fn extract_report(cfg: &Config, html: &str, history: &History) -> Result<ExtractReport> {
    let doc = Html::parse_document(html);
    let report = match extract::extract(&doc, &cfg.extract_options()) {
        Ok(r) => r,
        Err(ExtractError::TableNotFound) => {
            record(history, &cfg.url, RunOutcome::TableNotFound, None);
            bail!("no wikitable found at {}", cfg.url);
        }
    };
    if report.records.is_empty() {
        warn!(
            rows = report.rows_seen,
            skipped = report.skipped.len(),
            "table found but no rows qualified"
        );
    }
    Ok(report)
}

/// Upsert `report` (unless `dry_run`) and record `ok` or `store_failed`.
pub fn store_report(
    cfg: &Config,
    report: &ExtractReport,
    dry_run: bool,
    history: &History,
) -> Result<()> {
    let stored = if dry_run {
        info!("dry run; not writing to {}", cfg.db_path.display());
        Ok(())
    } else {
        SqliteStore::open(&cfg.db_path)
            .and_then(|mut store| store.upsert_movies(&report.records))
            .map(|_| ())
    };
    let outcome = if stored.is_ok() {
        RunOutcome::Ok
    } else {
        RunOutcome::StoreFailed
    };
    record(history, &cfg.url, outcome, Some(report));
    stored
}
