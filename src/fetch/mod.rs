// src/fetch/mod.rs

use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_BACKOFF_MS: u64 = 60_000;

/// Delay before retry number `attempt` (1-based), doubling from
/// `initial_ms` and capped at one minute.
pub fn backoff_delay(initial_ms: u64, attempt: u32) -> Duration {
    let factor = 2u64.checked_pow(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
    Duration::from_millis(initial_ms.saturating_mul(factor).min(MAX_BACKOFF_MS))
}

/// Build the HTTP client used for page fetches.
pub fn build_client(user_agent: &str) -> Result<Client> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(REQUEST_TIMEOUT)
        .gzip(true)
        .build()
        .context("building HTTP client")
}

async fn get_text_core(client: &Client, url: &Url) -> Result<String> {
    debug!("Fetching text from {}", url);
    client
        .get(url.clone())
        .send()
        .await
        .with_context(|| format!("GET {} failed", url))?
        .error_for_status()
        .with_context(|| format!("Non-success status {}", url))?
        .text()
        .await
        .with_context(|| format!("Reading text from {}", url))
}

/// Fetch `url` as text, retrying with exponential backoff.
#[instrument(level = "info", skip(client))]
pub async fn fetch_page(
    client: &Client,
    url: &str,
    max_retries: u32,
    initial_backoff_ms: u64,
) -> Result<String> {
    let url = Url::parse(url).with_context(|| format!("parsing URL {}", url))?;
    let mut attempts = 0;
    loop {
        match get_text_core(client, &url).await {
            Ok(t) => {
                debug!(bytes = t.len(), "page fetched");
                return Ok(t);
            }
            Err(e) if attempts < max_retries => {
                attempts += 1;
                let delay = backoff_delay(initial_backoff_ms, attempts);
                warn!(
                    %url,
                    attempt = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retrying"
                );
                sleep(delay).await;
            }
            Err(e) => {
                error!(%url, error = %e, "Exhausted retries");
                return Err(e);
            }
        }
    }
}
