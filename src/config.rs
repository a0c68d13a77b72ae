// src/config.rs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf};
use tracing::debug;

use crate::extract::{ExtractOptions, DEFAULT_MIN_GROSS};

pub const DEFAULT_URL: &str = "https://en.wikipedia.org/wiki/List_of_highest-grossing_films";
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (compatible; moviescraper)";

/// Runtime settings. Every field has a default so a YAML file may set any subset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub url: String,
    pub max_rows: Option<usize>,
    pub min_gross: u64,
    pub db_path: PathBuf,
    pub history_dir: PathBuf,
    pub user_agent: String,
    pub fetch_retries: u32,
    pub fetch_backoff_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            max_rows: None,
            min_gross: DEFAULT_MIN_GROSS,
            db_path: PathBuf::from("movies.db"),
            history_dir: PathBuf::from("history"),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            fetch_retries: 3,
            fetch_backoff_ms: 500,
        }
    }
}

impl Config {
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("parsing YAML config")
    }

    /// Load `path` if given, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => {
                let text = fs::read_to_string(p)
                    .with_context(|| format!("reading config {}", p.display()))?;
                let cfg = Self::from_yaml(&text)
                    .with_context(|| format!("in config {}", p.display()))?;
                debug!(path = %p.display(), "loaded config");
                Ok(cfg)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            max_rows: self.max_rows,
            min_gross: self.min_gross,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn partial_yaml_keeps_defaults() -> Result<()> {
        let cfg = Config::from_yaml("max_rows: 50\ndb_path: /tmp/films.db\n")?;
        assert_eq!(cfg.max_rows, Some(50));
        assert_eq!(cfg.db_path, PathBuf::from("/tmp/films.db"));
        assert_eq!(cfg.url, DEFAULT_URL);
        assert_eq!(cfg.min_gross, 1_000_000_000);
        assert_eq!(
            cfg.extract_options(),
            ExtractOptions {
                max_rows: Some(50),
                min_gross: 1_000_000_000,
            }
        );
        Ok(())
    }

    #[test]
    fn unknown_type_is_an_error() {
        assert!(Config::from_yaml("min_gross: lots").is_err());
    }

    #[test]
    fn load_from_file_or_default() -> Result<()> {
        assert_eq!(Config::load(None)?, Config::default());

        let mut f = NamedTempFile::new()?;
        writeln!(f, "url: https://example.org/films\nfetch_retries: 0")?;
        let cfg = Config::load(Some(f.path()))?;
        assert_eq!(cfg.url, "https://example.org/films");
        assert_eq!(cfg.fetch_retries, 0);
        assert_eq!(cfg.max_rows, None);
        Ok(())
    }
}
