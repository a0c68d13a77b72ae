// src/store/mod.rs

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::path::Path;
use tracing::{debug, info};

use crate::extract::MovieRecord;

const MOVIES_DDL: &str = "
    CREATE TABLE IF NOT EXISTS movies (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        title           TEXT NOT NULL UNIQUE,
        worldwide_gross INTEGER,
        year            INTEGER
    );
";

// Tables created by older scripts lack the UNIQUE constraint on title.
const TITLE_INDEX_DDL: &str =
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_movies_title ON movies(title);";

/// Sink for normalized records.
pub trait MovieStore {
    /// Insert or replace each record keyed on title. Returns rows written.
    fn upsert_movies(&mut self, records: &[MovieRecord]) -> Result<usize>;
}

/// A row read back from the `movies` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMovie {
    pub id: i64,
    pub title: String,
    pub worldwide_gross: Option<i64>,
    pub year: Option<i64>,
}

/// Column description from `PRAGMA table_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub ty: String,
    pub not_null: bool,
}

/// SQLite-backed movie store.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path` and ensure the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let store = Self::connect(path)?;
        store.init_schema()?;
        debug!(path = %path.display(), "opened movie store");
        Ok(store)
    }

    /// Open the database at `path` and drop and recreate `movies` without
    /// first checking the existing table.
    pub fn open_reset(path: impl AsRef<Path>) -> Result<Self> {
        let store = Self::connect(path.as_ref())?;
        store.reset()?;
        Ok(store)
    }

    fn connect(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("opening database {}", path.display()))?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.init_schema()?;
        Ok(store)
    }

    pub fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(MOVIES_DDL)
            .context("creating movies table")?;
        if let Err(e) = self.conn.execute_batch(TITLE_INDEX_DDL) {
            let dupes = self.duplicate_titles().unwrap_or_default();
            return Err(anyhow::Error::new(e).context(format!(
                "creating unique title index; duplicate titles already stored: {:?}",
                dupes
            )));
        }
        Ok(())
    }

    fn duplicate_titles(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT title FROM movies GROUP BY title HAVING COUNT(*) > 1 ORDER BY title",
        )?;
        let rows = stmt.query_map([], |r| r.get(0))?;
        let titles = rows.collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(titles)
    }

    /// Drop and recreate the `movies` table.
    pub fn reset(&self) -> Result<()> {
        self.conn
            .execute_batch("DROP TABLE IF EXISTS movies;")
            .context("dropping movies table")?;
        self.init_schema()?;
        info!("movies table reset");
        Ok(())
    }

    pub fn count(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM movies", [], |r| r.get(0))?)
    }

    /// Stored movies, highest gross first.
    pub fn list_movies(&self, limit: usize) -> Result<Vec<StoredMovie>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, worldwide_gross, year FROM movies
             ORDER BY worldwide_gross DESC, id ASC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |r| {
            Ok(StoredMovie {
                id: r.get(0)?,
                title: r.get(1)?,
                worldwide_gross: r.get(2)?,
                year: r.get(3)?,
            })
        })?;
        let movies = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(movies)
    }

    pub fn table_columns(&self) -> Result<Vec<ColumnInfo>> {
        let mut stmt = self.conn.prepare("PRAGMA table_info(movies)")?;
        let rows = stmt.query_map([], |r| {
            Ok(ColumnInfo {
                name: r.get(1)?,
                ty: r.get(2)?,
                not_null: r.get::<_, i64>(3)? == 1,
            })
        })?;
        let cols = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(cols)
    }
}

impl MovieStore for SqliteStore {
    fn upsert_movies(&mut self, records: &[MovieRecord]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO movies (title, worldwide_gross, year)
                 VALUES (?1, ?2, ?3)",
            )?;
            for rec in records {
                let gross = i64::try_from(rec.worldwide_gross)
                    .with_context(|| format!("gross for {} out of range", rec.title))?;
                written += stmt.execute(params![rec.title, gross, rec.year_number()])?;
            }
        }
        tx.commit().context("committing movie upsert")?;
        info!(written, "upserted movies");
        Ok(written)
    }
}
