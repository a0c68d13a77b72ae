// src/history/mod.rs

use anyhow::{Context, Result};
use arrow::array::{Array, ArrayRef, StringArray, TimestampMicrosecondArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use glob::glob;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::{
    fmt, fs,
    fs::File,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::debug;

use crate::extract::ExtractReport;

/// How a scrape run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Ok,
    TableNotFound,
    FetchFailed,
    StoreFailed,
}

impl RunOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunOutcome::Ok => "ok",
            RunOutcome::TableNotFound => "table_not_found",
            RunOutcome::FetchFailed => "fetch_failed",
            RunOutcome::StoreFailed => "store_failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ok" => Some(RunOutcome::Ok),
            "table_not_found" => Some(RunOutcome::TableNotFound),
            "fetch_failed" => Some(RunOutcome::FetchFailed),
            "store_failed" => Some(RunOutcome::StoreFailed),
            _ => None,
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scrape run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    pub run_time: DateTime<Utc>,
    pub url: String,
    pub outcome: RunOutcome,
    pub rows_seen: u64,
    pub accepted: u64,
    pub skipped: u64,
}

impl RunRecord {
    /// A run stamped now, with counts taken from `report` when extraction got that far.
    pub fn now(url: &str, outcome: RunOutcome, report: Option<&ExtractReport>) -> Self {
        Self {
            run_time: Utc::now(),
            url: url.to_string(),
            outcome,
            rows_seen: report.map_or(0, |r| r.rows_seen as u64),
            accepted: report.map_or(0, |r| r.records.len() as u64),
            skipped: report.map_or(0, |r| r.skipped.len() as u64),
        }
    }
}

fn run_schema() -> Schema {
    Schema::new(vec![
        Field::new(
            "run_time",
            DataType::Timestamp(TimeUnit::Microsecond, None),
            false,
        ),
        Field::new("url", DataType::Utf8, false),
        Field::new("outcome", DataType::Utf8, false),
        Field::new("rows_seen", DataType::UInt64, false),
        Field::new("accepted", DataType::UInt64, false),
        Field::new("skipped", DataType::UInt64, false),
    ])
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, idx: usize) -> Result<&'a T> {
    batch
        .column(idx)
        .as_any()
        .downcast_ref::<T>()
        .with_context(|| format!("unexpected type for history column {}", idx))
}

/// Run ledger backed by one single-row Parquet file per run.
pub struct History {
    history_dir: PathBuf,
}

impl History {
    /// Construct a History store at `history_dir`, creating the directory if needed.
    pub fn new(history_dir: impl Into<PathBuf>) -> Result<Self> {
        let history_dir = history_dir.into();
        fs::create_dir_all(&history_dir)
            .with_context(|| format!("creating history directory {:?}", &history_dir))?;
        Ok(Self { history_dir })
    }

    pub fn dir(&self) -> &Path {
        &self.history_dir
    }

    /// Write `run` to `run_<micros>.parquet`.
    pub fn record_run(&self, run: &RunRecord) -> Result<PathBuf> {
        let ts = run.run_time.timestamp_micros();
        let path = self.free_run_path(ts);
        let schema = Arc::new(run_schema());

        let arrays: Vec<ArrayRef> = vec![
            Arc::new(TimestampMicrosecondArray::from(vec![ts])),
            Arc::new(StringArray::from(vec![run.url.clone()])),
            Arc::new(StringArray::from(vec![run.outcome.as_str()])),
            Arc::new(UInt64Array::from(vec![run.rows_seen])),
            Arc::new(UInt64Array::from(vec![run.accepted])),
            Arc::new(UInt64Array::from(vec![run.skipped])),
        ];
        let batch = RecordBatch::try_new(schema.clone(), arrays)
            .context("building history record batch")?;

        let tmp = path.with_extension("parquet.tmp");
        let file =
            File::create(&tmp).with_context(|| format!("creating history file {:?}", &tmp))?;
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let mut writer = ArrowWriter::try_new(file, schema, Some(props))
            .context("creating Arrow writer for history")?;
        writer.write(&batch).context("writing history batch")?;
        writer.close().context("closing history writer")?;
        fs::rename(&tmp, &path)?;

        debug!(path = %path.display(), outcome = %run.outcome, "recorded run");
        Ok(path)
    }

    /// `run_<micros>.parquet`, or `run_<micros>_<n>.parquet` when runs share a timestamp.
    fn free_run_path(&self, ts: i64) -> PathBuf {
        let mut path = self.history_dir.join(format!("run_{}.parquet", ts));
        let mut n = 1;
        while path.exists() || path.with_extension("parquet.tmp").exists() {
            path = self.history_dir.join(format!("run_{}_{}.parquet", ts, n));
            n += 1;
        }
        path
    }

    /// Every recorded run, oldest first.
    pub fn load_runs(&self) -> Result<Vec<RunRecord>> {
        let pattern = format!("{}/run_*.parquet", self.history_dir.display());
        let mut runs = Vec::new();
        for entry in glob(&pattern)? {
            let path = entry?;
            let file = File::open(&path)
                .with_context(|| format!("failed to open `{}`", path.display()))?;
            let mut reader = ParquetRecordBatchReaderBuilder::try_new(file)?
                .with_batch_size(1024)
                .build()?;
            while let Some(batch) = reader.next().transpose()? {
                runs.extend(read_batch(&batch)?);
            }
        }
        runs.sort_by_key(|r| r.run_time);
        Ok(runs)
    }
}

fn read_batch(batch: &RecordBatch) -> Result<Vec<RunRecord>> {
    let times = column::<TimestampMicrosecondArray>(batch, 0)?;
    let urls = column::<StringArray>(batch, 1)?;
    let outcomes = column::<StringArray>(batch, 2)?;
    let rows_seen = column::<UInt64Array>(batch, 3)?;
    let accepted = column::<UInt64Array>(batch, 4)?;
    let skipped = column::<UInt64Array>(batch, 5)?;

    (0..batch.num_rows())
        .map(|i| {
            let run_time = DateTime::<Utc>::from_timestamp_micros(times.value(i))
                .context("history timestamp out of range")?;
            let outcome = RunOutcome::parse(outcomes.value(i))
                .with_context(|| format!("unknown run outcome {}", outcomes.value(i)))?;
            Ok(RunRecord {
                run_time,
                url: urls.value(i).to_string(),
                outcome,
                rows_seen: rows_seen.value(i),
                accepted: accepted.value(i),
                skipped: skipped.value(i),
            })
        })
        .collect()
}
