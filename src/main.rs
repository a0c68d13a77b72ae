use anyhow::Result;
use clap::{Parser, Subcommand};
use moviescraper::{
    config::Config,
    extract::{self, describe_tables},
    fetch,
    history::History,
    run,
    store::SqliteStore,
};
use scraper::Html;
use std::path::PathBuf;
use tokio::time::Instant;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "moviescraper",
    about = "Scrape the highest-grossing films table into SQLite"
)]
struct Cli {
    /// YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the page, extract billion-dollar films and upsert them
    Scrape {
        #[arg(long)]
        url: Option<String>,
        /// Max data rows to consider (default: all)
        #[arg(short = 'n', long)]
        max_rows: Option<usize>,
        /// Films must gross strictly more than this
        #[arg(long)]
        min_gross: Option<u64>,
        /// Extract only, do not write to the database
        #[arg(long)]
        dry_run: bool,
        /// Print extracted records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show stored movies, highest gross first
    List {
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
    /// Drop and recreate the movies table
    Reset,
    /// Describe the wikitables on the page
    Inspect {
        #[arg(long)]
        url: Option<String>,
        #[arg(short = 'n', long, default_value = "3")]
        limit: usize,
    },
    /// Show recorded scrape runs
    History,
}

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,moviescraper=info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let cli = Cli::parse();
    let mut cfg = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Scrape {
            url,
            max_rows,
            min_gross,
            dry_run,
            json,
        } => {
            if let Some(u) = url {
                cfg.url = u;
            }
            if max_rows.is_some() {
                cfg.max_rows = max_rows;
            }
            if let Some(g) = min_gross {
                cfg.min_gross = g;
            }
            scrape(&cfg, dry_run, json).await
        }
        Commands::List { limit } => {
            let store = SqliteStore::open(&cfg.db_path)?;
            let movies = store.list_movies(limit)?;
            println!("{} movies stored", store.count()?);
            for m in movies {
                println!(
                    "{:>4}  {:<50} {:>15} {}",
                    m.id,
                    m.title,
                    m.worldwide_gross.map(|g| g.to_string()).unwrap_or_default(),
                    m.year.map(|y| y.to_string()).unwrap_or_default()
                );
            }
            Ok(())
        }
        Commands::Reset => {
            let store = SqliteStore::open_reset(&cfg.db_path)?;
            println!("Reset movies table in {}", cfg.db_path.display());
            for c in store.table_columns()? {
                println!(
                    "  {:<16} {:<8} {}",
                    c.name,
                    c.ty,
                    if c.not_null { "NOT NULL" } else { "" }
                );
            }
            Ok(())
        }
        Commands::Inspect { url, limit } => {
            if let Some(u) = url {
                cfg.url = u;
            }
            let client = fetch::build_client(&cfg.user_agent)?;
            let html =
                fetch::fetch_page(&client, &cfg.url, cfg.fetch_retries, cfg.fetch_backoff_ms)
                    .await?;
            let doc = Html::parse_document(&html);
            let tables = describe_tables(&doc, limit);
            println!(
                "Found {} wikitable(s) (showing up to {})",
                extract::locate::wikitables(&doc).len(),
                limit
            );
            for t in tables {
                println!("\n--- Table {} ---", t.index + 1);
                if let Some(c) = &t.caption {
                    println!("Caption: {}", c);
                }
                println!("Headers: {:?}", t.headers);
                for (j, row) in t.sample_rows.iter().enumerate() {
                    println!("Row {}: {:?}", j + 1, row);
                }
            }
            Ok(())
        }
        Commands::History => {
            let history = History::new(&cfg.history_dir)?;
            for run in history.load_runs()? {
                println!(
                    "{}  {:<16} rows={:<4} accepted={:<4} skipped={:<4} {}",
                    run.run_time.format("%Y-%m-%d %H:%M:%S"),
                    run.outcome,
                    run.rows_seen,
                    run.accepted,
                    run.skipped,
                    run.url
                );
            }
            Ok(())
        }
    }
}

async fn scrape(cfg: &Config, dry_run: bool, json: bool) -> Result<()> {
    let start = Instant::now();
    let history = History::new(&cfg.history_dir)?;

    // ─── 1) fetch ────────────────────────────────────────────────────
    let html = run::fetch_html(cfg, &history).await?;

    // ─── 2) extract ──────────────────────────────────────────────────
    let report = run::extract_report(cfg, &html, &history)?;

    // ─── 3) store ────────────────────────────────────────────────────
    run::store_report(cfg, &report, dry_run, &history)?;

    // ─── 4) report ───────────────────────────────────────────────────
    if json {
        println!("{}", serde_json::to_string_pretty(&report.records)?);
    } else {
        for (i, m) in report.records.iter().enumerate() {
            println!("{:>3}. {} ({}) ${}", i + 1, m.title, m.year, m.worldwide_gross);
        }
    }
    println!(
        "Scraped {} movies ({} rows seen, {} skipped) in {:.1}s",
        report.records.len(),
        report.rows_seen,
        report.skipped.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}
