pub mod config;
pub mod extract;
pub mod fetch;
pub mod history;
pub mod run;
pub mod store;

pub use config::Config;
pub use extract::{extract, extract_html, ExtractError, ExtractOptions, ExtractReport, MovieRecord};
pub use store::{MovieStore, SqliteStore};
