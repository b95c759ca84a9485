//! Durable, append-only storage of expense records.
//!
//! Two interchangeable backends implement [`RecordStore`]:
//!
//! - [`CsvStore`] keeps every record in one delimited text file.
//! - [`SqliteStore`] keeps them in the `expenses` table.
//!
//! The backend is picked once at startup from [`Settings`] and handed to the
//! routes as managed state.
//!
//!  [`CsvStore`]: crate::csv_store::CsvStore
//!  [`SqliteStore`]: crate::db::SqliteStore
//!  [`Settings`]: crate::settings::Settings
use thiserror::Error;

use crate::csv_store::CsvStore;
use crate::db::SqliteStore;
use crate::models::{ExpenseRecord, NewExpense};
use crate::settings::{Backend, Settings};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("invalid amount in record {row}: {value:?}")]
    InvalidAmount { row: i64, value: String },
}

pub trait RecordStore: Send + Sync {
    /// Creates the backing file or table when absent. Safe to call on every start.
    fn initialize(&self) -> Result<(), StoreError>;

    /// Persists `expense` and returns it with its store-assigned id.
    fn append(&self, expense: NewExpense) -> Result<ExpenseRecord, StoreError>;

    /// Every record in insertion order. Empty when nothing was written yet.
    fn load_all(&self) -> Result<Vec<ExpenseRecord>, StoreError>;
}

pub type SharedStore = Box<dyn RecordStore>;

/// Builds the configured backend and runs its initialization.
pub fn open(settings: &Settings) -> Result<SharedStore, StoreError> {
    std::fs::create_dir_all(&settings.data_dir)?;
    let store: SharedStore = match settings.backend {
        Backend::Csv => Box::new(CsvStore::new(settings.data_dir.join(&settings.csv_file))),
        Backend::Sqlite => Box::new(SqliteStore::open(
            &settings.data_dir.join(&settings.sqlite_file),
        )?),
    };
    store.initialize()?;
    tracing::info!(backend = ?settings.backend, "record store ready");
    Ok(store)
}
