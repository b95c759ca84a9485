use std::path::Path;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, Result};

use crate::models::{ExpenseRecord, NewExpense};
use crate::store::{RecordStore, StoreError};

pub type DbPool = Pool<SqliteConnectionManager>;

/// Table-backed store. The pool is shared by every request; each append is a
/// single INSERT.
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn open(path: &Path) -> std::result::Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::new(manager)?;
        Ok(Self { pool })
    }
}

impl RecordStore for SqliteStore {
    fn initialize(&self) -> std::result::Result<(), StoreError> {
        let conn = self.pool.get()?;
        run_migrations(&conn)?;
        tracing::info!("expenses table ready");
        Ok(())
    }

    fn append(&self, expense: NewExpense) -> std::result::Result<ExpenseRecord, StoreError> {
        let conn = self.pool.get()?;
        let id = insert_expense(&conn, &expense)?;
        tracing::debug!(id, "inserted expense");
        Ok(expense.into_record(id))
    }

    fn load_all(&self) -> std::result::Result<Vec<ExpenseRecord>, StoreError> {
        let conn = self.pool.get()?;
        Ok(list_expenses(&conn)?)
    }
}

fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS expenses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            Date TEXT NOT NULL,
            Vendor TEXT NOT NULL,
            Category TEXT NOT NULL,
            Expense REAL NOT NULL,
            Payment REAL NOT NULL,
            Status TEXT NOT NULL CHECK(Status IN ('Pending', 'Received')),
            Notes TEXT NOT NULL
        );
        ",
    )
}

/// `Expense` and `Payment` are REAL columns in currency units, not cents.
fn cents_to_real(cents: i64) -> f64 {
    cents as f64 / 100.0
}

fn real_to_cents(value: f64) -> i64 {
    (value * 100.0).round() as i64
}

pub fn insert_expense(conn: &Connection, expense: &NewExpense) -> Result<i64> {
    conn.execute(
        "
        INSERT INTO expenses (Date, Vendor, Category, Expense, Payment, Status, Notes)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ",
        params![
            expense.date,
            expense.vendor_name,
            expense.category,
            cents_to_real(expense.expense_cents),
            cents_to_real(expense.payment_cents),
            expense.payment_status,
            expense.notes
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_expenses(conn: &Connection) -> Result<Vec<ExpenseRecord>> {
    let mut stmt = conn.prepare(
        "
        SELECT id, Date, Vendor, Category, Expense, Payment, Status, Notes
        FROM expenses
        ORDER BY id ASC
        ",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(ExpenseRecord {
            id: row.get(0)?,
            date: row.get(1)?,
            vendor_name: row.get(2)?,
            category: row.get(3)?,
            expense_cents: real_to_cents(row.get(4)?),
            payment_cents: real_to_cents(row.get(5)?),
            payment_status: row.get(6)?,
            notes: row.get(7)?,
        })
    })?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}
