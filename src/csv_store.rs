use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::SystemTime;

use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};

use crate::models::{format_decimal, parse_amount_to_cents, ExpenseRecord, NewExpense, PaymentStatus};
use crate::store::{RecordStore, StoreError};

pub const HEADER: [&str; 7] = [
    "Date",
    "Vendor Name",
    "Expense Category",
    "Expense Amount",
    "Client Payment Amount",
    "Payment Status",
    "Notes",
];

/// One line of the file. Ids are not stored; they follow row position.
/// Amounts are written as plain decimals (`5000`, `99.50`).
#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Vendor Name")]
    vendor_name: String,
    #[serde(rename = "Expense Category")]
    category: String,
    #[serde(rename = "Expense Amount")]
    expense_amount: String,
    #[serde(rename = "Client Payment Amount")]
    client_payment_amount: String,
    #[serde(rename = "Payment Status")]
    payment_status: PaymentStatus,
    #[serde(rename = "Notes")]
    notes: String,
}

impl From<&ExpenseRecord> for CsvRow {
    fn from(record: &ExpenseRecord) -> Self {
        Self {
            date: record.date.clone(),
            vendor_name: record.vendor_name.clone(),
            category: record.category.clone(),
            expense_amount: format_decimal(record.expense_cents),
            client_payment_amount: format_decimal(record.payment_cents),
            payment_status: record.payment_status,
            notes: record.notes.clone(),
        }
    }
}

impl CsvRow {
    fn into_record(self, id: i64) -> Result<ExpenseRecord, StoreError> {
        let cents = |value: String| {
            parse_amount_to_cents(&value).ok_or(StoreError::InvalidAmount { row: id, value })
        };
        Ok(ExpenseRecord {
            id,
            expense_cents: cents(self.expense_amount)?,
            payment_cents: cents(self.client_payment_amount)?,
            date: self.date,
            vendor_name: self.vendor_name,
            category: self.category,
            payment_status: self.payment_status,
            notes: self.notes,
        })
    }
}

/// Writes the header followed by one row per record.
pub fn write_records<W: Write>(out: W, records: &[ExpenseRecord]) -> Result<W, StoreError> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(out);
    writer.write_record(HEADER)?;
    for record in records {
        writer.serialize(CsvRow::from(record))?;
    }
    writer
        .into_inner()
        .map_err(|err| StoreError::Io(err.into_error()))
}

pub fn read_records<R: Read>(input: R) -> Result<Vec<ExpenseRecord>, StoreError> {
    let mut reader = ReaderBuilder::new().from_reader(input);
    let mut out = Vec::new();
    for row in reader.deserialize::<CsvRow>() {
        let id = out.len() as i64 + 1;
        out.push(row?.into_record(id)?);
    }
    Ok(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: SystemTime,
    len: u64,
}

impl FileStamp {
    fn of(path: &Path) -> io::Result<Option<FileStamp>> {
        match fs::metadata(path) {
            Ok(meta) => Ok(Some(FileStamp {
                modified: meta.modified()?,
                len: meta.len(),
            })),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }
}

struct Snapshot {
    stamp: FileStamp,
    records: Vec<ExpenseRecord>,
}

/// File-backed store. Records read from disk are cached until the file's
/// modification time or length changes.
pub struct CsvStore {
    path: PathBuf,
    cache: Mutex<Option<Snapshot>>,
}

impl CsvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Snapshot>> {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn current(&self, cache: &mut Option<Snapshot>) -> Result<Vec<ExpenseRecord>, StoreError> {
        let Some(stamp) = FileStamp::of(&self.path)? else {
            *cache = None;
            return Ok(Vec::new());
        };
        if let Some(snapshot) = cache.as_ref() {
            if snapshot.stamp == stamp {
                return Ok(snapshot.records.clone());
            }
        }

        let records = read_records(File::open(&self.path)?)?;
        tracing::debug!(path = %self.path.display(), count = records.len(), "reloaded csv");
        *cache = Some(Snapshot {
            stamp,
            records: records.clone(),
        });
        Ok(records)
    }

    /// Replaces the file through a synced temporary sibling and a rename, so a
    /// reader never observes a partially written row.
    fn persist(&self, records: &[ExpenseRecord]) -> Result<FileStamp, StoreError> {
        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        let file = write_records(File::create(&tmp_path)?, records)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&tmp_path, &self.path)?;

        FileStamp::of(&self.path)?
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "csv file vanished").into())
    }
}

impl RecordStore for CsvStore {
    fn initialize(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        if !self.path.exists() {
            self.persist(&[])?;
            tracing::info!(path = %self.path.display(), "created expense file");
        }
        Ok(())
    }

    fn append(&self, expense: NewExpense) -> Result<ExpenseRecord, StoreError> {
        let mut cache = self.lock();
        let mut records = self.current(&mut cache)?;
        let record = expense.into_record(records.len() as i64 + 1);
        records.push(record.clone());

        let stamp = self.persist(&records)?;
        *cache = Some(Snapshot { stamp, records });
        tracing::debug!(id = record.id, "appended expense to csv");
        Ok(record)
    }

    fn load_all(&self) -> Result<Vec<ExpenseRecord>, StoreError> {
        let mut cache = self.lock();
        self.current(&mut cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("expenses_{}.csv", uuid::Uuid::new_v4()))
    }

    #[test]
    fn initialize_writes_header_once() {
        let path = temp_path();
        let store = CsvStore::new(&path);
        store.initialize().unwrap();
        store.append(sample("Paint", 10_000, 0)).unwrap();
        store.initialize().unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(
            lines.next(),
            Some("Date,Vendor Name,Expense Category,Expense Amount,Client Payment Amount,Payment Status,Notes")
        );
        assert_eq!(lines.count(), 1);
        assert_eq!(store.load_all().unwrap().len(), 1);
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let store = CsvStore::new(temp_path());
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn appends_keep_insertion_order() {
        let path = temp_path();
        let store = CsvStore::new(&path);
        store.initialize().unwrap();
        for i in 0..5 {
            let record = store.append(sample(&format!("c{i}"), i * 100, 0)).unwrap();
            assert_eq!(record.id, i + 1);
        }

        let reopened = CsvStore::new(&path);
        let records = reopened.load_all().unwrap();
        assert_eq!(records.len(), 5);
        for (i, record) in records.iter().enumerate() {
            assert_eq!(record.category, format!("c{i}"));
            assert_eq!(record.id, i as i64 + 1);
        }
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn cache_follows_changes_from_another_handle() {
        let path = temp_path();
        let reader = CsvStore::new(&path);
        let writer = CsvStore::new(&path);
        writer.initialize().unwrap();
        assert!(reader.load_all().unwrap().is_empty());

        writer.append(sample("Paint", 500_000, 800_000)).unwrap();
        let records = reader.load_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].vendor_name, "Acme");
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn export_then_import_is_identical() {
        let mut awkward = sample("Paint, \"gloss\"", 123_450, 9_905);
        awkward.notes = "line one\nline two".to_string();
        awkward.payment_status = PaymentStatus::Pending;
        let records = vec![
            sample("Labor", 700_000, 0).into_record(1),
            awkward.into_record(2),
            sample("", 0, 30_000).into_record(3),
        ];

        let bytes = write_records(Vec::new(), &records).unwrap();
        let imported = read_records(bytes.as_slice()).unwrap();
        assert_eq!(imported, records);
    }

    #[test]
    fn amounts_are_written_as_plain_decimals() {
        let records = vec![
            sample("Paint", 500_000, 800_000).into_record(1),
            sample("Labor", 9_950, 5).into_record(2),
        ];
        let text = String::from_utf8(write_records(Vec::new(), &records).unwrap()).unwrap();
        let rows: Vec<_> = text.lines().skip(1).collect();
        assert_eq!(rows, ["2024-01-01,Acme,Paint,5000,8000,Received,", "2024-01-01,Acme,Labor,99.50,0.05,Received,"]);
    }

    #[test]
    fn reads_float_style_amounts() {
        let input = "Date,Vendor Name,Expense Category,Expense Amount,Client Payment Amount,Payment Status,Notes\n\
                     2024-01-01,Acme,Paint,5000.0,0.1,Pending,\n";
        let records = read_records(input.as_bytes()).unwrap();
        assert_eq!(records[0].expense_cents, 500_000);
        assert_eq!(records[0].payment_cents, 10);
    }

    #[test]
    fn rejects_malformed_amount() {
        let input = "Date,Vendor Name,Expense Category,Expense Amount,Client Payment Amount,Payment Status,Notes\n\
                     2024-01-01,Acme,Paint,lots,2,Pending,\n";
        assert!(matches!(
            read_records(input.as_bytes()),
            Err(StoreError::InvalidAmount { row: 1, .. })
        ));
    }

    #[test]
    fn rejects_unknown_status() {
        let input = "Date,Vendor Name,Expense Category,Expense Amount,Client Payment Amount,Payment Status,Notes\n\
                     2024-01-01,Acme,Paint,1,2,Overdue,\n";
        assert!(read_records(input.as_bytes()).is_err());
    }
}
