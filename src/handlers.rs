//! One function per user action. Each takes the store plus the action's input
//! and returns the view model the page renders from.
use chrono::Local;
use serde::Serialize;

use crate::csv_store;
use crate::models::{self, ExpenseRecord, NewExpense, PaymentStatus};
use crate::report::{self, Charts, Metric};
use crate::store::{RecordStore, StoreError};

pub const EXPORT_FILE_NAME: &str = "project_expenses.csv";
pub const ADDED_NOTICE: &str = "Entry added successfully and saved!";

#[derive(Debug, Serialize)]
pub struct RecordView {
    pub id: i64,
    pub date: String,
    pub vendor_name: String,
    pub category: String,
    pub expense: String,
    pub payment: String,
    pub payment_status: PaymentStatus,
    pub notes: String,
}

#[derive(Debug, Serialize)]
pub struct DashboardView {
    pub currency: String,
    pub today: String,
    pub statuses: [PaymentStatus; 2],
    pub records: Vec<RecordView>,
    pub metrics: Vec<Metric>,
    pub charts: Charts,
    pub notice: Option<String>,
    pub error: Option<String>,
}

impl DashboardView {
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

fn record_view(record: ExpenseRecord) -> RecordView {
    RecordView {
        id: record.id,
        date: record.date,
        vendor_name: record.vendor_name,
        category: record.category,
        expense: models::format_decimal(record.expense_cents),
        payment: models::format_decimal(record.payment_cents),
        payment_status: record.payment_status,
        notes: record.notes,
    }
}

pub fn today_ymd() -> String {
    Local::now().date_naive().format("%Y-%m-%d").to_string()
}

pub fn view_dashboard(store: &dyn RecordStore, currency: &str) -> Result<DashboardView, StoreError> {
    let records = store.load_all()?;
    let totals = report::compute_totals(&records);
    let breakdown = report::compute_category_breakdown(&records);
    let charts = report::render_charts(&totals, &breakdown, records.len());

    Ok(DashboardView {
        currency: currency.to_string(),
        today: today_ymd(),
        statuses: PaymentStatus::ALL,
        records: records.into_iter().map(record_view).collect(),
        metrics: report::render_summary(&totals, currency),
        charts,
        notice: None,
        error: None,
    })
}

pub fn submit_entry(
    store: &dyn RecordStore,
    currency: &str,
    expense: NewExpense,
) -> Result<DashboardView, StoreError> {
    let record = store.append(expense)?;
    tracing::info!(id = record.id, category = %record.category, "expense recorded");
    let mut view = view_dashboard(store, currency)?;
    view.notice = Some(ADDED_NOTICE.to_string());
    Ok(view)
}

pub fn request_export(store: &dyn RecordStore) -> Result<Vec<u8>, StoreError> {
    let records = store.load_all()?;
    tracing::debug!(count = records.len(), "exporting records");
    csv_store::write_records(Vec::new(), &records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_store::CsvStore;
    use crate::models::sample;

    fn store() -> (CsvStore, std::path::PathBuf) {
        let path = std::env::temp_dir().join(format!("expenses_{}.csv", uuid::Uuid::new_v4()));
        let store = CsvStore::new(&path);
        store.initialize().unwrap();
        (store, path)
    }

    #[test]
    fn empty_dashboard_has_zero_metrics_and_no_charts() {
        let (store, path) = store();
        let view = view_dashboard(&store, "₹").unwrap();
        assert!(view.records.is_empty());
        assert!(view.metrics.iter().all(|m| m.value == "0"));
        assert!(view.charts.bar.is_none());
        assert!(view.charts.pie.is_none());
        assert!(view.notice.is_none());
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn submit_shows_new_state() {
        let (store, path) = store();
        let view = submit_entry(&store, "₹", sample("Paint", 500_000, 800_000)).unwrap();
        assert_eq!(view.notice.as_deref(), Some(ADDED_NOTICE));
        assert_eq!(view.records.len(), 1);
        assert_eq!(view.records[0].expense, "5000");
        assert_eq!(view.records[0].payment, "8000");
        let values: Vec<_> = view.metrics.iter().map(|m| m.value.as_str()).collect();
        assert_eq!(values, ["5,000", "8,000", "3,000"]);
        assert!(view.charts.bar.is_some());
        assert_eq!(view.charts.pie.as_ref().unwrap().slices.len(), 1);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn export_reimports_to_the_same_records() {
        let (store, path) = store();
        submit_entry(&store, "₹", sample("Paint", 300_000, 0)).unwrap();
        submit_entry(&store, "₹", sample("Labor", 700_050, 100_000)).unwrap();

        let bytes = request_export(&store).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.starts_with("Date,Vendor Name,Expense Category,"));
        assert_eq!(
            csv_store::read_records(bytes.as_slice()).unwrap(),
            store.load_all().unwrap()
        );
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn cents_show_in_table_and_round_in_metrics() {
        let (store, path) = store();
        submit_entry(&store, "₹", sample("Paint", 250_050, 0)).unwrap();
        let view = submit_entry(&store, "₹", sample("Paint", 10, 0)).unwrap();
        assert_eq!(view.records[0].expense, "2500.50");
        assert_eq!(view.records[1].expense, "0.10");
        assert_eq!(view.metrics[0].value, "2,501");
        assert_eq!(view.charts.pie.as_ref().unwrap().slices[0].value, "2,501");
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn export_of_empty_store_is_header_only() {
        let (store, path) = store();
        let text = String::from_utf8(request_export(&store).unwrap()).unwrap();
        assert_eq!(text.lines().count(), 1);
        std::fs::remove_file(path).unwrap();
    }
}
