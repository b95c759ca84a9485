#[macro_use]
extern crate rocket;

mod csv_store;
mod db;
mod handlers;
mod models;
mod report;
mod settings;
mod store;

use chrono::NaiveDate;
use models::{NewExpense, PaymentStatus};
use rocket::figment::Figment;
use rocket::form::Form;
use rocket::fs::{relative, FileServer};
use rocket::http::{Header, Status};
use rocket::{Build, Rocket, State};
use rocket_dyn_templates::Template;
use settings::Settings;
use store::{SharedStore, StoreError};

struct AppState {
    store: SharedStore,
    currency: String,
}

#[derive(FromForm)]
struct EntryForm {
    date: String,
    vendor_name: String,
    category: String,
    expense_amount: String,
    client_payment_amount: String,
    payment_status: String,
    notes: String,
}

impl EntryForm {
    fn into_expense(self) -> Result<NewExpense, &'static str> {
        let expense_cents =
            parse_amount(&self.expense_amount).ok_or("Expense amount must be a non-negative number.")?;
        let payment_cents = parse_amount(&self.client_payment_amount)
            .ok_or("Client payment amount must be a non-negative number.")?;
        let date = parse_date(&self.date).ok_or("Date must be written as YYYY-MM-DD.")?;
        let payment_status: PaymentStatus = self
            .payment_status
            .parse()
            .map_err(|_| "Payment status must be Pending or Received.")?;

        Ok(NewExpense {
            date,
            vendor_name: self.vendor_name,
            category: self.category,
            expense_cents,
            payment_cents,
            payment_status,
            notes: self.notes,
        })
    }
}

/// Amount in cents. Blank counts as zero.
fn parse_amount(input: &str) -> Option<i64> {
    if input.trim().is_empty() {
        return Some(0);
    }
    models::parse_amount_to_cents(input)
}

fn parse_date(input: &str) -> Option<String> {
    let s = input.trim();
    if s.is_empty() {
        return Some(handlers::today_ymd());
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    Some(date.format("%Y-%m-%d").to_string())
}

#[derive(Responder)]
#[response(content_type = "text/csv")]
struct CsvDownload {
    body: Vec<u8>,
    disposition: Header<'static>,
}

fn internal_error(err: StoreError) -> Status {
    tracing::error!("record store failure: {err}");
    Status::InternalServerError
}

#[get("/")]
fn dashboard(state: &State<AppState>) -> Result<Template, Status> {
    let view = handlers::view_dashboard(state.store.as_ref(), &state.currency)
        .map_err(internal_error)?;
    Ok(Template::render("dashboard", &view))
}

#[post("/entries", data = "<form>")]
fn add_entry(state: &State<AppState>, form: Form<EntryForm>) -> Result<Template, Status> {
    let store = state.store.as_ref();
    let view = match form.into_inner().into_expense() {
        Ok(expense) => handlers::submit_entry(store, &state.currency, expense),
        Err(message) => {
            tracing::debug!(reason = message, "rejected entry");
            handlers::view_dashboard(store, &state.currency).map(|view| view.with_error(message))
        }
    }
    .map_err(internal_error)?;
    Ok(Template::render("dashboard", &view))
}

#[get("/export")]
fn export(state: &State<AppState>) -> Result<CsvDownload, Status> {
    let body = handlers::request_export(state.store.as_ref()).map_err(internal_error)?;
    Ok(CsvDownload {
        body,
        disposition: Header::new(
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", handlers::EXPORT_FILE_NAME),
        ),
    })
}

fn build(figment: Figment, settings: &Settings) -> Result<Rocket<Build>, StoreError> {
    let store = store::open(settings)?;
    Ok(rocket::custom(figment)
        .manage(AppState {
            store,
            currency: settings.currency.clone(),
        })
        .mount("/", routes![dashboard, add_entry, export])
        .mount("/static", FileServer::from(relative!("static")))
        .attach(Template::fairing()))
}

#[rocket::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let figment = rocket::Config::figment();
    let settings = Settings::from_figment(&figment)?;

    tracing_subscriber::fmt()
        .with_env_filter(format!("interior_expenses={}", settings.log_level))
        .init();
    tracing::info!(data_dir = %settings.data_dir.display(), "starting expense tracker");

    let _rocket = build(figment, &settings)?.launch().await?;
    Ok(())
}
