use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Received,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 2] = [PaymentStatus::Pending, PaymentStatus::Received];

    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Received => "Received",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown payment status: {0:?}")]
pub struct UnknownStatus(pub String);

impl FromStr for PaymentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(PaymentStatus::Pending),
            "Received" => Ok(PaymentStatus::Received),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl ToSql for PaymentStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for PaymentStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|err| FromSqlError::Other(Box::new(err)))
    }
}

/// Parses a non-negative decimal amount into cents. `,` is accepted as the
/// decimal separator; more than two fractional digits are rejected.
pub fn parse_amount_to_cents(input: &str) -> Option<i64> {
    let s = input.trim().replace(',', ".");
    if s.is_empty() || s.starts_with('-') || s.starts_with('+') {
        return None;
    }
    let mut parts = s.split('.');
    let whole_str = parts.next()?;
    let frac_str = parts.next();
    if parts.next().is_some() {
        return None;
    }
    if !whole_str.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let whole: i64 = if whole_str.is_empty() {
        0
    } else {
        whole_str.parse().ok()?
    };
    let frac = match frac_str {
        None => 0,
        Some(frac) => {
            if frac.len() > 2 || !frac.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let mut padded = frac.to_string();
            while padded.len() < 2 {
                padded.push('0');
            }
            padded.parse::<i64>().ok()?
        }
    };
    if whole_str.is_empty() && frac_str.is_none_or(str::is_empty) {
        return None;
    }
    whole.checked_mul(100)?.checked_add(frac)
}

/// Plain decimal form of `cents`: `5000` for whole amounts, `99.50` otherwise.
pub fn format_decimal(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    let whole = abs / 100;
    let frac = abs % 100;
    if frac == 0 {
        format!("{sign}{whole}")
    } else {
        format!("{sign}{whole}.{frac:02}")
    }
}

/// An entry as submitted through the form, before the store assigns an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub date: String,
    pub vendor_name: String,
    pub category: String,
    pub expense_cents: i64,
    pub payment_cents: i64,
    pub payment_status: PaymentStatus,
    pub notes: String,
}

impl NewExpense {
    pub fn into_record(self, id: i64) -> ExpenseRecord {
        ExpenseRecord {
            id,
            date: self.date,
            vendor_name: self.vendor_name,
            category: self.category,
            expense_cents: self.expense_cents,
            payment_cents: self.payment_cents,
            payment_status: self.payment_status,
            notes: self.notes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpenseRecord {
    pub id: i64,
    pub date: String,
    pub vendor_name: String,
    pub category: String,
    pub expense_cents: i64,
    pub payment_cents: i64,
    pub payment_status: PaymentStatus,
    pub notes: String,
}

#[cfg(test)]
pub(crate) fn sample(category: &str, expense_cents: i64, payment_cents: i64) -> NewExpense {
    NewExpense {
        date: "2024-01-01".to_string(),
        vendor_name: "Acme".to_string(),
        category: category.to_string(),
        expense_cents,
        payment_cents,
        payment_status: PaymentStatus::Received,
        notes: String::new(),
    }
}
