//! Aggregates derived from the full record set, and the chart geometry drawn
//! from them. Nothing here holds state; every render recomputes from records.
//! Money is summed in integer cents so group sums always add up to the totals.
use std::collections::BTreeMap;
use std::f64::consts::{FRAC_PI_2, TAU};
use std::ops::Add;

use serde::Serialize;

use crate::models::ExpenseRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub total_expenses: i64,
    pub total_payments: i64,
    pub profit_loss: i64,
}

impl Add for Totals {
    type Output = Totals;

    fn add(self, other: Totals) -> Totals {
        Totals {
            total_expenses: self.total_expenses + other.total_expenses,
            total_payments: self.total_payments + other.total_payments,
            profit_loss: self.profit_loss + other.profit_loss,
        }
    }
}

pub fn compute_totals(records: &[ExpenseRecord]) -> Totals {
    let total_expenses: i64 = records.iter().map(|r| r.expense_cents).sum();
    let total_payments: i64 = records.iter().map(|r| r.payment_cents).sum();
    Totals {
        total_expenses,
        total_payments,
        profit_loss: total_payments - total_expenses,
    }
}

/// Expense cents per category. Keys are compared exactly: no trimming, case matters.
pub fn compute_category_breakdown(records: &[ExpenseRecord]) -> BTreeMap<String, i64> {
    let mut out = BTreeMap::new();
    for record in records {
        *out.entry(record.category.clone()).or_insert(0) += record.expense_cents;
    }
    out
}

/// Thousands-separated whole units. Half a unit rounds to the even neighbour.
pub fn format_amount(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    let mut whole = abs / 100;
    let frac = abs % 100;
    if frac > 50 || (frac == 50 && whole % 2 == 1) {
        whole += 1;
    }
    let sign = if whole == 0 { "" } else { sign };

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{sign}{grouped}")
}

#[derive(Debug, Clone, Serialize)]
pub struct Metric {
    pub label: String,
    pub value: String,
}

pub fn render_summary(totals: &Totals, currency: &str) -> Vec<Metric> {
    [
        ("Total Expenses", totals.total_expenses),
        ("Total Client Payments", totals.total_payments),
        ("Net Profit/Loss", totals.profit_loss),
    ]
    .into_iter()
    .map(|(label, value)| Metric {
        label: format!("{label} ({currency})"),
        value: format_amount(value),
    })
    .collect()
}

const BAR_AREA_HEIGHT: f64 = 160.0;
const BAR_BASELINE: f64 = 180.0;
const BAR_WIDTH: f64 = 80.0;

#[derive(Debug, Clone, Serialize)]
pub struct Bar {
    pub label: &'static str,
    pub value: String,
    pub color: &'static str,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BarChart {
    pub bars: Vec<Bar>,
    pub baseline: f64,
}

const PIE_CENTER: f64 = 110.0;
const PIE_RADIUS: f64 = 100.0;
const PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

#[derive(Debug, Clone, Serialize)]
pub struct Slice {
    pub label: String,
    pub value: String,
    pub percent: String,
    pub color: &'static str,
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PieChart {
    pub title: &'static str,
    pub slices: Vec<Slice>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Charts {
    pub bar: Option<BarChart>,
    pub pie: Option<PieChart>,
}

pub fn render_charts(
    totals: &Totals,
    breakdown: &BTreeMap<String, i64>,
    record_count: usize,
) -> Charts {
    if record_count == 0 {
        return Charts::default();
    }
    Charts {
        bar: Some(bar_chart(totals)),
        pie: (totals.total_expenses > 0).then(|| pie_chart(breakdown)),
    }
}

fn bar_chart(totals: &Totals) -> BarChart {
    let series = [
        ("Expenses", totals.total_expenses, "red"),
        ("Payments", totals.total_payments, "green"),
    ];
    let max = series
        .iter()
        .map(|(_, value, _)| value.unsigned_abs())
        .max()
        .unwrap_or(0);

    let bars = series
        .into_iter()
        .enumerate()
        .map(|(i, (label, value, color))| {
            let height = if max > 0 {
                value.unsigned_abs() as f64 / max as f64 * BAR_AREA_HEIGHT
            } else {
                0.0
            };
            Bar {
                label,
                value: format_amount(value),
                color,
                x: 40.0 + i as f64 * (BAR_WIDTH + 60.0),
                y: BAR_BASELINE - height,
                width: BAR_WIDTH,
                height,
            }
        })
        .collect();
    BarChart {
        bars,
        baseline: BAR_BASELINE,
    }
}

fn pie_chart(breakdown: &BTreeMap<String, i64>) -> PieChart {
    // Slices can only show positive shares.
    let drawable: Vec<_> = breakdown.iter().filter(|(_, v)| **v > 0).collect();
    let total: i64 = drawable.iter().map(|(_, v)| **v).sum();

    let mut angle = -FRAC_PI_2;
    let slices = drawable
        .into_iter()
        .enumerate()
        .map(|(i, (label, value))| {
            let fraction = *value as f64 / total as f64;
            let path = slice_path(angle, fraction);
            angle += fraction * TAU;
            Slice {
                label: label.clone(),
                value: format_amount(*value),
                percent: format!("{:.1}%", fraction * 100.0),
                color: PALETTE[i % PALETTE.len()],
                path,
            }
        })
        .collect();
    PieChart {
        title: "Expense Distribution",
        slices,
    }
}

fn point(angle: f64) -> (f64, f64) {
    (
        PIE_CENTER + PIE_RADIUS * angle.cos(),
        PIE_CENTER + PIE_RADIUS * angle.sin(),
    )
}

/// SVG path for a wedge starting at `start` radians spanning `fraction` of the circle.
fn slice_path(start: f64, fraction: f64) -> String {
    let (c, r) = (PIE_CENTER, PIE_RADIUS);
    if fraction >= 1.0 - 1e-9 {
        // An arc cannot end where it starts, so a whole disc is two half arcs.
        let (top, bottom) = (c - r, c + r);
        return format!(
            "M {c:.2} {top:.2} A {r:.2} {r:.2} 0 1 1 {c:.2} {bottom:.2} A {r:.2} {r:.2} 0 1 1 {c:.2} {top:.2} Z"
        );
    }
    let (x0, y0) = point(start);
    let (x1, y1) = point(start + fraction * TAU);
    let large = u8::from(fraction > 0.5);
    format!("M {c:.2} {c:.2} L {x0:.2} {y0:.2} A {r:.2} {r:.2} 0 {large} 1 {x1:.2} {y1:.2} Z")
}
