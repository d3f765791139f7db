//! Scan-based aggregation over one owner's ledger rows.
//!
//! The store is an ordered log, not an indexed database, so every question
//! is answered by one full scan with filters applied in memory. The same
//! filter structure drives reports and delete previews, which keeps "what
//! would this delete" consistent with "what does this report show".

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};

use crate::models::Transaction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flow {
    Income,
    Expense,
    #[default]
    All,
}

impl Flow {
    pub fn from_label(label: &str) -> Flow {
        match label.trim().to_lowercase().as_str() {
            "income" => Flow::Income,
            "expense" => Flow::Expense,
            _ => Flow::All,
        }
    }

    fn matches(self, amount: f64) -> bool {
        match self {
            Flow::Income => amount > 0.0,
            Flow::Expense => amount < 0.0,
            Flow::All => true,
        }
    }
}

/// Filters shared by reports and delete previews. The date range is
/// inclusive on both ends; the keyword matches category or note,
/// case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct Filters {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub keyword: Option<String>,
    pub flow: Flow,
}

impl Filters {
    pub fn matches(&self, tx: &Transaction) -> bool {
        let date = tx.timestamp.date();
        if let Some(start) = self.start {
            if date < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if date > end {
                return false;
            }
        }
        if let Some(keyword) = &self.keyword {
            let needle = keyword.to_lowercase();
            if !tx.category.to_lowercase().contains(&needle)
                && !tx.note.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        self.flow.matches(tx.amount)
    }
}

/// Rows (with their current ledger indices) that pass the filters, in scan
/// order.
pub fn matching<'a>(
    rows: &'a [(usize, Transaction)],
    filters: &Filters,
) -> Vec<&'a (usize, Transaction)> {
    rows.iter().filter(|(_, tx)| filters.matches(tx)).collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TotalReport {
    pub income: f64,
    /// Expense total as a positive magnitude.
    pub expense: f64,
    pub net: f64,
    pub count: usize,
}

pub fn total_report(rows: &[(usize, Transaction)], filters: &Filters) -> TotalReport {
    let mut report = TotalReport::default();
    for (_, tx) in rows.iter().filter(|(_, tx)| filters.matches(tx)) {
        if tx.amount > 0.0 {
            report.income += tx.amount;
        } else {
            report.expense += -tx.amount;
        }
        report.count += 1;
    }
    report.net = report.income - report.expense;
    report
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTotal {
    pub category: String,
    /// Summed expense magnitude.
    pub total: f64,
}

/// Expense totals per category, descending. The sort is stable, so tied
/// categories keep scan order.
pub fn category_breakdown(
    rows: &[(usize, Transaction)],
    filters: &Filters,
) -> Vec<CategoryTotal> {
    let mut totals: Vec<CategoryTotal> = Vec::new();
    for (_, tx) in rows.iter().filter(|(_, tx)| filters.matches(tx)) {
        if tx.amount >= 0.0 {
            continue;
        }
        match totals.iter_mut().find(|t| t.category == tx.category) {
            Some(entry) => entry.total += -tx.amount,
            None => totals.push(CategoryTotal {
                category: tx.category.clone(),
                total: -tx.amount,
            }),
        }
    }
    totals.sort_by(|a, b| b.total.partial_cmp(&a.total).unwrap_or(std::cmp::Ordering::Equal));
    totals
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Week,
    Month,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PeriodReport {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub totals: TotalReport,
    /// Day with the highest expense magnitude inside the window, if any
    /// expense fell in it.
    pub peak_day: Option<(NaiveDate, f64)>,
}

/// Report for the current week (Monday through the send date) or the
/// current month so far.
pub fn period_report(
    rows: &[(usize, Transaction)],
    period: Period,
    as_of: NaiveDateTime,
) -> PeriodReport {
    let end = as_of.date();
    let start = match period {
        Period::Week => end - Duration::days(end.weekday().num_days_from_monday() as i64),
        Period::Month => end.with_day(1).unwrap_or(end),
    };
    window_report(rows, start, end)
}

fn window_report(rows: &[(usize, Transaction)], start: NaiveDate, end: NaiveDate) -> PeriodReport {
    let filters = Filters {
        start: Some(start),
        end: Some(end),
        ..Filters::default()
    };
    let totals = total_report(rows, &filters);

    let mut by_day: Vec<(NaiveDate, f64)> = Vec::new();
    for (_, tx) in rows.iter().filter(|(_, tx)| filters.matches(tx)) {
        if tx.amount >= 0.0 {
            continue;
        }
        let day = tx.timestamp.date();
        match by_day.iter_mut().find(|(d, _)| *d == day) {
            Some((_, total)) => *total += -tx.amount,
            None => by_day.push((day, -tx.amount)),
        }
    }
    let peak_day = by_day
        .into_iter()
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

    PeriodReport {
        start,
        end,
        totals,
        peak_day,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthComparison {
    pub this_month: TotalReport,
    pub last_month: TotalReport,
    /// Expense change from last month, as a percentage. `None` when last
    /// month has no expense data to compare against.
    pub percent_change: Option<f64>,
}

/// "This calendar month so far" against the immediately preceding full
/// month.
pub fn month_comparison(rows: &[(usize, Transaction)], as_of: NaiveDateTime) -> MonthComparison {
    let today = as_of.date();
    let this_start = today.with_day(1).unwrap_or(today);
    let last_end = this_start - Duration::days(1);
    let last_start = last_end.with_day(1).unwrap_or(last_end);

    let this_month = total_report(
        rows,
        &Filters {
            start: Some(this_start),
            end: Some(today),
            ..Filters::default()
        },
    );
    let last_month = total_report(
        rows,
        &Filters {
            start: Some(last_start),
            end: Some(last_end),
            ..Filters::default()
        },
    );

    let percent_change = if last_month.expense > 0.0 {
        Some((this_month.expense - last_month.expense) / last_month.expense * 100.0)
    } else {
        None
    };

    MonthComparison {
        this_month,
        last_month,
        percent_change,
    }
}
