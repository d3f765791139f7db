//! Budget checks after expense writes.
//!
//! A budget caps one category's spend within the current calendar month.
//! The check runs once per successful expense append, against the post-write
//! total, so the row that tipped the scale is included in what it reports.

use chrono::{Datelike, NaiveDateTime};

use crate::error::Result;
use crate::reports::{self, Filters, Flow};
use crate::store::{self, LedgerStore};

const NEAR_LIMIT_RATIO: f64 = 0.9;

#[derive(Debug, Clone, PartialEq)]
pub enum BudgetWarning {
    NearLimit {
        category: String,
        remaining: f64,
        percent_used: f64,
    },
    OverBudget {
        category: String,
        overage: f64,
    },
}

/// Current-calendar-month expense magnitude for one category.
pub fn month_spend(
    store: &dyn LedgerStore,
    owner_id: &str,
    category: &str,
    as_of: NaiveDateTime,
) -> Result<f64> {
    let rows = store::owner_transactions(store, owner_id)?;
    let filters = Filters {
        start: as_of.date().with_day(1),
        end: Some(as_of.date()),
        flow: Flow::Expense,
        ..Filters::default()
    };
    Ok(reports::matching(&rows, &filters)
        .iter()
        .filter(|(_, tx)| tx.category == category)
        .map(|(_, tx)| -tx.amount)
        .sum())
}

/// Compare a category's month-to-date spend against the owner's limit.
/// No-op for income, for categories without a budget row, and for
/// non-positive limits.
pub fn check(
    store: &dyn LedgerStore,
    owner_id: &str,
    category: &str,
    as_of: NaiveDateTime,
) -> Result<Option<BudgetWarning>> {
    if category == "income" {
        return Ok(None);
    }
    let Some(budget) = store.budget_for(owner_id, category)? else {
        return Ok(None);
    };
    if budget.limit <= 0.0 {
        return Ok(None);
    }

    let spent = month_spend(store, owner_id, category, as_of)?;
    let ratio = spent / budget.limit;
    if ratio >= 1.0 {
        Ok(Some(BudgetWarning::OverBudget {
            category: category.to_string(),
            overage: spent - budget.limit,
        }))
    } else if ratio >= NEAR_LIMIT_RATIO {
        Ok(Some(BudgetWarning::NearLimit {
            category: category.to_string(),
            remaining: budget.limit - spent,
            percent_used: ratio * 100.0,
        }))
    } else {
        Ok(None)
    }
}
