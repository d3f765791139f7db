use chrono::NaiveDateTime;

use crate::columns::{self, Record, TIMESTAMP_ALIASES};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One ledger row. Positive amount = income, negative = expense; amounts are
/// never zero by the time a row is written.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub timestamp: NaiveDateTime,
    pub category: String,
    pub amount: f64,
    pub owner_id: String,
    pub owner_display_name: String,
    pub note: String,
}

impl Transaction {
    pub fn is_expense(&self) -> bool {
        self.amount < 0.0
    }

    pub fn to_record(&self) -> Record {
        let mut record = Record::new();
        record.insert(
            "timestamp".to_string(),
            self.timestamp.format(TIMESTAMP_FORMAT).to_string(),
        );
        record.insert("category".to_string(), self.category.clone());
        record.insert("amount".to_string(), self.amount.to_string());
        record.insert("owner_id".to_string(), self.owner_id.clone());
        record.insert("owner_name".to_string(), self.owner_display_name.clone());
        record.insert("note".to_string(), self.note.clone());
        record
    }

    /// Tolerant read: the timestamp may live under the current or the legacy
    /// column name. Rows missing a parsable timestamp or amount are not
    /// transactions and yield `None`.
    pub fn from_record(record: &Record) -> Option<Transaction> {
        let raw_ts = columns::resolve(record, TIMESTAMP_ALIASES)?;
        let timestamp = NaiveDateTime::parse_from_str(raw_ts, TIMESTAMP_FORMAT)
            .or_else(|_| {
                // Legacy rows recorded dates without a clock time.
                chrono::NaiveDate::parse_from_str(raw_ts, "%Y-%m-%d")
                    .map(|d| d.and_hms_opt(0, 0, 0).unwrap_or_default())
            })
            .ok()?;
        let amount: f64 = record.get("amount")?.parse().ok()?;
        Some(Transaction {
            timestamp,
            category: record.get("category").cloned().unwrap_or_default(),
            amount,
            owner_id: record.get("owner_id").cloned().unwrap_or_default(),
            owner_display_name: record.get("owner_name").cloned().unwrap_or_default(),
            note: record.get("note").cloned().unwrap_or_default(),
        })
    }
}

/// A candidate transaction extracted from text, validated but not yet
/// written.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    pub timestamp: NaiveDateTime,
    pub category: String,
    pub amount: f64,
    pub note: String,
}

/// Monthly spending limit for one (owner, category) pair.
#[derive(Debug, Clone)]
pub struct Budget {
    pub owner_id: String,
    pub category: String,
    pub limit: f64,
}
