//! Two-phase delete confirmation.
//!
//! Bulk deletes are the only destructive operation, and the ledger has no
//! transactions to hide mistakes behind, so they run as preview -> confirm.
//! Each owner has at most one pending preview; a new one silently replaces
//! it. Expiry is lazy: the TTL is checked when the owner confirms, not by a
//! background timer.

use std::collections::HashMap;

use chrono::{Duration, NaiveDateTime};

use crate::error::{RaccoonError, Result};
use crate::fmt;
use crate::models::Transaction;
use crate::reports::{self, Filters};
use crate::store::{self, LedgerStore};

const PREVIEW_TTL_SECS: i64 = 5 * 60;
/// At most this many rows are listed with ordinals.
const ORDINAL_LIMIT: usize = 5;
/// Above this many matches, the preview carries an extra warning.
const BULK_WARNING_THRESHOLD: usize = 30;

#[derive(Debug, Clone)]
pub struct DeletePreview {
    pub created_at: NaiveDateTime,
    pub rendered_message: String,
    /// Ordinal n (1-based) maps to `ordinal_rows[n - 1]`.
    pub ordinal_rows: Vec<usize>,
    pub all_rows: Vec<usize>,
}

/// Pending previews keyed by owner, last-write-wins.
#[derive(Default)]
pub struct PreviewStore {
    inner: HashMap<String, DeletePreview>,
}

impl PreviewStore {
    pub fn new() -> PreviewStore {
        PreviewStore::default()
    }

    pub fn pending(&self, owner_id: &str) -> Option<&DeletePreview> {
        self.inner.get(owner_id)
    }
}

fn render_row(ordinal: usize, tx: &Transaction) -> String {
    format!(
        "{ordinal}. {} | {} | {} | {}",
        tx.timestamp.format("%Y-%m-%d %H:%M"),
        tx.category,
        fmt::money(tx.amount),
        tx.note
    )
}

/// Collect the rows the criteria would delete and park them as a pending
/// preview. Zero matches leaves the machine idle.
pub fn preview(
    ledger: &dyn LedgerStore,
    previews: &mut PreviewStore,
    owner_id: &str,
    filters: &Filters,
    now: NaiveDateTime,
) -> Result<String> {
    let rows = store::owner_transactions(ledger, owner_id)?;
    let matches = reports::matching(&rows, filters);
    if matches.is_empty() {
        return Ok("No matching records found — nothing to delete.".to_string());
    }

    let total = matches.len();
    let mut lines = vec![format!(
        "Found {total} matching record{}:",
        if total == 1 { "" } else { "s" }
    )];
    let mut ordinal_rows = Vec::new();
    for (ordinal, (index, tx)) in matches.iter().take(ORDINAL_LIMIT).enumerate() {
        lines.push(render_row(ordinal + 1, tx));
        ordinal_rows.push(*index);
    }
    if total > ORDINAL_LIMIT {
        lines.push(format!("... and {} more.", total - ORDINAL_LIMIT));
    }
    if total > BULK_WARNING_THRESHOLD {
        lines.push(format!(
            "⚠️ That is a lot of records ({total}). Double-check before confirming."
        ));
    }
    lines.push(
        "Reply \"confirm delete\" to delete them all, or \"confirm delete N\" for one row. \
         This preview expires in 5 minutes."
            .to_string(),
    );

    let rendered_message = lines.join("\n");
    previews.inner.insert(
        owner_id.to_string(),
        DeletePreview {
            created_at: now,
            rendered_message: rendered_message.clone(),
            ordinal_rows,
            all_rows: matches.iter().map(|(index, _)| *index).collect(),
        },
    );
    Ok(rendered_message)
}

/// Apply a pending preview. An out-of-range ordinal leaves the preview
/// intact so the owner can retry; every other path discards it.
pub fn confirm(
    ledger: &dyn LedgerStore,
    previews: &mut PreviewStore,
    owner_id: &str,
    ordinal: Option<usize>,
    now: NaiveDateTime,
) -> Result<String> {
    let Some(pending) = previews.inner.get(owner_id) else {
        return Err(RaccoonError::NoPendingPreview);
    };
    if now - pending.created_at > Duration::seconds(PREVIEW_TTL_SECS) {
        previews.inner.remove(owner_id);
        return Err(RaccoonError::PreviewExpired);
    }

    match ordinal {
        Some(n) => {
            if n == 0 || n > pending.ordinal_rows.len() {
                return Err(RaccoonError::OrdinalOutOfRange(n, pending.ordinal_rows.len()));
            }
            let row = pending.ordinal_rows[n - 1];
            previews.inner.remove(owner_id);
            ledger.delete(row)?;
            Ok(format!("🗑️ Deleted record {n} from the preview."))
        }
        None => {
            let all_rows = pending.all_rows.clone();
            previews.inner.remove(owner_id);
            let deleted = ledger.delete_many(&all_rows)?;
            Ok(format!(
                "🗑️ Deleted {deleted} record{}.",
                if deleted == 1 { "" } else { "s" }
            ))
        }
    }
}

/// The bare "delete" shortcut: remove the owner's single most recent row.
/// Not state-bearing and never previews.
pub fn delete_last(ledger: &dyn LedgerStore, owner_id: &str) -> Result<String> {
    let rows = store::owner_transactions(ledger, owner_id)?;
    match rows.last() {
        Some((index, tx)) => {
            let line = render_row(1, tx);
            ledger.delete(*index)?;
            Ok(format!("🗑️ Deleted your most recent record:\n{}", &line[3..]))
        }
        None => Ok("You have no records to delete.".to_string()),
    }
}
