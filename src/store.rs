//! Ledger storage behind the sheet contract.
//!
//! The ledger behaves like a spreadsheet, not a database: rows come back in
//! append order, a row is addressed by its current position, and deleting a
//! row shifts every later index down by one. `LedgerStore` captures that
//! contract; `SqliteStore` implements it over a local SQLite file, keeping
//! each row as a raw column->cell record so historical rows written under
//! older column names survive untouched.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension};

use crate::columns::Record;
use crate::error::{RaccoonError, Result};
use crate::models::{Budget, Transaction};

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS ledger (
    id INTEGER PRIMARY KEY,
    record TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS budgets (
    id INTEGER PRIMARY KEY,
    owner_id TEXT NOT NULL,
    category TEXT NOT NULL,
    limit_amount REAL NOT NULL,
    UNIQUE (owner_id, category)
);

CREATE TABLE IF NOT EXISTS custom_categories (
    id INTEGER PRIMARY KEY,
    owner_id TEXT NOT NULL,
    name TEXT NOT NULL
);
";

pub trait LedgerStore {
    /// Append one raw row at the end of the ledger.
    fn append(&self, record: &Record) -> Result<()>;

    /// All rows in append order. A row's position in this vec is its current
    /// index for `delete` and `update_cell`.
    fn read_all(&self) -> Result<Vec<Record>>;

    /// Delete the row at `index`. Every later row shifts down by one.
    fn delete(&self, index: usize) -> Result<()>;

    /// Overwrite a single cell in place.
    fn update_cell(&self, index: usize, column: &str, value: &str) -> Result<()>;

    fn upsert_budget(&self, budget: &Budget) -> Result<()>;
    fn budgets(&self, owner_id: &str) -> Result<Vec<Budget>>;
    fn budget_for(&self, owner_id: &str, category: &str) -> Result<Option<Budget>>;

    fn append_custom_category(&self, owner_id: &str, name: &str) -> Result<()>;
    fn custom_categories(&self, owner_id: &str) -> Result<Vec<String>>;
    /// Remove the most recently added matching row; Ok(false) if none match.
    fn remove_custom_category(&self, owner_id: &str, name: &str) -> Result<bool>;

    /// Delete several rows in one operation. Indices are sorted descending
    /// internally: deleting an earlier row first would shift the positions
    /// of the rest and remove the wrong rows.
    fn delete_many(&self, indices: &[usize]) -> Result<usize> {
        let mut sorted: Vec<usize> = indices.to_vec();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        sorted.dedup();
        let mut deleted = 0;
        for index in sorted {
            self.delete(index)?;
            deleted += 1;
        }
        Ok(deleted)
    }
}

/// One owner's parsed transactions, paired with each row's current ledger
/// index. Rows that do not parse as transactions are skipped, not errors.
pub fn owner_transactions(
    store: &dyn LedgerStore,
    owner_id: &str,
) -> Result<Vec<(usize, Transaction)>> {
    let rows = store.read_all()?;
    Ok(rows
        .iter()
        .enumerate()
        .filter_map(|(index, record)| Transaction::from_record(record).map(|tx| (index, tx)))
        .filter(|(_, tx)| tx.owner_id == owner_id)
        .collect())
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(db_path: &Path) -> Result<SqliteStore> {
        let conn = Connection::open(db_path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(SqliteStore { conn })
    }

    /// Map a position index to the backing rowid, in append order.
    fn rowid_at(&self, index: usize) -> Result<i64> {
        let id: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM ledger ORDER BY id LIMIT 1 OFFSET ?1",
                [index as i64],
                |row| row.get(0),
            )
            .optional()?;
        id.ok_or(RaccoonError::RowOutOfRange(index))
    }
}

impl LedgerStore for SqliteStore {
    fn append(&self, record: &Record) -> Result<()> {
        let encoded = serde_json::to_string(record)?;
        self.conn
            .execute("INSERT INTO ledger (record) VALUES (?1)", [encoded])?;
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<Record>> {
        let mut stmt = self.conn.prepare("SELECT record FROM ledger ORDER BY id")?;
        let encoded: Vec<String> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let mut records = Vec::with_capacity(encoded.len());
        for text in encoded {
            records.push(serde_json::from_str(&text)?);
        }
        Ok(records)
    }

    fn delete(&self, index: usize) -> Result<()> {
        let rowid = self.rowid_at(index)?;
        self.conn.execute("DELETE FROM ledger WHERE id = ?1", [rowid])?;
        Ok(())
    }

    fn update_cell(&self, index: usize, column: &str, value: &str) -> Result<()> {
        let rowid = self.rowid_at(index)?;
        let encoded: String = self.conn.query_row(
            "SELECT record FROM ledger WHERE id = ?1",
            [rowid],
            |row| row.get(0),
        )?;
        let mut record: Record = serde_json::from_str(&encoded)?;
        record.insert(column.to_string(), value.to_string());
        let updated = serde_json::to_string(&record)?;
        self.conn.execute(
            "UPDATE ledger SET record = ?1 WHERE id = ?2",
            rusqlite::params![updated, rowid],
        )?;
        Ok(())
    }

    fn upsert_budget(&self, budget: &Budget) -> Result<()> {
        self.conn.execute(
            "INSERT INTO budgets (owner_id, category, limit_amount) VALUES (?1, ?2, ?3) \
             ON CONFLICT (owner_id, category) DO UPDATE SET limit_amount = ?3",
            rusqlite::params![budget.owner_id, budget.category, budget.limit],
        )?;
        Ok(())
    }

    fn budgets(&self, owner_id: &str) -> Result<Vec<Budget>> {
        let mut stmt = self.conn.prepare(
            "SELECT category, limit_amount FROM budgets WHERE owner_id = ?1 ORDER BY category",
        )?;
        let rows = stmt.query_map([owner_id], |row| {
            Ok(Budget {
                owner_id: owner_id.to_string(),
                category: row.get(0)?,
                limit: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    fn budget_for(&self, owner_id: &str, category: &str) -> Result<Option<Budget>> {
        let limit: Option<f64> = self
            .conn
            .query_row(
                "SELECT limit_amount FROM budgets WHERE owner_id = ?1 AND category = ?2",
                [owner_id, category],
                |row| row.get(0),
            )
            .optional()?;
        Ok(limit.map(|limit| Budget {
            owner_id: owner_id.to_string(),
            category: category.to_string(),
            limit,
        }))
    }

    fn append_custom_category(&self, owner_id: &str, name: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO custom_categories (owner_id, name) VALUES (?1, ?2)",
            [owner_id, name],
        )?;
        Ok(())
    }

    fn custom_categories(&self, owner_id: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM custom_categories WHERE owner_id = ?1 ORDER BY id")?;
        let rows = stmt.query_map([owner_id], |row| row.get(0))?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    fn remove_custom_category(&self, owner_id: &str, name: &str) -> Result<bool> {
        let affected = self.conn.execute(
            "DELETE FROM custom_categories WHERE id = \
             (SELECT max(id) FROM custom_categories WHERE owner_id = ?1 AND name = ?2)",
            [owner_id, name],
        )?;
        Ok(affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("test.db")).unwrap();
        (dir, store)
    }

    fn note_record(note: &str) -> Record {
        let mut record = Record::new();
        record.insert("note".to_string(), note.to_string());
        record
    }

    #[test]
    fn test_append_preserves_order() {
        let (_dir, store) = test_store();
        for note in ["a", "b", "c"] {
            store.append(&note_record(note)).unwrap();
        }
        let rows = store.read_all().unwrap();
        let notes: Vec<&str> = rows.iter().map(|r| r["note"].as_str()).collect();
        assert_eq!(notes, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_delete_shifts_later_indices() {
        let (_dir, store) = test_store();
        for note in ["a", "b", "c"] {
            store.append(&note_record(note)).unwrap();
        }
        store.delete(0).unwrap();
        let rows = store.read_all().unwrap();
        assert_eq!(rows[0]["note"], "b");
        assert_eq!(rows[1]["note"], "c");
        // Index 1 now addresses what used to be row 2.
        store.delete(1).unwrap();
        let rows = store.read_all().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["note"], "b");
    }

    #[test]
    fn test_delete_out_of_range() {
        let (_dir, store) = test_store();
        store.append(&note_record("a")).unwrap();
        assert!(matches!(
            store.delete(5),
            Err(RaccoonError::RowOutOfRange(5))
        ));
    }

    #[test]
    fn test_delete_many_handles_unsorted_input() {
        let (_dir, store) = test_store();
        for note in ["a", "b", "c", "d", "e"] {
            store.append(&note_record(note)).unwrap();
        }
        // Ascending input would remove the wrong rows if applied verbatim.
        let deleted = store.delete_many(&[1, 3]).unwrap();
        assert_eq!(deleted, 2);
        let notes: Vec<String> = store
            .read_all()
            .unwrap()
            .iter()
            .map(|r| r["note"].clone())
            .collect();
        assert_eq!(notes, vec!["a", "c", "e"]);
    }

    #[test]
    fn test_delete_many_dedupes() {
        let (_dir, store) = test_store();
        for note in ["a", "b"] {
            store.append(&note_record(note)).unwrap();
        }
        let deleted = store.delete_many(&[1, 1]).unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.read_all().unwrap().len(), 1);
    }

    #[test]
    fn test_update_cell() {
        let (_dir, store) = test_store();
        store.append(&note_record("a")).unwrap();
        store.update_cell(0, "note", "edited").unwrap();
        store.update_cell(0, "category", "misc").unwrap();
        let rows = store.read_all().unwrap();
        assert_eq!(rows[0]["note"], "edited");
        assert_eq!(rows[0]["category"], "misc");
    }

    #[test]
    fn test_budget_upsert_replaces() {
        let (_dir, store) = test_store();
        let mut budget = Budget {
            owner_id: "U1".to_string(),
            category: "dining".to_string(),
            limit: 3000.0,
        };
        store.upsert_budget(&budget).unwrap();
        budget.limit = 4000.0;
        store.upsert_budget(&budget).unwrap();
        let found = store.budget_for("U1", "dining").unwrap().unwrap();
        assert_eq!(found.limit, 4000.0);
        assert_eq!(store.budgets("U1").unwrap().len(), 1);
    }

    #[test]
    fn test_custom_category_removal_takes_most_recent() {
        let (_dir, store) = test_store();
        store.append_custom_category("U1", "pets").unwrap();
        store.append_custom_category("U1", "pets").unwrap();
        assert!(store.remove_custom_category("U1", "pets").unwrap());
        assert_eq!(store.custom_categories("U1").unwrap(), vec!["pets"]);
        assert!(store.remove_custom_category("U1", "pets").unwrap());
        assert!(!store.remove_custom_category("U1", "pets").unwrap());
    }

    #[test]
    fn test_owner_transactions_filters_and_indexes() {
        let (_dir, store) = test_store();
        let tx = |owner: &str, note: &str| {
            let mut r = Record::new();
            r.insert("timestamp".to_string(), "2025-01-01 12:00:00".to_string());
            r.insert("amount".to_string(), "-10".to_string());
            r.insert("owner_id".to_string(), owner.to_string());
            r.insert("note".to_string(), note.to_string());
            r
        };
        store.append(&tx("U1", "mine")).unwrap();
        store.append(&tx("U2", "theirs")).unwrap();
        store.append(&tx("U1", "also mine")).unwrap();
        let rows = owner_transactions(&store, "U1").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, 0);
        assert_eq!(rows[1].0, 2);
        assert_eq!(rows[1].1.note, "also mine");
    }
}
