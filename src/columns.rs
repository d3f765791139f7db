//! Column alias resolution for rows written under older schemas.
//!
//! The ledger's timestamp column was renamed at some point and historical
//! rows were never migrated. Instead of repeating fallback lookups inline,
//! every reader goes through `resolve`, which tries each acceptable physical
//! name in order.

use std::collections::HashMap;

/// Acceptable physical names for the logical timestamp field, current name
/// first.
pub const TIMESTAMP_ALIASES: &[&str] = &["timestamp", "date"];

/// A raw ledger row as the store hands it back: column name -> cell text.
pub type Record = HashMap<String, String>;

/// Look a logical field up under each alias in turn; first non-empty cell
/// wins.
pub fn resolve<'a>(record: &'a Record, aliases: &[&str]) -> Option<&'a str> {
    for alias in aliases {
        if let Some(value) = record.get(*alias) {
            if !value.is_empty() {
                return Some(value.as_str());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_current_name_wins() {
        let r = record(&[("timestamp", "2025-11-12 19:36:00"), ("date", "old")]);
        assert_eq!(resolve(&r, TIMESTAMP_ALIASES), Some("2025-11-12 19:36:00"));
    }

    #[test]
    fn test_falls_back_to_legacy_name() {
        let r = record(&[("date", "2024-03-01 08:00:00")]);
        assert_eq!(resolve(&r, TIMESTAMP_ALIASES), Some("2024-03-01 08:00:00"));
    }

    #[test]
    fn test_empty_cell_is_skipped() {
        let r = record(&[("timestamp", ""), ("date", "2024-03-01 08:00:00")]);
        assert_eq!(resolve(&r, TIMESTAMP_ALIASES), Some("2024-03-01 08:00:00"));
    }

    #[test]
    fn test_missing_everywhere() {
        let r = record(&[("note", "lunch")]);
        assert_eq!(resolve(&r, TIMESTAMP_ALIASES), None);
    }
}
