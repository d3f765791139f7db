//! Per-owner category registry.
//!
//! The effective set is the fixed default list plus whatever custom labels
//! the owner has added, defaults first, no duplicates. The same set both
//! constrains the extraction prompt and validates what the oracle returns.

use crate::error::{RaccoonError, Result};
use crate::store::LedgerStore;

pub const DEFAULT_CATEGORIES: &[&str] = &[
    "dining",
    "drinks",
    "transport",
    "entertainment",
    "shopping",
    "daily",
    "income",
    "misc",
];

/// Fallback for labels the oracle invents that nobody registered.
pub const FALLBACK_CATEGORY: &str = "misc";

const MAX_NAME_CHARS: usize = 10;

pub fn is_default(name: &str) -> bool {
    DEFAULT_CATEGORIES.contains(&name)
}

/// Defaults ∪ custom, order-preserving, de-duplicated.
pub fn effective_categories(store: &dyn LedgerStore, owner_id: &str) -> Result<Vec<String>> {
    let mut categories: Vec<String> =
        DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect();
    for custom in store.custom_categories(owner_id)? {
        if !categories.contains(&custom) {
            categories.push(custom);
        }
    }
    Ok(categories)
}

pub fn validate(store: &dyn LedgerStore, owner_id: &str, category: &str) -> Result<bool> {
    Ok(effective_categories(store, owner_id)?
        .iter()
        .any(|c| c == category))
}

pub fn add_custom(store: &dyn LedgerStore, owner_id: &str, name: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_CHARS {
        return Err(RaccoonError::InvalidCategoryName(format!(
            "name must be 1..={MAX_NAME_CHARS} characters"
        )));
    }
    if validate(store, owner_id, name)? {
        return Err(RaccoonError::DuplicateCategory(name.to_string()));
    }
    store.append_custom_category(owner_id, name)
}

pub fn remove_custom(store: &dyn LedgerStore, owner_id: &str, name: &str) -> Result<()> {
    if is_default(name) {
        return Err(RaccoonError::ProtectedCategory(name.to_string()));
    }
    if store.remove_custom_category(owner_id, name)? {
        Ok(())
    } else {
        Err(RaccoonError::NotFound(format!("category '{name}'")))
    }
}
