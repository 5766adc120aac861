//! The player's inventory: an ordered list of item identifiers.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Items held by the player. Duplicates are separate entries.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Inventory {
    items: Vec<String>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item.
    pub fn add(&mut self, item: impl Into<String>) {
        let item = item.into();
        debug!(item = %item, "item added");
        self.items.push(item);
    }

    /// Check whether at least one matching entry is held.
    pub fn has(&self, item: &str) -> bool {
        self.items.iter().any(|i| i == item)
    }

    /// Remove the first matching entry. Returns `false` if none was held.
    pub fn remove(&mut self, item: &str) -> bool {
        match self.items.iter().position(|i| i == item) {
            Some(index) => {
                self.items.remove(index);
                debug!(item, "item used");
                true
            }
            None => false,
        }
    }

    /// All entries in the order they were added.
    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
