//! Placeholder inventory - distinct names found in one decode attempt

use std::collections::BTreeMap;

use serde::Serialize;

use crate::engine::grammar::Syntax;

/// One placeholder occurrence in decoded text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderToken {
    /// Inner identifier, whitespace-trimmed
    pub name: String,
    /// Exact matched text including delimiters
    pub literal: String,
    pub syntax: Syntax,
    /// Byte offset of the literal in the decoded text
    pub offset: usize,
}

/// First-seen literal and occurrence count for one placeholder name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryEntry {
    pub literal: String,
    pub syntax: Syntax,
    pub occurrences: usize,
}

/// Placeholder names found in a decoded template, keyed by name
///
/// Keeps the literal text of the first occurrence of each name. Iteration
/// order is sorted by name so reports are reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PlaceholderInventory {
    entries: BTreeMap<String, InventoryEntry>,
}

impl PlaceholderInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a token; returns true when the name was not seen before
    pub fn insert(&mut self, token: PlaceholderToken) -> bool {
        match self.entries.get_mut(&token.name) {
            Some(entry) => {
                entry.occurrences += 1;
                false
            }
            None => {
                self.entries.insert(
                    token.name,
                    InventoryEntry {
                        literal: token.literal,
                        syntax: token.syntax,
                        occurrences: 1,
                    },
                );
                true
            }
        }
    }

    /// Number of distinct names
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&InventoryEntry> {
        self.entries.get(name)
    }

    /// Literal text recorded for `name`
    pub fn literal(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(|e| e.literal.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &InventoryEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<PlaceholderToken> for PlaceholderInventory {
    fn from_iter<I: IntoIterator<Item = PlaceholderToken>>(iter: I) -> Self {
        let mut inventory = PlaceholderInventory::new();
        for token in iter {
            inventory.insert(token);
        }
        inventory
    }
}
