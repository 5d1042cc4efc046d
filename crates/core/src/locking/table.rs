// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure lock table: exclusive-ownership map from (category, name) to holder

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Namespace partition for lock names
///
/// A single request never mixes categories; the table keys every name
/// by its category so `user:alice` and `node:alice` are distinct locks.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LockCategory {
    User,
    Node,
}

impl LockCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockCategory::User => "user",
            LockCategory::Node => "node",
        }
    }
}

impl std::fmt::Display for LockCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing a lock category name
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown lock category: {0}")]
pub struct ParseLockCategoryError(pub String);

impl std::str::FromStr for LockCategory {
    type Err = ParseLockCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(LockCategory::User),
            "node" => Ok(LockCategory::Node),
            other => Err(ParseLockCategoryError(other.to_string())),
        }
    }
}

/// In-memory exclusive-ownership map
///
/// Keyed by (category, name), so single ownership per name is
/// structural: inserting a second owner for a held name is refused by
/// [`LockTable::grant`], never silently overwritten.
#[derive(Clone, Debug, Default)]
pub struct LockTable {
    owners: BTreeMap<(LockCategory, String), String>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether a single name is free
    pub fn is_free(&self, category: LockCategory, name: &str) -> bool {
        !self.owners.contains_key(&(category, name.to_string()))
    }

    /// Current owner of a name, if any
    pub fn owner(&self, category: LockCategory, name: &str) -> Option<&str> {
        self.owners
            .get(&(category, name.to_string()))
            .map(String::as_str)
    }

    /// Check whether every name in the set is free
    pub fn all_free(&self, category: LockCategory, names: &BTreeSet<String>) -> bool {
        names.iter().all(|name| self.is_free(category, name))
    }

    /// Grant the whole set to one holder, or nothing
    ///
    /// Returns false and leaves the table untouched if any name is
    /// already held (by anyone, including the requesting holder).
    pub fn grant(&mut self, category: LockCategory, names: &BTreeSet<String>, holder: &str) -> bool {
        if !self.all_free(category, names) {
            return false;
        }
        for name in names {
            self.owners
                .insert((category, name.clone()), holder.to_string());
        }
        true
    }

    /// Release the given names if owned by this holder
    ///
    /// Names owned by someone else (or free) are left alone. Returns
    /// the number of names actually freed.
    pub fn release(
        &mut self,
        category: LockCategory,
        names: &BTreeSet<String>,
        holder: &str,
    ) -> usize {
        let mut freed = 0;
        for name in names {
            let key = (category, name.clone());
            if self.owners.get(&key).is_some_and(|h| h == holder) {
                self.owners.remove(&key);
                freed += 1;
            }
        }
        freed
    }

    /// Release everything owned by a holder, across categories
    pub fn release_holder(&mut self, holder: &str) -> usize {
        let before = self.owners.len();
        self.owners.retain(|_, h| h != holder);
        before - self.owners.len()
    }

    /// Number of held names
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Drop all ownership
    pub fn clear(&mut self) {
        self.owners.clear();
    }

    /// Iterate over held entries
    pub fn entries(&self) -> impl Iterator<Item = (&(LockCategory, String), &String)> {
        self.owners.iter()
    }
}

#[cfg(test)]
#[path = "table_tests.rs"]
mod tests;
