//! IdentityResolver - name → companion table for one session
//!
//! Resolves canonical name keys to substitutes and links bare name parts
//! ("Smith") to the full names they first appeared in ("Jane Smith").
//!
//! # Precedence
//! 1. Exact key match
//! 2. Part-link: first part (left to right) already linked to a full name
//! 3. New identity from the allocator; parts of multi-word keys get linked
//!
//! Entries are only ever added. Nothing here reassigns a mapping.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::allocator::SubstituteAllocator;
use super::pool::Companion;

/// Parts must be longer than this (in chars) to be linked; drops initials.
const MIN_PART_LEN: usize = 2;

/// How a resolution was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Exact,
    PartLink,
    New,
}

/// One row of the name table, for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameMapping {
    pub name: String,
    pub substitute: Companion,
}

#[derive(Debug, Clone)]
pub struct IdentityResolver {
    /// NameRecord: canonical key → substitute
    names: HashMap<String, Companion>,
    /// PartLinkRecord: single name part → canonical full name
    part_links: HashMap<String, String>,
    allocator: SubstituteAllocator,
}

impl IdentityResolver {
    pub fn new(allocator: SubstituteAllocator) -> Self {
        Self {
            names: HashMap::new(),
            part_links: HashMap::new(),
            allocator,
        }
    }

    /// Resolve `key` to its substitute, assigning one on first sight.
    pub fn resolve(&mut self, key: &str) -> Companion {
        self.resolve_traced(key).0
    }

    /// Like [`resolve`](Self::resolve) but also reports which rule applied.
    pub fn resolve_traced(&mut self, key: &str) -> (Companion, Resolution) {
        if let Some(&substitute) = self.names.get(key) {
            return (substitute, Resolution::Exact);
        }

        let linked = name_parts(key).find_map(|part| {
            self.part_links
                .get(part)
                .and_then(|full| self.names.get(full))
                .copied()
        });
        if let Some(substitute) = linked {
            self.names.insert(key.to_string(), substitute);
            tracing::debug!(name = key, %substitute, "linked by name part");
            return (substitute, Resolution::PartLink);
        }

        let substitute = self.allocator.next();
        self.names.insert(key.to_string(), substitute);
        if key.split_whitespace().count() > 1 {
            for part in name_parts(key) {
                // First binding of a part wins.
                self.part_links
                    .entry(part.to_string())
                    .or_insert_with(|| key.to_string());
            }
        }
        tracing::debug!(name = key, %substitute, "assigned new substitute");
        (substitute, Resolution::New)
    }

    /// Read-only lookup; never allocates.
    pub fn lookup(&self, key: &str) -> Option<Companion> {
        self.names.get(key).copied()
    }

    /// Full name a part was linked to, if any.
    pub fn linked_name(&self, part: &str) -> Option<&str> {
        self.part_links.get(part).map(String::as_str)
    }

    /// Resolved names with more than one whitespace-separated part.
    pub fn multi_part_names(&self) -> impl Iterator<Item = (&str, Companion)> {
        self.names
            .iter()
            .filter(|(name, _)| name.split_whitespace().count() > 1)
            .map(|(name, &c)| (name.as_str(), c))
    }

    /// Snapshot of the name table sorted by name.
    pub fn mappings(&self) -> Vec<NameMapping> {
        let mut rows: Vec<NameMapping> = self
            .names
            .iter()
            .map(|(name, &substitute)| NameMapping { name: name.clone(), substitute })
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        rows
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn allocator(&self) -> &SubstituteAllocator {
        &self.allocator
    }
}

/// Whitespace-separated parts long enough to be linked.
pub fn name_parts(key: &str) -> impl Iterator<Item = &str> {
    key.split_whitespace()
        .filter(|part| part.chars().count() >= MIN_PART_LEN)
}

// =============================================================================
// Tests
// =============================================================================
