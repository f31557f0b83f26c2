//! RewriteLedger: remembers what we wrote into each node.
//!
//! Rewriting a text node makes the page fire a mutation of its own. The
//! ledger keeps a content hash of our last write per node, so a node whose
//! text still hashes to what we wrote is recognised as ours and skipped.

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use super::tree::NodeId;

/// Counters exposed for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerStats {
    pub tracked_nodes: usize,
    pub check_count: u64,
    pub skip_count: u64,
}

#[derive(Debug, Default)]
pub struct RewriteLedger {
    written: HashMap<NodeId, u64>,
    check_count: u64,
    skip_count: u64,
}

impl RewriteLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember that we just set `node` to `text`.
    pub fn record(&mut self, node: NodeId, text: &str) {
        self.written.insert(node, Self::compute_hash(text));
    }

    /// True if `text` is exactly what we last wrote into `node`.
    pub fn is_own_write(&mut self, node: NodeId, text: &str) -> bool {
        self.check_count += 1;
        let own = self.written.get(&node) == Some(&Self::compute_hash(text));
        if own {
            self.skip_count += 1;
        }
        own
    }

    /// Skip rate as a percentage of checks.
    pub fn skip_rate(&self) -> f64 {
        if self.check_count == 0 {
            return 0.0;
        }
        (self.skip_count as f64 / self.check_count as f64) * 100.0
    }

    pub fn stats(&self) -> LedgerStats {
        LedgerStats {
            tracked_nodes: self.written.len(),
            check_count: self.check_count,
            skip_count: self.skip_count,
        }
    }

    pub fn reset(&mut self) {
        self.written.clear();
        self.check_count = 0;
        self.skip_count = 0;
    }

    fn compute_hash(text: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        hasher.finish()
    }
}
