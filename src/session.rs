//! ResolutionSession: one page visit's worth of name resolution.
//!
//! Owns the identity table and the rewrite ledger. A pass walks text nodes,
//! asks the detector for person names, resolves them and writes the
//! rewritten text back, then optionally sweeps lone name parts.
//!
//! Failures are contained per node: a detector error or a malformed span
//! leaves that node as it was and the pass moves on.

use instant::Instant;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::config::SessionConfig;
use crate::dom::{ContentTree, DomWalker, LedgerStats, NodeId, RewriteLedger};
use crate::error::{FellowshipError, Result};
use crate::names::{
    normalize, validate_spans, IdentityResolver, NameMapping, PersonDetector, Resolution,
    SubstituteAllocator, SweepPass, TextRewriter,
};

/// Counters for one pass (or, from [`ResolutionSession::totals`], all of them).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PassStats {
    pub text_nodes_visited: usize,
    pub text_nodes_rewritten: usize,
    /// Nodes whose text is still exactly what we last wrote.
    pub own_writes_skipped: usize,
    pub names_detected: usize,
    pub names_new: usize,
    pub names_linked: usize,
    /// Spans the normalizer rejected (bare titles, too short).
    pub names_ignored: usize,
    pub detector_failures: usize,
    pub sweep_replacements: usize,
    pub elapsed_us: u64,
}

impl PassStats {
    pub fn merge(&mut self, other: &PassStats) {
        self.text_nodes_visited += other.text_nodes_visited;
        self.text_nodes_rewritten += other.text_nodes_rewritten;
        self.own_writes_skipped += other.own_writes_skipped;
        self.names_detected += other.names_detected;
        self.names_new += other.names_new;
        self.names_linked += other.names_linked;
        self.names_ignored += other.names_ignored;
        self.detector_failures += other.detector_failures;
        self.sweep_replacements += other.sweep_replacements;
        self.elapsed_us += other.elapsed_us;
    }
}

pub struct ResolutionSession {
    config: SessionConfig,
    resolver: IdentityResolver,
    ledger: RewriteLedger,
    totals: PassStats,
    passes: u32,
}

impl ResolutionSession {
    pub fn new(config: SessionConfig) -> Self {
        let seed = config.seed.unwrap_or_else(session_seed);
        let allocator = SubstituteAllocator::new(config.policy, seed);
        Self {
            config,
            resolver: IdentityResolver::new(allocator),
            ledger: RewriteLedger::new(),
            totals: PassStats::default(),
            passes: 0,
        }
    }

    /// Walk the whole content root.
    pub fn run_full<T, D>(&mut self, tree: &mut T, detector: &D) -> Result<PassStats>
    where
        T: ContentTree + ?Sized,
        D: PersonDetector + ?Sized,
    {
        let root = tree.root().ok_or(FellowshipError::NoRoot)?;
        Ok(self.process_roots(tree, detector, &[root]))
    }

    /// Walk a batch of subtree roots, e.g. nodes added since the last pass.
    ///
    /// Roots outside the content root or under a skipped element are
    /// ignored. A node reachable from several roots is processed once.
    pub fn process_roots<T, D>(&mut self, tree: &mut T, detector: &D, roots: &[NodeId]) -> PassStats
    where
        T: ContentTree + ?Sized,
        D: PersonDetector + ?Sized,
    {
        let start = Instant::now();
        let mut stats = PassStats::default();

        let nodes = {
            let walker = DomWalker::new(&self.config);
            let mut visited = HashSet::new();
            let mut nodes = Vec::new();
            for &root in roots {
                if walker.is_eligible(tree, root) {
                    nodes.extend(walker.text_nodes(tree, root, &mut visited));
                }
            }
            nodes
        };

        let mut failed = HashSet::new();
        for &node in &nodes {
            if !self.process_text_node(tree, detector, node, &mut stats) {
                failed.insert(node);
            }
        }

        // Any batch can bind a multi-part name (new or part-linked) whose
        // parts already sit elsewhere on the page, so the sweep always covers
        // the whole root. Nodes whose detection failed stay untouched.
        if self.config.sweep {
            let targets: Vec<NodeId> = self
                .all_text_nodes(tree)
                .into_iter()
                .filter(|n| !failed.contains(n))
                .collect();
            stats.sweep_replacements = self.sweep_nodes(tree, &targets);
        }

        stats.elapsed_us = start.elapsed().as_micros() as u64;
        self.passes += 1;
        self.totals.merge(&stats);

        tracing::info!(
            pass = self.passes,
            visited = stats.text_nodes_visited,
            rewritten = stats.text_nodes_rewritten,
            names = self.resolver.len(),
            failures = stats.detector_failures,
            elapsed_us = stats.elapsed_us,
            "pass complete"
        );
        stats
    }

    /// Returns false if detection failed and the node was left alone.
    fn process_text_node<T, D>(&mut self, tree: &mut T, detector: &D, node: NodeId, stats: &mut PassStats) -> bool
    where
        T: ContentTree + ?Sized,
        D: PersonDetector + ?Sized,
    {
        let Some(text) = tree.text(node) else {
            return true;
        };
        stats.text_nodes_visited += 1;

        if self.ledger.is_own_write(node, &text) {
            stats.own_writes_skipped += 1;
            return true;
        }

        let spans = match detector
            .detect_people(&text)
            .and_then(|spans| validate_spans(&text, &spans).map(|_| spans))
        {
            Ok(spans) => spans,
            Err(e) => {
                tracing::warn!(node = node.0, error = %e, "skipping text node");
                stats.detector_failures += 1;
                return false;
            }
        };

        let mut rewriter = TextRewriter::new();
        for span in &spans {
            stats.names_detected += 1;
            let Some(name) = normalize(&span.text, self.config.min_name_len) else {
                stats.names_ignored += 1;
                continue;
            };
            let (substitute, how) = self.resolver.resolve_traced(&name.key);
            match how {
                Resolution::New => stats.names_new += 1,
                Resolution::PartLink => stats.names_linked += 1,
                Resolution::Exact => {}
            }
            if let Err(e) = rewriter.rewrite_name(&text, &name, substitute) {
                tracing::warn!(name = %name.key, error = %e, "could not rewrite name");
            }
        }

        if let Some(rewritten) = rewriter.apply(&text) {
            tree.set_text(node, &rewritten);
            self.ledger.record(node, &rewritten);
            stats.text_nodes_rewritten += 1;
        }
        true
    }

    /// Rewrite lone parts of resolved multi-word names anywhere under the
    /// content root. Returns the number of replacements.
    pub fn sweep<T: ContentTree + ?Sized>(&mut self, tree: &mut T) -> usize {
        let nodes = self.all_text_nodes(tree);
        self.sweep_nodes(tree, &nodes)
    }

    fn all_text_nodes<T: ContentTree + ?Sized>(&self, tree: &T) -> Vec<NodeId> {
        match tree.root() {
            Some(root) => DomWalker::new(&self.config).text_nodes(tree, root, &mut HashSet::new()),
            None => Vec::new(),
        }
    }

    fn sweep_nodes<T: ContentTree + ?Sized>(&mut self, tree: &mut T, nodes: &[NodeId]) -> usize {
        if nodes.is_empty() {
            return 0;
        }
        let pass = match SweepPass::build(&self.resolver) {
            Ok(pass) => pass,
            Err(e) => {
                tracing::warn!(error = %e, "sweep skipped");
                return 0;
            }
        };
        if pass.is_empty() {
            return 0;
        }

        let mut replacements = 0;
        for &node in nodes {
            let Some(text) = tree.text(node) else {
                continue;
            };
            if let Some(outcome) = pass.sweep_text(&text) {
                tree.set_text(node, &outcome.text);
                self.ledger.record(node, &outcome.text);
                replacements += outcome.replacements;
            }
        }
        tracing::debug!(parts = pass.part_count(), replacements, "sweep complete");
        replacements
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn resolver(&self) -> &IdentityResolver {
        &self.resolver
    }

    pub fn mappings(&self) -> Vec<NameMapping> {
        self.resolver.mappings()
    }

    /// Sum over every pass so far.
    pub fn totals(&self) -> PassStats {
        self.totals
    }

    pub fn pass_count(&self) -> u32 {
        self.passes
    }

    pub fn ledger_stats(&self) -> LedgerStats {
        self.ledger.stats()
    }
}

/// Fresh allocator seed from the platform RNG.
fn session_seed() -> u64 {
    getrandom::u64().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "no platform randomness, using fixed seed");
        0x9E37_79B9_7F4A_7C15
    })
}
