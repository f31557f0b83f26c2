//! Document side: the tree abstraction, the walker and the rewrite ledger.
//!
//! On wasm32 the `web` module binds all of it to the live page.

pub mod ledger;
pub mod tree;
pub mod walker;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use ledger::{LedgerStats, RewriteLedger};
pub use tree::{ArenaTree, ContentTree, NodeId, NodeKind};
pub use walker::DomWalker;

#[cfg(target_arch = "wasm32")]
pub use web::{Fellowship, WebTree};

#[cfg(test)]
mod tests;
