//! Fellowship: rename every person on a page to a Fellowship member
//!
//! A Rust/WASM content-script core. Person names found by an NLP detector
//! are mapped, consistently for the whole page visit, onto nine companion
//! names and written back into the page's text nodes.
//!
//! # Architecture
//!
//! ## Names (`names/`)
//! - `pool.rs` - Companion: the nine substitute names
//! - `allocator.rs` - SubstituteAllocator: non-repeating or balanced picks
//! - `normalizer.rs` - NameNormalizer: titles, possessives, punctuation → key
//! - `resolver.rs` - IdentityResolver: key → companion, with part links
//! - `rewriter.rs` - TextRewriter: escaped, whole-word, single-splice edits
//! - `sweep.rs` - SweepPass: Aho-Corasick pass over lone name parts
//! - `detector.rs` - PersonDetector seam (JS callback or heuristic)
//!
//! ## Document (`dom/`)
//! - `tree.rs` - ContentTree trait + in-memory ArenaTree
//! - `walker.rs` - DomWalker: document-order text nodes, skip tags
//! - `ledger.rs` - RewriteLedger: recognises our own writes
//! - `web.rs` - WebTree + `Fellowship` JS export (wasm32 only)
//!
//! ## Lifecycle
//! - `session.rs` - ResolutionSession: one page visit's state and passes
//! - `conductor.rs` - FellowshipConductor: enable/toggle/mutation queue
//!
//! # Usage (WASM)
//! ```javascript,ignore
//! import init, { startFellowship } from 'fellowship';
//!
//! await init();
//! const { enabled } = await chrome.storage.sync.get('enabled');
//! const fellowship = startFellowship({ enabled: enabled ?? true },
//!                                    text => nlp(text).people().json());
//! console.log(fellowship.mappings()); // [{ name: 'Jane Smith', substitute: 'Frodo' }]
//! ```

pub mod conductor;
pub mod config;
pub mod dom;
pub mod error;
pub mod logging;
pub mod names;
pub mod session;

pub use conductor::{ControlMessage, FellowshipConductor, MessageOutcome};
pub use config::SessionConfig;
pub use error::{FellowshipError, Result};
pub use names::*;
pub use session::{PassStats, ResolutionSession};

use wasm_bindgen::prelude::*;

// When the `wee_alloc` feature is enabled, use `wee_alloc` as the global
// allocator for smaller WASM bundle size.
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Get version information
#[wasm_bindgen]
pub fn version() -> String {
    format!("fellowship v{}", env!("CARGO_PKG_VERSION"))
}

/// The nine substitute names, in allocation order.
#[wasm_bindgen(js_name = "companions")]
pub fn companions() -> Vec<JsValue> {
    Companion::ALL
        .iter()
        .map(|c| JsValue::from_str(c.as_str()))
        .collect()
}
