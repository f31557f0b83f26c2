//! Browser bindings: `WebTree` over the live document and the `Fellowship`
//! object the content script drives.
//!
//! ```javascript,ignore
//! import init, { Fellowship } from 'fellowship';
//!
//! await init();
//! const fellowship = new Fellowship({ policy: 'non_repeating' },
//!                                   text => nlp(text).people().json());
//! fellowship.run();
//! chrome.runtime.onMessage.addListener(msg => {
//!   const reply = fellowship.handleMessage(msg);
//!   if (reply.outcome === 'reload') location.reload();
//! });
//! ```

use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, MutationObserver, MutationObserverInit, MutationRecord, Node};

use super::tree::{ContentTree, NodeId, NodeKind};
use crate::conductor::{ControlMessage, FellowshipConductor, MessageOutcome};
use crate::config::SessionConfig;
use crate::logging;
use crate::names::{HeuristicDetector, JsDetector, PersonDetector};
use crate::session::PassStats;

// =============================================================================
// WebTree
// =============================================================================

/// Node ids live in a `WeakMap` keyed by the DOM node, so the same node
/// always maps to the same id. Strong handles are kept only for nodes seen
/// since the last [`WebTree::forget_detached`].
pub struct WebTree {
    document: Document,
    ids: js_sys::WeakMap,
    nodes: RefCell<HashMap<NodeId, Node>>,
    next_id: Cell<u32>,
}

impl WebTree {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            ids: js_sys::WeakMap::new(),
            nodes: RefCell::new(HashMap::new()),
            next_id: Cell::new(0),
        }
    }

    /// Stable id for `node`, assigned on first sight.
    pub fn id_of(&self, node: &Node) -> NodeId {
        let key: &js_sys::Object = node.as_ref();
        if let Some(id) = self.ids.get(key).as_f64() {
            let id = NodeId(id as u32);
            // Re-attached after a prune: same id, fresh handle.
            self.nodes.borrow_mut().entry(id).or_insert_with(|| node.clone());
            return id;
        }
        let id = NodeId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.ids.set(key, &JsValue::from(id.0));
        self.nodes.borrow_mut().insert(id, node.clone());
        id
    }

    /// Drop handles to nodes no longer in the document. Their ids stay
    /// reserved in the `WeakMap` for as long as the nodes are alive, and
    /// [`WebTree::id_of`] picks the handle up again if one comes back.
    pub fn forget_detached(&self) {
        self.nodes.borrow_mut().retain(|_, node| node.is_connected());
    }

    pub fn tracked(&self) -> usize {
        self.nodes.borrow().len()
    }

    fn node(&self, id: NodeId) -> Option<Node> {
        self.nodes.borrow().get(&id).cloned()
    }
}

impl ContentTree for WebTree {
    fn root(&self) -> Option<NodeId> {
        self.document.body().map(|body| self.id_of(body.as_ref()))
    }

    fn kind(&self, node: NodeId) -> NodeKind {
        match self.node(node) {
            Some(n) if n.node_type() == Node::ELEMENT_NODE => {
                NodeKind::Element(n.node_name().to_ascii_lowercase())
            }
            Some(n) if n.node_type() == Node::TEXT_NODE => NodeKind::Text,
            _ => NodeKind::Other,
        }
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?.parent_node().map(|p| self.id_of(&p))
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        let Some(n) = self.node(node) else {
            return Vec::new();
        };
        let list = n.child_nodes();
        (0..list.length())
            .filter_map(|i| list.item(i))
            .map(|child| self.id_of(&child))
            .collect()
    }

    fn text(&self, node: NodeId) -> Option<String> {
        let n = self.node(node)?;
        if n.node_type() != Node::TEXT_NODE {
            return None;
        }
        n.node_value()
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        if let Some(n) = self.node(node) {
            n.set_node_value(Some(text));
        }
    }
}

// =============================================================================
// Fellowship (JS entry point)
// =============================================================================

struct Inner {
    conductor: FellowshipConductor,
    tree: WebTree,
}

#[derive(Serialize)]
struct MessageReply {
    outcome: &'static str,
    stats: Option<PassStats>,
}

type MutationCallback = Closure<dyn FnMut(js_sys::Array, MutationObserver)>;

#[wasm_bindgen]
pub struct Fellowship {
    inner: Rc<RefCell<Inner>>,
    /// Added nodes that arrived while the session was busy.
    stash: Rc<RefCell<Vec<Node>>>,
    observer: Option<MutationObserver>,
    callback: Option<MutationCallback>,
}

#[wasm_bindgen]
impl Fellowship {
    /// `config` may be null. `detect` is `(text) => Array<string | {text, position}>`;
    /// without it a capitalised-word heuristic is used.
    #[wasm_bindgen(constructor)]
    pub fn js_new(config: JsValue, detect: Option<js_sys::Function>) -> Result<Fellowship, JsValue> {
        let config = SessionConfig::from_js(config)?;
        logging::init(config.level());

        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| JsValue::from_str("no document"))?;
        let detector: Box<dyn PersonDetector> = match detect {
            Some(callback) => Box::new(JsDetector::new(callback)),
            None => Box::new(HeuristicDetector::new()),
        };

        tracing::debug!(policy = ?config.policy, enabled = config.enabled, "fellowship created");
        Ok(Fellowship {
            inner: Rc::new(RefCell::new(Inner {
                conductor: FellowshipConductor::new(config, detector),
                tree: WebTree::new(document),
            })),
            stash: Rc::new(RefCell::new(Vec::new())),
            observer: None,
            callback: None,
        })
    }

    /// Start a fresh session over the whole page and keep watching for new
    /// content. Returns the pass stats, or null if disabled or the body
    /// does not exist yet.
    #[wasm_bindgen(js_name = "run")]
    pub fn js_run(&mut self) -> Result<JsValue, JsValue> {
        let stats = {
            let mut guard = self.inner.borrow_mut();
            let Inner { conductor, tree } = &mut *guard;
            tree.forget_detached();
            conductor.run(tree)
        };
        if self.inner.borrow().conductor.is_enabled() {
            self.observe()?;
        }
        to_js(&stats)
    }

    /// Handle `{action: "toggle", enabled}`. Returns `{outcome, stats}`
    /// where outcome is "started", "reload" or "ignored".
    #[wasm_bindgen(js_name = "handleMessage")]
    pub fn js_handle_message(&mut self, message: JsValue) -> Result<JsValue, JsValue> {
        let message = ControlMessage::from_js(message)?;
        let outcome = {
            let mut guard = self.inner.borrow_mut();
            let Inner { conductor, tree } = &mut *guard;
            conductor.handle_message(tree, &message)
        };
        match outcome {
            MessageOutcome::Started(_) => self.observe()?,
            MessageOutcome::ReloadRequested => self.disconnect(),
            MessageOutcome::Ignored => {}
        }
        let stats = match outcome {
            MessageOutcome::Started(stats) => stats,
            _ => None,
        };
        to_js(&MessageReply { outcome: outcome.as_str(), stats })
    }

    /// Process queued mutations now instead of waiting for the observer.
    #[wasm_bindgen(js_name = "flush")]
    pub fn js_flush(&mut self) -> Result<JsValue, JsValue> {
        to_js(&deliver(&self.inner, &self.stash, Vec::new()))
    }

    /// Totals for the current session.
    #[wasm_bindgen(js_name = "stats")]
    pub fn js_stats(&self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.borrow().conductor.stats())
    }

    /// `[{name, substitute}]`, sorted by name.
    #[wasm_bindgen(js_name = "mappings")]
    pub fn js_mappings(&self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.borrow().conductor.mappings())
    }

    #[wasm_bindgen(js_name = "stateName")]
    pub fn js_state_name(&self) -> String {
        self.inner.borrow().conductor.state_name().to_string()
    }

    /// Stop watching the page.
    #[wasm_bindgen(js_name = "disconnect")]
    pub fn disconnect(&mut self) {
        if let Some(observer) = self.observer.take() {
            observer.disconnect();
        }
        self.callback = None;
    }
}

impl Fellowship {
    /// Watch the whole document element, so a body that appears later is
    /// seen too. Only one observer is ever installed.
    fn observe(&mut self) -> Result<(), JsValue> {
        if self.observer.is_some() {
            return Ok(());
        }
        let target = {
            let inner = self.inner.borrow();
            inner.tree.document.document_element()
        };
        let Some(target) = target else {
            return Err(JsValue::from_str("document has no root element"));
        };

        let inner = Rc::clone(&self.inner);
        let stash = Rc::clone(&self.stash);
        let callback: MutationCallback = Closure::new(move |records: js_sys::Array, _: MutationObserver| {
            let mut added = Vec::new();
            for record in records.iter() {
                let Ok(record) = record.dyn_into::<MutationRecord>() else {
                    continue;
                };
                let nodes = record.added_nodes();
                added.extend((0..nodes.length()).filter_map(|i| nodes.item(i)));
            }
            deliver(&inner, &stash, added);
        });

        let observer = MutationObserver::new(callback.as_ref().unchecked_ref())?;
        let options = MutationObserverInit::new();
        options.set_child_list(true);
        options.set_subtree(true);
        observer.observe_with_options(&target, &options)?;

        self.observer = Some(observer);
        self.callback = Some(callback);
        Ok(())
    }
}

/// Queue `added` (plus anything stashed earlier) and run a batch.
///
/// If the session is already borrowed, the callback fired from inside one
/// of our own calls. The nodes then wait in `stash` until the next
/// delivery, which is the next observer batch or an explicit `flush()`.
fn deliver(inner: &RefCell<Inner>, stash: &RefCell<Vec<Node>>, added: Vec<Node>) -> Option<PassStats> {
    let Ok(mut guard) = inner.try_borrow_mut() else {
        tracing::debug!(nodes = added.len(), "session busy, batch stashed");
        stash.borrow_mut().extend(added);
        return None;
    };
    let Inner { conductor, tree } = &mut *guard;

    let mut nodes = std::mem::take(&mut *stash.borrow_mut());
    nodes.extend(added);
    tree.forget_detached();
    conductor.enqueue(nodes.iter().map(|n| tree.id_of(n)));
    conductor.flush(tree)
}

impl Drop for Fellowship {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Create and immediately run, for content scripts that need nothing else.
#[wasm_bindgen(js_name = "startFellowship")]
pub fn start_fellowship(config: JsValue, detect: Option<js_sys::Function>) -> Result<Fellowship, JsValue> {
    let mut fellowship = Fellowship::js_new(config, detect)?;
    fellowship.js_run()?;
    Ok(fellowship)
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(JsValue::from)
}
