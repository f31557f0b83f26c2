//! ContentTree: the slice of the DOM the walker needs.
//!
//! Node identity is a plain [`NodeId`] so visited sets and the rewrite
//! ledger can key on it without touching the nodes themselves. The browser
//! build implements this over `web_sys`; [`ArenaTree`] is the in-memory
//! version used everywhere else.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Element with its lowercase tag name.
    Element(String),
    Text,
    /// Comments, processing instructions, doctype...
    Other,
}

pub trait ContentTree {
    /// The page body, if it exists yet.
    fn root(&self) -> Option<NodeId>;
    fn kind(&self, node: NodeId) -> NodeKind;
    fn parent(&self, node: NodeId) -> Option<NodeId>;
    /// Children in document order.
    fn children(&self, node: NodeId) -> Vec<NodeId>;
    /// Character data of a text node; `None` for anything else.
    fn text(&self, node: NodeId) -> Option<String>;
    fn set_text(&mut self, node: NodeId, text: &str);
}

// =============================================================================
// ArenaTree
// =============================================================================

#[derive(Debug, Clone)]
struct ArenaNode {
    kind: NodeKind,
    text: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    writes: u32,
}

/// Vec-backed tree. Nodes are never freed; detaching just unlinks.
#[derive(Debug, Clone, Default)]
pub struct ArenaTree {
    nodes: Vec<ArenaNode>,
    root: Option<NodeId>,
}

impl ArenaTree {
    /// A tree with no body yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// A tree with an empty `<body>` as root.
    pub fn with_body() -> (Self, NodeId) {
        let mut tree = Self::new();
        let body = tree.create(NodeKind::Element("body".to_string()), "");
        tree.root = Some(body);
        (tree, body)
    }

    pub fn set_root(&mut self, node: NodeId) {
        self.root = Some(node);
    }

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.create(NodeKind::Element(tag.to_ascii_lowercase()), "")
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.create(NodeKind::Text, text)
    }

    /// Create an element under `parent`.
    pub fn element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let node = self.create_element(tag);
        self.append(parent, node);
        node
    }

    /// Create a text node under `parent`.
    pub fn text_node(&mut self, parent: NodeId, text: &str) -> NodeId {
        let node = self.create_text(text);
        self.append(parent, node);
        node
    }

    pub fn comment(&mut self, parent: NodeId, text: &str) -> NodeId {
        let node = self.create(NodeKind::Other, text);
        self.append(parent, node);
        node
    }

    /// Append `child` (detaching it first if needed).
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        if let Some(old) = self.nodes[child.0 as usize].parent.take() {
            self.nodes[old.0 as usize].children.retain(|c| *c != child);
        }
        self.nodes[child.0 as usize].parent = Some(parent);
        self.nodes[parent.0 as usize].children.push(child);
    }

    /// Concatenated text of a subtree, in document order.
    pub fn text_content(&self, node: NodeId) -> String {
        let n = &self.nodes[node.0 as usize];
        match n.kind {
            NodeKind::Text => n.text.clone(),
            NodeKind::Element(_) => n.children.iter().map(|c| self.text_content(*c)).collect(),
            NodeKind::Other => String::new(),
        }
    }

    /// How many times `set_text` hit this node.
    pub fn write_count(&self, node: NodeId) -> u32 {
        self.nodes[node.0 as usize].writes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn create(&mut self, kind: NodeKind, text: &str) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(ArenaNode {
            kind,
            text: text.to_string(),
            parent: None,
            children: Vec::new(),
            writes: 0,
        });
        id
    }
}

impl ContentTree for ArenaTree {
    fn root(&self) -> Option<NodeId> {
        self.root
    }

    fn kind(&self, node: NodeId) -> NodeKind {
        self.nodes[node.0 as usize].kind.clone()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0 as usize].parent
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes[node.0 as usize].children.clone()
    }

    fn text(&self, node: NodeId) -> Option<String> {
        let n = &self.nodes[node.0 as usize];
        (n.kind == NodeKind::Text).then(|| n.text.clone())
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        let n = &mut self.nodes[node.0 as usize];
        n.text = text.to_string();
        n.writes += 1;
    }
}
