//! DomWalker: which text nodes a pass gets to touch.
//!
//! Depth-first, document order. Skip-tag subtrees are pruned whole, blank
//! text nodes are dropped, and a per-pass visited set keeps overlapping
//! mutation roots from handing out the same node twice.

use std::collections::HashSet;

use super::tree::{ContentTree, NodeId, NodeKind};
use crate::config::SessionConfig;

pub struct DomWalker<'a> {
    config: &'a SessionConfig,
}

impl<'a> DomWalker<'a> {
    pub fn new(config: &'a SessionConfig) -> Self {
        Self { config }
    }

    /// True if `node` is an element whose tag is in the skip set.
    pub fn is_skipped<T: ContentTree + ?Sized>(&self, tree: &T, node: NodeId) -> bool {
        matches!(tree.kind(node), NodeKind::Element(tag) if self.config.is_skipped_tag(&tag))
    }

    /// A mutation root is only worth walking if it hangs under the content
    /// root and no ancestor (itself included) is a skipped element.
    pub fn is_eligible<T: ContentTree + ?Sized>(&self, tree: &T, node: NodeId) -> bool {
        let Some(root) = tree.root() else {
            return false;
        };
        let mut current = Some(node);
        while let Some(n) = current {
            if self.is_skipped(tree, n) {
                return false;
            }
            if n == root {
                return true;
            }
            current = tree.parent(n);
        }
        false
    }

    /// Non-blank text nodes under `start` (inclusive), pre-order.
    ///
    /// Nodes already in `visited` are skipped, and everything returned is
    /// added to it.
    pub fn text_nodes<T: ContentTree + ?Sized>(
        &self,
        tree: &T,
        start: NodeId,
        visited: &mut HashSet<NodeId>,
    ) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![start];

        while let Some(node) = stack.pop() {
            match tree.kind(node) {
                NodeKind::Text => {
                    let has_content = tree
                        .text(node)
                        .is_some_and(|t| !t.trim().is_empty());
                    if has_content && visited.insert(node) {
                        out.push(node);
                    }
                }
                NodeKind::Element(tag) => {
                    if self.config.is_skipped_tag(&tag) {
                        continue;
                    }
                    // Reverse so the first child pops first.
                    stack.extend(tree.children(node).into_iter().rev());
                }
                NodeKind::Other => {}
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::tree::ArenaTree;

    fn texts(tree: &ArenaTree, nodes: &[NodeId]) -> Vec<String> {
        nodes.iter().filter_map(|n| tree.text(*n)).collect()
    }

    #[test]
    fn test_document_order() {
        let (mut tree, body) = ArenaTree::with_body();
        let div = tree.element(body, "div");
        tree.text_node(div, "one");
        let span = tree.element(div, "span");
        tree.text_node(span, "two");
        tree.text_node(body, "three");

        let config = SessionConfig::default();
        let walker = DomWalker::new(&config);
        let nodes = walker.text_nodes(&tree, body, &mut HashSet::new());
        assert_eq!(texts(&tree, &nodes), vec!["one", "two", "three"]);
    }

    #[test]
    fn test_skip_tags_prune_subtrees() {
        let (mut tree, body) = ArenaTree::with_body();
        let script = tree.element(body, "SCRIPT");
        tree.text_node(script, "var Frodo = 1;");
        let style = tree.element(body, "style");
        let nested = tree.element(style, "div");
        tree.text_node(nested, "Bob");
        tree.text_node(body, "visible");

        let config = SessionConfig::default();
        let walker = DomWalker::new(&config);
        let nodes = walker.text_nodes(&tree, body, &mut HashSet::new());
        assert_eq!(texts(&tree, &nodes), vec!["visible"]);
    }

    #[test]
    fn test_blank_and_comment_nodes_dropped() {
        let (mut tree, body) = ArenaTree::with_body();
        tree.text_node(body, "   \n\t");
        tree.comment(body, "Bob");
        tree.text_node(body, "Alice");

        let config = SessionConfig::default();
        let nodes = DomWalker::new(&config).text_nodes(&tree, body, &mut HashSet::new());
        assert_eq!(texts(&tree, &nodes), vec!["Alice"]);
    }

    #[test]
    fn test_visited_set_dedupes_overlapping_roots() {
        let (mut tree, body) = ArenaTree::with_body();
        let outer = tree.element(body, "div");
        let inner = tree.element(outer, "p");
        tree.text_node(inner, "Alice");

        let config = SessionConfig::default();
        let walker = DomWalker::new(&config);
        let mut visited = HashSet::new();
        assert_eq!(walker.text_nodes(&tree, inner, &mut visited).len(), 1);
        assert!(walker.text_nodes(&tree, outer, &mut visited).is_empty());
    }

    #[test]
    fn test_eligibility() {
        let (mut tree, body) = ArenaTree::with_body();
        let p = tree.element(body, "p");
        let text = tree.text_node(p, "Bob");
        let script = tree.element(body, "script");
        let inside_script = tree.text_node(script, "Bob");
        let detached = tree.create_text("Bob");

        let config = SessionConfig::default();
        let walker = DomWalker::new(&config);
        assert!(walker.is_eligible(&tree, text));
        assert!(walker.is_eligible(&tree, body));
        assert!(!walker.is_eligible(&tree, inside_script));
        assert!(!walker.is_eligible(&tree, script));
        assert!(!walker.is_eligible(&tree, detached));
    }

    #[test]
    fn test_custom_skip_tags() {
        let (mut tree, body) = ArenaTree::with_body();
        let pre = tree.element(body, "pre");
        tree.text_node(pre, "Bob");
        let script = tree.element(body, "script");
        tree.text_node(script, "Carol");

        let config = SessionConfig::from_json(r#"{"skip_tags": ["pre"]}"#).unwrap();
        let nodes = DomWalker::new(&config).text_nodes(&tree, body, &mut HashSet::new());
        assert_eq!(texts(&tree, &nodes), vec!["Carol"]);
    }
}
