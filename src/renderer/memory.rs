//! In-memory host tree
//!
//! [`MemoryHost`] implements [`Host`] over a plain node table. Every call is
//! recorded as a [`HostOp`] and tallied in [`HostStats`], which makes it the
//! reference host for checking how many mutations a patch really performed.

use std::cell::{Cell, RefCell};

use compact_str::CompactString;

use crate::value::Value;
use crate::vnode::{Props, PropsExt};

use super::host::{Host, HostId};

// =============================================================================
// Public Types
// =============================================================================

/// One recorded host call.
#[derive(Debug, Clone, PartialEq)]
pub enum HostOp {
    CreateElement { node: HostId, tag: CompactString },
    CreateText { node: HostId, content: CompactString },
    Insert { node: HostId, container: HostId, anchor: Option<HostId> },
    /// Insert of a node that already had a parent
    Move { node: HostId, container: HostId, anchor: Option<HostId> },
    Remove { node: HostId },
    SetText { node: HostId, content: CompactString },
    SetElementText { node: HostId, content: CompactString },
    /// Property patch with the number of keys actually changed
    PatchProps { node: HostId, changed: usize },
}

/// Counters over recorded host calls.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HostStats {
    /// Number of nodes created
    pub created: usize,
    /// Number of fresh insertions
    pub inserted: usize,
    /// Number of nodes moved
    pub moved: usize,
    /// Number of nodes removed
    pub removed: usize,
    /// Number of text content updates
    pub text_updates: usize,
    /// Number of property keys set or removed
    pub prop_updates: usize,
}

impl HostStats {
    /// Total number of structural mutations.
    pub fn structural(&self) -> usize {
        self.inserted + self.moved + self.removed
    }
}

#[derive(Debug, Clone)]
enum NodeData {
    Element { tag: CompactString, props: Props },
    Text(CompactString),
}

#[derive(Debug, Clone)]
struct HostNode {
    data: NodeData,
    parent: Option<HostId>,
    children: Vec<HostId>,
}

// =============================================================================
// MemoryHost
// =============================================================================

/// Host tree kept in memory.
#[derive(Debug, Default)]
pub struct MemoryHost {
    nodes: RefCell<Vec<HostNode>>,
    ops: RefCell<Vec<HostOp>>,
    stats: Cell<HostStats>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detached element to render into. Not recorded.
    pub fn create_root(&self) -> HostId {
        self.alloc(NodeData::Element {
            tag: CompactString::const_new("root"),
            props: Props::new(),
        })
    }

    fn alloc(&self, data: NodeData) -> HostId {
        let mut nodes = self.nodes.borrow_mut();
        let id = HostId::from_raw(nodes.len() as u64);
        nodes.push(HostNode {
            data,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    fn record(&self, op: HostOp) {
        self.ops.borrow_mut().push(op);
    }

    fn bump(&self, f: impl FnOnce(&mut HostStats)) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }

    /// Recorded calls, oldest first.
    pub fn ops(&self) -> Vec<HostOp> {
        self.ops.borrow().clone()
    }

    /// Take the recorded calls, leaving the log empty.
    pub fn take_ops(&self) -> Vec<HostOp> {
        std::mem::take(&mut *self.ops.borrow_mut())
    }

    /// Current counters.
    pub fn stats(&self) -> HostStats {
        self.stats.get()
    }

    /// Clear the call log and the counters.
    pub fn reset(&self) {
        self.ops.borrow_mut().clear();
        self.stats.set(HostStats::default());
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Children of `node`, in order.
    pub fn children(&self, node: HostId) -> Vec<HostId> {
        self.with_node(node, |n| n.children.clone()).unwrap_or_default()
    }

    /// Parent of `node`, if attached.
    pub fn parent(&self, node: HostId) -> Option<HostId> {
        self.with_node(node, |n| n.parent).flatten()
    }

    /// Tag of an element node.
    pub fn tag(&self, node: HostId) -> Option<CompactString> {
        self.with_node(node, |n| match &n.data {
            NodeData::Element { tag, .. } => Some(tag.clone()),
            NodeData::Text(_) => None,
        })
        .flatten()
    }

    /// Content of a text node.
    pub fn text(&self, node: HostId) -> Option<CompactString> {
        self.with_node(node, |n| match &n.data {
            NodeData::Text(content) => Some(content.clone()),
            NodeData::Element { .. } => None,
        })
        .flatten()
    }

    /// Property of an element node.
    pub fn prop(&self, node: HostId, name: &str) -> Option<Value> {
        self.with_node(node, |n| match &n.data {
            NodeData::Element { props, .. } => props.get_prop(name).cloned(),
            NodeData::Text(_) => None,
        })
        .flatten()
    }

    /// Concatenated text of `node` and its descendants.
    pub fn text_content(&self, node: HostId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: HostId, out: &mut String) {
        if let Some(content) = self.text(node) {
            out.push_str(&content);
            return;
        }
        for child in self.children(node) {
            self.collect_text(child, out);
        }
    }

    fn with_node<R>(&self, node: HostId, f: impl FnOnce(&HostNode) -> R) -> Option<R> {
        self.nodes.borrow().get(node.as_raw() as usize).map(f)
    }

    fn with_node_mut<R>(&self, node: HostId, f: impl FnOnce(&mut HostNode) -> R) -> Option<R> {
        self.nodes.borrow_mut().get_mut(node.as_raw() as usize).map(f)
    }

    fn detach(&self, node: HostId) -> bool {
        let Some(parent) = self.with_node_mut(node, |n| n.parent.take()).flatten() else {
            return false;
        };
        self.with_node_mut(parent, |p| p.children.retain(|c| *c != node));
        true
    }

    // =========================================================================
    // HTML
    // =========================================================================

    /// Serialize the children of `node` as HTML.
    pub fn inner_html(&self, node: HostId) -> String {
        let mut output = String::new();
        for child in self.children(node) {
            self.render_node(child, &mut output);
        }
        output
    }

    /// Serialize `node` itself as HTML.
    pub fn outer_html(&self, node: HostId) -> String {
        let mut output = String::new();
        self.render_node(node, &mut output);
        output
    }

    fn render_node(&self, node: HostId, output: &mut String) {
        let Some(data) = self.with_node(node, |n| n.data.clone()) else {
            return;
        };
        match data {
            NodeData::Text(content) => output.push_str(&escape_html(&content)),
            NodeData::Element { tag, props } => {
                output.push('<');
                output.push_str(&tag);
                for (name, value) in &props {
                    output.push(' ');
                    output.push_str(name);
                    output.push_str("=\"");
                    output.push_str(&escape_attr(&value.to_string()));
                    output.push('"');
                }
                if is_void_element(&tag) {
                    output.push_str(" />");
                    return;
                }
                output.push('>');
                for child in self.children(node) {
                    self.render_node(child, output);
                }
                output.push_str("</");
                output.push_str(&tag);
                output.push('>');
            }
        }
    }
}

impl Host for MemoryHost {
    fn create_element(&self, tag: &str) -> HostId {
        let tag = CompactString::from(tag);
        let node = self.alloc(NodeData::Element {
            tag: tag.clone(),
            props: Props::new(),
        });
        self.bump(|s| s.created += 1);
        self.record(HostOp::CreateElement { node, tag });
        node
    }

    fn create_text(&self, content: &str) -> HostId {
        let content = CompactString::from(content);
        let node = self.alloc(NodeData::Text(content.clone()));
        self.bump(|s| s.created += 1);
        self.record(HostOp::CreateText { node, content });
        node
    }

    fn remove(&self, node: HostId) {
        if self.detach(node) {
            self.bump(|s| s.removed += 1);
        }
        self.record(HostOp::Remove { node });
    }

    fn insert(&self, node: HostId, container: HostId, anchor: Option<HostId>) {
        let moved = self.detach(node);
        let mut nodes = self.nodes.borrow_mut();
        if let Some(parent) = nodes.get_mut(container.as_raw() as usize) {
            let pos = anchor
                .and_then(|a| parent.children.iter().position(|c| *c == a))
                .unwrap_or(parent.children.len());
            parent.children.insert(pos, node);
        }
        if let Some(child) = nodes.get_mut(node.as_raw() as usize) {
            child.parent = Some(container);
        }
        drop(nodes);

        if moved {
            self.bump(|s| s.moved += 1);
            self.record(HostOp::Move { node, container, anchor });
        } else {
            self.bump(|s| s.inserted += 1);
            self.record(HostOp::Insert { node, container, anchor });
        }
    }

    fn set_text(&self, node: HostId, content: &str) {
        let content = CompactString::from(content);
        self.with_node_mut(node, |n| n.data = NodeData::Text(content.clone()));
        self.bump(|s| s.text_updates += 1);
        self.record(HostOp::SetText { node, content });
    }

    fn set_element_text(&self, node: HostId, content: &str) {
        for child in self.children(node) {
            self.detach(child);
        }
        if !content.is_empty() {
            let text = self.alloc(NodeData::Text(CompactString::from(content)));
            self.with_node_mut(text, |t| t.parent = Some(node));
            self.with_node_mut(node, |n| n.children.push(text));
        }
        self.bump(|s| s.text_updates += 1);
        self.record(HostOp::SetElementText {
            node,
            content: CompactString::from(content),
        });
    }

    fn patch_props(&self, node: HostId, old: &Props, new: &Props) {
        let mut changed = 0;
        self.with_node_mut(node, |n| {
            let NodeData::Element { props, .. } = &mut n.data else {
                return;
            };
            for (name, value) in new {
                let same = old.get_prop(name).is_some_and(|prev| prev.same(value));
                if !same {
                    props.set_prop(name.clone(), value.clone());
                    changed += 1;
                }
            }
            for (name, _) in old {
                if !new.has_prop(name) {
                    props.remove_prop(name);
                    changed += 1;
                }
            }
        });
        self.bump(|s| s.prop_updates += changed);
        self.record(HostOp::PatchProps { node, changed });
    }
}

/// Escape HTML special characters.
fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            _ => result.push(c),
        }
    }
    result
}

/// Escape attribute value special characters.
fn escape_attr(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '"' => result.push_str("&quot;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            _ => result.push(c),
        }
    }
    result
}

/// Check if element is a void element (self-closing).
fn is_void_element(tag: &str) -> bool {
    matches!(
        tag,
        "area" | "br" | "col" | "embed" | "hr" | "img" | "input" | "link" | "meta" | "source" | "wbr"
    )
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vnode::props;

    #[test]
    fn test_insert_and_move_are_distinguished() {
        let host = MemoryHost::new();
        let root = host.create_root();
        let a = host.create_text("a");
        let b = host.create_text("b");
        host.insert(a, root, None);
        host.insert(b, root, None);
        assert_eq!(host.children(root), vec![a, b]);

        // Re-inserting an attached node is a move.
        host.insert(b, root, Some(a));
        assert_eq!(host.children(root), vec![b, a]);

        let stats = host.stats();
        assert_eq!(stats.created, 2);
        assert_eq!(stats.inserted, 2);
        assert_eq!(stats.moved, 1);
    }

    #[test]
    fn test_remove_detaches() {
        let host = MemoryHost::new();
        let root = host.create_root();
        let a = host.create_element("p");
        host.insert(a, root, None);
        host.remove(a);
        assert!(host.children(root).is_empty());
        assert_eq!(host.parent(a), None);
        assert_eq!(host.stats().removed, 1);
    }

    #[test]
    fn test_patch_props_counts_changes() {
        let host = MemoryHost::new();
        let el = host.create_element("a");
        host.patch_props(el, &Props::new(), &props([("href", "/x"), ("id", "k")]));
        assert_eq!(host.stats().prop_updates, 2);

        host.patch_props(
            el,
            &props([("href", "/x"), ("id", "k")]),
            &props([("href", "/x"), ("title", "t")]),
        );
        assert_eq!(host.prop(el, "title"), Some(Value::from("t")));
        assert_eq!(host.prop(el, "id"), None);
        assert_eq!(host.prop(el, "href"), Some(Value::from("/x")));
        // One set plus one removal.
        assert_eq!(host.stats().prop_updates, 4);
    }

    #[test]
    fn test_html_serialization() {
        let host = MemoryHost::new();
        let root = host.create_root();
        let div = host.create_element("div");
        host.patch_props(div, &Props::new(), &props([("class", "a&b")]));
        host.set_element_text(div, "<hi>");
        let br = host.create_element("br");
        host.insert(div, root, None);
        host.insert(br, root, None);

        assert_eq!(
            host.inner_html(root),
            r#"<div class="a&amp;b">&lt;hi&gt;</div><br />"#
        );
        assert_eq!(host.text_content(root), "<hi>");
    }

    #[test]
    fn test_set_element_text_replaces_children() {
        let host = MemoryHost::new();
        let ul = host.create_element("ul");
        let li = host.create_element("li");
        host.insert(li, ul, None);
        host.set_element_text(ul, "");
        assert!(host.children(ul).is_empty());
        assert_eq!(host.parent(li), None);
    }
}
