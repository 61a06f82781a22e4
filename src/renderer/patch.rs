//! Patch state machine
//!
//! `patch(old, new)` branches on the kind of `new`:
//!
//! ```text
//! old is not the same kind ──▶ mount new before old, unmount old
//! Fragment   ──▶ mount children        | reconcile children
//! Text       ──▶ create + insert       | set text if changed
//! Element    ──▶ create, props, kids   | reuse host node, diff props, kids
//! Component  ──▶ instance + effect     | relink, or stage `next` and re-render
//! ```
//!
//! # Keyed children
//!
//! 1. Trim the common prefix and suffix (same type and key), patching in place.
//! 2. Only old left: unmount it. Only new left: mount it before the suffix.
//! 3. Otherwise match old to new by key (unkeyed nodes by type), unmount the
//!    unmatched old nodes, and take the LIS of matched new positions in old
//!    order. Walking the new span right to left with a running anchor, LIS
//!    members are patched in place, other matches are moved then patched, and
//!    the rest are mounted.

use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::{trace, warn};

use crate::reactivity::{EffectOptions, Job, effect_with, queue_job};
use crate::vnode::{Children, Key, Props, VNodeRef, VNodeType, props_shallow_equal};

use super::component::ComponentInstance;
use super::host::{Host, HostId};
use super::lis::longest_increasing_subsequence;
use super::RendererInner;

type Parent<'a> = Option<&'a Rc<ComponentInstance>>;

/// First host node among `nodes`, in order.
fn first_host_in(nodes: &[VNodeRef]) -> Option<HostId> {
    nodes.iter().find_map(|n| n.first_host())
}

/// Point every component among `nodes` at the host node that follows it.
///
/// Walks right to left from `anchor`, descending through fragments and
/// component subtrees, which share their parent's container. Run after a
/// children array is settled so a component re-rendering on its own inserts
/// before its current next sibling.
pub(super) fn refresh_anchors(nodes: &[VNodeRef], anchor: Option<HostId>) {
    let mut anchor = anchor;
    for node in nodes.iter().rev() {
        match node.kind() {
            VNodeType::Component(_) => {
                if let Some(instance) = node.component() {
                    instance.set_anchor(anchor);
                    if let Some(tree) = instance.subtree() {
                        refresh_anchors(std::slice::from_ref(&tree), anchor);
                    }
                }
            }
            VNodeType::Fragment => refresh_anchors(node.children().as_slice(), anchor),
            VNodeType::Element(_) | VNodeType::Text => {}
        }
        if let Some(first) = node.first_host() {
            anchor = Some(first);
        }
    }
}

impl<H: Host + 'static> RendererInner<H> {
    /// Reconcile `new` against `old` inside `container`, inserting new host
    /// nodes before `anchor`.
    pub(crate) fn patch(
        self: &Rc<Self>,
        old: Option<&VNodeRef>,
        new: &VNodeRef,
        container: HostId,
        anchor: Option<HostId>,
        parent: Parent<'_>,
    ) {
        if old.is_some_and(|prev| Rc::ptr_eq(prev, new)) {
            return;
        }
        let Some(_depth) = self.enter() else {
            warn!(
                max_depth = self.config.max_depth,
                kind = ?new.kind(),
                "tree exceeds max depth, skipping patch"
            );
            return;
        };

        if let Some(prev) = old.filter(|prev| !prev.is_same(new)) {
            trace!(old = ?prev.kind(), new = ?new.kind(), "replacing node");
            let anchor = prev.first_host().or(anchor);
            self.dispatch(None, new, container, anchor, parent);
            self.unmount(prev, true);
            return;
        }
        self.dispatch(old, new, container, anchor, parent);
    }

    fn dispatch(
        self: &Rc<Self>,
        old: Option<&VNodeRef>,
        new: &VNodeRef,
        container: HostId,
        anchor: Option<HostId>,
        parent: Parent<'_>,
    ) {
        match new.kind() {
            VNodeType::Fragment => self.process_fragment(old, new, container, anchor, parent),
            VNodeType::Text => self.process_text(old, new, container, anchor),
            VNodeType::Element(_) => self.process_element(old, new, container, anchor, parent),
            VNodeType::Component(_) => self.process_component(old, new, container, anchor, parent),
        }
    }

    // =========================================================================
    // Fragment / Text
    // =========================================================================

    fn process_fragment(
        self: &Rc<Self>,
        old: Option<&VNodeRef>,
        new: &VNodeRef,
        container: HostId,
        anchor: Option<HostId>,
        parent: Parent<'_>,
    ) {
        match old {
            None => {
                let children = new.children().as_slice();
                for child in children {
                    self.patch(None, child, container, anchor, parent);
                }
                refresh_anchors(children, anchor);
            }
            Some(prev) => self.patch_keyed_children(
                prev.children().as_slice(),
                new.children().as_slice(),
                container,
                anchor,
                parent,
            ),
        }
    }

    fn process_text(
        &self,
        old: Option<&VNodeRef>,
        new: &VNodeRef,
        container: HostId,
        anchor: Option<HostId>,
    ) {
        let content = new.children().as_text().unwrap_or_default();
        match old {
            Some(prev) => {
                let el = prev.el();
                new.set_el(el);
                if prev.children().as_text() != Some(content) {
                    if let Some(el) = el {
                        self.host.set_text(el, content);
                    }
                }
            }
            None => {
                let el = self.host.create_text(content);
                new.set_el(Some(el));
                self.host.insert(el, container, anchor);
            }
        }
    }

    // =========================================================================
    // Element
    // =========================================================================

    fn process_element(
        self: &Rc<Self>,
        old: Option<&VNodeRef>,
        new: &VNodeRef,
        container: HostId,
        anchor: Option<HostId>,
        parent: Parent<'_>,
    ) {
        match old {
            Some(prev) => self.update_element(prev, new, parent),
            None => self.mount_element(new, container, anchor, parent),
        }
    }

    fn mount_element(
        self: &Rc<Self>,
        vnode: &VNodeRef,
        container: HostId,
        anchor: Option<HostId>,
        parent: Parent<'_>,
    ) {
        let tag = vnode.tag().unwrap_or_default();
        let el = self.host.create_element(tag);
        vnode.set_el(Some(el));
        trace!(tag, el = %el, "mount element");

        if !vnode.props().is_empty() {
            self.host.patch_props(el, &Props::new(), vnode.props());
        }
        match vnode.children() {
            Children::Text(content) => {
                if !content.is_empty() {
                    self.host.set_element_text(el, content);
                }
            }
            Children::Array(items) => {
                for child in items {
                    self.patch(None, child, el, None, parent);
                }
                refresh_anchors(items, None);
            }
        }
        self.host.insert(el, container, anchor);
    }

    fn update_element(self: &Rc<Self>, prev: &VNodeRef, new: &VNodeRef, parent: Parent<'_>) {
        let Some(el) = prev.el() else {
            warn!(tag = ?new.tag(), "previous element was never mounted");
            return;
        };
        new.set_el(Some(el));
        if !props_shallow_equal(prev.props(), new.props()) {
            self.host.patch_props(el, prev.props(), new.props());
        }
        self.update_children(prev, new, el, parent);
    }

    fn update_children(
        self: &Rc<Self>,
        prev: &VNodeRef,
        new: &VNodeRef,
        el: HostId,
        parent: Parent<'_>,
    ) {
        match (prev.children(), new.children()) {
            (old_children, Children::Text(content)) => {
                if let Children::Array(items) = old_children {
                    for child in items {
                        self.unmount(child, true);
                    }
                }
                if old_children.as_text() != Some(content.as_str()) {
                    self.host.set_element_text(el, content);
                }
            }
            (Children::Text(_), Children::Array(items)) => {
                self.host.set_element_text(el, "");
                for child in items {
                    self.patch(None, child, el, None, parent);
                }
                refresh_anchors(items, None);
            }
            (Children::Array(old_items), Children::Array(new_items)) => {
                self.patch_keyed_children(old_items, new_items, el, None, parent);
            }
        }
    }

    // =========================================================================
    // Keyed children
    // =========================================================================

    fn patch_keyed_children(
        self: &Rc<Self>,
        c1: &[VNodeRef],
        c2: &[VNodeRef],
        container: HostId,
        parent_anchor: Option<HostId>,
        parent: Parent<'_>,
    ) {
        self.diff_children(c1, c2, container, parent_anchor, parent);
        refresh_anchors(c2, parent_anchor);
    }

    fn diff_children(
        self: &Rc<Self>,
        c1: &[VNodeRef],
        c2: &[VNodeRef],
        container: HostId,
        parent_anchor: Option<HostId>,
        parent: Parent<'_>,
    ) {
        let mut i = 0;
        // Exclusive ends
        let mut e1 = c1.len();
        let mut e2 = c2.len();

        // 1. Common prefix. Old siblings are all still attached at this point.
        while i < e1 && i < e2 && c1[i].is_same(&c2[i]) {
            let anchor = first_host_in(&c1[i + 1..]).or(parent_anchor);
            self.patch(Some(&c1[i]), &c2[i], container, anchor, parent);
            i += 1;
        }

        // Common suffix
        while i < e1 && i < e2 && c1[e1 - 1].is_same(&c2[e2 - 1]) {
            let anchor = first_host_in(&c2[e2..]).or(parent_anchor);
            self.patch(Some(&c1[e1 - 1]), &c2[e2 - 1], container, anchor, parent);
            e1 -= 1;
            e2 -= 1;
        }

        // 2. One side exhausted
        if i == e2 {
            for prev in &c1[i..e1] {
                self.unmount(prev, true);
            }
            return;
        }
        if i == e1 {
            let anchor = first_host_in(&c2[e2..]).or(parent_anchor);
            for next in &c2[i..e2] {
                self.patch(None, next, container, anchor, parent);
            }
            return;
        }

        // 3. Unknown middle span
        let span = e2 - i;
        let key_to_new: FxHashMap<&Key, usize> = (i..e2)
            .filter_map(|j| c2[j].key().map(|k| (k, j)))
            .collect();
        let mut new_to_old: Vec<Option<usize>> = vec![None; span];
        // New positions of matched old nodes, in old order
        let mut order: Vec<usize> = Vec::with_capacity(span);

        for (old_idx, prev) in c1.iter().enumerate().take(e1).skip(i) {
            let found = match prev.key() {
                Some(key) => key_to_new
                    .get(key)
                    .copied()
                    .filter(|&j| new_to_old[j - i].is_none() && c2[j].is_same(prev)),
                None => (i..e2).find(|&j| {
                    new_to_old[j - i].is_none() && c2[j].key().is_none() && c2[j].is_same(prev)
                }),
            };
            match found {
                Some(j) => {
                    new_to_old[j - i] = Some(old_idx);
                    order.push(j);
                }
                None => self.unmount(prev, true),
            }
        }

        let mut stable = vec![false; span];
        for pos in longest_increasing_subsequence(&order) {
            stable[order[pos] - i] = true;
        }
        trace!(
            span,
            matched = order.len(),
            stable = stable.iter().filter(|s| **s).count(),
            "keyed diff"
        );

        let mut anchor = first_host_in(&c2[e2..]).or(parent_anchor);
        for j in (i..e2).rev() {
            let next = &c2[j];
            match new_to_old[j - i] {
                Some(old_idx) if stable[j - i] => {
                    self.patch(Some(&c1[old_idx]), next, container, anchor, parent);
                }
                Some(old_idx) => {
                    let prev = &c1[old_idx];
                    self.move_node(prev, container, anchor);
                    self.patch(Some(prev), next, container, anchor, parent);
                }
                None => self.patch(None, next, container, anchor, parent),
            }
            if let Some(first) = next.first_host() {
                anchor = Some(first);
            }
        }
    }

    /// Move every top-level host node of `vnode` before `anchor`.
    fn move_node(&self, vnode: &VNodeRef, container: HostId, anchor: Option<HostId>) {
        for node in vnode.host_nodes() {
            self.host.insert(node, container, anchor);
        }
    }

    // =========================================================================
    // Component
    // =========================================================================

    fn process_component(
        self: &Rc<Self>,
        old: Option<&VNodeRef>,
        new: &VNodeRef,
        container: HostId,
        anchor: Option<HostId>,
        parent: Parent<'_>,
    ) {
        match old {
            Some(prev) => self.update_component(prev, new, anchor),
            None => self.mount_component(new, container, anchor, parent),
        }
    }

    fn mount_component(
        self: &Rc<Self>,
        vnode: &VNodeRef,
        container: HostId,
        anchor: Option<HostId>,
        parent: Parent<'_>,
    ) {
        let VNodeType::Component(def) = vnode.kind() else {
            return;
        };
        let instance = ComponentInstance::new(def.clone(), vnode, parent, container, anchor);
        vnode.set_component(Some(instance.clone()));
        trace!(component = instance.name(), "mount component");

        let job_target = Rc::downgrade(&instance);
        let job: Job = Rc::new(move || {
            if let Some(instance) = job_target.upgrade() {
                instance.update();
            }
        });

        let renderer = Rc::downgrade(self);
        let target = Rc::downgrade(&instance);
        let effect = effect_with(
            move || {
                if let (Some(renderer), Some(instance)) = (renderer.upgrade(), target.upgrade()) {
                    renderer.render_component(&instance);
                }
            },
            EffectOptions::new().scheduler(move || queue_job(job.clone())),
        );
        instance.set_effect(effect);
    }

    /// Body of a component's render effect.
    fn render_component(self: &Rc<Self>, instance: &Rc<ComponentInstance>) {
        instance.accept_next();
        let tree = instance.render_tree();
        let prev = instance.replace_subtree(Some(tree.clone()));
        trace!(
            component = instance.name(),
            mounted = prev.is_some(),
            "render component"
        );
        let anchor = instance.anchor();
        self.patch(prev.as_ref(), &tree, instance.container(), anchor, Some(instance));
        refresh_anchors(std::slice::from_ref(&tree), anchor);
        if let Some(vnode) = instance.vnode() {
            vnode.set_el(tree.first_host());
        }
    }

    fn update_component(&self, prev: &VNodeRef, new: &VNodeRef, anchor: Option<HostId>) {
        let Some(instance) = prev.component() else {
            warn!(kind = ?new.kind(), "previous component was never mounted");
            return;
        };
        new.set_el(prev.el());
        new.set_component(Some(instance.clone()));
        instance.set_anchor(anchor);

        if props_shallow_equal(prev.props(), new.props()) {
            instance.set_vnode(new);
        } else {
            instance.set_next(new.clone());
            instance.update();
        }
    }

    // =========================================================================
    // Unmount
    // =========================================================================

    /// Tear down `vnode`. Host nodes are detached only when `remove` is set;
    /// descendants of a removed element go with it.
    pub(crate) fn unmount(&self, vnode: &VNodeRef, remove: bool) {
        match vnode.kind() {
            VNodeType::Component(_) => {
                let Some(instance) = vnode.component() else {
                    return;
                };
                trace!(component = instance.name(), "unmount component");
                instance.stop();
                if let Some(tree) = instance.replace_subtree(None) {
                    self.unmount(&tree, remove);
                }
            }
            VNodeType::Fragment => {
                for child in vnode.children().as_slice() {
                    self.unmount(child, remove);
                }
            }
            VNodeType::Element(_) => {
                for child in vnode.children().as_slice() {
                    self.unmount(child, false);
                }
                if let Some(el) = vnode.el().filter(|_| remove) {
                    self.host.remove(el);
                }
            }
            VNodeType::Text => {
                if let Some(el) = vnode.el().filter(|_| remove) {
                    self.host.remove(el);
                }
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::renderer::{HostOp, MemoryHost, Renderer};
    use crate::vnode::{Props, VNodeRef, fragment, h, keyed_fragment, props, text};

    use super::*;

    fn setup() -> (Rc<MemoryHost>, HostId, Renderer<Rc<MemoryHost>>) {
        let host = Rc::new(MemoryHost::new());
        let root = host.create_root();
        let renderer = Renderer::new(host.clone());
        (host, root, renderer)
    }

    fn keyed_list(keys: &[i64]) -> VNodeRef {
        let items = keys
            .iter()
            .map(|&k| h("li", props([("key", k)]), k.to_string()))
            .collect::<Vec<_>>();
        h("ul", Props::new(), items)
    }

    fn items(host: &MemoryHost, root: HostId) -> String {
        host.inner_html(root)
            .replace("<ul>", "")
            .replace("</ul>", "")
            .replace("<li>", "")
            .replace("</li>", ",")
    }

    /// Render `from`, then patch to `to`, returning stats for the patch only.
    fn diff(from: &[i64], to: &[i64]) -> (Rc<MemoryHost>, HostId, crate::renderer::HostStats) {
        let (host, root, renderer) = setup();
        renderer.render(keyed_list(from), root);
        host.reset();
        renderer.render(keyed_list(to), root);
        let stats = host.stats();
        (host, root, stats)
    }

    #[test]
    fn test_rotate_right_is_single_move() {
        let (host, root, stats) = diff(&[1, 2, 3], &[3, 1, 2]);
        assert_eq!(items(&host, root), "3,1,2,");
        assert_eq!(stats.moved, 1);
        assert_eq!(stats.inserted, 0);
        assert_eq!(stats.removed, 0);
        assert_eq!(stats.created, 0);
        assert_eq!(stats.text_updates, 0);
    }

    #[test]
    fn test_insert_between_keeps_neighbours() {
        let (host, root, renderer) = setup();
        renderer.render(keyed_list(&[1, 2]), root);
        let ul = host.children(root)[0];
        let two = host.children(ul)[1];
        host.reset();

        renderer.render(keyed_list(&[1, 3, 2]), root);
        assert_eq!(items(&host, root), "1,3,2,");

        let stats = host.stats();
        assert_eq!(stats.inserted, 1);
        assert_eq!(stats.removed, 0);
        assert_eq!(stats.moved, 0);

        let inserts: Vec<HostOp> = host
            .ops()
            .into_iter()
            .filter(|op| matches!(op, HostOp::Insert { .. }))
            .collect();
        assert!(matches!(
            inserts.as_slice(),
            [HostOp::Insert { container, anchor: Some(anchor), .. }] if *container == ul && *anchor == two
        ));
    }

    #[test]
    fn test_remove_from_middle() {
        let (host, root, stats) = diff(&[1, 2, 3], &[1, 3]);
        assert_eq!(items(&host, root), "1,3,");
        assert_eq!(stats.removed, 1);
        assert_eq!(stats.structural(), 1);
    }

    #[test]
    fn test_append_and_prepend() {
        let (host, root, stats) = diff(&[2, 3], &[1, 2, 3, 4]);
        assert_eq!(items(&host, root), "1,2,3,4,");
        assert_eq!(stats.inserted, 2);
        assert_eq!(stats.moved, 0);
    }

    #[test]
    fn test_reverse_moves_all_but_one() {
        let (host, root, stats) = diff(&[1, 2, 3, 4], &[4, 3, 2, 1]);
        assert_eq!(items(&host, root), "4,3,2,1,");
        assert_eq!(stats.moved, 3);
        assert_eq!(stats.created, 0);
    }

    #[test]
    fn test_mixed_insert_remove_move() {
        let (host, root, stats) = diff(&[1, 2, 3, 4, 5], &[1, 4, 6, 2, 5]);
        assert_eq!(items(&host, root), "1,4,6,2,5,");
        assert_eq!(stats.moved, 1);
        assert_eq!(stats.inserted, 1);
        assert_eq!(stats.removed, 1);
    }

    #[test]
    fn test_clear_and_fill() {
        let (host, root, stats) = diff(&[1, 2], &[]);
        assert_eq!(items(&host, root), "");
        assert_eq!(stats.removed, 2);

        let (host, root, stats) = diff(&[], &[1, 2]);
        assert_eq!(items(&host, root), "1,2,");
        assert_eq!(stats.inserted, 2);
    }

    #[test]
    fn test_unkeyed_children_are_matched_by_type() {
        let (host, root, renderer) = setup();
        let list = |first: &str| {
            let mut children = vec![h("p", Props::new(), "a"), h("span", Props::new(), "b")];
            if first == "span" {
                children.reverse();
            }
            h("div", Props::new(), children)
        };
        renderer.render(list("p"), root);
        host.reset();

        renderer.render(list("span"), root);
        assert_eq!(host.inner_html(root), "<div><span>b</span><p>a</p></div>");
        assert_eq!(host.stats().moved, 1);
        assert_eq!(host.stats().created, 0);
    }

    #[test]
    fn test_prop_diff_only_touches_changes() {
        let (host, root, renderer) = setup();
        renderer.render(h("a", props([("href", "/x"), ("id", "k")]), "go"), root);
        host.reset();

        renderer.render(h("a", props([("href", "/x"), ("id", "k")]), "go"), root);
        assert_eq!(host.stats(), Default::default());

        renderer.render(h("a", props([("href", "/y")]), "go"), root);
        let el = host.children(root)[0];
        assert_eq!(host.prop(el, "href"), Some("/y".into()));
        assert_eq!(host.prop(el, "id"), None);
        assert_eq!(host.stats().prop_updates, 2);
    }

    #[test]
    fn test_text_and_array_children_swap() {
        let (host, root, renderer) = setup();
        renderer.render(h("div", Props::new(), "plain"), root);

        renderer.render(
            h("div", Props::new(), vec![h("b", Props::new(), "x"), text("y")]),
            root,
        );
        assert_eq!(host.inner_html(root), "<div><b>x</b>y</div>");

        renderer.render(h("div", Props::new(), "again"), root);
        assert_eq!(host.inner_html(root), "<div>again</div>");
        assert_eq!(host.stats().created, 3);
    }

    #[test]
    fn test_text_node_updates_only_on_change() {
        let (host, root, renderer) = setup();
        renderer.render(fragment(vec![text("a")]), root);
        host.reset();

        renderer.render(fragment(vec![text("a")]), root);
        assert_eq!(host.stats().text_updates, 0);

        renderer.render(fragment(vec![text("b")]), root);
        assert_eq!(host.stats().text_updates, 1);
        assert_eq!(host.inner_html(root), "b");
    }

    #[test]
    fn test_kind_mismatch_replaces_in_place() {
        let (host, root, renderer) = setup();
        renderer.render(
            fragment(vec![text("before"), h("p", Props::new(), "old"), text("after")]),
            root,
        );
        host.reset();

        renderer.render(
            fragment(vec![text("before"), h("div", Props::new(), "new"), text("after")]),
            root,
        );
        assert_eq!(host.inner_html(root), "before<div>new</div>after");
        assert_eq!(host.stats().removed, 1);
        assert_eq!(host.stats().inserted, 1);
    }

    #[test]
    fn test_keyed_fragments_move_all_host_nodes() {
        let (host, root, renderer) = setup();
        let tree = |order: &[&str]| {
            let frags = order
                .iter()
                .map(|&k| match k {
                    "a" => keyed_fragment("a", vec![text("x"), text("y")]),
                    _ => keyed_fragment("b", vec![text("z")]),
                })
                .collect::<Vec<_>>();
            h("div", Props::new(), frags)
        };
        renderer.render(tree(&["a", "b"]), root);
        host.reset();

        renderer.render(tree(&["b", "a"]), root);
        assert_eq!(host.text_content(root), "zxy");
        assert_eq!(host.stats().moved, 2);
        assert_eq!(host.stats().created, 0);
    }

    #[test]
    fn test_fragment_children_grow_before_next_sibling() {
        let (host, root, renderer) = setup();
        renderer.render(
            h("div", Props::new(), vec![fragment(vec![text("a")]), text("end")]),
            root,
        );
        renderer.render(
            h(
                "div",
                Props::new(),
                vec![fragment(vec![text("a"), text("b")]), text("end")],
            ),
            root,
        );
        assert_eq!(host.text_content(root), "abend");
    }
}
