//! Tree descriptions
//!
//! A [`VNode`] describes one desired host-tree node. Descriptions are built
//! once and then treated as immutable; the only state the renderer writes back
//! is the host node a description ended up bound to and, for components, the
//! live instance.
//!
//! # Shapes
//!
//! | Kind        | Children            | Host nodes owned           |
//! |-------------|---------------------|----------------------------|
//! | `Element`   | text or array       | one                        |
//! | `Text`      | text                | one                        |
//! | `Fragment`  | array               | those of its children      |
//! | `Component` | none                | those of its rendered tree |

mod props;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use compact_str::{CompactString, ToCompactString};
use smallvec::SmallVec;

use crate::renderer::{ComponentDef, ComponentInstance, HostId};
use crate::value::{Value, safe_integer};

pub use props::{Props, PropsExt, props, props_shallow_equal};

/// Shared handle to a description.
pub type VNodeRef = Rc<VNode>;

/// Host nodes owned by one description, in document order.
pub type HostNodes = SmallVec<[HostId; 2]>;

// =============================================================================
// Kind / Children / Shape
// =============================================================================

/// What a description stands for.
#[derive(Clone)]
pub enum VNodeType {
    /// Host element with a tag name
    Element(CompactString),
    /// Host text node
    Text,
    /// Grouping of siblings without a host node of its own
    Fragment,
    /// Component definition, compared by identity
    Component(Rc<ComponentDef>),
}

impl VNodeType {
    /// Same kind: equal tags, or the very same component definition.
    pub fn same(&self, other: &VNodeType) -> bool {
        match (self, other) {
            (Self::Element(a), Self::Element(b)) => a == b,
            (Self::Text, Self::Text) | (Self::Fragment, Self::Fragment) => true,
            (Self::Component(a), Self::Component(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for VNodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Element(tag) => write!(f, "Element({tag})"),
            Self::Text => f.write_str("Text"),
            Self::Fragment => f.write_str("Fragment"),
            Self::Component(def) => write!(f, "Component({})", def.name()),
        }
    }
}

/// Children of a description: literal text or a list of descriptions.
#[derive(Debug, Clone)]
pub enum Children {
    Text(CompactString),
    Array(Vec<VNodeRef>),
}

impl Children {
    /// Literal text, if any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Array(_) => None,
        }
    }

    /// Child descriptions; empty for literal text.
    pub fn as_slice(&self) -> &[VNodeRef] {
        match self {
            Self::Array(items) => items,
            Self::Text(_) => &[],
        }
    }
}

impl Default for Children {
    fn default() -> Self {
        Self::Array(Vec::new())
    }
}

impl From<&str> for Children {
    fn from(s: &str) -> Self {
        Self::Text(CompactString::from(s))
    }
}

impl From<String> for Children {
    fn from(s: String) -> Self {
        Self::Text(CompactString::from(s))
    }
}

impl From<CompactString> for Children {
    fn from(s: CompactString) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<VNodeRef>> for Children {
    fn from(items: Vec<VNodeRef>) -> Self {
        Self::Array(items)
    }
}

bitflags::bitflags! {
    /// Kind and children shape, precomputed for branching.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShapeFlags: u8 {
        const ELEMENT            = 0b0000_0001;
        const STATEFUL_COMPONENT = 0b0000_0010;
        const TEXT_CHILDREN      = 0b0000_0100;
        const ARRAY_CHILDREN     = 0b0000_1000;
    }
}

impl ShapeFlags {
    fn of(kind: &VNodeType, children: &Children) -> Self {
        let base = match kind {
            VNodeType::Element(_) => Self::ELEMENT,
            VNodeType::Component(_) => Self::STATEFUL_COMPONENT,
            VNodeType::Text | VNodeType::Fragment => Self::empty(),
        };
        let shape = match children {
            Children::Text(_) => Self::TEXT_CHILDREN,
            Children::Array(_) => Self::ARRAY_CHILDREN,
        };
        base | shape
    }
}

// =============================================================================
// Key
// =============================================================================

/// Sibling identity used by the keyed children diff.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Int(i64),
    Str(CompactString),
}

impl Key {
    /// Derive a key from a property value. `Null` means unkeyed.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Number(n) => Some(
                safe_integer(*n).map_or_else(|| Self::Str(value.to_compact_string()), Self::Int),
            ),
            Value::Str(s) => Some(Self::Str(s.clone())),
            other => Some(Self::Str(other.to_compact_string())),
        }
    }
}

impl From<i64> for Key {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Self::Str(CompactString::from(s))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

// =============================================================================
// VNode
// =============================================================================

/// Description of one desired host-tree node.
pub struct VNode {
    kind: VNodeType,
    props: Props,
    children: Children,
    key: Option<Key>,
    shape: ShapeFlags,
    /// Host node bound by the renderer (first host node for components)
    el: Cell<Option<HostId>>,
    /// Live instance, for component descriptions
    component: RefCell<Option<Rc<ComponentInstance>>>,
}

impl VNode {
    /// Build a description. A `key` property becomes the sibling key and is
    /// not forwarded as a host property.
    pub fn new(kind: VNodeType, mut props: Props, children: Children) -> VNodeRef {
        let key = props
            .remove_prop("key")
            .and_then(|value| Key::from_value(&value));
        let shape = ShapeFlags::of(&kind, &children);
        Rc::new(Self {
            kind,
            props,
            children,
            key,
            shape,
            el: Cell::new(None),
            component: RefCell::new(None),
        })
    }

    #[inline]
    pub fn kind(&self) -> &VNodeType {
        &self.kind
    }

    #[inline]
    pub fn props(&self) -> &Props {
        &self.props
    }

    #[inline]
    pub fn children(&self) -> &Children {
        &self.children
    }

    #[inline]
    pub fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    #[inline]
    pub fn shape(&self) -> ShapeFlags {
        self.shape
    }

    /// Tag name, for element descriptions.
    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            VNodeType::Element(tag) => Some(tag),
            _ => None,
        }
    }

    /// Host node this description is bound to, once mounted.
    #[inline]
    pub fn el(&self) -> Option<HostId> {
        self.el.get()
    }

    #[inline]
    pub(crate) fn set_el(&self, el: Option<HostId>) {
        self.el.set(el);
    }

    /// Live component instance, once mounted.
    pub fn component(&self) -> Option<Rc<ComponentInstance>> {
        self.component.borrow().clone()
    }

    pub(crate) fn set_component(&self, instance: Option<Rc<ComponentInstance>>) {
        let _old = self.component.replace(instance);
    }

    /// Same type and same key: the renderer may patch one into the other.
    pub fn is_same(&self, other: &VNode) -> bool {
        self.kind.same(&other.kind) && self.key == other.key
    }

    /// Top-level host nodes owned by this description, in order.
    pub fn host_nodes(&self) -> HostNodes {
        let mut out = HostNodes::new();
        self.collect_host_nodes(&mut out);
        out
    }

    /// First top-level host node, used as an insertion anchor.
    pub fn first_host(&self) -> Option<HostId> {
        match &self.kind {
            VNodeType::Element(_) | VNodeType::Text => self.el.get(),
            VNodeType::Fragment => self.children.as_slice().iter().find_map(|c| c.first_host()),
            VNodeType::Component(_) => self
                .component()
                .and_then(|instance| instance.subtree())
                .and_then(|tree| tree.first_host()),
        }
    }

    fn collect_host_nodes(&self, out: &mut HostNodes) {
        match &self.kind {
            VNodeType::Element(_) | VNodeType::Text => out.extend(self.el.get()),
            VNodeType::Fragment => {
                for child in self.children.as_slice() {
                    child.collect_host_nodes(out);
                }
            }
            VNodeType::Component(_) => {
                if let Some(tree) = self.component().and_then(|instance| instance.subtree()) {
                    tree.collect_host_nodes(out);
                }
            }
        }
    }
}

impl fmt::Debug for VNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VNode")
            .field("kind", &self.kind)
            .field("key", &self.key)
            .field("props", &self.props)
            .field("children", &self.children)
            .field("el", &self.el.get())
            .finish()
    }
}

// =============================================================================
// Constructors
// =============================================================================

/// Element description.
pub fn h(tag: &str, props: Props, children: impl Into<Children>) -> VNodeRef {
    VNode::new(
        VNodeType::Element(CompactString::from(tag)),
        props,
        children.into(),
    )
}

/// Text description.
pub fn text(content: impl Into<CompactString>) -> VNodeRef {
    VNode::new(VNodeType::Text, Props::new(), Children::Text(content.into()))
}

/// Fragment description grouping `children`.
pub fn fragment(children: Vec<VNodeRef>) -> VNodeRef {
    VNode::new(VNodeType::Fragment, Props::new(), Children::Array(children))
}

/// Keyed fragment description.
pub fn keyed_fragment(key: impl Into<Value>, children: Vec<VNodeRef>) -> VNodeRef {
    let props = vec![(CompactString::const_new("key"), key.into())];
    VNode::new(VNodeType::Fragment, props, Children::Array(children))
}

/// Component description with input properties.
pub fn component(def: &Rc<ComponentDef>, props: Props) -> VNodeRef {
    VNode::new(VNodeType::Component(def.clone()), props, Children::default())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_flags() {
        let el = h("div", Props::new(), "hi");
        assert_eq!(el.shape(), ShapeFlags::ELEMENT | ShapeFlags::TEXT_CHILDREN);

        let list = h("ul", Props::new(), vec![h("li", Props::new(), "a")]);
        assert!(list.shape().contains(ShapeFlags::ARRAY_CHILDREN));
        assert!(!list.shape().contains(ShapeFlags::TEXT_CHILDREN));

        let def = ComponentDef::new("Empty").build();
        let comp = component(&def, Props::new());
        assert!(comp.shape().contains(ShapeFlags::STATEFUL_COMPONENT));
    }

    #[test]
    fn test_key_is_extracted_from_props() {
        let node = h("li", props([("key", Value::from(3)), ("class", Value::from("x"))]), "c");
        assert_eq!(node.key(), Some(&Key::Int(3)));
        assert!(!node.props().has_prop("key"));
        assert!(node.props().has_prop("class"));

        let node = h("li", props([("key", "a")]), "c");
        assert_eq!(node.key(), Some(&Key::from("a")));
    }

    #[test]
    fn test_large_numeric_keys_stay_distinct() {
        assert_eq!(Key::from_value(&Value::from(7.0)), Some(Key::Int(7)));
        let big = Key::from_value(&Value::from(1e20));
        let bigger = Key::from_value(&Value::from(1e21));
        assert!(matches!(big, Some(Key::Str(_))));
        assert_ne!(big, bigger);
    }

    #[test]
    fn test_is_same() {
        let a = h("li", props([("key", 1)]), "a");
        let b = h("li", props([("key", 1)]), "b");
        let c = h("li", props([("key", 2)]), "a");
        let d = h("p", props([("key", 1)]), "a");
        assert!(a.is_same(&b));
        assert!(!a.is_same(&c));
        assert!(!a.is_same(&d));
        assert!(text("x").is_same(&text("y")));
        assert!(!text("x").is_same(&fragment(vec![])));
    }

    #[test]
    fn test_component_identity_is_definition_identity() {
        let one = ComponentDef::new("Item").build();
        let other = ComponentDef::new("Item").build();
        assert!(component(&one, Props::new()).is_same(&component(&one, Props::new())));
        assert!(!component(&one, Props::new()).is_same(&component(&other, Props::new())));
    }

    #[test]
    fn test_unmounted_nodes_own_no_host_nodes() {
        let frag = fragment(vec![text("a"), h("b", Props::new(), "c")]);
        assert!(frag.host_nodes().is_empty());
        assert!(frag.first_host().is_none());
    }
}
