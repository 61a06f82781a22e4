//! Host-tree capability set
//!
//! The renderer never touches a concrete tree. Every mutation goes through a
//! [`Host`] supplied at construction, and host nodes are only ever seen as the
//! opaque [`HostId`] handles the host hands back.

use std::fmt;

use crate::vnode::Props;

/// Opaque handle to a node owned by a [`Host`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostId(u64);

impl HostId {
    /// Wrap a raw handle minted by a host.
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw value
    #[inline]
    pub const fn as_raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostId({})", self.0)
    }
}

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Operations the renderer needs from a host tree.
pub trait Host {
    /// Create a detached element node.
    fn create_element(&self, tag: &str) -> HostId;

    /// Create a detached text node.
    fn create_text(&self, content: &str) -> HostId;

    /// Detach `node` from its parent.
    fn remove(&self, node: HostId);

    /// Insert `node` into `container` before `anchor`, or last when `None`.
    /// Inserting a node that already has a parent moves it.
    fn insert(&self, node: HostId, container: HostId, anchor: Option<HostId>);

    /// Set the content of a text node.
    fn set_text(&self, node: HostId, content: &str);

    /// Replace all children of an element with literal text.
    fn set_element_text(&self, node: HostId, content: &str);

    /// Apply the difference between `old` and `new` properties, removing
    /// keys absent from `new`.
    fn patch_props(&self, node: HostId, old: &Props, new: &Props);
}

impl<H: Host + ?Sized> Host for std::rc::Rc<H> {
    fn create_element(&self, tag: &str) -> HostId {
        (**self).create_element(tag)
    }

    fn create_text(&self, content: &str) -> HostId {
        (**self).create_text(content)
    }

    fn remove(&self, node: HostId) {
        (**self).remove(node)
    }

    fn insert(&self, node: HostId, container: HostId, anchor: Option<HostId>) {
        (**self).insert(node, container, anchor)
    }

    fn set_text(&self, node: HostId, content: &str) {
        (**self).set_text(node, content)
    }

    fn set_element_text(&self, node: HostId, content: &str) {
        (**self).set_element_text(node, content)
    }

    fn patch_props(&self, node: HostId, old: &Props, new: &Props) {
        (**self).patch_props(node, old, new)
    }
}
