//! Reconciliation engine
//!
//! A [`Renderer`] turns tree descriptions into host-tree mutations through an
//! injected [`Host`]. The first render into a container mounts; later renders
//! into the same container patch the previous description into the new one.
//!
//! ```
//! use reactive_vdom::prelude::*;
//!
//! let host = std::rc::Rc::new(MemoryHost::new());
//! let root = host.create_root();
//! let renderer = Renderer::new(host.clone());
//!
//! renderer.render(h("p", Props::new(), "hello"), root);
//! renderer.render(h("p", Props::new(), "world"), root);
//! assert_eq!(host.inner_html(root), "<p>world</p>");
//! assert_eq!(host.stats().created, 1);
//! ```

mod component;
mod host;
mod lis;
mod memory;
mod patch;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::vnode::{Props, VNodeRef, component};

pub use component::{ComponentDef, ComponentInstance, PublicInstance, RenderFn, SetupResult};
pub use host::{Host, HostId};
pub use lis::longest_increasing_subsequence;
pub use memory::{HostOp, HostStats, MemoryHost};

// =============================================================================
// RendererConfig
// =============================================================================

/// Default maximum nesting depth of a single patch.
const DEFAULT_MAX_DEPTH: usize = 512;

/// Configuration for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RendererConfig {
    /// Maximum nesting depth; deeper subtrees are skipped with a warning.
    /// Default: 512
    pub max_depth: usize,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl RendererConfig {
    /// Create config with a custom depth limit.
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Create config for large trees (higher limit).
    pub fn large() -> Self {
        Self { max_depth: 4096 }
    }

    /// Create config for small trees (lower limit, earlier cutoff).
    pub fn small() -> Self {
        Self { max_depth: 64 }
    }
}

// =============================================================================
// Renderer
// =============================================================================

pub(crate) struct RendererInner<H> {
    host: H,
    config: RendererConfig,
    /// Last description rendered into each container
    roots: RefCell<FxHashMap<HostId, VNodeRef>>,
    depth: Cell<usize>,
}

/// Decrements the patch depth on drop.
pub(crate) struct DepthGuard<'a>(&'a Cell<usize>);

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

impl<H> RendererInner<H> {
    /// Enter one patch level, or `None` past the configured depth.
    pub(crate) fn enter(&self) -> Option<DepthGuard<'_>> {
        let depth = self.depth.get() + 1;
        if depth > self.config.max_depth {
            return None;
        }
        self.depth.set(depth);
        Some(DepthGuard(&self.depth))
    }
}

/// Reconciler bound to one host. Cloning shares the renderer.
pub struct Renderer<H: Host + 'static> {
    inner: Rc<RendererInner<H>>,
}

impl<H: Host + 'static> Clone for Renderer<H> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<H: Host + 'static> Renderer<H> {
    /// Create a renderer with default limits.
    pub fn new(host: H) -> Self {
        Self::with_config(host, RendererConfig::default())
    }

    /// Create a renderer with custom limits.
    pub fn with_config(host: H, config: RendererConfig) -> Self {
        Self {
            inner: Rc::new(RendererInner {
                host,
                config,
                roots: RefCell::new(FxHashMap::default()),
                depth: Cell::new(0),
            }),
        }
    }

    /// The host this renderer drives.
    pub fn host(&self) -> &H {
        &self.inner.host
    }

    pub fn config(&self) -> RendererConfig {
        self.inner.config
    }

    /// Render `vnode` into `container`, patching whatever was rendered there
    /// before.
    pub fn render(&self, vnode: VNodeRef, container: HostId) {
        let prev = self.inner.roots.borrow().get(&container).cloned();
        debug!(container = %container, update = prev.is_some(), "render");
        self.inner.patch(prev.as_ref(), &vnode, container, None, None);
        patch::refresh_anchors(std::slice::from_ref(&vnode), None);
        let _old = self.inner.roots.borrow_mut().insert(container, vnode);
    }

    /// Tear down whatever was rendered into `container`.
    pub fn unmount(&self, container: HostId) {
        let prev = self.inner.roots.borrow_mut().remove(&container);
        if let Some(prev) = prev {
            debug!(container = %container, "unmount");
            self.inner.unmount(&prev, true);
        }
    }

    /// Description last rendered into `container`.
    pub fn root(&self, container: HostId) -> Option<VNodeRef> {
        self.inner.roots.borrow().get(&container).cloned()
    }

    /// Reconcile `new` against `old` directly, inserting before `anchor`.
    ///
    /// Lower-level than [`render`](Self::render): nothing is remembered for
    /// the container.
    pub fn patch(
        &self,
        old: Option<&VNodeRef>,
        new: &VNodeRef,
        container: HostId,
        anchor: Option<HostId>,
    ) {
        self.inner.patch(old, new, container, anchor, None);
        patch::refresh_anchors(std::slice::from_ref(new), anchor);
    }

    /// Application rooted at a component definition.
    pub fn create_app(&self, root: &Rc<ComponentDef>) -> App<H> {
        App {
            renderer: self.clone(),
            root: root.clone(),
            props: Props::new(),
        }
    }
}

// =============================================================================
// App
// =============================================================================

/// A root component plus the renderer that mounts it.
pub struct App<H: Host + 'static> {
    renderer: Renderer<H>,
    root: Rc<ComponentDef>,
    props: Props,
}

impl<H: Host + 'static> App<H> {
    /// Root props passed to the component.
    pub fn with_props(mut self, props: Props) -> Self {
        self.props = props;
        self
    }

    /// Mount the root component into `container`.
    pub fn mount(&self, container: HostId) -> VNodeRef {
        let vnode = component(&self.root, self.props.clone());
        self.renderer.render(vnode.clone(), container);
        vnode
    }

    /// Unmount from `container`.
    pub fn unmount(&self, container: HostId) {
        self.renderer.unmount(container);
    }
}

// =============================================================================
// Tests
// =============================================================================
