//! Component definitions and live instances
//!
//! A [`ComponentDef`] is a recipe: an optional setup function run once per
//! instance and an optional render function. A [`ComponentInstance`] is the
//! mounted state the renderer keeps alongside a component description: its
//! input properties, the setup state, the last rendered tree and the render
//! effect that re-renders it.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use compact_str::CompactString;
use tracing::warn;

use crate::error::ReactiveError;
use crate::object::{Object, Properties};
use crate::reactivity::{Effect, ProxyRefs, Reactive, proxy_refs, shallow_readonly, untracked};
use crate::value::Value;
use crate::vnode::{VNode, VNodeRef, fragment};

use super::host::HostId;

/// Render function: builds the component's tree from its public instance.
pub type RenderFn = Rc<dyn Fn(&PublicInstance) -> VNodeRef>;

type SetupFn = Rc<dyn Fn(&Reactive) -> SetupResult>;

// =============================================================================
// Definition
// =============================================================================

/// What a setup function hands back.
pub enum SetupResult {
    /// No state; the definition's render function is used
    None,
    /// State exposed to render through a ref-unwrapping view
    State(Object),
    /// Render function taking precedence over the definition's
    Render(RenderFn),
}

impl SetupResult {
    /// Wrap a render closure.
    pub fn render(f: impl Fn(&PublicInstance) -> VNodeRef + 'static) -> Self {
        Self::Render(Rc::new(f))
    }
}

impl From<Object> for SetupResult {
    fn from(state: Object) -> Self {
        Self::State(state)
    }
}

/// Component recipe. Descriptions refer to it by `Rc` identity.
///
/// # Example
///
/// ```
/// use reactive_vdom::prelude::*;
///
/// let counter = ComponentDef::new("Counter")
///     .setup(|_props| {
///         let state = Object::new();
///         state.set("count", new_ref(0));
///         state.into()
///     })
///     .render(|this| h("span", Props::new(), this.get("count").to_string()))
///     .build();
/// assert_eq!(counter.name(), "Counter");
/// ```
pub struct ComponentDef {
    name: CompactString,
    setup: Option<SetupFn>,
    render: Option<RenderFn>,
}

impl ComponentDef {
    pub fn new(name: impl Into<CompactString>) -> Self {
        Self {
            name: name.into(),
            setup: None,
            render: None,
        }
    }

    /// Setup function, called once per instance with a read-only props view.
    pub fn setup(mut self, f: impl Fn(&Reactive) -> SetupResult + 'static) -> Self {
        self.setup = Some(Rc::new(f));
        self
    }

    /// Render function used when setup does not return one.
    pub fn render(mut self, f: impl Fn(&PublicInstance) -> VNodeRef + 'static) -> Self {
        self.render = Some(Rc::new(f));
        self
    }

    /// Finish the definition.
    pub fn build(self) -> Rc<Self> {
        Rc::new(self)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for ComponentDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDef")
            .field("name", &self.name)
            .field("setup", &self.setup.is_some())
            .field("render", &self.render.is_some())
            .finish()
    }
}

// =============================================================================
// Instance
// =============================================================================

/// Mounted component state.
pub struct ComponentInstance {
    def: Rc<ComponentDef>,
    /// Description currently bound to this instance
    vnode: RefCell<Weak<VNode>>,
    /// Description staged by a parent update, consumed by the next render
    next: RefCell<Option<VNodeRef>>,
    props: Object,
    props_view: Reactive,
    state: Option<ProxyRefs>,
    render: Option<RenderFn>,
    subtree: RefCell<Option<VNodeRef>>,
    effect: RefCell<Option<Effect>>,
    parent: Option<Weak<ComponentInstance>>,
    container: HostId,
    anchor: Cell<Option<HostId>>,
}

impl ComponentInstance {
    /// Create the instance for `vnode` and run its setup.
    pub(crate) fn new(
        def: Rc<ComponentDef>,
        vnode: &VNodeRef,
        parent: Option<&Rc<ComponentInstance>>,
        container: HostId,
        anchor: Option<HostId>,
    ) -> Rc<Self> {
        let props: Object = vnode.props().iter().cloned().collect();
        let props_view = shallow_readonly(&props);

        // Setup reads belong to nobody.
        let result = match &def.setup {
            Some(setup) => untracked(|| setup(&props_view)),
            None => SetupResult::None,
        };
        let (state, render) = match result {
            SetupResult::None => (None, def.render.clone()),
            SetupResult::State(obj) => (Some(proxy_refs(obj)), def.render.clone()),
            SetupResult::Render(f) => (None, Some(f)),
        };

        Rc::new(Self {
            def,
            vnode: RefCell::new(Rc::downgrade(vnode)),
            next: RefCell::new(None),
            props,
            props_view,
            state,
            render,
            subtree: RefCell::new(None),
            effect: RefCell::new(None),
            parent: parent.map(Rc::downgrade),
            container,
            anchor: Cell::new(anchor),
        })
    }

    #[inline]
    pub fn name(&self) -> &str {
        self.def.name()
    }

    /// Read-only view of the current input properties.
    #[inline]
    pub fn props(&self) -> &Reactive {
        &self.props_view
    }

    /// Last rendered tree.
    pub fn subtree(&self) -> Option<VNodeRef> {
        self.subtree.borrow().clone()
    }

    /// Description currently bound to this instance.
    pub fn vnode(&self) -> Option<VNodeRef> {
        self.vnode.borrow().upgrade()
    }

    /// Whether the render effect is still live.
    pub fn is_active(&self) -> bool {
        self.effect.borrow().as_ref().is_some_and(Effect::is_active)
    }

    pub(crate) fn container(&self) -> HostId {
        self.container
    }

    pub(crate) fn anchor(&self) -> Option<HostId> {
        self.anchor.get()
    }

    pub(crate) fn set_anchor(&self, anchor: Option<HostId>) {
        self.anchor.set(anchor);
    }

    pub(crate) fn set_effect(&self, effect: Effect) {
        let _old = self.effect.replace(Some(effect));
    }

    pub(crate) fn set_vnode(&self, vnode: &VNodeRef) {
        *self.vnode.borrow_mut() = Rc::downgrade(vnode);
    }

    pub(crate) fn set_next(&self, vnode: VNodeRef) {
        let _old = self.next.replace(Some(vnode));
    }

    /// Adopt a staged description, if any: rebind and refresh props.
    pub(crate) fn accept_next(&self) {
        let Some(next) = self.next.borrow_mut().take() else {
            return;
        };
        self.props.replace_all(next.props().iter().cloned());
        self.set_vnode(&next);
    }

    pub(crate) fn replace_subtree(&self, tree: Option<VNodeRef>) -> Option<VNodeRef> {
        self.subtree.replace(tree)
    }

    /// Re-run the render effect, unless the instance was unmounted.
    pub(crate) fn update(&self) {
        let effect = self.effect.borrow().clone();
        if let Some(effect) = effect.filter(Effect::is_active) {
            effect.run();
        }
    }

    /// Stop the render effect and release staged state.
    pub(crate) fn stop(&self) {
        let effect = self.effect.borrow().clone();
        if let Some(effect) = effect {
            effect.stop();
        }
        let _next = self.next.borrow_mut().take();
    }

    /// Call the render function. A component without one renders nothing.
    pub(crate) fn render_tree(self: &Rc<Self>) -> VNodeRef {
        match &self.render {
            Some(render) => render(&PublicInstance(self.clone())),
            None => {
                let err = ReactiveError::MissingRender {
                    component: self.def.name.clone(),
                };
                warn!(error = %err, "rendering empty tree");
                fragment(Vec::new())
            }
        }
    }
}

impl fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInstance")
            .field("name", &self.name())
            .field("active", &self.is_active())
            .field("container", &self.container)
            .finish()
    }
}

// =============================================================================
// Public instance
// =============================================================================

/// What render functions see: setup state first, then props.
#[derive(Clone)]
pub struct PublicInstance(Rc<ComponentInstance>);

impl PublicInstance {
    /// Read-only props view.
    pub fn props(&self) -> &Reactive {
        self.0.props()
    }

    /// First host node of the last rendered tree.
    pub fn el(&self) -> Option<HostId> {
        self.0.vnode().and_then(|v| v.el())
    }

    /// Enclosing component, if any.
    pub fn parent(&self) -> Option<PublicInstance> {
        self.0
            .parent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(PublicInstance)
    }

    #[inline]
    pub fn name(&self) -> &str {
        self.0.name()
    }

    fn state_has(&self, key: &str) -> bool {
        self.0.state.as_ref().is_some_and(|s| s.target().has(key))
    }
}

impl Properties for PublicInstance {
    fn get(&self, key: &str) -> Value {
        match &self.0.state {
            Some(state) if state.target().has(key) => state.get(key),
            _ => self.0.props_view.get(key),
        }
    }

    fn set(&self, key: &str, value: impl Into<Value>) -> bool {
        if let Some(state) = self.0.state.as_ref().filter(|_| self.state_has(key)) {
            return state.set(key, value);
        }
        if self.0.props.has(key) {
            // Props are owned by the parent.
            return self.0.props_view.set(key, value);
        }
        false
    }
}

impl fmt::Debug for PublicInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PublicInstance").field(&self.0.name()).finish()
    }
}


// =============================================================================
// Tests
// =============================================================================
