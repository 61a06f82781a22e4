//! reactive-vdom - Fine-grained reactivity driving a keyed virtual-tree reconciler
//!
//! ## Core Concepts
//!
//! **Dependency tracking**: a tracked computation ([`Effect`]) records every
//! `(object, key)` it reads while running and re-runs when any of them is
//! written. Proxies, refs and computed values are views over that one
//! mechanism.
//!
//! **Reconciliation**: a [`Renderer`] diffs tree descriptions ([`VNode`]) and
//! applies the minimal set of mutations to an injected [`Host`]. Keyed
//! children are reordered with the fewest host moves (LIS).
//!
//! Components connect the two: each one renders inside its own effect, so a
//! write to state it read queues exactly that component for re-render.
//!
//! ## Modules
//! - `value` / `object`: dynamic values and plain observable objects
//! - `reactivity`: effects, proxies, refs, computed values, job scheduler
//! - `vnode`: tree descriptions, props, keys
//! - `renderer`: patch state machine, components, host trait, in-memory host
//! - `error`: error types
//!
//! ## Usage
//!
//! ```
//! use std::rc::Rc;
//! use reactive_vdom::prelude::*;
//!
//! let host = Rc::new(MemoryHost::new());
//! let root = host.create_root();
//! let renderer = Renderer::new(host.clone());
//!
//! let count = new_ref(0);
//! let state = count.clone();
//! let counter = ComponentDef::new("Counter")
//!     .render(move |_| h("b", Props::new(), state.get().to_string()))
//!     .build();
//!
//! renderer.render(component(&counter, Props::new()), root);
//! assert_eq!(host.inner_html(root), "<b>0</b>");
//!
//! count.set(1);
//! assert_eq!(host.inner_html(root), "<b>1</b>");
//! ```

#[macro_use]
mod macros;

// =============================================================================
// Core modules
// =============================================================================

/// Error types
pub mod error;

/// Plain observable objects
pub mod object;

/// Dynamic values
pub mod value;

/// Reactive core: effects, proxies, refs, computed, scheduler
pub mod reactivity;

/// Tree descriptions
pub mod vnode;

/// Reconciliation engine and hosts
pub mod renderer;

/// Prelude for common imports
pub mod prelude;

// =============================================================================
// Re-exports
// =============================================================================

// Values
pub use object::{Object, ObjectId, Properties};
pub use value::Value;

// Reactivity
pub use reactivity::{
    Computed, Effect, EffectOptions, ProxyMode, ProxyRefs, Reactive, Ref, SchedulerConfig,
    computed, effect, effect_with, reactive, readonly, shallow_readonly, stop,
};

// Tree descriptions
pub use vnode::{Children, Key, Props, PropsExt, ShapeFlags, VNode, VNodeRef, VNodeType};

// Renderer
pub use renderer::{
    App, ComponentDef, Host, HostId, MemoryHost, PublicInstance, Renderer, RendererConfig,
    SetupResult,
};

// Error types
pub use error::{ReactiveError, ReactiveResult};
