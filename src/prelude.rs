//! Prelude module for common imports.
//!
//! ```
//! use reactive_vdom::prelude::*;
//! ```

// Values
pub use crate::object::{Object, ObjectId, Properties};
pub use crate::value::Value;

// Reactivity
pub use crate::reactivity::{
    Computed, Effect, EffectOptions, ProxyMode, ProxyRefs, Reactive, Ref, SchedulerConfig,
    batch, computed, configure_scheduler, effect, effect_with, is_proxy, is_reactive,
    is_readonly, is_ref, new_ref, proxy_refs, queue_job, reactive, readonly, shallow_readonly,
    stop, to_raw, unref, untracked,
};

// Tree descriptions
pub use crate::vnode::{
    Children, Key, Props, PropsExt, ShapeFlags, VNode, VNodeRef, VNodeType, component, fragment,
    h, keyed_fragment, props, props_shallow_equal, text,
};

// Renderer
pub use crate::renderer::{
    App, ComponentDef, Host, HostId, HostOp, HostStats, MemoryHost, PublicInstance, RenderFn,
    Renderer, RendererConfig, SetupResult,
};

// Error
pub use crate::error::{ReactiveError, ReactiveResult};
