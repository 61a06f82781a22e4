//! Fine-grained reactive dependency tracking.
//!
//! - `runtime`: thread-local current computation, registry and memo tables
//! - `dep`: generational arena of dependency sets
//! - `effect`: tracked computations, `track` / `trigger`
//! - `proxy`: mutable, read-only and shallow-read-only object views
//! - `reference`: single-value cells and the ref-unwrapping view
//! - `computed`: lazily cached derived values
//! - `scheduler`: de-duplicating job queue used by custom notifiers

pub(crate) mod runtime;

mod computed;
mod dep;
mod effect;
mod proxy;
mod reference;
mod scheduler;

pub use computed::{Computed, computed};
pub use dep::DepId;
pub use effect::{Effect, EffectOptions, effect, effect_with, stop, track, trigger, untracked};
pub use proxy::{
    ProxyMode, Reactive, ReactiveFlag, is_proxy, is_reactive, is_readonly, reactive, readonly,
    shallow_readonly, to_raw,
};
pub use reference::{ProxyRefs, Ref, is_ref, new_ref, proxy_refs, unref};
pub use runtime::is_tracking;
pub use scheduler::{
    Job, SchedulerConfig, batch, configure_scheduler, flush_jobs, has_pending_jobs, queue_job,
    scheduler_config,
};
