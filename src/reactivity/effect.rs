//! Tracked computations.
//!
//! An [`Effect`] wraps a function and re-runs it whenever data it read during
//! its last run changes. While running it occupies the runtime's single
//! "current computation" slot, so every `track` call made by the function is
//! attributed to it.
//!
//! # Lifecycle
//!
//! ```text
//! effect(f)  ──run──▶  active  ──stop()──▶  stopped
//!                       ▲  │                  │
//!                       └──┘ trigger/run      └─ run() still calls f, untracked
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;
use tracing::trace;

use crate::object::ObjectId;

use super::dep::{DepId, Subscribers};
use super::runtime::{self, with_runtime};

type Callback = Rc<dyn Fn()>;

// =============================================================================
// EffectOptions
// =============================================================================

/// Construction options for [`effect_with`].
#[derive(Default)]
pub struct EffectOptions {
    scheduler: Option<Callback>,
    on_stop: Option<Box<dyn FnOnce()>>,
}

impl EffectOptions {
    /// Empty options: run eagerly on notification, no teardown.
    pub fn new() -> Self {
        Self::default()
    }

    /// Custom notifier invoked instead of re-running the effect.
    pub fn scheduler(mut self, f: impl Fn() + 'static) -> Self {
        self.scheduler = Some(Rc::new(f));
        self
    }

    /// Teardown hook invoked once by [`Effect::stop`].
    pub fn on_stop(mut self, f: impl FnOnce() + 'static) -> Self {
        self.on_stop = Some(Box::new(f));
        self
    }
}

// =============================================================================
// Effect
// =============================================================================

struct EffectInner {
    func: Callback,
    scheduler: Option<Callback>,
    on_stop: RefCell<Option<Box<dyn FnOnce()>>>,
    active: Cell<bool>,
    /// Reverse index: every dependency set this effect joined
    deps: RefCell<SmallVec<[DepId; 4]>>,
}

/// Handle to a tracked computation. Cloning shares the computation.
#[derive(Clone)]
pub struct Effect(Rc<EffectInner>);

/// Create a tracked computation and run it once.
pub fn effect(f: impl Fn() + 'static) -> Effect {
    effect_with(f, EffectOptions::new())
}

/// Create a tracked computation with options and run it once.
pub fn effect_with(f: impl Fn() + 'static, options: EffectOptions) -> Effect {
    let effect = Effect(Rc::new(EffectInner {
        func: Rc::new(f),
        scheduler: options.scheduler,
        on_stop: RefCell::new(options.on_stop),
        active: Cell::new(true),
        deps: RefCell::new(SmallVec::new()),
    }));
    effect.run();
    effect
}

/// Stop a computation. Equivalent to [`Effect::stop`].
pub fn stop(effect: &Effect) {
    effect.stop();
}

impl Effect {
    /// Run the computation.
    ///
    /// An active effect drops its previous subscriptions, installs itself as
    /// the current computation for the duration of the call, and restores
    /// whatever was current before. A stopped effect just calls its function.
    pub fn run(&self) {
        self.scoped(|| (self.0.func)());
    }

    /// Run `f` attributed to this effect, returning its result.
    pub(crate) fn scoped<R>(&self, f: impl FnOnce() -> R) -> R {
        if !self.is_active() {
            return f();
        }
        self.cleanup();
        let _guard = ActiveGuard::install(self.clone());
        f()
    }

    /// Permanently deactivate the computation. Idempotent.
    pub fn stop(&self) {
        if !self.0.active.replace(false) {
            return;
        }
        self.cleanup();
        trace!(deps_cleared = true, "effect stopped");
        let hook = self.0.on_stop.borrow_mut().take();
        if let Some(hook) = hook {
            hook();
        }
    }

    /// Whether the computation still participates in tracking.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.0.active.get()
    }

    /// Whether both handles refer to the same computation.
    #[inline]
    pub fn ptr_eq(&self, other: &Effect) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Number of dependency sets this computation currently belongs to.
    pub fn dep_count(&self) -> usize {
        self.0.deps.borrow().len()
    }

    /// Deliver a change notification: the scheduler if one was given,
    /// otherwise a direct re-run.
    fn notify(&self) {
        match &self.0.scheduler {
            Some(scheduler) => scheduler(),
            None => self.run(),
        }
    }

    /// Leave every dependency set this effect joined.
    fn cleanup(&self) {
        let deps: SmallVec<[DepId; 4]> = std::mem::take(&mut *self.0.deps.borrow_mut());
        // Runtime may already be gone when a computed drops during teardown.
        let removed: Option<Vec<Effect>> = runtime::try_with_runtime(|rt| {
            let mut arena = rt.deps.borrow_mut();
            deps.iter().filter_map(|dep| arena.unsubscribe(*dep, self)).collect()
        });
        drop(removed);
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("active", &self.is_active())
            .field("deps", &self.dep_count())
            .field("scheduled", &self.0.scheduler.is_some())
            .finish()
    }
}

/// Restores the previous current computation on drop.
struct ActiveGuard {
    prev: Option<Effect>,
}

impl ActiveGuard {
    fn install(effect: Effect) -> Self {
        Self { prev: runtime::set_active(Some(effect)) }
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        let finished = runtime::set_active(self.prev.take());
        drop(finished);
    }
}

// =============================================================================
// TRACK / TRIGGER
// =============================================================================

/// Record that the current computation read `key` of `target`.
///
/// No-op outside a tracked computation.
pub fn track(target: ObjectId, key: &str) {
    if !runtime::is_tracking() {
        return;
    }
    track_dep(runtime::target_dep(target, key));
}

/// Subscribe the current computation to a dependency set.
pub(crate) fn track_dep(dep: DepId) {
    let Some(active) = runtime::active() else {
        return;
    };
    let added = with_runtime(|rt| rt.deps.borrow_mut().subscribe(dep, &active));
    if added {
        active.0.deps.borrow_mut().push(dep);
    }
}

/// Notify every computation that read `key` of `target`.
///
/// A key that was never tracked has no dependency set; that is a no-op.
pub fn trigger(target: ObjectId, key: &str) {
    if let Some(dep) = runtime::lookup_dep(target, key) {
        trigger_dep(dep);
    }
}

/// Notify every subscriber of a dependency set, in registration order.
///
/// The computation that is currently running is skipped, so an effect that
/// writes state it also reads does not re-enter itself.
pub(crate) fn trigger_dep(dep: DepId) {
    let subs: Subscribers = runtime::subscribers(dep);
    let current = runtime::active();
    for effect in subs {
        if current.as_ref().is_some_and(|c| c.ptr_eq(&effect)) {
            continue;
        }
        effect.notify();
    }
}

/// Run `f` without attributing its reads to the current computation.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    let prev = runtime::set_active(None);
    let out = f();
    runtime::set_active(prev);
    out
}

// =============================================================================
// Tests
// =============================================================================
