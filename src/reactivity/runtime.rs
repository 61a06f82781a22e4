//! Thread-local reactive runtime.
//!
//! Holds all process-wide reactive state for the current thread: the single
//! "current computation" slot, the subscriber registry, the dependency-set
//! arena, the proxy memo and the job queue. Everything here is only touched
//! from the owning thread; handles are `!Send`.
//!
//! Borrow discipline: no `RefCell` in here is ever held across a call into
//! user code, and values that may run destructors (effects, proxies) are
//! always dropped after the borrow that produced them is released.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Weak;

use compact_str::CompactString;
use rustc_hash::FxHashMap;

use crate::object::ObjectId;

use super::dep::{DepArena, DepId, Subscribers};
use super::effect::Effect;
use super::proxy::{ProxyInner, ProxyMode};
use super::scheduler::{Job, SchedulerConfig};

/// Per-key dependency sets of one observed object.
type KeyMap = FxHashMap<CompactString, DepId>;

/// All global reactive state for one thread.
pub(crate) struct Runtime {
    /// Currently running tracked computation
    pub active: RefCell<Option<Effect>>,
    /// Subscriber registry: object -> key -> dependency set
    pub targets: RefCell<FxHashMap<ObjectId, KeyMap>>,
    /// Dependency-set storage
    pub deps: RefCell<DepArena>,
    /// Memoized proxies, one map per mode
    pub proxies: RefCell<[FxHashMap<ObjectId, Weak<ProxyInner>>; 3]>,
    /// Pending scheduler jobs
    pub queue: RefCell<VecDeque<Job>>,
    /// Whether the job queue is being flushed
    pub flushing: Cell<bool>,
    /// Open `batch` scopes
    pub batch_depth: Cell<u32>,
    /// Scheduler limits
    pub scheduler: Cell<SchedulerConfig>,
}

impl Runtime {
    fn new() -> Self {
        Self {
            active: RefCell::new(None),
            targets: RefCell::new(FxHashMap::default()),
            deps: RefCell::new(DepArena::default()),
            proxies: RefCell::new(Default::default()),
            queue: RefCell::new(VecDeque::new()),
            flushing: Cell::new(false),
            batch_depth: Cell::new(0),
            scheduler: Cell::new(SchedulerConfig::default()),
        }
    }
}

thread_local! {
    static RUNTIME: Runtime = Runtime::new();
}

/// Run `f` with the thread's runtime.
#[inline]
pub(crate) fn with_runtime<R>(f: impl FnOnce(&Runtime) -> R) -> R {
    RUNTIME.with(f)
}

/// Like [`with_runtime`], but `None` once the thread's runtime is torn down.
#[inline]
pub(crate) fn try_with_runtime<R>(f: impl FnOnce(&Runtime) -> R) -> Option<R> {
    RUNTIME.try_with(f).ok()
}

// =============================================================================
// CURRENT COMPUTATION
// =============================================================================

/// Install `effect` as the current computation, returning the previous one.
pub(crate) fn set_active(effect: Option<Effect>) -> Option<Effect> {
    with_runtime(|rt| rt.active.replace(effect))
}

/// The current computation, if any.
pub(crate) fn active() -> Option<Effect> {
    with_runtime(|rt| rt.active.borrow().clone())
}

/// Whether a computation is currently running.
pub fn is_tracking() -> bool {
    with_runtime(|rt| rt.active.borrow().is_some())
}

// =============================================================================
// DEPENDENCY SETS
// =============================================================================

/// Allocate a private dependency set (refs, computeds).
pub(crate) fn alloc_dep() -> DepId {
    with_runtime(|rt| rt.deps.borrow_mut().alloc())
}

/// Release a private dependency set.
pub(crate) fn release_dep(dep: DepId) {
    // Runtime may already be gone during thread teardown.
    let released: Option<Subscribers> = try_with_runtime(|rt| rt.deps.borrow_mut().release(dep));
    drop(released);
}

/// Dependency set for `(target, key)`, created on first use.
pub(crate) fn target_dep(target: ObjectId, key: &str) -> DepId {
    with_runtime(|rt| {
        let mut targets = rt.targets.borrow_mut();
        let keys = targets.entry(target).or_default();
        if let Some(dep) = keys.get(key) {
            return *dep;
        }
        let dep = rt.deps.borrow_mut().alloc();
        keys.insert(CompactString::from(key), dep);
        dep
    })
}

/// Existing dependency set for `(target, key)`, if it was ever tracked.
pub(crate) fn lookup_dep(target: ObjectId, key: &str) -> Option<DepId> {
    with_runtime(|rt| rt.targets.borrow().get(&target).and_then(|keys| keys.get(key).copied()))
}

/// Copy of a set's subscribers.
pub(crate) fn subscribers(dep: DepId) -> Subscribers {
    with_runtime(|rt| rt.deps.borrow().snapshot(dep))
}

/// Number of subscribers of a set.
pub(crate) fn subscriber_count(dep: DepId) -> usize {
    with_runtime(|rt| rt.deps.borrow().len(dep))
}

/// Drop registry and memo entries of an object that no longer exists.
pub(crate) fn forget_target(target: ObjectId) {
    try_with_runtime(|rt| {
        let Ok(mut targets) = rt.targets.try_borrow_mut() else {
            return;
        };
        let keys = targets.remove(&target);
        drop(targets);

        let mut released: Vec<Subscribers> = Vec::new();
        if let Some(keys) = keys {
            if let Ok(mut deps) = rt.deps.try_borrow_mut() {
                released.extend(keys.into_values().map(|dep| deps.release(dep)));
            }
        }

        let stale: Vec<Weak<ProxyInner>> = match rt.proxies.try_borrow_mut() {
            Ok(mut memo) => ProxyMode::ALL
                .iter()
                .filter_map(|mode| memo[mode.slot()].remove(&target))
                .collect(),
            Err(_) => Vec::new(),
        };
        drop(stale);
        drop(released);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Object, Properties};

    #[test]
    fn test_target_dep_is_created_once() {
        let obj = Object::new();
        assert!(lookup_dep(obj.id(), "a").is_none());

        let first = target_dep(obj.id(), "a");
        let second = target_dep(obj.id(), "a");
        assert_eq!(first, second);
        assert_eq!(lookup_dep(obj.id(), "a"), Some(first));
        assert_ne!(target_dep(obj.id(), "b"), first);
    }

    #[test]
    fn test_dropped_object_is_forgotten() {
        let obj = Object::new();
        obj.set("a", 1);
        let id = obj.id();
        target_dep(id, "a");
        drop(obj);
        assert!(lookup_dep(id, "a").is_none());
    }

    #[test]
    fn test_no_tracking_outside_effects() {
        assert!(!is_tracking());
        assert!(active().is_none());
    }
}
