//! Lazily cached derived values.
//!
//! A [`Computed`] runs its derivation inside an internal effect whose
//! scheduler only marks the cache dirty and notifies the computed's own
//! readers; recomputation waits until the next [`Computed::get`].

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::warn;

use crate::error::{ReactiveError, ReactiveResult};

use super::dep::DepId;
use super::effect::{Effect, EffectOptions, effect_with, track_dep, trigger_dep};
use super::runtime;

struct ComputedInner<T> {
    getter: Box<dyn Fn() -> T>,
    value: RefCell<Option<T>>,
    dirty: Cell<bool>,
    effect: RefCell<Option<Effect>>,
    /// Readers of this computed's value
    dep: DepId,
}

impl<T> Drop for ComputedInner<T> {
    fn drop(&mut self) {
        if let Some(effect) = self.effect.get_mut().take() {
            effect.stop();
        }
        runtime::release_dep(self.dep);
    }
}

/// Cached, lazily recomputed derived value. Cloning shares the cache.
pub struct Computed<T: 'static>(Rc<ComputedInner<T>>);

/// Create a derived value from `getter`. Nothing runs until the first read.
pub fn computed<T: Clone + 'static>(getter: impl Fn() -> T + 'static) -> Computed<T> {
    Computed::new(getter)
}

impl<T: Clone + 'static> Computed<T> {
    /// Create a derived value from `getter`.
    pub fn new(getter: impl Fn() -> T + 'static) -> Self {
        Self(Rc::new(ComputedInner {
            getter: Box::new(getter),
            value: RefCell::new(None),
            dirty: Cell::new(true),
            effect: RefCell::new(None),
            dep: runtime::alloc_dep(),
        }))
    }

    /// Read the value, recomputing first if a dependency changed since the
    /// last read.
    pub fn get(&self) -> T {
        track_dep(self.0.dep);

        let effect = self.0.effect.borrow().clone();
        let Some(effect) = effect else {
            // First read builds the internal effect, which computes once.
            self.0.dirty.set(false);
            let effect = effect_with(recompute_fn(&self.0), notifier(&self.0));
            *self.0.effect.borrow_mut() = Some(effect);
            return self.cached();
        };

        if self.0.dirty.replace(false) {
            effect.run();
            trigger_dep(self.0.dep);
        }
        self.cached()
    }

    /// Whether the next read will recompute.
    pub fn is_dirty(&self) -> bool {
        self.0.dirty.get()
    }

    /// Writes to a computed are suppressed; see [`Computed::try_set`].
    pub fn set(&self, value: T) {
        if let Err(err) = self.try_set(value) {
            warn!(error = %err, "write suppressed");
        }
    }

    /// Always fails with [`ReactiveError::ComputedWrite`].
    pub fn try_set(&self, _value: T) -> ReactiveResult<()> {
        Err(ReactiveError::ComputedWrite)
    }

    /// Number of computations reading this value.
    pub fn subscriber_count(&self) -> usize {
        runtime::subscriber_count(self.0.dep)
    }

    fn cached(&self) -> T {
        let cached = self.0.value.borrow().clone();
        match cached {
            Some(v) => v,
            // The internal effect was stopped; fall back to a direct call.
            None => (self.0.getter)(),
        }
    }
}

/// Body of the internal effect: recompute and cache.
fn recompute_fn<T: 'static>(inner: &Rc<ComputedInner<T>>) -> impl Fn() + 'static {
    let weak: Weak<ComputedInner<T>> = Rc::downgrade(inner);
    move || {
        if let Some(inner) = weak.upgrade() {
            let value = (inner.getter)();
            let _old = inner.value.replace(Some(value));
        }
    }
}

/// Scheduler of the internal effect: mark dirty, notify readers.
fn notifier<T: 'static>(inner: &Rc<ComputedInner<T>>) -> EffectOptions {
    let weak: Weak<ComputedInner<T>> = Rc::downgrade(inner);
    EffectOptions::new().scheduler(move || {
        if let Some(inner) = weak.upgrade() {
            inner.dirty.set(true);
            trigger_dep(inner.dep);
        }
    })
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T: fmt::Debug> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("value", &*self.0.value.borrow())
            .field("dirty", &self.0.dirty.get())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
