//! Dependency-set arena.
//!
//! Every dependency set (one per tracked `(object, key)` pair, plus one per
//! ref and computed) lives in a generational slab. Effects keep the ids of
//! the sets they joined instead of pointers to them, so removal on stop is
//! O(back-references) and there are no reference cycles between sets and
//! effects beyond the subscription itself.

use smallvec::SmallVec;

use super::effect::Effect;

/// Subscribers of one dependency set, in registration order.
pub(crate) type Subscribers = SmallVec<[Effect; 4]>;

/// Handle to a dependency set in the arena.
///
/// A released slot bumps its generation, so stale handles held in an
/// effect's reverse index never alias a recycled set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepId {
    index: u32,
    generation: u32,
}

struct Slot {
    generation: u32,
    subscribers: Option<Subscribers>,
}

/// Generational slab of dependency sets.
#[derive(Default)]
pub(crate) struct DepArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl DepArena {
    /// Allocate an empty dependency set.
    pub fn alloc(&mut self) -> DepId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.subscribers = Some(SmallVec::new());
            return DepId { index, generation: slot.generation };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot { generation: 0, subscribers: Some(SmallVec::new()) });
        DepId { index, generation: 0 }
    }

    /// Release a set, returning its subscribers so the caller can drop them
    /// outside of any runtime borrow.
    pub fn release(&mut self, id: DepId) -> Subscribers {
        let Some(slot) = self.slot_mut(id) else {
            return SmallVec::new();
        };
        let subs = slot.subscribers.take().unwrap_or_default();
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        subs
    }

    /// Add `effect` to the set. Returns `true` if it was not already a member.
    pub fn subscribe(&mut self, id: DepId, effect: &Effect) -> bool {
        let Some(subs) = self.subscribers_mut(id) else {
            return false;
        };
        if subs.iter().any(|e| e.ptr_eq(effect)) {
            return false;
        }
        subs.push(effect.clone());
        true
    }

    /// Remove `effect` from the set, handing back the removed handle.
    pub fn unsubscribe(&mut self, id: DepId, effect: &Effect) -> Option<Effect> {
        let subs = self.subscribers_mut(id)?;
        let pos = subs.iter().position(|e| e.ptr_eq(effect))?;
        Some(subs.remove(pos))
    }

    /// Copy of the current subscribers, for notification outside the borrow.
    pub fn snapshot(&self, id: DepId) -> Subscribers {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.subscribers.clone())
            .unwrap_or_default()
    }

    /// Number of subscribers in a live set.
    pub fn len(&self, id: DepId) -> usize {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.subscribers.as_ref())
            .map_or(0, SmallVec::len)
    }

    fn slot_mut(&mut self, id: DepId) -> Option<&mut Slot> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation && slot.subscribers.is_some())
    }

    fn subscribers_mut(&mut self, id: DepId) -> Option<&mut Subscribers> {
        self.slot_mut(id).and_then(|slot| slot.subscribers.as_mut())
    }
}
