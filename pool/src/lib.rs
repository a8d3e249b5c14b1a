#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Keyed object pool that recycles bounded-lifetime entities by tag.
//!
//! Every entity lives in a generational slot owned by the pool. A slot is
//! either free (queued on its tag's FIFO free list), active (handed out to a
//! streamer), or destroyed. Instantiation and destruction only happen when a
//! pool is created, when an empty pool expands by one, or when pools are
//! cleared; steady-state spawn and release calls move handles between the
//! free list and the active set without allocating entities.

mod prop;

use std::{
    collections::{HashMap, VecDeque},
    fmt, mem,
    rc::Rc,
};

use runway_core::{EntityHandle, PoolTag, SpawnError, Transform, Vec2};
use tracing::{debug, info, warn};

pub use prop::{Prop, PropTemplate, Tint};

/// Capability contract every pooled entity provides.
pub trait Poolable {
    /// Clears transient state before the entity becomes active.
    ///
    /// The pool applies the spawn position and rotation before invoking the
    /// hook, so implementations must leave both untouched.
    fn reset(&mut self);

    /// Current placement of the entity.
    fn transform(&self) -> &Transform;

    /// Mutable placement of the entity.
    fn transform_mut(&mut self) -> &mut Transform;

    /// Size of the entity along the forward axis, when it can be measured.
    fn extent(&self) -> Option<f32> {
        None
    }
}

/// Factory producing fresh entities for a tag.
pub trait Template<E> {
    /// Instantiates a new, inactive entity.
    fn instantiate(&self, tag: &PoolTag) -> E;
}

impl<E, F> Template<E> for F
where
    F: Fn(&PoolTag) -> E,
{
    fn instantiate(&self, tag: &PoolTag) -> E {
        self(tag)
    }
}

/// Membership of a live entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityState {
    /// Queued on its tag's free list.
    Free,
    /// Handed out by [`EntityPool::spawn`] and not yet released.
    Active,
}

/// Outcome of returning an entity to its pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Release {
    /// The entity was appended to its tag's free queue.
    Pooled,
    /// The entity's tag has no pool anymore, so the entity was destroyed.
    Destroyed,
    /// The handle was stale or the entity was not active; nothing changed.
    Ignored,
}

/// Counters describing pool activity since construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PoolStats {
    /// Entities created from templates.
    pub instantiated: u64,
    /// Entities destroyed by clears, external destruction, or orphaned releases.
    pub destroyed: u64,
    /// Single-entity expansions triggered by spawning from an empty queue.
    pub expansions: u64,
    /// Successful spawns.
    pub spawned: u64,
    /// Entities returned to a free queue.
    pub released: u64,
    /// Destroyed entities discarded while dequeuing.
    pub null_references: u64,
    /// Spawns rejected because the tag had neither pool nor template.
    pub unknown_tags: u64,
}

enum SlotState<E> {
    Free(E),
    Active(E),
    Destroyed,
}

struct Slot<E> {
    generation: u32,
    tag: PoolTag,
    state: SlotState<E>,
}

/// Generic keyed object pool.
pub struct EntityPool<E> {
    slots: Vec<Slot<E>>,
    vacant: Vec<u32>,
    queues: HashMap<PoolTag, VecDeque<EntityHandle>>,
    templates: HashMap<PoolTag, Rc<dyn Template<E>>>,
    diagnostics: Vec<SpawnError>,
    stats: PoolStats,
}

impl<E> fmt::Debug for EntityPool<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityPool")
            .field("slots", &self.slots.len())
            .field("pools", &self.queues.len())
            .field("templates", &self.templates.len())
            .field("stats", &self.stats)
            .finish()
    }
}

impl<E> Default for EntityPool<E> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            vacant: Vec::new(),
            queues: HashMap::new(),
            templates: HashMap::new(),
            diagnostics: Vec::new(),
            stats: PoolStats::default(),
        }
    }
}

impl<E: Poolable> EntityPool<E> {
    /// Creates an empty pool without templates.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a template for `tag` without creating its pool.
    ///
    /// The first spawn for the tag creates the pool lazily.
    pub fn register_template(&mut self, tag: PoolTag, template: Rc<dyn Template<E>>) {
        if self.templates.insert(tag.clone(), template).is_some() {
            debug!(%tag, "replaced template");
        }
    }

    /// Creates the pool for `tag` holding `initial_size` inactive entities.
    ///
    /// Returns `false` without touching anything when the pool already exists.
    pub fn create_pool(
        &mut self,
        tag: PoolTag,
        template: Rc<dyn Template<E>>,
        initial_size: usize,
    ) -> bool {
        if self.queues.contains_key(&tag) {
            debug!(%tag, "pool already exists");
            return false;
        }

        let _ = self.templates.insert(tag.clone(), template);
        let mut queue = VecDeque::with_capacity(initial_size);
        for _ in 0..initial_size {
            if let Some(handle) = self.instantiate(&tag) {
                queue.push_back(handle);
            }
        }
        let _ = self.queues.insert(tag.clone(), queue);
        debug!(%tag, initial_size, "created pool");
        true
    }

    /// Creates the pool for `tag` from its registered template.
    pub fn prewarm(&mut self, tag: &PoolTag, initial_size: usize) -> Result<bool, SpawnError> {
        let template = self
            .templates
            .get(tag)
            .cloned()
            .ok_or_else(|| SpawnError::UnknownTag(tag.clone()))?;
        Ok(self.create_pool(tag.clone(), template, initial_size))
    }

    /// Hands out an entity for `tag` placed at `position` and `rotation_degrees`.
    ///
    /// An empty queue expands by exactly one entity. Destroyed entities found
    /// in the queue are discarded and recorded as diagnostics.
    pub fn spawn(
        &mut self,
        tag: &PoolTag,
        position: Vec2,
        rotation_degrees: f32,
    ) -> Result<EntityHandle, SpawnError> {
        if !self.queues.contains_key(tag) {
            if !self.templates.contains_key(tag) {
                self.stats.unknown_tags += 1;
                warn!(%tag, "spawn requested for unknown tag");
                return Err(SpawnError::UnknownTag(tag.clone()));
            }
            debug!(%tag, "creating pool on first spawn");
            let _ = self.queues.insert(tag.clone(), VecDeque::new());
        }

        loop {
            let queued = self.queues.get_mut(tag).and_then(VecDeque::pop_front);
            let handle = match queued {
                Some(handle) => handle,
                None => self.expand(tag)?,
            };

            if self.activate(handle, position, rotation_degrees) {
                self.stats.spawned += 1;
                return Ok(handle);
            }

            self.stats.null_references += 1;
            warn!(%tag, ?handle, "discarding destroyed entity found in free queue");
            self.diagnostics
                .push(SpawnError::NullEntityReference(tag.clone()));
        }
    }

    /// Returns an active entity to the free queue recorded for its tag.
    pub fn release(&mut self, handle: EntityHandle) -> Release {
        let index = handle.index();
        let Some(slot) = self.slots.get_mut(index as usize) else {
            warn!(?handle, "release of unknown handle ignored");
            return Release::Ignored;
        };
        if slot.generation != handle.generation() {
            warn!(?handle, "release of stale handle ignored");
            return Release::Ignored;
        }

        let entity = match mem::replace(&mut slot.state, SlotState::Destroyed) {
            SlotState::Active(entity) => entity,
            other => {
                slot.state = other;
                warn!(tag = %slot.tag, ?handle, "release of inactive entity ignored");
                return Release::Ignored;
            }
        };

        match self.queues.get_mut(&slot.tag) {
            Some(queue) => {
                slot.state = SlotState::Free(entity);
                queue.push_back(handle);
                self.stats.released += 1;
                Release::Pooled
            }
            None => {
                warn!(tag = %slot.tag, "no pool for released entity, destroying it");
                drop(entity);
                slot.generation = slot.generation.wrapping_add(1);
                self.vacant.push(index);
                self.stats.destroyed += 1;
                Release::Destroyed
            }
        }
    }

    /// Destroys an entity outside the regular release path.
    ///
    /// A free entity's handle stays in its queue and is discarded when the
    /// pool next dequeues it.
    pub fn destroy(&mut self, handle: EntityHandle) -> bool {
        let live = self
            .slots
            .get(handle.index() as usize)
            .is_some_and(|slot| {
                slot.generation == handle.generation()
                    && !matches!(slot.state, SlotState::Destroyed)
            });
        if live {
            self.destroy_slot(handle.index());
        }
        live
    }

    /// Destroys the free entities of `tag` and removes its queue.
    ///
    /// The template stays registered; active entities of the tag are destroyed
    /// when released.
    pub fn clear_pool(&mut self, tag: &PoolTag) {
        let Some(queue) = self.queues.remove(tag) else {
            return;
        };

        for handle in queue {
            let free = self.slots.get(handle.index() as usize).is_some_and(|slot| {
                slot.generation == handle.generation() && matches!(slot.state, SlotState::Free(_))
            });
            if free {
                self.destroy_slot(handle.index());
            }
        }
        debug!(%tag, "cleared pool");
    }

    /// Destroys every entity and empties all pools. Templates stay registered.
    pub fn clear_all(&mut self) {
        let mut destroyed = 0_usize;
        for index in 0..self.slots.len() {
            if !matches!(self.slots[index].state, SlotState::Destroyed) {
                self.destroy_slot(index as u32);
                destroyed += 1;
            }
        }
        self.queues.clear();
        info!(destroyed, "cleared all pools");
    }

    /// Borrows a live entity.
    #[must_use]
    pub fn get(&self, handle: EntityHandle) -> Option<&E> {
        let slot = self.slots.get(handle.index() as usize)?;
        if slot.generation != handle.generation() {
            return None;
        }
        match &slot.state {
            SlotState::Free(entity) | SlotState::Active(entity) => Some(entity),
            SlotState::Destroyed => None,
        }
    }

    /// Mutably borrows a live entity.
    pub fn get_mut(&mut self, handle: EntityHandle) -> Option<&mut E> {
        let slot = self.slots.get_mut(handle.index() as usize)?;
        if slot.generation != handle.generation() {
            return None;
        }
        match &mut slot.state {
            SlotState::Free(entity) | SlotState::Active(entity) => Some(entity),
            SlotState::Destroyed => None,
        }
    }

    /// Membership of a live entity, or `None` for stale handles.
    #[must_use]
    pub fn state(&self, handle: EntityHandle) -> Option<EntityState> {
        let slot = self.slots.get(handle.index() as usize)?;
        if slot.generation != handle.generation() {
            return None;
        }
        match slot.state {
            SlotState::Free(_) => Some(EntityState::Free),
            SlotState::Active(_) => Some(EntityState::Active),
            SlotState::Destroyed => None,
        }
    }

    /// Tag recorded for the entity when it was instantiated.
    #[must_use]
    pub fn tag_of(&self, handle: EntityHandle) -> Option<&PoolTag> {
        self.slots
            .get(handle.index() as usize)
            .filter(|slot| slot.generation == handle.generation())
            .map(|slot| &slot.tag)
    }

    /// Handles currently queued for `tag`, in reuse order.
    pub fn free_handles(&self, tag: &PoolTag) -> impl Iterator<Item = EntityHandle> + '_ {
        self.queues.get(tag).into_iter().flatten().copied()
    }

    /// Number of handles queued for `tag`.
    #[must_use]
    pub fn free_count(&self, tag: &PoolTag) -> usize {
        self.queues.get(tag).map_or(0, VecDeque::len)
    }

    /// Number of entities currently handed out.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot.state, SlotState::Active(_)))
            .count()
    }

    /// Reports whether a pool exists for `tag`.
    #[must_use]
    pub fn has_pool(&self, tag: &PoolTag) -> bool {
        self.queues.contains_key(tag)
    }

    /// Reports whether a template is registered for `tag`.
    #[must_use]
    pub fn has_template(&self, tag: &PoolTag) -> bool {
        self.templates.contains_key(tag)
    }

    /// Activity counters.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    /// Drains the diagnostics recorded since the previous call.
    pub fn take_diagnostics(&mut self) -> Vec<SpawnError> {
        mem::take(&mut self.diagnostics)
    }

    fn expand(&mut self, tag: &PoolTag) -> Result<EntityHandle, SpawnError> {
        let handle = self
            .instantiate(tag)
            .ok_or_else(|| SpawnError::UnknownTag(tag.clone()))?;
        self.stats.expansions += 1;
        debug!(%tag, "expanded pool by one");
        Ok(handle)
    }

    fn instantiate(&mut self, tag: &PoolTag) -> Option<EntityHandle> {
        let template = Rc::clone(self.templates.get(tag)?);
        let entity = template.instantiate(tag);
        self.stats.instantiated += 1;

        let state = SlotState::Free(entity);
        let handle = match self.vacant.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.tag = tag.clone();
                slot.state = state;
                EntityHandle::new(index, slot.generation)
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    tag: tag.clone(),
                    state,
                });
                EntityHandle::new(index, 0)
            }
        };
        Some(handle)
    }

    fn activate(&mut self, handle: EntityHandle, position: Vec2, rotation_degrees: f32) -> bool {
        let Some(slot) = self.slots.get_mut(handle.index() as usize) else {
            return false;
        };
        if slot.generation != handle.generation() {
            return false;
        }

        match mem::replace(&mut slot.state, SlotState::Destroyed) {
            SlotState::Free(mut entity) => {
                let transform = entity.transform_mut();
                transform.position = position;
                transform.rotation_degrees = rotation_degrees;
                entity.reset();
                slot.state = SlotState::Active(entity);
                true
            }
            other => {
                slot.state = other;
                false
            }
        }
    }

    fn destroy_slot(&mut self, index: u32) {
        let slot = &mut self.slots[index as usize];
        slot.state = SlotState::Destroyed;
        slot.generation = slot.generation.wrapping_add(1);
        self.vacant.push(index);
        self.stats.destroyed += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_with(tag: &str, size: usize) -> EntityPool<Prop> {
        let mut pool = EntityPool::new();
        let created = pool.create_pool(
            PoolTag::new(tag),
            Rc::new(PropTemplate::new(Some(1.0))),
            size,
        );
        assert!(created);
        pool
    }

    #[test]
    fn vacant_slots_are_reused_with_new_generation() {
        let mut pool = pool_with("rock", 1);
        let tag = PoolTag::new("rock");
        let first = pool.spawn(&tag, Vec2::ZERO, 0.0).expect("spawn");
        assert!(pool.destroy(first));

        let second = pool.spawn(&tag, Vec2::ZERO, 0.0).expect("spawn");
        assert_eq!(second.index(), first.index());
        assert_ne!(second.generation(), first.generation());
        assert!(pool.get(first).is_none());
        assert!(pool.get(second).is_some());
    }

    #[test]
    fn destroy_rejects_stale_handles() {
        let mut pool = pool_with("rock", 1);
        let handle = pool.free_handles(&PoolTag::new("rock")).next().expect("queued");
        assert!(pool.destroy(handle));
        assert!(!pool.destroy(handle));
        assert_eq!(pool.stats().destroyed, 1);
    }
}
