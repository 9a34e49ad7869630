//! The entity pool: a fixed arena of slots partitioned by category lists.
//!
//! The pool owns every dynamic object in the simulated world. Slots are
//! preallocated once and never move; identity is the slot index plus a
//! generation counter bumped on every recycle. Six intrusive doubly linked
//! lists partition the slots by owning subsystem — vacant slots live on the
//! free list, so allocation and release are both O(1) link splices.
//!
//! The pool also owns the [`SpatialGrid`]: any operation that changes a
//! position updates the grid and the cached screen rectangle in the same
//! call, so no caller can observe them out of step.
//!
//! # Writer discipline
//!
//! One logical writer per tick. Nothing here blocks, suspends, or performs
//! I/O; a multi-threaded host must serialize access externally (for
//! example by running simulation and render on one thread, or handing off
//! at an explicit phase boundary).
//!
//! # Example
//!
//! ```
//! use gala_core::{EntityPool, PoolConfig};
//! use gala_core::entity::{EntityCategory, EntityKind, GuestData};
//! use glam::IVec3;
//!
//! let mut pool = EntityPool::new(PoolConfig::default()).unwrap();
//!
//! let guest = pool.spawn(EntityKind::Guest(GuestData::default())).unwrap();
//! pool.relocate(guest, IVec3::new(128, 96, 16));
//!
//! assert_eq!(pool.count(EntityCategory::Peep), 1);
//! assert!(pool.first_in_cell(128, 96).is_some());
//!
//! pool.release(guest);
//! assert_eq!(pool.count(EntityCategory::Peep), 0);
//! ```

use glam::IVec3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{ConfigError, PoolConfig};
use crate::entity::{Entity, EntityCategory, EntityId, EntityKind, SlotIndex};
use crate::spatial::SpatialGrid;

/// Per-slot list membership: which category owns the slot, and its
/// neighbours in that category's chain.
///
/// Kept in a table beside the entities rather than inside them, so list
/// bookkeeping can be audited and repaired without touching records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct CategoryLink {
    pub category: EntityCategory,
    pub next: Option<SlotIndex>,
    pub prev: Option<SlotIndex>,
}

/// Head, tail, and live population of one category list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ListState {
    pub head: Option<SlotIndex>,
    pub tail: Option<SlotIndex>,
    pub count: u16,
}

/// Fixed-capacity entity arena with category lists and a spatial index.
///
/// See the [module documentation](self) for an overview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityPool {
    pub(crate) config: PoolConfig,
    pub(crate) slots: Vec<Option<Entity>>,
    pub(crate) links: Vec<CategoryLink>,
    pub(crate) generations: Vec<u16>,
    pub(crate) lists: [ListState; EntityCategory::COUNT],
    pub(crate) grid: SpatialGrid,
    pub(crate) tick: u64,
}

impl EntityPool {
    /// Creates a pool with every slot on the free list, in index order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the configuration fails
    /// [`PoolConfig::validate`].
    pub fn new(config: PoolConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let capacity = usize::from(config.capacity);

        let mut links = Vec::with_capacity(capacity);
        for index in 0..capacity {
            let index = index as u16;
            links.push(CategoryLink {
                category: EntityCategory::Free,
                next: (index + 1 < config.capacity).then(|| SlotIndex::new(index + 1)),
                prev: (index > 0).then(|| SlotIndex::new(index - 1)),
            });
        }

        let mut lists = [ListState::default(); EntityCategory::COUNT];
        lists[EntityCategory::Free.index()] = ListState {
            head: Some(SlotIndex::new(0)),
            tail: Some(SlotIndex::new(config.capacity - 1)),
            count: config.capacity,
        };

        Ok(Self {
            grid: SpatialGrid::new(&config),
            slots: vec![None; capacity],
            links,
            generations: vec![0; capacity],
            lists,
            config,
            tick: 0,
        })
    }

    // -------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------

    /// Allocates a slot into `category` with that category's default
    /// payload.
    ///
    /// Returns `None` when the arena is exhausted, or when `category` is
    /// [`EntityCategory::Misc`] and the free count has fallen to the
    /// configured reserve — misc effects are the first thing the pool
    /// refuses under pressure.
    ///
    /// The slot is reset before use: a previous occupant's state never
    /// leaks into the new entity.
    ///
    /// # Panics
    ///
    /// Panics if `category` is [`EntityCategory::Free`].
    pub fn allocate(&mut self, category: EntityCategory) -> Option<EntityId> {
        assert!(
            category != EntityCategory::Free,
            "allocate targets a live category; release() is how slots return to Free"
        );
        if category == EntityCategory::Misc && self.free_count() <= usize::from(self.config.misc_reserve)
        {
            debug!(
                free = self.free_count(),
                reserve = self.config.misc_reserve,
                "misc allocation refused to preserve reserve"
            );
            return None;
        }

        let slot = self.lists[EntityCategory::Free.index()].head?;
        self.unlink(slot);
        self.link_head(slot, category);

        let index = slot.as_usize();
        let id = EntityId::new(slot, self.generations[index]);
        self.slots[index] = Some(Entity::new(id, EntityKind::default_for(category), self.tick));
        Some(id)
    }

    /// Allocates a slot and installs `kind`, deriving the category from it.
    ///
    /// Returns `None` under the same conditions as [`Self::allocate`].
    pub fn spawn(&mut self, kind: EntityKind) -> Option<EntityId> {
        let id = self.allocate(kind.category())?;
        self.entity_mut_internal(id.slot().as_usize()).set_kind(kind);
        Some(id)
    }

    /// Releases a live entity back to the free list.
    ///
    /// The entity is removed from its spatial cell first (if placed), its
    /// record — including any owned display name — is dropped, and the
    /// slot's generation is bumped so outstanding handles go stale.
    ///
    /// # Panics
    ///
    /// Panics on a stale or out-of-range handle; releasing twice through
    /// the same handle is a caller contract violation, not a recoverable
    /// condition.
    pub fn release(&mut self, id: EntityId) {
        let index = self.resolve(id);
        let slot = id.slot();

        if let Some(pos) = self.slots[index].as_ref().and_then(Entity::position) {
            let key = self.grid.key_at(pos.x, pos.y);
            self.grid.remove(slot, key);
        }

        self.slots[index] = None;
        self.generations[index] = self.generations[index].wrapping_add(1);
        self.unlink(slot);
        self.link_head(slot, EntityCategory::Free);
    }

    // -------------------------------------------------------------------
    // Access
    // -------------------------------------------------------------------

    /// Returns the entity behind a handle.
    ///
    /// # Panics
    ///
    /// Panics on a stale or out-of-range handle.
    #[must_use]
    pub fn get(&self, id: EntityId) -> &Entity {
        let index = self.resolve(id);
        self.slots[index].as_ref().expect("resolved slot is occupied")
    }

    /// Returns the entity behind a handle, or `None` if the handle is
    /// stale. Out-of-range handles are still a panic: no well-formed
    /// caller can construct one.
    #[must_use]
    pub fn try_get(&self, id: EntityId) -> Option<&Entity> {
        let index = self.try_resolve(id)?;
        self.slots[index].as_ref()
    }

    /// Mutable variant of [`Self::get`].
    ///
    /// # Panics
    ///
    /// Panics on a stale or out-of-range handle.
    #[must_use]
    pub fn get_mut(&mut self, id: EntityId) -> &mut Entity {
        let index = self.resolve(id);
        self.slots[index].as_mut().expect("resolved slot is occupied")
    }

    /// Mutable variant of [`Self::try_get`].
    #[must_use]
    pub fn try_get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        let index = self.try_resolve(id)?;
        self.slots[index].as_mut()
    }

    /// Returns the category a live entity currently belongs to.
    #[must_use]
    pub fn category_of(&self, id: EntityId) -> EntityCategory {
        let index = self.resolve(id);
        self.links[index].category
    }

    // -------------------------------------------------------------------
    // Category lists
    // -------------------------------------------------------------------

    /// Moves a live entity to another category list.
    ///
    /// This is the only sanctioned way to change membership: it patches
    /// both chains and both population counters in one step. A move to the
    /// current category is a no-op. Spatial membership is untouched.
    ///
    /// # Panics
    ///
    /// Panics on a stale handle, or if `new_category` is
    /// [`EntityCategory::Free`] (use [`Self::release`]).
    pub fn move_to_category(&mut self, id: EntityId, new_category: EntityCategory) {
        assert!(
            new_category != EntityCategory::Free,
            "release() is how slots return to Free"
        );
        let index = self.resolve(id);
        if self.links[index].category == new_category {
            return;
        }
        let slot = id.slot();
        self.unlink(slot);
        self.link_head(slot, new_category);
    }

    /// Number of slots in a category list.
    #[must_use]
    pub fn count(&self, category: EntityCategory) -> usize {
        usize::from(self.lists[category.index()].count)
    }

    /// Number of vacant slots.
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.count(EntityCategory::Free)
    }

    /// Total slot capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// First entity in a category list, if any.
    #[must_use]
    pub fn head_of(&self, category: EntityCategory) -> Option<EntityId> {
        let slot = self.lists[category.index()].head?;
        self.slots[slot.as_usize()].as_ref().map(Entity::id)
    }

    /// Iterates the entities of a category list in chain order.
    pub fn iter_category(&self, category: EntityCategory) -> impl Iterator<Item = &Entity> + '_ {
        CategoryIter {
            pool: self,
            cursor: self.lists[category.index()].head,
        }
    }

    /// Walks a category list, invoking `f` with the pool and each entity's
    /// handle.
    ///
    /// The next link is captured before each call, so `f` may release or
    /// re-categorize the entity it is handed. Mutating *other* entities'
    /// list membership from inside the callback is not supported.
    pub fn for_each(&mut self, category: EntityCategory, mut f: impl FnMut(&mut Self, EntityId)) {
        let mut cursor = self.lists[category.index()].head;
        while let Some(slot) = cursor {
            let index = slot.as_usize();
            cursor = self.links[index].next;
            if let Some(entity) = &self.slots[index] {
                let id = entity.id();
                f(self, id);
            }
        }
    }

    // -------------------------------------------------------------------
    // Spatial coupling
    // -------------------------------------------------------------------

    /// Moves a live entity to a world position.
    ///
    /// The position is clamped into the world bounds. When the move stays
    /// within the current cell only the coordinate is rewritten; crossing
    /// a boundary unlinks the entity from its old cell and prepends it to
    /// the new one. The screen rectangle is recomputed in the same call.
    ///
    /// # Panics
    ///
    /// Panics on a stale handle.
    pub fn relocate(&mut self, id: EntityId, pos: IVec3) {
        let index = self.resolve(id);
        let slot = id.slot();
        let clamped = self.grid.clamp(pos);
        let new_key = self.grid.key_at(clamped.x, clamped.y);

        let old = self.slots[index].as_ref().and_then(Entity::position);
        match old {
            Some(old_pos) => {
                let old_key = self.grid.key_at(old_pos.x, old_pos.y);
                if old_key != new_key {
                    self.grid.remove(slot, old_key);
                    self.grid.insert(slot, new_key);
                }
            }
            None => self.grid.insert(slot, new_key),
        }
        self.entity_mut_internal(index).set_position(Some(clamped));
    }

    /// Takes a live entity off the world, unlinking it from its spatial
    /// cell. Category membership is untouched.
    ///
    /// # Panics
    ///
    /// Panics on a stale handle.
    pub fn remove_from_map(&mut self, id: EntityId) {
        let index = self.resolve(id);
        if let Some(pos) = self.slots[index].as_ref().and_then(Entity::position) {
            let key = self.grid.key_at(pos.x, pos.y);
            self.grid.remove(id.slot(), key);
        }
        self.entity_mut_internal(index).set_position(None);
    }

    /// First entity in the cell containing `(x, y)`, if any.
    #[must_use]
    pub fn first_in_cell(&self, x: i32, y: i32) -> Option<EntityId> {
        let clamped = self.grid.clamp(IVec3::new(x, y, 0));
        let key = self.grid.key_at(clamped.x, clamped.y);
        let slot = self.grid.first_in(key)?;
        self.slots[slot.as_usize()].as_ref().map(Entity::id)
    }

    /// Iterates the entities in the cell containing `(x, y)`, most
    /// recently placed first.
    pub fn cell_entities(&self, x: i32, y: i32) -> impl Iterator<Item = EntityId> + '_ {
        let clamped = self.grid.clamp(IVec3::new(x, y, 0));
        let key = self.grid.key_at(clamped.x, clamped.y);
        self.grid
            .chain(key)
            .filter_map(|slot| self.slots[slot.as_usize()].as_ref().map(Entity::id))
    }

    /// Read access to the spatial grid.
    #[must_use]
    pub fn spatial(&self) -> &SpatialGrid {
        &self.grid
    }

    // -------------------------------------------------------------------
    // Persistence and bookkeeping
    // -------------------------------------------------------------------

    /// Raw iteration over every slot in index order, vacant or not — the
    /// save/load surface.
    pub fn slots(&self) -> impl Iterator<Item = (SlotIndex, Option<&Entity>)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .map(|(index, slot)| (SlotIndex::new(index as u16), slot.as_ref()))
    }

    /// The configuration this pool was built with.
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Current simulation tick.
    #[must_use]
    pub const fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Advances the simulation tick counter.
    pub fn advance_tick(&mut self) {
        self.tick += 1;
    }

    // -------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------

    fn resolve(&self, id: EntityId) -> usize {
        let index = id.slot().as_usize();
        assert!(
            index < self.slots.len(),
            "entity slot {index} out of range for capacity {}",
            self.slots.len()
        );
        assert!(
            self.generations[index] == id.generation() && self.slots[index].is_some(),
            "stale entity handle {id}"
        );
        index
    }

    fn try_resolve(&self, id: EntityId) -> Option<usize> {
        let index = id.slot().as_usize();
        assert!(
            index < self.slots.len(),
            "entity slot {index} out of range for capacity {}",
            self.slots.len()
        );
        (self.generations[index] == id.generation() && self.slots[index].is_some()).then_some(index)
    }

    fn entity_mut_internal(&mut self, index: usize) -> &mut Entity {
        self.slots[index].as_mut().expect("slot is occupied")
    }

    /// Overwrites an occupied slot's rendered position without touching
    /// the spatial grid. Used by tween blending, which must be rewound via
    /// the matching restore before simulation resumes.
    pub(crate) fn set_render_position(&mut self, index: usize, pos: IVec3) {
        if let Some(entity) = self.slots[index].as_mut() {
            entity.set_position(Some(pos));
        }
    }

    /// Unlinks a slot from its current category chain, patching the
    /// neighbours or the list head/tail.
    pub(crate) fn unlink(&mut self, slot: SlotIndex) {
        let index = slot.as_usize();
        let CategoryLink { category, next, prev } = self.links[index];
        let list = &mut self.lists[category.index()];
        match prev {
            Some(p) => self.links[p.as_usize()].next = next,
            None => list.head = next,
        }
        let list = &mut self.lists[category.index()];
        match next {
            Some(n) => self.links[n.as_usize()].prev = prev,
            None => list.tail = prev,
        }
        self.lists[category.index()].count -= 1;
        self.links[index].next = None;
        self.links[index].prev = None;
    }

    /// Links a slot at the head of a category chain.
    pub(crate) fn link_head(&mut self, slot: SlotIndex, category: EntityCategory) {
        let index = slot.as_usize();
        let list = &mut self.lists[category.index()];
        let old_head = list.head;
        list.head = Some(slot);
        if list.tail.is_none() {
            list.tail = Some(slot);
        }
        list.count += 1;
        self.links[index] = CategoryLink {
            category,
            next: old_head,
            prev: None,
        };
        if let Some(h) = old_head {
            self.links[h.as_usize()].prev = Some(slot);
        }
    }

    /// Links a slot at the tail of a category chain. Used by the repair
    /// passes, which append recovered slots deterministically.
    pub(crate) fn link_tail(&mut self, slot: SlotIndex, category: EntityCategory) {
        let index = slot.as_usize();
        let list = &mut self.lists[category.index()];
        let old_tail = list.tail;
        list.tail = Some(slot);
        if list.head.is_none() {
            list.head = Some(slot);
        }
        list.count += 1;
        self.links[index] = CategoryLink {
            category,
            next: None,
            prev: old_tail,
        };
        if let Some(t) = old_tail {
            self.links[t.as_usize()].next = Some(slot);
        }
    }
}

struct CategoryIter<'a> {
    pool: &'a EntityPool,
    cursor: Option<SlotIndex>,
}

impl<'a> Iterator for CategoryIter<'a> {
    type Item = &'a Entity;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let slot = self.cursor?;
            let index = slot.as_usize();
            self.cursor = self.pool.links[index].next;
            if let Some(entity) = &self.pool.slots[index] {
                return Some(entity);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{GuestData, LitterData, VehicleData};

    fn pool(capacity: u16) -> EntityPool {
        EntityPool::new(PoolConfig {
            capacity,
            world_cells: 8,
            cell_shift: 5,
            ..PoolConfig::default()
        })
        .unwrap()
    }

    mod lifecycle_tests {
        use super::*;

        #[test]
        fn new_pool_is_entirely_free() {
            let pool = pool(8);
            assert_eq!(pool.free_count(), 8);
            assert_eq!(pool.capacity(), 8);
            for category in EntityCategory::ALL {
                if category != EntityCategory::Free {
                    assert_eq!(pool.count(category), 0);
                }
            }
        }

        #[test]
        fn allocate_pulls_from_free_head() {
            let mut pool = pool(4);
            let id = pool.allocate(EntityCategory::Generic).unwrap();
            assert_eq!(id.slot(), SlotIndex::new(0));
            assert_eq!(pool.free_count(), 3);
            assert_eq!(pool.count(EntityCategory::Generic), 1);
        }

        #[test]
        fn allocate_exhausts_to_none() {
            let mut pool = pool(2);
            assert!(pool.allocate(EntityCategory::Generic).is_some());
            assert!(pool.allocate(EntityCategory::Generic).is_some());
            assert!(pool.allocate(EntityCategory::Generic).is_none());
        }

        #[test]
        #[should_panic(expected = "live category")]
        fn allocate_into_free_is_a_contract_violation() {
            let mut pool = pool(2);
            let _ = pool.allocate(EntityCategory::Free);
        }

        #[test]
        fn spawn_derives_category_from_kind() {
            let mut pool = pool(4);
            let vehicle = pool.spawn(EntityKind::Vehicle(VehicleData::default())).unwrap();
            assert_eq!(pool.category_of(vehicle), EntityCategory::Train);
            assert!(pool.get(vehicle).kind().as_vehicle().is_some());
        }

        #[test]
        fn release_returns_slot_to_free_head() {
            let mut pool = pool(4);
            let a = pool.allocate(EntityCategory::Generic).unwrap();
            let b = pool.allocate(EntityCategory::Generic).unwrap();
            pool.release(a);
            assert_eq!(pool.free_count(), 3);
            // Freed slot is reused first.
            let c = pool.allocate(EntityCategory::Generic).unwrap();
            assert_eq!(c.slot(), a.slot());
            assert_ne!(c.generation(), a.generation());
            let _ = b;
        }

        #[test]
        fn release_drops_the_record_and_its_name() {
            let mut pool = pool(4);
            let id = pool.spawn(EntityKind::Guest(GuestData::default())).unwrap();
            pool.get_mut(id).set_name(Some("Ivy".to_owned()));
            pool.release(id);
            // The slot's next occupant starts clean.
            let next = pool.spawn(EntityKind::Guest(GuestData::default())).unwrap();
            assert_eq!(next.slot(), id.slot());
            assert_eq!(pool.get(next).name(), None);
        }

        #[test]
        #[should_panic(expected = "stale entity handle")]
        fn double_release_panics() {
            let mut pool = pool(4);
            let id = pool.allocate(EntityCategory::Generic).unwrap();
            pool.release(id);
            pool.release(id);
        }

        #[test]
        fn stale_handle_is_detected_after_reuse() {
            let mut pool = pool(2);
            let old = pool.allocate(EntityCategory::Generic).unwrap();
            pool.release(old);
            let new = pool.allocate(EntityCategory::Generic).unwrap();
            assert_eq!(old.slot(), new.slot());
            assert!(pool.try_get(old).is_none());
            assert!(pool.try_get(new).is_some());
        }

        #[test]
        #[should_panic(expected = "out of range")]
        fn out_of_range_handle_panics() {
            let pool = pool(2);
            let _ = pool.try_get(EntityId::new(SlotIndex::new(99), 0));
        }
    }

    mod reservation_tests {
        use super::*;

        #[test]
        fn misc_allocation_respects_the_reserve() {
            let mut pool = EntityPool::new(PoolConfig {
                capacity: 310,
                misc_reserve: 300,
                world_cells: 8,
                ..PoolConfig::default()
            })
            .unwrap();

            for _ in 0..10 {
                assert!(pool.allocate(EntityCategory::Misc).is_some());
            }
            assert_eq!(pool.free_count(), 300);
            // The reserve is exhausted for misc...
            assert!(pool.allocate(EntityCategory::Misc).is_none());
            // ...but gameplay categories still allocate.
            assert!(pool.allocate(EntityCategory::Peep).is_some());
        }
    }

    mod category_tests {
        use super::*;

        #[test]
        fn move_to_category_relinks_and_recounts() {
            let mut pool = pool(4);
            let id = pool.allocate(EntityCategory::Generic).unwrap();
            pool.move_to_category(id, EntityCategory::Peep);
            assert_eq!(pool.count(EntityCategory::Generic), 0);
            assert_eq!(pool.count(EntityCategory::Peep), 1);
            assert_eq!(pool.category_of(id), EntityCategory::Peep);
        }

        #[test]
        fn move_to_same_category_is_noop() {
            let mut pool = pool(4);
            let a = pool.allocate(EntityCategory::Peep).unwrap();
            let b = pool.allocate(EntityCategory::Peep).unwrap();
            pool.move_to_category(b, EntityCategory::Peep);
            // Head order unchanged: b was most recently linked.
            assert_eq!(pool.head_of(EntityCategory::Peep), Some(b));
            assert_eq!(pool.count(EntityCategory::Peep), 2);
            let _ = a;
        }

        #[test]
        fn iter_category_walks_most_recent_first() {
            let mut pool = pool(4);
            let a = pool.allocate(EntityCategory::Litter).unwrap();
            let b = pool.allocate(EntityCategory::Litter).unwrap();
            let ids: Vec<_> = pool.iter_category(EntityCategory::Litter).map(Entity::id).collect();
            assert_eq!(ids, vec![b, a]);
        }

        #[test]
        fn for_each_survives_release_of_current() {
            let mut pool = pool(8);
            for _ in 0..5 {
                pool.spawn(EntityKind::Litter(LitterData::default())).unwrap();
            }
            pool.for_each(EntityCategory::Litter, |pool, id| pool.release(id));
            assert_eq!(pool.count(EntityCategory::Litter), 0);
            assert_eq!(pool.free_count(), 8);
        }

        #[test]
        fn category_move_leaves_spatial_membership_alone() {
            let mut pool = pool(4);
            let id = pool.allocate(EntityCategory::Generic).unwrap();
            pool.relocate(id, IVec3::new(10, 10, 0));
            pool.move_to_category(id, EntityCategory::Peep);
            assert_eq!(pool.first_in_cell(10, 10), Some(id));
        }
    }

    mod spatial_tests {
        use super::*;

        #[test]
        fn relocate_places_and_moves_between_cells() {
            let mut pool = pool(4);
            let id = pool.allocate(EntityCategory::Generic).unwrap();
            pool.relocate(id, IVec3::new(0, 0, 0));
            assert_eq!(pool.first_in_cell(0, 0), Some(id));

            pool.relocate(id, IVec3::new(64, 0, 0));
            assert_eq!(pool.first_in_cell(0, 0), None);
            assert_eq!(pool.first_in_cell(64, 0), Some(id));
        }

        #[test]
        fn same_cell_relocate_only_rewrites_the_coordinate() {
            let mut pool = pool(4);
            let id = pool.allocate(EntityCategory::Generic).unwrap();
            pool.relocate(id, IVec3::new(0, 0, 0));
            pool.relocate(id, IVec3::new(5, 9, 2));
            assert_eq!(pool.get(id).position(), Some(IVec3::new(5, 9, 2)));
            assert_eq!(pool.cell_entities(0, 0).count(), 1);
        }

        #[test]
        fn relocate_is_idempotent_on_bucket_membership() {
            let mut pool = pool(4);
            let id = pool.allocate(EntityCategory::Generic).unwrap();
            pool.relocate(id, IVec3::new(40, 40, 0));
            pool.relocate(id, IVec3::new(40, 40, 0));
            assert_eq!(pool.cell_entities(40, 40).count(), 1);
        }

        #[test]
        fn remove_from_map_unlinks_and_clears_position() {
            let mut pool = pool(4);
            let id = pool.allocate(EntityCategory::Generic).unwrap();
            pool.relocate(id, IVec3::new(0, 0, 0));
            pool.remove_from_map(id);
            assert_eq!(pool.get(id).position(), None);
            assert_eq!(pool.first_in_cell(0, 0), None);
        }

        #[test]
        fn release_removes_from_spatial_cell() {
            let mut pool = pool(4);
            let id = pool.allocate(EntityCategory::Generic).unwrap();
            pool.relocate(id, IVec3::new(0, 0, 0));
            pool.release(id);
            assert_eq!(pool.first_in_cell(0, 0), None);
        }

        #[test]
        fn positions_clamp_into_the_world() {
            let mut pool = pool(4);
            let id = pool.allocate(EntityCategory::Generic).unwrap();
            pool.relocate(id, IVec3::new(-50, 100_000, 0));
            let pos = pool.get(id).position().unwrap();
            assert_eq!(pos.x, 0);
            assert_eq!(pos.y, 8 * 32 - 1);
        }
    }

    mod persistence_tests {
        use super::*;

        #[test]
        fn slots_iterates_in_index_order() {
            let mut pool = pool(4);
            let _ = pool.allocate(EntityCategory::Generic);
            let indices: Vec<_> = pool.slots().map(|(index, _)| index.as_u16()).collect();
            assert_eq!(indices, vec![0, 1, 2, 3]);
            assert!(pool.slots().next().unwrap().1.is_some());
        }

        #[test]
        fn serialization_roundtrip_preserves_structure() {
            let mut pool = pool(8);
            let a = pool.spawn(EntityKind::Guest(GuestData::default())).unwrap();
            pool.relocate(a, IVec3::new(33, 12, 4));
            let b = pool.spawn(EntityKind::Litter(LitterData::default())).unwrap();
            pool.release(b);
            pool.advance_tick();

            let json = serde_json::to_string(&pool).unwrap();
            let back: EntityPool = serde_json::from_str(&json).unwrap();

            assert_eq!(back.count(EntityCategory::Peep), 1);
            assert_eq!(back.free_count(), pool.free_count());
            assert_eq!(back.current_tick(), 1);
            assert_eq!(back.first_in_cell(33, 12), Some(a));
            // Generation history survives, so the stale handle stays stale.
            assert!(back.try_get(b).is_none());
        }
    }
}
