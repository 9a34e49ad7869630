//! Litter placement against the map and the litter cap.
//!
//! Litter is the one entity kind whose creation consults the outside
//! world: the map module owns tile state, and the pool only asks it a
//! single question through [`LocationValidator`] before placing anything.
//! The litter category also self-limits — at the cap, the oldest
//! surviving piece is evicted to make room, so a park never fails to get
//! visibly dirtier just because it is already dirty.

use glam::IVec3;
use tracing::debug;

use crate::entity::{Entity, EntityCategory, EntityId, EntityKind, LitterData, LitterKind};
use crate::pool::EntityPool;

/// The map module's answer to "may litter exist here?".
///
/// Coordinates are coarse cell coordinates plus elevation. The pool never
/// reads or writes tile records; this predicate is its entire view of the
/// map.
pub trait LocationValidator {
    /// True when the cell is inside owned land and unobstructed at `z`.
    fn is_location_owned_and_unobstructed(&self, cell_x: i32, cell_y: i32, z: i32) -> bool;
}

/// Attempts to place litter at a world position.
///
/// In order:
/// 1. the position is clamped and checked against the map predicate;
/// 2. an identical piece already at the exact spot is refreshed instead
///    of duplicated (its creation tick becomes the current tick);
/// 3. at the configured litter cap, the oldest surviving piece is evicted;
/// 4. a new entity is spawned and placed.
///
/// Returns the surviving entity — new or refreshed — or `None` when the
/// map vetoes the location or the arena has no slot to give.
pub fn try_place(
    pool: &mut EntityPool,
    map: &dyn LocationValidator,
    kind: LitterKind,
    pos: IVec3,
) -> Option<EntityId> {
    let clamped = pool.spatial().clamp(pos);
    let cell = pool.spatial().cell_size();
    if !map.is_location_owned_and_unobstructed(clamped.x / cell, clamped.y / cell, clamped.z) {
        return None;
    }

    let existing = pool.cell_entities(clamped.x, clamped.y).find(|&id| {
        let entity = pool.get(id);
        entity.position() == Some(clamped)
            && matches!(entity.kind(), EntityKind::Litter(data) if data.kind == kind)
    });
    if let Some(id) = existing {
        let tick = pool.current_tick();
        pool.get_mut(id).refresh_created_tick(tick);
        return Some(id);
    }

    if pool.count(EntityCategory::Litter) >= usize::from(pool.config().max_litter) {
        if let Some(oldest) = oldest_litter(pool) {
            debug!(%oldest, "evicting oldest litter at the cap");
            pool.release(oldest);
        }
    }

    let id = pool.spawn(EntityKind::Litter(LitterData { kind }))?;
    pool.relocate(id, clamped);
    Some(id)
}

/// The litter entity with the earliest creation tick, ties broken by slot
/// for determinism.
fn oldest_litter(pool: &EntityPool) -> Option<EntityId> {
    pool.iter_category(EntityCategory::Litter)
        .min_by_key(|entity| (entity.created_tick(), entity.id().slot()))
        .map(Entity::id)
}
