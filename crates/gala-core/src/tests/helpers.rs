//! Shared setup utilities for the integration suites.

use glam::IVec3;

use crate::config::PoolConfig;
use crate::entity::{EntityCategory, EntityId};
use crate::litter::LocationValidator;
use crate::pool::EntityPool;

/// A pool over a small 8x8-cell world, capacity as given.
pub fn small_pool(capacity: u16) -> EntityPool {
    EntityPool::new(PoolConfig {
        capacity,
        // The shipping reserve would swallow these tiny arenas whole.
        misc_reserve: 2,
        world_cells: 8,
        cell_shift: 5,
        ..PoolConfig::default()
    })
    .unwrap()
}

/// Map stub that owns every tile.
pub struct OpenMap;

impl LocationValidator for OpenMap {
    fn is_location_owned_and_unobstructed(&self, _: i32, _: i32, _: i32) -> bool {
        true
    }
}

/// Allocates a generic entity and places it at `(x, y, 0)`.
pub fn place_generic(pool: &mut EntityPool, x: i32, y: i32) -> EntityId {
    let id = pool.allocate(EntityCategory::Generic).expect("pool has room");
    pool.relocate(id, IVec3::new(x, y, 0));
    id
}

/// One scripted pool operation. Handle-valued operations pick from the
/// replay's live set by wrapping index, so any sequence is valid on any
/// pool state.
#[derive(Debug, Clone)]
pub enum Op {
    /// Allocate into a live category.
    Spawn(EntityCategory),
    /// Release the k-th live handle.
    Release(usize),
    /// Relocate the k-th live handle.
    Relocate(usize, i32, i32),
    /// Move the k-th live handle to another live category.
    Recategorize(usize, EntityCategory),
}

/// Applies a scripted sequence, advancing the tick after each operation.
/// Returns the handles still live at the end.
pub fn replay(pool: &mut EntityPool, ops: &[Op]) -> Vec<EntityId> {
    let mut live: Vec<EntityId> = Vec::new();
    for op in ops {
        match op {
            Op::Spawn(category) if *category != EntityCategory::Free => {
                if let Some(id) = pool.allocate(*category) {
                    live.push(id);
                }
            }
            Op::Release(k) if !live.is_empty() => {
                let id = live.remove(k % live.len());
                pool.release(id);
            }
            Op::Relocate(k, x, y) if !live.is_empty() => {
                let id = live[k % live.len()];
                pool.relocate(id, IVec3::new(*x, *y, 0));
            }
            Op::Recategorize(k, category)
                if !live.is_empty() && *category != EntityCategory::Free =>
            {
                let id = live[k % live.len()];
                pool.move_to_category(id, *category);
            }
            _ => {}
        }
        pool.advance_tick();
    }
    live
}
