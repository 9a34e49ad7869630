//! Coarse spatial index over the world plane.
//!
//! The world is quantized into square cells of `1 << cell_shift` world
//! units. Each cell stores the head of a singly linked chain of slots, and
//! the chain links live in a grid-owned table indexed by slot — the grid
//! never inspects entity records. There is no back link: removal walks the
//! bucket to find the predecessor, which stays cheap because bucket
//! occupancy is small relative to the world.
//!
//! The grid deliberately knows nothing about liveness or generations. The
//! pool is the only writer and guarantees that a slot is linked into at
//! most one cell at a time, and into none at all while off-world.

use glam::IVec3;
use serde::{Deserialize, Serialize};

use crate::config::PoolConfig;
use crate::entity::SlotIndex;

/// A quantized cell address, usable as a dense array key.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellKey(u32);

impl CellKey {
    /// Returns the raw dense-array index.
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// Dense grid of per-cell entity chains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpatialGrid {
    cell_shift: u8,
    world_cells: u16,
    /// Head of each cell's chain, indexed by [`CellKey`].
    heads: Vec<Option<SlotIndex>>,
    /// Per-slot forward link within its cell's chain.
    next: Vec<Option<SlotIndex>>,
}

impl SpatialGrid {
    pub(crate) fn new(config: &PoolConfig) -> Self {
        let cells = usize::from(config.world_cells) * usize::from(config.world_cells);
        Self {
            cell_shift: config.cell_shift,
            world_cells: config.world_cells,
            heads: vec![None; cells],
            next: vec![None; usize::from(config.capacity)],
        }
    }

    /// Edge length of one cell in world units.
    #[must_use]
    pub const fn cell_size(&self) -> i32 {
        1 << self.cell_shift
    }

    /// Number of cells in the grid.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.heads.len()
    }

    /// Clamps a position into the world bounds.
    ///
    /// Every coordinate the grid quantizes has been through this, so a
    /// computed [`CellKey`] is always a valid dense index.
    #[must_use]
    pub fn clamp(&self, pos: IVec3) -> IVec3 {
        let edge = (i32::from(self.world_cells) << self.cell_shift) - 1;
        IVec3::new(
            pos.x.clamp(0, edge),
            pos.y.clamp(0, edge),
            pos.z.clamp(0, PoolConfig::MAX_ELEVATION),
        )
    }

    /// Quantizes clamped world coordinates to a cell key.
    #[must_use]
    pub fn key_at(&self, x: i32, y: i32) -> CellKey {
        debug_assert!(x >= 0 && (x >> self.cell_shift) < i32::from(self.world_cells));
        debug_assert!(y >= 0 && (y >> self.cell_shift) < i32::from(self.world_cells));
        let cx = (x >> self.cell_shift) as u32;
        let cy = (y >> self.cell_shift) as u32;
        CellKey(cx * u32::from(self.world_cells) + cy)
    }

    /// Returns the first slot in a cell's chain, if any.
    #[must_use]
    pub fn first_in(&self, key: CellKey) -> Option<SlotIndex> {
        self.heads[key.as_usize()]
    }

    /// Iterates a cell's chain from head to terminator.
    pub fn chain(&self, key: CellKey) -> impl Iterator<Item = SlotIndex> + '_ {
        ChainIter {
            grid: self,
            cursor: self.first_in(key),
        }
    }

    /// Returns the slot following `slot` in its cell chain.
    #[must_use]
    pub fn next_of(&self, slot: SlotIndex) -> Option<SlotIndex> {
        self.next[slot.as_usize()]
    }

    /// Prepends `slot` to the chain of `key`.
    pub(crate) fn insert(&mut self, slot: SlotIndex, key: CellKey) {
        let cell = key.as_usize();
        self.next[slot.as_usize()] = self.heads[cell];
        self.heads[cell] = Some(slot);
    }

    /// Unlinks `slot` from the chain of `key`, patching the predecessor.
    pub(crate) fn remove(&mut self, slot: SlotIndex, key: CellKey) {
        let cell = key.as_usize();
        let follow = self.next[slot.as_usize()].take();
        if self.heads[cell] == Some(slot) {
            self.heads[cell] = follow;
            return;
        }
        let mut cursor = self.heads[cell];
        while let Some(current) = cursor {
            let here = current.as_usize();
            if self.next[here] == Some(slot) {
                self.next[here] = follow;
                return;
            }
            cursor = self.next[here];
        }
        debug_assert!(false, "slot {slot} was not linked into its recorded cell");
    }

    /// Empties every cell chain.
    pub(crate) fn clear(&mut self) {
        self.heads.fill(None);
        self.next.fill(None);
    }

    pub(crate) fn head_mut(&mut self, cell: usize) -> &mut Option<SlotIndex> {
        &mut self.heads[cell]
    }

    pub(crate) fn link_mut(&mut self, slot: usize) -> &mut Option<SlotIndex> {
        &mut self.next[slot]
    }

    pub(crate) fn raw_head(&self, cell: usize) -> Option<SlotIndex> {
        self.heads[cell]
    }

    pub(crate) fn slot_capacity(&self) -> usize {
        self.next.len()
    }
}

struct ChainIter<'a> {
    grid: &'a SpatialGrid,
    cursor: Option<SlotIndex>,
}

impl Iterator for ChainIter<'_> {
    type Item = SlotIndex;

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.cursor?;
        self.cursor = self.grid.next_of(slot);
        Some(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> SpatialGrid {
        SpatialGrid::new(&PoolConfig {
            capacity: 16,
            world_cells: 4,
            cell_shift: 5,
            ..PoolConfig::default()
        })
    }

    #[test]
    fn keys_quantize_by_cell_size() {
        let grid = grid();
        assert_eq!(grid.cell_size(), 32);
        assert_eq!(grid.key_at(0, 0), grid.key_at(31, 31));
        assert_ne!(grid.key_at(0, 0), grid.key_at(32, 0));
        assert_ne!(grid.key_at(0, 0), grid.key_at(0, 32));
    }

    #[test]
    fn clamp_bounds_coordinates() {
        let grid = grid();
        let clamped = grid.clamp(IVec3::new(-5, 9999, -1));
        assert_eq!(clamped.x, 0);
        assert_eq!(clamped.y, 4 * 32 - 1);
        assert_eq!(clamped.z, 0);
    }

    #[test]
    fn insert_prepends() {
        let mut grid = grid();
        let key = grid.key_at(0, 0);
        grid.insert(SlotIndex::new(1), key);
        grid.insert(SlotIndex::new(2), key);
        let chain: Vec<_> = grid.chain(key).collect();
        assert_eq!(chain, vec![SlotIndex::new(2), SlotIndex::new(1)]);
    }

    #[test]
    fn remove_head_and_interior() {
        let mut grid = grid();
        let key = grid.key_at(0, 0);
        for slot in 0..3 {
            grid.insert(SlotIndex::new(slot), key);
        }
        // Chain is 2 -> 1 -> 0; remove the interior slot first.
        grid.remove(SlotIndex::new(1), key);
        assert_eq!(
            grid.chain(key).collect::<Vec<_>>(),
            vec![SlotIndex::new(2), SlotIndex::new(0)]
        );
        grid.remove(SlotIndex::new(2), key);
        assert_eq!(grid.first_in(key), Some(SlotIndex::new(0)));
        grid.remove(SlotIndex::new(0), key);
        assert_eq!(grid.first_in(key), None);
    }

    #[test]
    fn chains_are_per_cell() {
        let mut grid = grid();
        grid.insert(SlotIndex::new(0), grid.key_at(0, 0));
        grid.insert(SlotIndex::new(1), grid.key_at(32, 0));
        assert_eq!(grid.chain(grid.key_at(0, 0)).count(), 1);
        assert_eq!(grid.chain(grid.key_at(32, 0)).count(), 1);
    }

    #[test]
    fn clear_empties_every_cell() {
        let mut grid = grid();
        grid.insert(SlotIndex::new(0), grid.key_at(0, 0));
        grid.clear();
        assert_eq!(grid.first_in(grid.key_at(0, 0)), None);
    }

    #[test]
    fn serialization_roundtrip() {
        let mut grid = grid();
        grid.insert(SlotIndex::new(3), grid.key_at(64, 64));
        let json = serde_json::to_string(&grid).unwrap();
        let back: SpatialGrid = serde_json::from_str(&json).unwrap();
        assert_eq!(grid, back);
    }
}
