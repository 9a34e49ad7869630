//! Structural diagnostics and repair for the pool's linked structures.
//!
//! The arena and its chains are persisted to save files and exchanged
//! during network synchronization, so corrupted or version-skewed data can
//! arrive with cycles, cross-linked chains, or slots no list can reach.
//! The passes here detect that with [`plait::scan`] (one shared tortoise/
//! hare primitive for category lists, the free list, and every spatial
//! cell) and restore the invariants without losing a reachable entity.
//!
//! All passes are linear in arena size or worse and are meant for load and
//! resync boundaries, never the per-tick hot path.
//!
//! # Entry points
//!
//! - [`audit`]: what would [`repair`] fix? Read-only.
//! - [`repair`]: detect and fix, returning per-pass counts.
//! - [`rebuild_spatial`]: wholesale reconstruction of every cell chain
//!   from entity positions, the belt-and-braces step after a bulk load.

use tracing::warn;

use crate::entity::{Entity, EntityCategory, EntityId, SlotIndex};
use crate::pool::EntityPool;

/// Counts of anomalies found (and, after [`repair`], fixed).
///
/// A report of all zeroes means the structures were already sound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairReport {
    /// Links or list heads that pointed outside the arena.
    pub out_of_range: usize,
    /// Category chains (free list included) that re-entered themselves.
    pub category_cycles: usize,
    /// Spatial cell chains that re-entered themselves.
    pub spatial_cycles: usize,
    /// Detached fragment slots re-appended to the chain that lost them.
    pub relinked: usize,
    /// Chains truncated because another list already owned the slot.
    pub duplicates_cut: usize,
    /// Vacant slots that no walk from the free head could reach, spliced
    /// back onto the free tail.
    pub reclaimed_free: usize,
    /// Occupied slots found outside any live list (or stranded on the free
    /// list) and relinked into their kind's category.
    pub rescued: usize,
    /// Records whose stored identity disagreed with their slot.
    pub identity_fixes: usize,
    /// Spatial links corrected against entity positions: members removed
    /// from cells they do not belong to, plus positioned entities
    /// reinserted after going missing from the grid.
    pub spatial_fixes: usize,
}

impl RepairReport {
    /// True when nothing was found.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }

    /// Total anomaly count across every pass.
    #[must_use]
    pub fn total(&self) -> usize {
        self.out_of_range
            + self.category_cycles
            + self.spatial_cycles
            + self.relinked
            + self.duplicates_cut
            + self.reclaimed_free
            + self.rescued
            + self.identity_fixes
            + self.spatial_fixes
    }
}

/// Reports what [`repair`] would fix, without mutating the pool.
#[must_use]
pub fn audit(pool: &EntityPool) -> RepairReport {
    repair_impl(&mut pool.clone(), true)
}

/// Detects and fixes structural corruption in the category lists and the
/// spatial grid.
///
/// Repair may reorder chains — ordering is not an invariant — but never
/// drops a reachable live entity: occupied slots always end up linked into
/// a live category, vacant slots onto the free list, and positioned
/// entities into exactly the cell matching their coordinates.
pub fn repair(pool: &mut EntityPool) -> RepairReport {
    repair_impl(pool, false)
}

fn repair_impl(pool: &mut EntityPool, quiet: bool) -> RepairReport {
    let mut report = RepairReport::default();
    sanitize_ranges(pool, &mut report);
    repair_category_chains(pool, &mut report);
    let claimed = normalize_category_chains(pool, &mut report);
    sweep_slots(pool, &claimed, &mut report);
    repair_spatial_chains(pool, &mut report);
    sweep_spatial_membership(pool, &mut report);

    if !quiet && !report.is_clean() {
        warn!(
            anomalies = report.total(),
            out_of_range = report.out_of_range,
            category_cycles = report.category_cycles,
            spatial_cycles = report.spatial_cycles,
            reclaimed_free = report.reclaimed_free,
            rescued = report.rescued,
            "entity pool repaired after structural corruption"
        );
    }
    report
}

/// Rebuilds every spatial cell chain from entity positions.
///
/// Unlike the repair passes this does not try to preserve chain order; it
/// is the cheap, total answer after a bulk load, once [`repair`] has made
/// the category side trustworthy.
pub fn rebuild_spatial(pool: &mut EntityPool) {
    pool.grid.clear();
    for index in 0..pool.capacity() {
        if let Some(pos) = pool.slots[index].as_ref().and_then(Entity::position) {
            let key = pool.grid.key_at(pos.x, pos.y);
            pool.grid.insert(SlotIndex::new(index as u16), key);
        }
    }
}

/// Nulls out any link or head that points outside the arena. Such values
/// can only come from deserialized data.
fn sanitize_ranges(pool: &mut EntityPool, report: &mut RepairReport) {
    let capacity = pool.capacity();
    let in_range = |slot: &SlotIndex| slot.as_usize() < capacity;

    for link in &mut pool.links {
        if link.next.is_some_and(|s| !in_range(&s)) {
            link.next = None;
            report.out_of_range += 1;
        }
        if link.prev.is_some_and(|s| !in_range(&s)) {
            link.prev = None;
            report.out_of_range += 1;
        }
    }
    for list in &mut pool.lists {
        if list.head.is_some_and(|s| !in_range(&s)) {
            list.head = None;
            report.out_of_range += 1;
        }
        if list.tail.is_some_and(|s| !in_range(&s)) {
            list.tail = None;
            report.out_of_range += 1;
        }
    }
    for cell in 0..pool.grid.cell_count() {
        if pool.grid.raw_head(cell).is_some_and(|s| !in_range(&s)) {
            *pool.grid.head_mut(cell) = None;
            report.out_of_range += 1;
        }
    }
    for slot in 0..pool.grid.slot_capacity() {
        let stale = pool
            .grid
            .next_of(SlotIndex::new(slot as u16))
            .is_some_and(|s| !in_range(&s));
        if stale {
            *pool.grid.link_mut(slot) = None;
            report.out_of_range += 1;
        }
    }
}

/// Cuts any cycle in each category chain and re-appends the detached
/// fragment, free list included — one uniform algorithm for all six.
fn repair_category_chains(pool: &mut EntityPool, report: &mut RepairReport) {
    let capacity = pool.capacity();
    for category in EntityCategory::ALL {
        let head = pool.lists[category.index()].head.map(SlotIndex::as_usize);

        let meet = {
            let links = &pool.links;
            match plait::scan(head, |i| links[i].next.map(SlotIndex::as_usize)) {
                plait::Scan::Clean { .. } => None,
                plait::Scan::Cyclic { meet } => Some(meet),
            }
        };
        let Some(meet) = meet else { continue };

        report.category_cycles += 1;
        let detached = pool.links[meet].next.take().map(SlotIndex::as_usize);

        // The chain from the head now terminates at the cut; everything
        // after the cut may have become unreachable. Walk the fragment and
        // re-append whatever the healed chain does not already contain.
        let mut in_chain = {
            let links = &pool.links;
            plait::reachable(head, |i| links[i].next.map(SlotIndex::as_usize), capacity)
        };
        let mut tail = meet;
        let mut cursor = detached;
        while let Some(node) = cursor {
            if in_chain[node] {
                break;
            }
            cursor = pool.links[node].next.map(SlotIndex::as_usize);
            pool.links[tail].next = Some(SlotIndex::new(node as u16));
            pool.links[node].prev = Some(SlotIndex::new(tail as u16));
            pool.links[node].next = None;
            pool.links[node].category = category;
            in_chain[node] = true;
            tail = node;
            report.relinked += 1;
        }
    }
}

/// Walks every (now acyclic) chain rewriting `prev` links, category tags,
/// tails, and population counts from what is physically linked. A slot
/// already claimed by an earlier list truncates the later chain — no two
/// chains may share a node.
///
/// Returns the claim bitmap for the orphan sweep.
fn normalize_category_chains(pool: &mut EntityPool, report: &mut RepairReport) -> Vec<bool> {
    let mut claimed = vec![false; pool.capacity()];
    for category in EntityCategory::ALL {
        let mut count: u16 = 0;
        let mut prev: Option<SlotIndex> = None;
        let mut cursor = pool.lists[category.index()].head;
        while let Some(slot) = cursor {
            let index = slot.as_usize();
            if claimed[index] {
                report.duplicates_cut += 1;
                match prev {
                    Some(p) => pool.links[p.as_usize()].next = None,
                    None => pool.lists[category.index()].head = None,
                }
                break;
            }
            claimed[index] = true;
            cursor = pool.links[index].next;
            pool.links[index].category = category;
            pool.links[index].prev = prev;
            prev = Some(slot);
            count += 1;
        }
        let list = &mut pool.lists[category.index()];
        list.tail = prev;
        list.count = count;
    }
    claimed
}

/// Restores the slot-level invariants: every occupied slot in a live list,
/// every vacant slot on the free list, every record's identity matching
/// its slot and generation table entry.
fn sweep_slots(pool: &mut EntityPool, claimed: &[bool], report: &mut RepairReport) {
    for index in 0..pool.capacity() {
        let slot = SlotIndex::new(index as u16);

        if let Some(entity) = pool.slots[index].as_mut() {
            if entity.id().slot() != slot {
                entity.set_id(EntityId::new(slot, entity.id().generation()));
                report.identity_fixes += 1;
            }
            let generation = entity.id().generation();
            if pool.generations[index] != generation {
                pool.generations[index] = generation;
                report.identity_fixes += 1;
            }
        }

        let occupied = pool.slots[index].is_some();
        let category = pool.links[index].category;
        if !claimed[index] {
            // Orphan: no chain reaches this slot.
            let target = match &pool.slots[index] {
                Some(entity) => {
                    report.rescued += 1;
                    entity.kind().category()
                }
                None => {
                    report.reclaimed_free += 1;
                    EntityCategory::Free
                }
            };
            // The slot was never counted into any list, so there is no
            // unlink half to this move.
            pool.link_tail(slot, target);
        } else if occupied && category == EntityCategory::Free {
            pool.unlink(slot);
            let target = pool.slots[index]
                .as_ref()
                .expect("occupied slot")
                .kind()
                .category();
            pool.link_tail(slot, target);
            report.rescued += 1;
        } else if !occupied && category != EntityCategory::Free {
            pool.unlink(slot);
            pool.link_tail(slot, EntityCategory::Free);
            report.reclaimed_free += 1;
        }
    }
}

/// Cuts cycles in each spatial cell chain and re-appends detached
/// fragments, mirroring the category pass.
fn repair_spatial_chains(pool: &mut EntityPool, report: &mut RepairReport) {
    let capacity = pool.grid.slot_capacity();
    for cell in 0..pool.grid.cell_count() {
        let head = pool.grid.raw_head(cell).map(SlotIndex::as_usize);

        let meet = {
            let grid = &pool.grid;
            let next = |i: usize| grid.next_of(SlotIndex::new(i as u16)).map(SlotIndex::as_usize);
            match plait::scan(head, next) {
                plait::Scan::Clean { .. } => None,
                plait::Scan::Cyclic { meet } => Some(meet),
            }
        };
        let Some(meet) = meet else { continue };

        report.spatial_cycles += 1;
        let detached = pool.grid.link_mut(meet).take().map(SlotIndex::as_usize);

        let mut in_chain = {
            let grid = &pool.grid;
            let next = |i: usize| grid.next_of(SlotIndex::new(i as u16)).map(SlotIndex::as_usize);
            plait::reachable(head, next, capacity)
        };
        let mut tail = meet;
        let mut cursor = detached;
        while let Some(node) = cursor {
            if in_chain[node] {
                break;
            }
            cursor = pool.grid.next_of(SlotIndex::new(node as u16)).map(SlotIndex::as_usize);
            *pool.grid.link_mut(tail) = Some(SlotIndex::new(node as u16));
            *pool.grid.link_mut(node) = None;
            in_chain[node] = true;
            tail = node;
            report.relinked += 1;
        }
    }
}

/// Reconciles cell membership with entity positions: drops members from
/// cells they do not belong to (and duplicate appearances), then reinserts
/// positioned entities the grid lost track of.
fn sweep_spatial_membership(pool: &mut EntityPool, report: &mut RepairReport) {
    let capacity = pool.capacity();
    let expected: Vec<Option<usize>> = (0..capacity)
        .map(|index| {
            pool.slots[index]
                .as_ref()
                .and_then(Entity::position)
                .map(|pos| pool.grid.key_at(pos.x, pos.y).as_usize())
        })
        .collect();

    let mut placed = vec![false; capacity];
    for cell in 0..pool.grid.cell_count() {
        let mut kept_prev: Option<usize> = None;
        let mut cursor = pool.grid.raw_head(cell).map(SlotIndex::as_usize);
        while let Some(node) = cursor {
            cursor = pool.grid.next_of(SlotIndex::new(node as u16)).map(SlotIndex::as_usize);
            if expected[node] == Some(cell) && !placed[node] {
                placed[node] = true;
                kept_prev = Some(node);
            } else {
                let follow = pool.grid.link_mut(node).take();
                match kept_prev {
                    Some(p) => *pool.grid.link_mut(p) = follow,
                    None => *pool.grid.head_mut(cell) = follow,
                }
                report.spatial_fixes += 1;
            }
        }
    }

    for index in 0..capacity {
        if let Some(cell) = expected[index] {
            if !placed[index] {
                let key_head = pool.grid.head_mut(cell);
                let old_head = key_head.take();
                *key_head = Some(SlotIndex::new(index as u16));
                *pool.grid.link_mut(index) = old_head;
                report.spatial_fixes += 1;
            }
        }
    }
}
