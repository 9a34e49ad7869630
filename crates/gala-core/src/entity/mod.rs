//! Entity identity, classification, and the arena record itself.
//!
//! This module provides the core vocabulary of the pool:
//! - [`SlotIndex`]: a raw arena position, the unit all links are built from
//! - [`EntityId`]: a generation-checked handle to an occupied slot
//! - [`EntityCategory`]: which simulation list currently owns a slot
//! - [`EntityKind`]: the tagged payload describing what occupies a slot
//! - [`Entity`]: the fixed-layout record stored in the arena
//!
//! # Identity
//!
//! Slots are addressed by index, never by reference: the arena never moves,
//! but a slot's *occupant* changes every time it is recycled. A bare index
//! therefore says which slot, not which entity. [`EntityId`] pairs the index
//! with the slot's generation at allocation time, so a handle held across a
//! release/reallocate cycle is detectably stale instead of silently aliasing
//! the new occupant.

pub mod kinds;

use glam::IVec3;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use kinds::{
    EffectData, GuestData, GuestFlags, LitterData, LitterKind, StaffData, StaffRole, VehicleData,
};

/// A raw arena position.
///
/// `SlotIndex` is how the link tables, the spatial grid, and the persistence
/// layer address slots. It carries no liveness information — most callers
/// want [`EntityId`] instead, and only repair/persistence tooling should
/// traffic in bare indices.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SlotIndex(u16);

impl SlotIndex {
    /// Creates a slot index from a raw `u16` value.
    #[must_use]
    pub const fn new(index: u16) -> Self {
        Self(index)
    }

    /// Returns the raw `u16` value.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Returns the index widened for table addressing.
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SlotIndex({})", self.0)
    }
}

impl fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A generation-checked handle to a live entity.
///
/// The generation is the slot's recycle count at allocation time. Every
/// accessor on the pool verifies it, so a handle outliving its entity fails
/// loudly (or softly, via the `try_` accessors) rather than reading whatever
/// now occupies the slot.
///
/// # Example
///
/// ```
/// use gala_core::entity::{EntityId, SlotIndex};
///
/// let id = EntityId::new(SlotIndex::new(7), 0);
/// assert_eq!(id.slot().as_u16(), 7);
/// assert_eq!(id.generation(), 0);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId {
    slot: SlotIndex,
    generation: u16,
}

impl EntityId {
    /// Creates a handle from a slot index and a generation.
    ///
    /// Handles are normally minted by the pool; constructing one by hand is
    /// only useful for persistence tooling and tests.
    #[must_use]
    pub const fn new(slot: SlotIndex, generation: u16) -> Self {
        Self { slot, generation }
    }

    /// Returns the arena position this handle refers to.
    #[must_use]
    pub const fn slot(self) -> SlotIndex {
        self.slot
    }

    /// Returns the slot generation this handle was minted against.
    #[must_use]
    pub const fn generation(self) -> u16 {
        self.generation
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({}v{})", self.slot.0, self.generation)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.slot.0, self.generation)
    }
}

/// The simulation list that currently owns a slot.
///
/// Every slot belongs to exactly one category list at all times, including
/// vacant slots, which belong to [`EntityCategory::Free`]. Category
/// membership is orthogonal to spatial membership: moving between lists
/// never touches the grid and vice versa.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EntityCategory {
    /// Vacant slots awaiting allocation.
    Free = 0,
    /// Ride vehicles and their trains.
    Train,
    /// Guests and staff.
    Peep,
    /// Visual-only effects (steam, money pickups, balloons, explosions).
    Misc,
    /// Dropped litter.
    Litter,
    /// Catch-all for entities no subsystem has claimed.
    Generic,
}

impl EntityCategory {
    /// Number of category lists.
    pub const COUNT: usize = 6;

    /// Every category, in list-table order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Free,
        Self::Train,
        Self::Peep,
        Self::Misc,
        Self::Litter,
        Self::Generic,
    ];

    /// Position of this category in the list table.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Whether entities in this category interpolate between tick snapshots.
    ///
    /// Trains, peeps, and unclaimed entities move smoothly enough to be
    /// worth tweening; litter and one-shot effects render at their exact
    /// simulated position every frame.
    #[must_use]
    pub const fn is_tween_eligible(self) -> bool {
        matches!(self, Self::Train | Self::Peep | Self::Generic)
    }
}

impl fmt::Display for EntityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Free => "Free",
            Self::Train => "Train",
            Self::Peep => "Peep",
            Self::Misc => "Misc",
            Self::Litter => "Litter",
            Self::Generic => "Generic",
        };
        write!(f, "{name}")
    }
}

/// Tagged payload describing what occupies a slot.
///
/// The variant set is closed and known at compile time, so per-tick dispatch
/// is a `match`, not virtual dispatch. Each variant's payload struct lives
/// in [`kinds`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityKind {
    /// A ride vehicle (car, train head, boat).
    Vehicle(VehicleData),
    /// A park guest.
    Guest(GuestData),
    /// A staff member.
    Staff(StaffData),
    /// A piece of dropped litter.
    Litter(LitterData),
    /// A visual-only effect.
    Effect(EffectData),
    /// An unclaimed entity with no specialized payload.
    Generic,
}

impl EntityKind {
    /// Returns the category list this kind of entity belongs in.
    #[must_use]
    pub const fn category(&self) -> EntityCategory {
        match self {
            Self::Vehicle(_) => EntityCategory::Train,
            Self::Guest(_) | Self::Staff(_) => EntityCategory::Peep,
            Self::Litter(_) => EntityCategory::Litter,
            Self::Effect(_) => EntityCategory::Misc,
            Self::Generic => EntityCategory::Generic,
        }
    }

    /// Default payload for a freshly allocated slot in `category`.
    #[must_use]
    pub fn default_for(category: EntityCategory) -> Self {
        match category {
            EntityCategory::Free => unreachable!("free slots hold no record"),
            EntityCategory::Train => Self::Vehicle(VehicleData::default()),
            EntityCategory::Peep => Self::Guest(GuestData::default()),
            EntityCategory::Misc => Self::Effect(EffectData::default()),
            EntityCategory::Litter => Self::Litter(LitterData::default()),
            EntityCategory::Generic => Self::Generic,
        }
    }

    /// Half-extent of the projected sprite, (half width, half height).
    #[must_use]
    pub(crate) const fn sprite_half_extent(&self) -> (i32, i32) {
        match self {
            Self::Vehicle(_) => (16, 16),
            Self::Guest(_) | Self::Staff(_) => (8, 12),
            Self::Litter(_) => (4, 4),
            Self::Effect(_) | Self::Generic => (8, 8),
        }
    }

    /// Returns the vehicle payload, if this is a vehicle.
    #[must_use]
    pub const fn as_vehicle(&self) -> Option<&VehicleData> {
        match self {
            Self::Vehicle(data) => Some(data),
            _ => None,
        }
    }

    /// Returns the mutable vehicle payload, if this is a vehicle.
    #[must_use]
    pub fn as_vehicle_mut(&mut self) -> Option<&mut VehicleData> {
        match self {
            Self::Vehicle(data) => Some(data),
            _ => None,
        }
    }

    /// Returns the guest payload, if this is a guest.
    #[must_use]
    pub const fn as_guest(&self) -> Option<&GuestData> {
        match self {
            Self::Guest(data) => Some(data),
            _ => None,
        }
    }

    /// Returns the mutable guest payload, if this is a guest.
    #[must_use]
    pub fn as_guest_mut(&mut self) -> Option<&mut GuestData> {
        match self {
            Self::Guest(data) => Some(data),
            _ => None,
        }
    }

    /// Returns the staff payload, if this is a staff member.
    #[must_use]
    pub const fn as_staff(&self) -> Option<&StaffData> {
        match self {
            Self::Staff(data) => Some(data),
            _ => None,
        }
    }

    /// Returns the mutable staff payload, if this is a staff member.
    #[must_use]
    pub fn as_staff_mut(&mut self) -> Option<&mut StaffData> {
        match self {
            Self::Staff(data) => Some(data),
            _ => None,
        }
    }

    /// Returns the litter payload, if this is litter.
    #[must_use]
    pub const fn as_litter(&self) -> Option<&LitterData> {
        match self {
            Self::Litter(data) => Some(data),
            _ => None,
        }
    }

    /// Returns the effect payload, if this is an effect.
    #[must_use]
    pub const fn as_effect(&self) -> Option<&EffectData> {
        match self {
            Self::Effect(data) => Some(data),
            _ => None,
        }
    }

    /// Returns the mutable effect payload, if this is an effect.
    #[must_use]
    pub fn as_effect_mut(&mut self) -> Option<&mut EffectData> {
        match self {
            Self::Effect(data) => Some(data),
            _ => None,
        }
    }
}

/// A projected screen-space bounding rectangle, used for redraw
/// invalidation.
///
/// This is render bookkeeping, not gameplay state: it is recomputed
/// whenever the position changes and excluded from the network checksum.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenRect {
    /// Left edge, inclusive.
    pub left: i32,
    /// Top edge, inclusive.
    pub top: i32,
    /// Right edge, inclusive.
    pub right: i32,
    /// Bottom edge, inclusive.
    pub bottom: i32,
}

impl ScreenRect {
    /// The empty rectangle used for off-world entities.
    pub const ZERO: Self = Self {
        left: 0,
        top: 0,
        right: 0,
        bottom: 0,
    };

    /// Projects a world position into an isometric screen rectangle.
    #[must_use]
    pub fn project(pos: IVec3, half_width: i32, half_height: i32) -> Self {
        let screen_x = pos.y - pos.x;
        let screen_y = (pos.x + pos.y) / 2 - pos.z;
        Self {
            left: screen_x - half_width,
            top: screen_y - half_height,
            right: screen_x + half_width,
            bottom: screen_y + half_height,
        }
    }
}

/// The fixed-layout record stored in every occupied arena slot.
///
/// The record keeps its own [`EntityId`] so repair and persistence tooling
/// can recover a handle from a bare record. Category membership and the
/// list links live in the pool's link table, not here; the spatial chain
/// link lives in the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    id: EntityId,
    kind: EntityKind,
    position: Option<IVec3>,
    screen: ScreenRect,
    name: Option<String>,
    created_tick: u64,
}

impl Entity {
    pub(crate) fn new(id: EntityId, kind: EntityKind, created_tick: u64) -> Self {
        Self {
            id,
            kind,
            position: None,
            screen: ScreenRect::ZERO,
            name: None,
            created_tick,
        }
    }

    /// Returns this entity's handle.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Returns the kind payload.
    #[must_use]
    pub const fn kind(&self) -> &EntityKind {
        &self.kind
    }

    /// Returns the mutable kind payload.
    ///
    /// Replacing the payload with one of a *different* kind is only valid
    /// through the pool, which keeps category membership in step.
    #[must_use]
    pub fn kind_mut(&mut self) -> &mut EntityKind {
        &mut self.kind
    }

    /// Returns the world position, or `None` when off-world.
    #[must_use]
    pub const fn position(&self) -> Option<IVec3> {
        self.position
    }

    /// Returns the projected screen rectangle for redraw invalidation.
    #[must_use]
    pub const fn screen_rect(&self) -> ScreenRect {
        self.screen
    }

    /// Returns the display name, if one has been assigned.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Assigns or clears the display name.
    pub fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    /// Returns the tick this entity was created on.
    #[must_use]
    pub const fn created_tick(&self) -> u64 {
        self.created_tick
    }

    /// Writes the position and recomputes the screen rectangle in one step,
    /// so no frame can observe a position/rectangle mismatch.
    pub(crate) fn set_position(&mut self, position: Option<IVec3>) {
        self.position = position;
        self.screen = match position {
            Some(pos) => {
                let (hw, hh) = self.kind.sprite_half_extent();
                ScreenRect::project(pos, hw, hh)
            }
            None => ScreenRect::ZERO,
        };
    }

    pub(crate) fn set_kind(&mut self, kind: EntityKind) {
        self.kind = kind;
        // Extents differ per kind, so the cached projection may have moved.
        let position = self.position;
        self.set_position(position);
    }

    pub(crate) fn refresh_created_tick(&mut self, tick: u64) {
        self.created_tick = tick;
    }

    pub(crate) fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }
}
