//! Per-kind payload structs for entity records.
//!
//! Each payload holds the state specific to one entity kind. Simulation
//! rules that read or write these live with their subsystems (ride logic,
//! peep AI); the pool only stores them, recycles them, and feeds the
//! gameplay-relevant fields into the network checksum.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Payload for ride vehicles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleData {
    /// The ride this vehicle belongs to.
    pub ride: u16,
    /// Whether this car leads its train.
    pub is_head: bool,
    /// Signed velocity along the track, in fixed-point world units per tick.
    pub velocity: i32,
    /// Progress along the current track element.
    pub track_progress: u32,
}

bitflags! {
    /// Pending UI redraw reasons for a guest.
    ///
    /// Purely presentational: set when guest state changes that an open
    /// inspection window would display, cleared when the window repaints.
    /// Excluded from the network checksum because peers legitimately
    /// diverge on which windows are open.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct GuestFlags: u32 {
        /// Stats tab needs repainting.
        const STATS = 1;
        /// Inventory tab needs repainting.
        const INVENTORY = 1 << 1;
        /// Thoughts tab needs repainting.
        const THOUGHTS = 1 << 2;
        /// Current-action readout needs repainting.
        const ACTION = 1 << 3;
    }
}

/// Payload for park guests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestData {
    /// Remaining energy, 0-255.
    pub energy: u8,
    /// Current happiness, 0-255.
    pub happiness: u8,
    /// Cash on hand, in the park currency's minor unit.
    pub cash: i32,
    /// Pending UI redraw reasons.
    pub invalidation: GuestFlags,
}

impl Default for GuestData {
    fn default() -> Self {
        Self {
            energy: 128,
            happiness: 128,
            cash: 0,
            invalidation: GuestFlags::empty(),
        }
    }
}

/// Job assignment for staff members.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StaffRole {
    /// Sweeps litter and empties bins.
    #[default]
    Handyman,
    /// Inspects and repairs rides.
    Mechanic,
    /// Patrols against vandalism.
    Security,
    /// Performs for nearby guests.
    Entertainer,
}

/// Payload for staff members.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffData {
    /// The staff member's job.
    pub role: StaffRole,
    /// Bitmask of standing orders for this role.
    pub orders: u8,
}

/// What a piece of litter looks like.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LitterKind {
    /// Generic discarded rubbish.
    #[default]
    Rubbish,
    /// An empty drink can.
    EmptyCan,
    /// An empty bottle.
    EmptyBottle,
    /// Broken glass.
    BrokenGlass,
    /// A guest was sick here.
    Sick,
}

/// Payload for dropped litter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LitterData {
    /// What the litter looks like.
    pub kind: LitterKind,
}

/// Payload for visual-only effects.
///
/// Effects carry no gameplay authority — peers may legitimately differ on
/// which effects exist, which is why the whole misc category is excluded
/// from the network checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectData {
    /// A puff of steam that rises and dissipates.
    Steam {
        /// Animation frame, advanced once per tick.
        frame: u16,
    },
    /// A floating indicator for money picked up or spent.
    MoneyPickup {
        /// Amount displayed, in the park currency's minor unit.
        amount: i32,
    },
    /// A balloon drifting upward.
    Balloon {
        /// Palette index of the balloon.
        colour: u8,
        /// Set once the balloon has burst; it is released next tick.
        popped: bool,
    },
    /// An explosion cloud running a fixed frame strip.
    ExplosionCloud {
        /// Animation frame, advanced once per tick.
        frame: u16,
    },
}

impl Default for EffectData {
    fn default() -> Self {
        Self::Steam { frame: 0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payloads_default() {
        assert_eq!(VehicleData::default().velocity, 0);
        assert_eq!(GuestData::default().invalidation, GuestFlags::empty());
        assert_eq!(StaffData::default().role, StaffRole::Handyman);
        assert_eq!(LitterData::default().kind, LitterKind::Rubbish);
        assert_eq!(EffectData::default(), EffectData::Steam { frame: 0 });
    }

    #[test]
    fn guest_flags_accumulate() {
        let mut flags = GuestFlags::empty();
        flags |= GuestFlags::STATS;
        flags |= GuestFlags::THOUGHTS;
        assert!(flags.contains(GuestFlags::STATS));
        assert!(!flags.contains(GuestFlags::INVENTORY));
    }

    #[test]
    fn payload_serialization_roundtrip() {
        let guest = GuestData {
            energy: 50,
            happiness: 200,
            cash: 1500,
            invalidation: GuestFlags::STATS | GuestFlags::ACTION,
        };
        let json = serde_json::to_string(&guest).unwrap();
        let back: GuestData = serde_json::from_str(&json).unwrap();
        assert_eq!(guest, back);
    }
}
