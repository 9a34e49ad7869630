//! Content hashing for cross-machine state verification.
//!
//! In a networked game every peer runs the same simulation; after any tick
//! that must be verified, each machine digests its live entities and the
//! strings are compared out-of-band. Two machines with identical state
//! must produce identical strings, so the digest walks slots in index
//! order and encodes every persistent field at a fixed position —
//! floats-as-bits style normalization is unnecessary here because all
//! gameplay state is integral.
//!
//! Two classes of state are left out:
//! - the whole misc category: visual effects carry no gameplay authority
//!   and legitimately diverge between machines;
//! - render bookkeeping on otherwise-hashed records: the cached screen
//!   rectangle, and a guest's UI-invalidation bitmask. These are written
//!   as zeroes, exactly as if a zeroed copy of the record had been hashed.

use sha2::{Digest, Sha256};
use std::fmt;

use crate::entity::{Entity, EntityCategory, EntityKind};
use crate::pool::EntityPool;

/// A finished pool digest, rendered as 64 lowercase hex digits.
///
/// # Example
///
/// ```
/// use gala_core::{entity_checksum, EntityPool, PoolConfig};
///
/// let pool = EntityPool::new(PoolConfig::default()).unwrap();
/// let digest = entity_checksum(&pool);
/// assert_eq!(digest.to_string().len(), 64);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityChecksum([u8; 32]);

impl EntityChecksum {
    /// Raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for EntityChecksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Digests every live, non-misc entity in slot order.
#[must_use]
pub fn entity_checksum(pool: &EntityPool) -> EntityChecksum {
    let mut hasher = Sha256::new();
    for index in 0..pool.capacity() {
        let Some(entity) = &pool.slots[index] else {
            continue;
        };
        let category = pool.links[index].category;
        if category == EntityCategory::Misc {
            continue;
        }
        digest_entity(entity, category, &mut hasher);
    }
    EntityChecksum(hasher.finalize().into())
}

fn digest_entity(entity: &Entity, category: EntityCategory, hasher: &mut Sha256) {
    hasher.update(entity.id().slot().as_u16().to_le_bytes());
    hasher.update(entity.id().generation().to_le_bytes());
    hasher.update([category.index() as u8]);

    match entity.position() {
        Some(pos) => {
            hasher.update([1u8]);
            hasher.update(pos.x.to_le_bytes());
            hasher.update(pos.y.to_le_bytes());
            hasher.update(pos.z.to_le_bytes());
        }
        None => hasher.update([0u8; 13]),
    }

    // Screen rectangle: zeroed in the normalized copy.
    hasher.update([0u8; 16]);

    hasher.update(entity.created_tick().to_le_bytes());

    match entity.name() {
        Some(name) => {
            hasher.update((name.len() as u64).to_le_bytes());
            hasher.update(name.as_bytes());
        }
        None => hasher.update(u64::MAX.to_le_bytes()),
    }

    digest_kind(entity.kind(), hasher);
}

fn digest_kind(kind: &EntityKind, hasher: &mut Sha256) {
    match kind {
        EntityKind::Vehicle(v) => {
            hasher.update([0u8]);
            hasher.update(v.ride.to_le_bytes());
            hasher.update([u8::from(v.is_head)]);
            hasher.update(v.velocity.to_le_bytes());
            hasher.update(v.track_progress.to_le_bytes());
        }
        EntityKind::Guest(g) => {
            hasher.update([1u8, g.energy, g.happiness]);
            hasher.update(g.cash.to_le_bytes());
            // Invalidation bitmask: zeroed in the normalized copy.
            hasher.update(0u32.to_le_bytes());
        }
        EntityKind::Staff(s) => {
            hasher.update([2u8, s.role as u8, s.orders]);
        }
        EntityKind::Litter(l) => {
            hasher.update([3u8, l.kind as u8]);
        }
        EntityKind::Effect(e) => {
            // Only reachable for an effect outside the misc category,
            // which repair would flag; hash it for completeness.
            hasher.update([4u8]);
            match e {
                crate::entity::EffectData::Steam { frame } => {
                    hasher.update([0u8]);
                    hasher.update(frame.to_le_bytes());
                }
                crate::entity::EffectData::MoneyPickup { amount } => {
                    hasher.update([1u8]);
                    hasher.update(amount.to_le_bytes());
                }
                crate::entity::EffectData::Balloon { colour, popped } => {
                    hasher.update([2u8, *colour, u8::from(*popped)]);
                }
                crate::entity::EffectData::ExplosionCloud { frame } => {
                    hasher.update([3u8]);
                    hasher.update(frame.to_le_bytes());
                }
            }
        }
        EntityKind::Generic => hasher.update([5u8]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolConfig;
    use crate::entity::{EffectData, GuestData, GuestFlags};
    use glam::IVec3;

    fn pool() -> EntityPool {
        EntityPool::new(PoolConfig {
            capacity: 32,
            misc_reserve: 2,
            world_cells: 8,
            ..PoolConfig::default()
        })
        .unwrap()
    }

    fn spawn_guest_at(pool: &mut EntityPool, x: i32, y: i32) -> crate::entity::EntityId {
        let id = pool.spawn(EntityKind::Guest(GuestData::default())).unwrap();
        pool.relocate(id, IVec3::new(x, y, 0));
        id
    }

    #[test]
    fn display_is_64_hex_digits() {
        let digest = entity_checksum(&pool());
        let text = digest.to_string();
        assert_eq!(text.len(), 64);
        assert!(text.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn identical_pools_digest_identically() {
        let mut a = pool();
        let mut b = pool();
        spawn_guest_at(&mut a, 10, 20);
        spawn_guest_at(&mut b, 10, 20);
        assert_eq!(entity_checksum(&a), entity_checksum(&b));
    }

    #[test]
    fn position_changes_the_digest() {
        let mut a = pool();
        let mut b = pool();
        spawn_guest_at(&mut a, 10, 20);
        spawn_guest_at(&mut b, 10, 21);
        assert_ne!(entity_checksum(&a), entity_checksum(&b));
    }

    #[test]
    fn misc_effects_are_excluded() {
        let mut a = pool();
        let mut b = pool();
        spawn_guest_at(&mut a, 10, 20);
        spawn_guest_at(&mut b, 10, 20);
        let effect = b
            .spawn(EntityKind::Effect(EffectData::Steam { frame: 3 }))
            .unwrap();
        b.relocate(effect, IVec3::new(50, 50, 0));
        assert_eq!(entity_checksum(&a), entity_checksum(&b));
    }

    #[test]
    fn guest_invalidation_flags_are_normalized_away() {
        let mut a = pool();
        let mut b = pool();
        let ia = spawn_guest_at(&mut a, 10, 20);
        let _ib = spawn_guest_at(&mut b, 10, 20);
        a.get_mut(ia)
            .kind_mut()
            .as_guest_mut()
            .unwrap()
            .invalidation = GuestFlags::STATS | GuestFlags::THOUGHTS;
        assert_eq!(entity_checksum(&a), entity_checksum(&b));
    }

    #[test]
    fn gameplay_guest_state_is_not_normalized_away() {
        let mut a = pool();
        let mut b = pool();
        let ia = spawn_guest_at(&mut a, 10, 20);
        let _ib = spawn_guest_at(&mut b, 10, 20);
        a.get_mut(ia).kind_mut().as_guest_mut().unwrap().cash = 9000;
        assert_ne!(entity_checksum(&a), entity_checksum(&b));
    }

    #[test]
    fn display_name_participates() {
        let mut a = pool();
        let mut b = pool();
        let ia = spawn_guest_at(&mut a, 10, 20);
        let _ib = spawn_guest_at(&mut b, 10, 20);
        a.get_mut(ia).set_name(Some("Nia".to_owned()));
        assert_ne!(entity_checksum(&a), entity_checksum(&b));
    }
}
