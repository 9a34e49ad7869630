//! Per-tick stepping for visual-only effects.
//!
//! Effects live on the misc list, carry no gameplay authority, and expire
//! on their own: steam dissipates, money indicators float away, balloons
//! drift up and burst, explosion clouds run a fixed frame strip. Expiry
//! releases the entity from inside the walk, which the pool's iteration
//! contract supports by capturing the next link before each callback.

use glam::IVec3;

use crate::entity::{EffectData, EntityCategory, EntityId, EntityKind};
use crate::pool::EntityPool;

/// Steam dissipates after this many animation frames.
const STEAM_FRAMES: u16 = 16;
/// Money indicators live this many ticks.
const MONEY_PICKUP_TICKS: u64 = 40;
/// Balloons burst after this many ticks aloft.
const BALLOON_FLIGHT_TICKS: u64 = 64;
/// Explosion clouds run a strip of this many frames.
const EXPLOSION_FRAMES: u16 = 18;

/// Spawns a steam puff at a position.
pub fn spawn_steam(pool: &mut EntityPool, pos: IVec3) -> Option<EntityId> {
    spawn_at(pool, EffectData::Steam { frame: 0 }, pos)
}

/// Spawns a floating money indicator showing `amount`.
pub fn spawn_money_pickup(pool: &mut EntityPool, pos: IVec3, amount: i32) -> Option<EntityId> {
    spawn_at(pool, EffectData::MoneyPickup { amount }, pos)
}

/// Spawns a drifting balloon of the given palette colour.
pub fn spawn_balloon(pool: &mut EntityPool, pos: IVec3, colour: u8) -> Option<EntityId> {
    spawn_at(pool, EffectData::Balloon { colour, popped: false }, pos)
}

/// Spawns an explosion cloud at a position.
pub fn spawn_explosion(pool: &mut EntityPool, pos: IVec3) -> Option<EntityId> {
    spawn_at(pool, EffectData::ExplosionCloud { frame: 0 }, pos)
}

fn spawn_at(pool: &mut EntityPool, effect: EffectData, pos: IVec3) -> Option<EntityId> {
    let id = pool.spawn(EntityKind::Effect(effect))?;
    pool.relocate(id, pos);
    Some(id)
}

/// Steps every misc effect once.
pub fn update_all(pool: &mut EntityPool) {
    pool.for_each(EntityCategory::Misc, |pool, id| {
        let entity = pool.get(id);
        let age = pool.current_tick().saturating_sub(entity.created_tick());
        let pos = entity.position();
        let Some(effect) = entity.kind().as_effect().copied() else {
            return;
        };

        match effect {
            EffectData::Steam { frame } => {
                if frame + 1 >= STEAM_FRAMES {
                    pool.release(id);
                    return;
                }
                set_effect(pool, id, EffectData::Steam { frame: frame + 1 });
                rise(pool, id, pos, 1);
            }
            EffectData::MoneyPickup { .. } => {
                if age >= MONEY_PICKUP_TICKS {
                    pool.release(id);
                    return;
                }
                rise(pool, id, pos, 1);
            }
            EffectData::Balloon { colour, popped } => {
                if popped {
                    pool.release(id);
                    return;
                }
                if age >= BALLOON_FLIGHT_TICKS {
                    set_effect(pool, id, EffectData::Balloon { colour, popped: true });
                    return;
                }
                rise(pool, id, pos, 2);
            }
            EffectData::ExplosionCloud { frame } => {
                if frame + 1 >= EXPLOSION_FRAMES {
                    pool.release(id);
                    return;
                }
                set_effect(pool, id, EffectData::ExplosionCloud { frame: frame + 1 });
            }
        }
    });
}

fn set_effect(pool: &mut EntityPool, id: EntityId, effect: EffectData) {
    *pool.get_mut(id).kind_mut() = EntityKind::Effect(effect);
}

/// Drifts an effect upward. Cell membership never changes — the cell is a
/// function of x and y only — so this always takes the cheap path.
fn rise(pool: &mut EntityPool, id: EntityId, pos: Option<IVec3>, dz: i32) {
    if let Some(p) = pos {
        pool.relocate(id, p + IVec3::new(0, 0, dz));
    }
}
