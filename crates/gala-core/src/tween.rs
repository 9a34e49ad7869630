//! Render-side position interpolation between simulation ticks.
//!
//! The simulation advances at a coarser rate than the frame clock. To keep
//! motion smooth, the renderer brackets each tick with two full-arena
//! position snapshots and, while drawing, blends every tween-eligible
//! entity between them. Blended positions are written straight into the
//! records (screen rectangle included) so the paint path needs no special
//! casing — and [`PositionTween::restore`] must rewind them before the
//! next tick, so gameplay logic never observes a blended coordinate.
//!
//! Only categories flagged tween-eligible participate (trains, peeps, and
//! unclaimed entities); everything else renders at its exact simulated
//! position every frame. Blending deliberately bypasses the spatial grid:
//! cell membership stays authoritative throughout.

use glam::IVec3;

use crate::entity::Entity;
use crate::pool::EntityPool;

/// Paired before/after position snapshots for one simulation tick.
///
/// # Usage
///
/// ```text
/// tween.store_previous(&pool);   // before the tick
/// simulate_one_tick(&mut pool);
/// tween.store_current(&pool);    // after the tick
///
/// tween.blend(&mut pool, alpha); // per frame, alpha in [0, 1]
/// paint(&pool);
/// tween.restore(&mut pool);      // before the next tick
/// ```
#[derive(Debug, Clone, Default)]
pub struct PositionTween {
    previous: Vec<Option<IVec3>>,
    current: Vec<Option<IVec3>>,
    eligible: Vec<bool>,
}

impl PositionTween {
    /// Creates empty snapshot buffers for a pool of `capacity` slots.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            previous: vec![None; capacity],
            current: vec![None; capacity],
            eligible: vec![false; capacity],
        }
    }

    /// Captures the pre-tick snapshot.
    pub fn store_previous(&mut self, pool: &EntityPool) {
        capture(pool, &mut self.previous);
    }

    /// Captures the post-tick snapshot and refreshes per-slot eligibility.
    ///
    /// Eligibility is decided here, against post-tick membership: an
    /// entity that changed category mid-tick tweens according to where it
    /// ended up.
    pub fn store_current(&mut self, pool: &EntityPool) {
        capture(pool, &mut self.current);
        self.eligible.resize(pool.capacity(), false);
        for (index, flag) in self.eligible.iter_mut().enumerate() {
            *flag = pool.slots[index].is_some() && pool.links[index].category.is_tween_eligible();
        }
    }

    /// Writes blended positions for every tween-eligible entity.
    ///
    /// `alpha` is the fraction of the way from the previous snapshot to
    /// the current one; it is clamped into `[0, 1]`. Entities that were
    /// off-world in either snapshot render at their authoritative
    /// position instead of extrapolating from nothing.
    pub fn blend(&self, pool: &mut EntityPool, alpha: f32) {
        let alpha = alpha.clamp(0.0, 1.0);
        for index in 0..self.span(pool) {
            if !self.eligible[index] || pool.slots[index].is_none() {
                continue;
            }
            let (Some(prev), Some(curr)) = (self.previous[index], self.current[index]) else {
                continue;
            };
            let blended = prev.as_vec3().lerp(curr.as_vec3(), alpha).round().as_ivec3();
            pool.set_render_position(index, blended);
        }
    }

    /// Rewinds every blended entity to the authoritative post-tick
    /// position.
    pub fn restore(&self, pool: &mut EntityPool) {
        for index in 0..self.span(pool) {
            if !self.eligible[index] || pool.slots[index].is_none() {
                continue;
            }
            if let Some(curr) = self.current[index] {
                pool.set_render_position(index, curr);
            }
        }
    }

    fn span(&self, pool: &EntityPool) -> usize {
        self.previous
            .len()
            .min(self.current.len())
            .min(self.eligible.len())
            .min(pool.capacity())
    }
}

fn capture(pool: &EntityPool, buf: &mut Vec<Option<IVec3>>) {
    buf.clear();
    buf.extend(pool.slots.iter().map(|slot| slot.as_ref().and_then(Entity::position)));
}
