//! # Gala Core
//!
//! Entity pool and spatial index core for the Gala park simulation.
//!
//! Every dynamic object in the simulated world — ride vehicles, guests,
//! staff, litter, visual effects — lives in one fixed-capacity arena,
//! addressed by generation-checked handles and partitioned by intrusive
//! category lists. A coarse grid threaded through the same slots answers
//! proximity queries, and load-time repair passes make persisted or
//! network-synchronized state safe to trust.
//!
//! ## Architecture
//!
//! - **[`pool`]**: the arena, free list, and category lists — allocation,
//!   release, and every position mutation
//! - **[`spatial`]**: the per-cell chains behind proximity queries
//! - **[`integrity`]**: cycle detection and deterministic repair, built on
//!   the [`plait`] chain toolkit
//! - **[`checksum`]**: SHA-256 state digests for peer verification
//! - **[`tween`]**: render-side position interpolation between ticks
//! - **[`litter`]**, **[`effects`]**: the pool-facing behaviors of the
//!   self-limiting entity kinds
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gala_core::{EntityPool, PoolConfig, entity_checksum, integrity};
//!
//! let mut pool: EntityPool = serde_json::from_reader(save_file)?;
//! let report = integrity::repair(&mut pool);
//! if !report.is_clean() {
//!     eprintln!("save repaired: {report:?}");
//! }
//! network.compare(entity_checksum(&pool).to_string());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

// Re-export the chain toolkit used by the repair passes.
pub use plait;

pub mod checksum;
pub mod config;
pub mod effects;
pub mod entity;
pub mod integrity;
pub mod litter;
pub mod pool;
pub mod spatial;
pub mod tween;

pub use checksum::{entity_checksum, EntityChecksum};
pub use config::{ConfigError, PoolConfig};
pub use entity::{Entity, EntityCategory, EntityId, EntityKind, SlotIndex};
pub use integrity::RepairReport;
pub use litter::LocationValidator;
pub use pool::EntityPool;
pub use spatial::SpatialGrid;
pub use tween::PositionTween;

#[cfg(test)]
mod tests;
