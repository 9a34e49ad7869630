//! Integration tests for the entity pool.
//!
//! Unit tests live beside the code they cover; this module holds the
//! cross-cutting suites:
//! - `lifecycle.rs`: end-to-end allocate/place/release scenarios
//! - `determinism.rs`: identical operation replays must converge, and
//!   repair must never lose a live entity
//! - `properties.rs`: randomized operation sequences against the pool's
//!   invariants
//! - `helpers.rs`: shared setup and the operation-replay driver

mod helpers;

pub use helpers::*;
