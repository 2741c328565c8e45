//! The physical world NPCs live in: particles, the ship mesh and the ocean.
//!
//! These are engine-owned resources rather than ECS components; the
//! behavior logic reads them through the `floatsand_logic::environment` traits.

mod ocean;
mod particles;
mod ship;

pub use ocean::*;
pub use particles::*;
pub use ship::*;
