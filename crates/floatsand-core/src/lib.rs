//! Floating Sandbox NPC Engine - humans on a ship
//!
//! Runs the human behavior logic of `floatsand-logic` against a concrete
//! world: a particle buffer, a triangulated ship and a flat ocean.
//!
//! # Architecture
//!
//! NPCs are stored in an Entity Component System (ECS) via `hecs`:
//! - **Entities**: One per human
//! - **Components**: `HumanNpc` (behavior state and particle contacts)
//! - **Resources**: Particles, ship mesh and ocean, owned by the engine
//! - **Systems**: Waterness sampling, behavior update, integration
//!
//! # Example
//!
//! ```rust,no_run
//! use floatsand_core::prelude::*;
//!
//! let ship = ShipMesh::box_hull(Vec2::ZERO, 2.0, 2.5, 4, 2);
//! let mut engine = NpcSimulationEngine::new(ship, Ocean::new(-1.0));
//!
//! let npc = engine.add_human(Vec2::new(1.0, 0.0), 1.65, 0.5);
//! engine.end_placement(npc).unwrap();
//!
//! loop {
//!     engine.update(1.0 / 64.0);
//! }
//! ```

pub mod engine;
pub mod persistence;
pub mod substrate;
pub mod systems;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::engine::{NpcError, NpcSimulationEngine};
    pub use crate::substrate::{NpcParticles, Ocean, ShipMesh};
    pub use floatsand_logic::behavior::BehaviorType;
    pub use floatsand_logic::npc::{NpcId, ParticleOrdinal};
    pub use floatsand_logic::vec2::Vec2;
}
