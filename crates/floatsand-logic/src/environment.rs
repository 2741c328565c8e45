//! Interfaces to the world the behavior logic reads but does not own.
//!
//! The particle substrate, the ship's triangle mesh and the ocean are run by
//! the physics engine. The behavior logic only queries them.

use crate::npc::{ParticleIndex, TriangleEdge, TriangleIndex};
use crate::vec2::Vec2;

/// Point masses shared by all NPCs.
pub trait ParticleSubstrate {
    fn position(&self, particle: ParticleIndex) -> Vec2;
    fn velocity(&self, particle: ParticleIndex) -> Vec2;
    /// How wet the particle is, 0 (dry) to 1 (submerged).
    fn any_waterness(&self, particle: ParticleIndex) -> f32;
}

/// The ship whose triangles constrained particles ride on.
pub trait HomeShip {
    /// Vector from the first to the second endpoint of a triangle edge.
    fn sub_spring_vector(&self, edge: TriangleEdge) -> Vec2;
    fn is_triangle_electrified(&self, triangle: TriangleIndex) -> bool;
    fn are_bombs_in_proximity(&self, triangle: TriangleIndex) -> bool;
}

pub trait OceanSurface {
    /// Depth below the surface at `position`; negative above water.
    fn depth(&self, position: Vec2) -> f32;
}

/// Everything an NPC update looks at, bundled for passing around.
#[derive(Clone, Copy)]
pub struct Surroundings<'a> {
    pub particles: &'a dyn ParticleSubstrate,
    pub ship: &'a dyn HomeShip,
    pub ocean: &'a dyn OceanSurface,
}

/// Clock of the simulation step being processed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimulationTick {
    pub current_simulation_time: f32,
    pub sequence_number: u64,
}

impl SimulationTick {
    pub fn new(current_simulation_time: f32, sequence_number: u64) -> Self {
        Self {
            current_simulation_time,
            sequence_number,
        }
    }

    /// Whether this tick is the `step`-th slot of a period of `period` ticks.
    pub fn is_step_of(&self, step: u64, period: u64) -> bool {
        step == self.sequence_number % period
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_step_of_cycles() {
        let hits: Vec<u64> = (0..12)
            .filter(|seq| SimulationTick::new(0.0, *seq).is_step_of(3, 4))
            .collect();
        assert_eq!(hits, vec![3, 7, 11]);
    }
}
