//! Human NPC data: the two particles, their contact state and the behavior state.

use serde::{Deserialize, Serialize};

use crate::behavior::HumanNpcState;
use crate::environment::{HomeShip, ParticleSubstrate};
use crate::vec2::Vec2;

pub type NpcId = u32;
pub type ParticleIndex = u32;
pub type TriangleIndex = u32;

/// Which of the two human particles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParticleOrdinal {
    Feet = 0,
    Head = 1,
}

/// One edge of a ship triangle; `edge_ordinal` is 0, 1 or 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriangleEdge {
    pub triangle: TriangleIndex,
    pub edge_ordinal: u8,
}

/// A point inside a ship triangle in barycentric coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriangleBCoords {
    pub triangle: TriangleIndex,
    pub bcoords: [f32; 3],
}

/// Contact state of a particle attached to a ship triangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConstrainedState {
    pub current_bcoords: TriangleBCoords,
    /// Floor edge the particle currently rests on, if any.
    pub current_virtual_floor: Option<TriangleEdge>,
    /// Velocity relative to the ship mesh.
    pub mesh_relative_velocity: Vec2,
    /// Ignore floors for one integration step.
    pub ghost_particle_pulse: bool,
}

impl ConstrainedState {
    pub fn new(current_bcoords: TriangleBCoords) -> Self {
        Self {
            current_bcoords,
            current_virtual_floor: None,
            mesh_relative_velocity: Vec2::ZERO,
            ghost_particle_pulse: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NpcParticle {
    pub particle_index: ParticleIndex,
    /// `None` while the particle is free (ballistic).
    pub constrained_state: Option<ConstrainedState>,
}

impl NpcParticle {
    pub fn free(particle_index: ParticleIndex) -> Self {
        Self {
            particle_index,
            constrained_state: None,
        }
    }

    pub fn is_constrained(&self) -> bool {
        self.constrained_state.is_some()
    }

    pub fn is_on_floor(&self) -> bool {
        self.constrained_state
            .as_ref()
            .is_some_and(|cs| cs.current_virtual_floor.is_some())
    }

    /// Mesh-relative velocity when constrained, absolute velocity when free.
    pub fn applicable_velocity(&self, particles: &dyn ParticleSubstrate) -> Vec2 {
        match &self.constrained_state {
            Some(cs) => cs.mesh_relative_velocity,
            None => particles.velocity(self.particle_index),
        }
    }
}

/// Burning NPC.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CombustionState {
    pub ignition_simulation_time: f32,
}

/// A two-particle human: feet (primary) and head (secondary).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HumanNpc {
    pub id: NpcId,
    /// Uniform in [0, 1); desynchronizes thresholds across humans.
    pub random_seed: f32,
    pub height: f32,
    pub particles: [NpcParticle; 2],
    pub combustion: Option<CombustionState>,
    pub state: HumanNpcState,
}

impl HumanNpc {
    pub fn new(
        id: NpcId,
        random_seed: f32,
        height: f32,
        feet: ParticleIndex,
        head: ParticleIndex,
        current_simulation_time: f32,
    ) -> Self {
        Self {
            id,
            random_seed,
            height,
            particles: [NpcParticle::free(feet), NpcParticle::free(head)],
            combustion: None,
            state: HumanNpcState::new(height, current_simulation_time),
        }
    }

    pub fn feet(&self) -> &NpcParticle {
        &self.particles[ParticleOrdinal::Feet as usize]
    }

    pub fn head(&self) -> &NpcParticle {
        &self.particles[ParticleOrdinal::Head as usize]
    }

    pub fn feet_mut(&mut self) -> &mut NpcParticle {
        &mut self.particles[ParticleOrdinal::Feet as usize]
    }

    pub fn particle(&self, ordinal: ParticleOrdinal) -> &NpcParticle {
        &self.particles[ordinal as usize]
    }

    /// A human is free when its primary particle is not attached to the ship.
    pub fn is_free(&self) -> bool {
        !self.feet().is_constrained()
    }

    /// Mesh-relative velocity of the primary particle; zero when free.
    pub fn feet_mesh_relative_velocity(&self) -> Vec2 {
        self.feet()
            .constrained_state
            .map(|cs| cs.mesh_relative_velocity)
            .unwrap_or(Vec2::ZERO)
    }

    pub fn is_electrified(&self, ship: &dyn HomeShip) -> bool {
        self.particles.iter().any(|p| {
            p.constrained_state
                .is_some_and(|cs| ship.is_triangle_electrified(cs.current_bcoords.triangle))
        })
    }

    pub fn has_bomb(&self, ship: &dyn HomeShip) -> bool {
        self.particles.iter().any(|p| {
            p.constrained_state
                .is_some_and(|cs| ship.are_bombs_in_proximity(cs.current_bcoords.triangle))
        })
    }

    pub fn is_on_fire(&self) -> bool {
        self.combustion.is_some()
    }
}
