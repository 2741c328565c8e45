//! NPC particle buffer.

use floatsand_logic::environment::ParticleSubstrate;
use floatsand_logic::npc::ParticleIndex;
use floatsand_logic::vec2::Vec2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticleData {
    pub position: Vec2,
    pub velocity: Vec2,
    /// 0 (dry) to 1 (submerged)
    pub any_waterness: f32,
}

/// All NPC particles, addressed by [`ParticleIndex`].
///
/// Slots of removed NPCs are retired and handed out again by [`add`](Self::add),
/// so the indices of live particles never shift.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NpcParticles {
    particles: Vec<ParticleData>,
    retired: Vec<ParticleIndex>,
}

impl NpcParticles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, position: Vec2) -> ParticleIndex {
        let data = ParticleData {
            position,
            ..Default::default()
        };
        match self.retired.pop() {
            Some(index) => {
                self.particles[index as usize] = data;
                index
            }
            None => {
                self.particles.push(data);
                (self.particles.len() - 1) as ParticleIndex
            }
        }
    }

    /// Free a particle's slot for reuse.
    pub fn retire(&mut self, particle: ParticleIndex) {
        if (particle as usize) < self.particles.len() && !self.retired.contains(&particle) {
            self.particles[particle as usize] = ParticleData::default();
            self.retired.push(particle);
        }
    }

    /// Number of live particles.
    pub fn len(&self) -> usize {
        self.particles.len() - self.retired.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, particle: ParticleIndex) -> Option<&ParticleData> {
        self.particles.get(particle as usize)
    }

    pub fn get_mut(&mut self, particle: ParticleIndex) -> Option<&mut ParticleData> {
        self.particles.get_mut(particle as usize)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ParticleData> {
        self.particles.iter_mut()
    }

    pub fn set_position(&mut self, particle: ParticleIndex, position: Vec2) {
        if let Some(p) = self.get_mut(particle) {
            p.position = position;
        }
    }

    pub fn set_velocity(&mut self, particle: ParticleIndex, velocity: Vec2) {
        if let Some(p) = self.get_mut(particle) {
            p.velocity = velocity;
        }
    }
}

impl ParticleSubstrate for NpcParticles {
    fn position(&self, particle: ParticleIndex) -> Vec2 {
        self.get(particle).map(|p| p.position).unwrap_or_default()
    }

    fn velocity(&self, particle: ParticleIndex) -> Vec2 {
        self.get(particle).map(|p| p.velocity).unwrap_or_default()
    }

    fn any_waterness(&self, particle: ParticleIndex) -> f32 {
        self.get(particle).map(|p| p.any_waterness).unwrap_or(0.0)
    }
}
