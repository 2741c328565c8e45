//! Waterness system - samples the ocean at every NPC particle.

use crate::substrate::{NpcParticles, Ocean};

/// Refresh `any_waterness` of all particles from the ocean surface.
pub fn waterness_system(particles: &mut NpcParticles, ocean: &Ocean) {
    for particle in particles.iter_mut() {
        particle.any_waterness = ocean.waterness_at(particle.position);
    }
}
