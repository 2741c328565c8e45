//! Standing-equilibrium check for two-particle humans.
//!
//! A human stays upright while its feet-to-head vector is within a sector
//! around the vertical. Outside that sector it may still be in equilibrium
//! if it is rotating back toward the vertical (or, while rising, away from
//! it slower than a small tolerance).

use crate::behavior::{BehaviorType, HumanNpcState};
use crate::constants::{
    EQUILIBRIUM_RISING_MAX_RADIAL_VELOCITY, EQUILIBRIUM_STATIC_DIRECTION_Y,
    RISING_ALIGNMENT_TOLERANCE,
};
use crate::convergence::are_almost_equal;
use crate::environment::ParticleSubstrate;
use crate::npc::ParticleIndex;
use crate::vec2::Vec2;

/// Whether the human is still in equilibrium; when it is and
/// `do_maintain_equilibrium` is set, raises the righting torque for this frame.
pub fn check_and_maintain_human_equilibrium(
    feet: ParticleIndex,
    head: ParticleIndex,
    state: &mut HumanNpcState,
    do_maintain_equilibrium: bool,
    particles: &dyn ParticleSubstrate,
) -> bool {
    let human_vector = particles.position(head) - particles.position(feet);
    let human_dir = human_vector.normalize();

    if human_dir.y < EQUILIBRIUM_STATIC_DIRECTION_Y {
        // Diverging from the vertical when the radial velocity has the same
        // sign as the head's offset from the ideal (straight-up) head
        let relative_velocity = particles.velocity(head) - particles.velocity(feet);
        let radial_velocity = relative_velocity.dot(human_dir.to_perpendicular());

        let max_radial_velocity = if state.current_behavior() == BehaviorType::ConstrainedRising {
            EQUILIBRIUM_RISING_MAX_RADIAL_VELOCITY
        } else {
            0.0
        };

        if radial_velocity * (-human_vector.x) > max_radial_velocity {
            log::debug!(
                "Losing equilibrium: dir.y={:.3} radial={:.3} max={:.3}",
                human_dir.y,
                radial_velocity * (-human_vector.x),
                max_radial_velocity
            );
            return false;
        }
    }

    if do_maintain_equilibrium {
        state.equilibrium_torque = 1.0;
    }

    true
}

/// Cosine of the angle between the head-to-feet vector and straight down.
pub fn spring_vertical_alignment(feet_position: Vec2, head_position: Vec2) -> f32 {
    (feet_position - head_position)
        .normalize()
        .dot(Vec2::new(0.0, -1.0))
}

/// Whether a rising human has come all the way up.
pub fn is_fully_risen(feet_position: Vec2, head_position: Vec2) -> bool {
    are_almost_equal(
        spring_vertical_alignment(feet_position, head_position),
        1.0,
        RISING_ALIGNMENT_TOLERANCE,
    )
}
