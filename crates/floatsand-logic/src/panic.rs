//! Externally driven panic and orientation changes.

use crate::behavior::{BehaviorType, HumanNpcState};
use crate::constants::PANIC_FLIP_THRESHOLD;
use crate::environment::ParticleSubstrate;
use crate::npc::HumanNpc;
use crate::vec2::Vec2;
use crate::walking::flip_human_walk;

/// Set the ship-wide panic component of a human, clamped to [0, 1].
pub fn set_generalized_panic_level(state: &mut HumanNpcState, level: f32) {
    state.generalized_panic_level = level.clamp(0.0, 1.0);
}

/// Scare a walking human with a disturbance at `position`.
///
/// A human walking toward the disturbance turns around, unless it was
/// scared recently. Returns whether it turned around.
pub fn on_disturbance(npc: &mut HumanNpc, position: Vec2, particles: &dyn ParticleSubstrate) -> bool {
    if npc.state.current_behavior() != BehaviorType::ConstrainedWalking {
        return false;
    }

    let head_position = particles.position(npc.head().particle_index);
    let is_heading_toward = (position.x - head_position.x) * npc.state.current_face_direction_x > 0.0;
    let is_recently_scared = npc.state.attraction_decay_timer >= PANIC_FLIP_THRESHOLD;

    npc.state.attraction_decay_timer = 1.0;

    if is_heading_toward && !is_recently_scared {
        log::debug!("NPC {}: scared by disturbance; turning around", npc.id);
        flip_human_walk(&mut npc.state, true);
        true
    } else {
        false
    }
}

/// Turn a front-facing human to face back and vice versa; side-facing humans are unaffected.
pub fn flip_human_front_back(state: &mut HumanNpcState) {
    if state.current_face_orientation != 0.0 {
        state.current_face_orientation *= -1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::npc::ParticleIndex;

    struct StandingAt(Vec2);

    impl ParticleSubstrate for StandingAt {
        fn position(&self, _p: ParticleIndex) -> Vec2 {
            self.0
        }
        fn velocity(&self, _p: ParticleIndex) -> Vec2 {
            Vec2::ZERO
        }
        fn any_waterness(&self, _p: ParticleIndex) -> f32 {
            0.0
        }
    }

    fn walker_facing_right() -> HumanNpc {
        let mut npc = HumanNpc::new(1, 0.2, 1.65, 0, 1, 0.0);
        npc.state.transition_to_state(BehaviorType::ConstrainedWalking, 0.0);
        npc.state.current_face_orientation = 0.0;
        npc.state.current_face_direction_x = 1.0;
        npc
    }

    #[test]
    fn test_generalized_panic_is_clamped() {
        let mut state = HumanNpcState::new(1.65, 0.0);
        set_generalized_panic_level(&mut state, 4.0);
        assert_eq!(state.generalized_panic_level, 1.0);
        set_generalized_panic_level(&mut state, -1.0);
        assert_eq!(state.generalized_panic_level, 0.0);
    }

    #[test]
    fn test_disturbance_ahead_flips_once() {
        let particles = StandingAt(Vec2::new(0.0, 1.0));
        let mut npc = walker_facing_right();

        assert!(on_disturbance(&mut npc, Vec2::new(3.0, 1.0), &particles));
        assert_eq!(npc.state.current_face_direction_x, -1.0);
        assert_eq!(npc.state.attraction_decay_timer, 1.0);

        // Now heading toward a disturbance on the left, but still scared from the last one
        assert!(!on_disturbance(&mut npc, Vec2::new(-3.0, 1.0), &particles));
        assert_eq!(npc.state.current_face_direction_x, -1.0);
    }

    #[test]
    fn test_disturbance_behind_does_not_flip() {
        let particles = StandingAt(Vec2::new(0.0, 1.0));
        let mut npc = walker_facing_right();
        assert!(!on_disturbance(&mut npc, Vec2::new(-3.0, 1.0), &particles));
        assert_eq!(npc.state.current_face_direction_x, 1.0);
    }

    #[test]
    fn test_front_back_flip_ignores_side() {
        let mut state = HumanNpcState::new(1.65, 0.0);
        flip_human_front_back(&mut state);
        assert_eq!(state.current_face_orientation, -1.0);
        state.current_face_orientation = 0.0;
        flip_human_front_back(&mut state);
        assert_eq!(state.current_face_orientation, 0.0);
    }
}
