//! Walking gait: walk magnitude ramp, direction flips and walking speed.

use crate::behavior::{HumanNpcState, WalkingProgress};
use crate::config::NpcParameters;
use crate::constants::{rates, thresholds, MAX_TOTAL_WALKING_SPEED_ADJUSTMENT};
use crate::convergence::converge;
use crate::vec2::Vec2;

/// Relative walking speed (1 = nominal), including panic; capped.
pub fn calculate_walking_speed_adjustment(state: &HumanNpcState, params: &NpcParameters) -> f32 {
    let walk_magnitude = state
        .behavior
        .walking()
        .map(|w| w.current_walk_magnitude)
        .unwrap_or(0.0);

    (walk_magnitude * params.human_walking_speed_adjustment * (1.0 + state.capped_panic() * 3.0))
        .min(MAX_TOTAL_WALKING_SPEED_ADJUSTMENT)
}

/// Walking speed (m/s) the integrator should drive the feet at.
pub fn calculate_actual_walking_absolute_speed(state: &HumanNpcState, params: &NpcParameters) -> f32 {
    state.walking_speed_base * calculate_walking_speed_adjustment(state, params)
}

/// Reverse the walking direction.
///
/// A non-immediate flip only raises the target of the flip decision, which
/// then has to converge before the actual flip happens. An immediate flip
/// turns around right away and restarts the walk from standstill.
pub fn flip_human_walk(state: &mut HumanNpcState, immediate: bool) {
    let face_direction_x = state.current_face_direction_x;
    let Some(walking) = state.behavior.walking_mut() else {
        debug_assert!(false, "walk flip outside of walking");
        return;
    };

    if immediate {
        state.current_face_direction_x = -face_direction_x;
        *walking = WalkingProgress::default();
    } else {
        walking.target_flip_decision = 1.0;
    }
}

/// Advance the walking gait by one frame. The human must be walking with its feet on the floor.
pub fn run_walking_human_state_machine(
    state: &mut HumanNpcState,
    feet_mesh_relative_velocity: Vec2,
    params: &NpcParameters,
) {
    let Some(walking) = state.behavior.walking().copied() else {
        debug_assert!(false, "walking state machine run outside of walking");
        return;
    };

    // 1. Flip when the feet do not move the way we walk
    if walking.current_walk_magnitude != 0.0 {
        let ideal_walk_velocity = Vec2::new(
            state.current_face_direction_x * calculate_actual_walking_absolute_speed(state, params),
            0.0,
        );
        let agreement = feet_mesh_relative_velocity.dot(ideal_walk_velocity);

        log::trace!(
            "Walk agreement={:.4} mrv={:?} ideal={:?}",
            agreement,
            feet_mesh_relative_velocity,
            ideal_walk_velocity
        );

        if agreement < thresholds::WALK_AGREEMENT {
            flip_human_walk(state, false);
        } else if let Some(w) = state.behavior.walking_mut() {
            w.target_flip_decision = 0.0;
            w.current_flip_decision = 0.0;
        }
    }

    // 2-3. Smooth the decision, flip once convinced
    let Some(w) = state.behavior.walking_mut() else {
        return;
    };
    w.current_flip_decision = converge(w.current_flip_decision, w.target_flip_decision, rates::WALK_FLIP);
    if w.current_flip_decision >= thresholds::WALK_FLIP_DECISION {
        log::debug!("Walk flip: decision={:.3}", w.current_flip_decision);
        flip_human_walk(state, true);
    }

    // 4. Ramp up
    let panic = state.capped_panic();
    if let Some(w) = state.behavior.walking_mut() {
        let rate = rates::WALK_MAGNITUDE + panic * rates::WALK_MAGNITUDE_PANIC;
        w.current_walk_magnitude = converge(w.current_walk_magnitude, 1.0, rate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::{BehaviorState, BehaviorType};

    fn walking_state(magnitude: f32) -> HumanNpcState {
        let mut state = HumanNpcState::new(1.65, 0.0);
        state.transition_to_state(BehaviorType::ConstrainedWalking, 0.0);
        state.current_face_orientation = 0.0;
        state.current_face_direction_x = 1.0;
        if let Some(w) = state.behavior.walking_mut() {
            w.current_walk_magnitude = magnitude;
        }
        state
    }

    #[test]
    fn test_speed_adjustment_scales_with_panic_and_caps() {
        let params = NpcParameters::default();
        let mut state = walking_state(1.0);
        assert!((calculate_walking_speed_adjustment(&state, &params) - 1.0).abs() < 1e-6);

        state.resultant_panic_level = 0.25;
        assert!((calculate_walking_speed_adjustment(&state, &params) - 1.75).abs() < 1e-6);

        state.resultant_panic_level = 3.0;
        assert_eq!(
            calculate_walking_speed_adjustment(&state, &params),
            MAX_TOTAL_WALKING_SPEED_ADJUSTMENT
        );
    }

    #[test]
    fn test_speed_is_zero_when_not_walking() {
        let params = NpcParameters::default();
        let state = HumanNpcState::new(1.65, 0.0);
        assert_eq!(calculate_actual_walking_absolute_speed(&state, &params), 0.0);
    }

    #[test]
    fn test_immediate_flip_resets_gait() {
        let mut state = walking_state(0.8);
        flip_human_walk(&mut state, true);
        assert_eq!(state.current_face_direction_x, -1.0);
        assert_eq!(
            state.behavior,
            BehaviorState::ConstrainedWalking(WalkingProgress::default())
        );
    }

    #[test]
    fn test_non_immediate_flip_sets_target_only() {
        let mut state = walking_state(0.8);
        flip_human_walk(&mut state, false);
        assert_eq!(state.current_face_direction_x, 1.0);
        let w = state.behavior.walking().copied().unwrap_or_default();
        assert_eq!(w.target_flip_decision, 1.0);
        assert_eq!(w.current_walk_magnitude, 0.8);
    }

    #[test]
    fn test_stuck_walker_flips_after_29_frames() {
        let params = NpcParameters::default();
        let mut state = walking_state(0.5);

        for frame in 1..=28 {
            run_walking_human_state_machine(&mut state, Vec2::ZERO, &params);
            assert_eq!(state.current_face_direction_x, 1.0, "flipped early at frame {}", frame);
        }

        run_walking_human_state_machine(&mut state, Vec2::ZERO, &params);
        assert_eq!(state.current_face_direction_x, -1.0);
    }

    #[test]
    fn test_agreeing_walker_keeps_direction_and_ramps_up() {
        let params = NpcParameters::default();
        let mut state = walking_state(0.0);

        for _ in 0..60 {
            run_walking_human_state_machine(&mut state, Vec2::new(1.0, 0.0), &params);
        }

        let w = state.behavior.walking().copied().unwrap_or_default();
        assert_eq!(state.current_face_direction_x, 1.0);
        assert_eq!(w.current_flip_decision, 0.0);
        assert!(w.current_walk_magnitude > 0.99);
    }
}
