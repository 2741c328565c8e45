//! Reactions of a human to its particles bouncing off ship edges.

use crate::behavior::BehaviorType;
use crate::constants::thresholds;
use crate::environment::SimulationTick;
use crate::events::NpcEventSink;
use crate::npc::{HumanNpc, ParticleOrdinal};
use crate::vec2::Vec2;
use crate::walking::flip_human_walk;

/// Called by the integrator when an NPC particle bounces off an edge.
///
/// `normal_response` is the velocity change along the edge normal and
/// `bounce_edge_normal` the edge's outward normal.
pub fn on_human_impact(
    npc: &mut HumanNpc,
    particle: ParticleOrdinal,
    normal_response: Vec2,
    bounce_edge_normal: Vec2,
    tick: SimulationTick,
    events: &mut dyn NpcEventSink,
) {
    let state = &mut npc.state;

    match state.current_behavior() {
        BehaviorType::ConstrainedRising | BehaviorType::ConstrainedEquilibrium => {
            let threshold = if state.current_behavior() == BehaviorType::ConstrainedRising {
                thresholds::RISING_HEAD_IMPACT
            } else {
                thresholds::EQUILIBRIUM_HEAD_IMPACT
            };

            if particle == ParticleOrdinal::Head && normal_response.length() > threshold {
                log::debug!(
                    "NPC {}: head impact {:.3} while {}; knocked out",
                    npc.id,
                    normal_response.length(),
                    state.current_behavior()
                );

                state.transition_to_state(
                    BehaviorType::ConstrainedKnockedOut,
                    tick.current_simulation_time,
                );
                events.on_human_behavior_changed(npc.id, BehaviorType::ConstrainedKnockedOut);
            }
        }

        BehaviorType::ConstrainedWalking => {
            // Bounced against something steep in the walking direction
            let bounce_slope = bounce_edge_normal.dot(Vec2::new(state.current_face_direction_x, 0.0));
            let is_steep = match particle {
                ParticleOrdinal::Feet => bounce_slope > thresholds::WALKING_FEET_IMPACT_SLOPE,
                ParticleOrdinal::Head => bounce_slope > thresholds::WALKING_HEAD_IMPACT_SLOPE,
            };
            let is_moving = state
                .behavior
                .walking()
                .is_some_and(|w| w.current_walk_magnitude != 0.0);

            if is_steep && is_moving {
                log::debug!("NPC {}: walked into a wall; flipping", npc.id);
                flip_human_walk(state, true);
            }
        }

        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NullEventSink;

    fn human_in(kind: BehaviorType) -> HumanNpc {
        let mut npc = HumanNpc::new(7, 0.5, 1.65, 0, 1, 0.0);
        npc.state.transition_to_state(kind, 0.0);
        npc
    }

    fn impact(npc: &mut HumanNpc, particle: ParticleOrdinal, response: Vec2, normal: Vec2) {
        on_human_impact(npc, particle, response, normal, SimulationTick::new(1.0, 64), &mut NullEventSink);
    }

    #[test]
    fn test_feet_impact_does_not_knock_out_rising() {
        let mut npc = human_in(BehaviorType::ConstrainedRising);
        impact(&mut npc, ParticleOrdinal::Feet, Vec2::new(0.0, 5.0), Vec2::new(0.0, -1.0));
        assert_eq!(npc.state.current_behavior(), BehaviorType::ConstrainedRising);
    }

    #[test]
    fn test_equilibrium_needs_harder_head_impact() {
        let mut npc = human_in(BehaviorType::ConstrainedEquilibrium);
        impact(&mut npc, ParticleOrdinal::Head, Vec2::new(1.0, 0.0), Vec2::new(-1.0, 0.0));
        assert_eq!(npc.state.current_behavior(), BehaviorType::ConstrainedEquilibrium);

        impact(&mut npc, ParticleOrdinal::Head, Vec2::new(2.0, 0.0), Vec2::new(-1.0, 0.0));
        assert_eq!(npc.state.current_behavior(), BehaviorType::ConstrainedKnockedOut);
        assert_eq!(npc.state.current_state_start_simulation_time, 1.0);
    }

    #[test]
    fn test_walker_flips_on_wall_in_walking_direction() {
        let mut npc = human_in(BehaviorType::ConstrainedWalking);
        npc.state.current_face_direction_x = 1.0;
        if let Some(w) = npc.state.behavior.walking_mut() {
            w.current_walk_magnitude = 0.5;
        }

        // Floor: normal points down, no flip
        impact(&mut npc, ParticleOrdinal::Feet, Vec2::new(0.0, 1.0), Vec2::new(0.0, -1.0));
        assert_eq!(npc.state.current_face_direction_x, 1.0);

        // Wall on the right: outward normal points right
        impact(&mut npc, ParticleOrdinal::Feet, Vec2::new(-1.0, 0.0), Vec2::new(1.0, 0.0));
        assert_eq!(npc.state.current_face_direction_x, -1.0);
        assert_eq!(npc.state.current_behavior(), BehaviorType::ConstrainedWalking);
    }

    #[test]
    fn test_standing_walker_does_not_flip() {
        let mut npc = human_in(BehaviorType::ConstrainedWalking);
        npc.state.current_face_direction_x = 1.0;
        impact(&mut npc, ParticleOrdinal::Head, Vec2::new(-1.0, 0.0), Vec2::new(1.0, 0.0));
        assert_eq!(npc.state.current_face_direction_x, 1.0);
    }
}
