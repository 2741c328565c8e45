//! Per-frame human behavior state machine.
//!
//! [`update_human`] runs once per simulation step for every human. It first
//! resets one-frame signals and updates panic, then checks that the current
//! state's family (constrained vs free) still matches the primary particle,
//! and finally advances the current state, which may transition.
//!
//! State overview:
//!
//! | Family | States |
//! |--------|--------|
//! | placement | `BeingPlaced` |
//! | constrained, down | `Aerial`, `Falling`, `KnockedOut`, `PreRising` |
//! | constrained, up | `Rising`, `Equilibrium`, `Walking` |
//! | constrained, other | `InWater`, `Swimming_Style1/2`, `Electrified` |
//! | free | `Aerial`, `KnockedOut`, `InWater`, `Swimming_Style1/2/3` |

use rand::Rng;

use crate::behavior::{
    AerialProgress, BehaviorState, BehaviorType, ElectrifiedProgress,
    FreeAerialProgress, FreeKnockedOutProgress, PreRisingProgress,
    RecoveryProgress,
};
use crate::config::NpcParameters;
use crate::constants::{
    rates, thresholds, AERIAL_SLIDING_VELOCITY, ATTRACTION_DECAY, BOMB_PANIC_DECAY,
    MAX_RELATIVE_VELOCITY_MAGNITUDE_FOR_EQUILIBRIUM, MAX_RESTING_VELOCITY,
    MAX_WALKING_RELATIVE_VELOCITY, ON_FIRE_PANIC_DECAY, PANIC_FLIP_THRESHOLD,
    UPSIDE_DOWN_DIRECTION_Y,
};
use crate::convergence::{converge, is_at_target, step, step_counter};
use crate::environment::{SimulationTick, Surroundings};
use crate::equilibrium::{check_and_maintain_human_equilibrium, is_fully_risen};
use crate::events::NpcEventSink;
use crate::npc::HumanNpc;
use crate::vec2::Vec2;
use crate::walking::{calculate_walking_speed_adjustment, run_walking_human_state_machine};

/// Initial behavior of a human that has just been placed.
pub fn calculate_human_behavior(npc: &HumanNpc) -> BehaviorType {
    if !npc.feet().is_constrained() && !npc.head().is_constrained() {
        BehaviorType::FreeAerial
    } else {
        BehaviorType::ConstrainedAerial
    }
}

/// Enter the free family: in water if both ends are under the surface, else aerial.
pub fn transition_human_behavior_to_free(
    npc: &mut HumanNpc,
    tick: SimulationTick,
    env: &Surroundings,
    events: &mut dyn NpcEventSink,
) {
    let head_position = env.particles.position(npc.head().particle_index);
    let feet_position = env.particles.position(npc.feet().particle_index);

    let new_behavior = if env.ocean.depth(head_position) > 0.0 && env.ocean.depth(feet_position) > 0.0 {
        BehaviorType::FreeInWater
    } else {
        BehaviorType::FreeAerial
    };

    transition(npc, new_behavior, tick, events);
}

/// Advance the behavior of one human by one simulation step.
pub fn update_human<R: Rng>(
    npc: &mut HumanNpc,
    tick: SimulationTick,
    env: &Surroundings,
    params: &NpcParameters,
    rng: &mut R,
    events: &mut dyn NpcEventSink,
) {
    //
    // One-frame signals and panic
    //

    if let Some(cs) = npc.feet_mut().constrained_state.as_mut() {
        cs.ghost_particle_pulse = false;
    }

    let state = &mut npc.state;
    state.equilibrium_torque = 0.0;

    state.resultant_panic_level =
        state.on_fire_panic_level + state.bomb_proximity_panic_level + state.generalized_panic_level;
    state.on_fire_panic_level -= state.on_fire_panic_level * ON_FIRE_PANIC_DECAY;
    state.bomb_proximity_panic_level -= state.bomb_proximity_panic_level * BOMB_PANIC_DECAY;
    state.attraction_decay_timer -= state.attraction_decay_timer * ATTRACTION_DECAY;

    //
    // Family check
    //

    let is_free = npc.is_free();
    let behavior = npc.state.behavior;
    let kind = behavior.kind();

    if kind.is_constrained() && is_free {
        transition_human_behavior_to_free(npc, tick, env, events);
    } else if kind.is_free() && !is_free {
        transition(npc, BehaviorType::ConstrainedKnockedOut, tick, events);
    } else {
        match behavior {
            BehaviorState::BeingPlaced => {}

            BehaviorState::ConstrainedAerial(p) => update_constrained_aerial(npc, p, tick, env, events),

            BehaviorState::ConstrainedFalling(p) => update_constrained_falling(npc, p, tick, env, events),

            BehaviorState::ConstrainedKnockedOut(p) => {
                update_constrained_knocked_out(npc, p, tick, env, events)
            }

            BehaviorState::ConstrainedPreRising(p) => {
                update_constrained_pre_rising(npc, p, tick, env, events)
            }

            BehaviorState::ConstrainedRising
            | BehaviorState::ConstrainedEquilibrium(_)
            | BehaviorState::ConstrainedWalking(_) => {
                update_constrained_upright(npc, tick, env, params, rng, events)
            }

            BehaviorState::ConstrainedInWater(_)
            | BehaviorState::ConstrainedSwimmingStyle1
            | BehaviorState::ConstrainedSwimmingStyle2 => {
                update_constrained_in_water(npc, tick, env, events)
            }

            BehaviorState::ConstrainedElectrified(p) => {
                update_constrained_electrified(npc, p, tick, env, events)
            }

            BehaviorState::FreeAerial(p) => update_free_aerial(npc, p, tick, env, events),

            BehaviorState::FreeKnockedOut(p) => update_free_knocked_out(npc, p, tick, env, events),

            BehaviorState::FreeInWater(_)
            | BehaviorState::FreeSwimmingStyle1
            | BehaviorState::FreeSwimmingStyle2
            | BehaviorState::FreeSwimmingStyle3 => update_free_in_water(npc, tick, env, rng, events),
        }
    }

    events.on_human_state_quantity_changed(npc.id, npc.state.behavior.headline_quantity());
}

fn transition(
    npc: &mut HumanNpc,
    new_behavior: BehaviorType,
    tick: SimulationTick,
    events: &mut dyn NpcEventSink,
) {
    log::debug!(
        "NPC {}: {} -> {}",
        npc.id,
        npc.state.current_behavior(),
        new_behavior
    );

    npc.state
        .transition_to_state(new_behavior, tick.current_simulation_time);
    events.on_human_behavior_changed(npc.id, new_behavior);
}

/// Face sideways, toward where the head is going.
fn face_direction_of_fall(npc: &mut HumanNpc, env: &Surroundings) {
    let head_velocity = npc.head().applicable_velocity(env.particles);
    npc.state.current_face_orientation = 0.0;
    npc.state.current_face_direction_x = if head_velocity.x >= 0.0 { 1.0 } else { -1.0 };
}

fn is_head_on_floor(npc: &HumanNpc) -> bool {
    npc.head().is_on_floor()
}

fn are_feet_on_floor(npc: &HumanNpc) -> bool {
    npc.feet().is_on_floor()
}

/// Whether the human is lying still enough to count a frame toward getting up.
fn is_resting(npc: &HumanNpc, env: &Surroundings, max_velocity: f32) -> bool {
    are_feet_on_floor(npc)
        && npc.feet_mesh_relative_velocity().length() < max_velocity
        && npc.head().applicable_velocity(env.particles).length() < max_velocity
}

fn average_applicable_speed(npc: &HumanNpc, env: &Surroundings) -> f32 {
    (npc.feet().applicable_velocity(env.particles).length()
        + npc.head().applicable_velocity(env.particles).length())
        / 2.0
}

//
// Constrained, down
//

fn update_constrained_aerial(
    npc: &mut HumanNpc,
    mut p: AerialProgress,
    tick: SimulationTick,
    env: &Surroundings,
    events: &mut dyn NpcEventSink,
) {
    let (falling_target, rising_target) = if is_head_on_floor(npc) || are_feet_on_floor(npc) {
        let floor_vector = npc
            .feet()
            .constrained_state
            .and_then(|cs| cs.current_virtual_floor)
            .map(|floor| env.ship.sub_spring_vector(floor))
            .unwrap_or(Vec2::new(1.0, 0.0));

        let head_along_floor = npc.head().applicable_velocity(env.particles).dot(floor_vector);
        let feet_along_floor = npc.feet().applicable_velocity(env.particles).dot(floor_vector);

        if head_along_floor.abs() >= AERIAL_SLIDING_VELOCITY
            || feet_along_floor.abs() >= AERIAL_SLIDING_VELOCITY
        {
            (1.0, 0.0)
        } else {
            (0.0, 1.0)
        }
    } else {
        (0.0, 0.0)
    };

    p.progress_to_falling = converge(p.progress_to_falling, falling_target, rates::AERIAL_TO_FALLING);
    if is_at_target(p.progress_to_falling, 1.0) {
        transition(npc, BehaviorType::ConstrainedFalling, tick, events);
        if npc.state.current_face_orientation != 0.0 {
            face_direction_of_fall(npc, env);
        }
        return;
    }

    p.progress_to_rising = converge(p.progress_to_rising, rising_target, rates::AERIAL_TO_RISING);
    if is_at_target(p.progress_to_rising, 1.0) {
        transition(npc, BehaviorType::ConstrainedRising, tick, events);
        return;
    }

    let particles = env.particles;
    if particles.any_waterness(npc.feet().particle_index) > thresholds::CONSTRAINED_IN_WATER_WATERNESS
        || particles.any_waterness(npc.head().particle_index) > thresholds::CONSTRAINED_IN_WATER_WATERNESS
    {
        transition(npc, BehaviorType::ConstrainedInWater, tick, events);
        return;
    }

    npc.state.behavior = BehaviorState::ConstrainedAerial(p);
}

fn update_constrained_falling(
    npc: &mut HumanNpc,
    mut p: RecoveryProgress,
    tick: SimulationTick,
    env: &Surroundings,
    events: &mut dyn NpcEventSink,
) {
    let resting = is_resting(npc, env, MAX_RESTING_VELOCITY);
    p.progress_to_pre_rising = step_counter(p.progress_to_pre_rising, resting);

    let target = thresholds::FALLING_TO_PRE_RISING_FRAMES
        - npc.state.capped_panic() * thresholds::FALLING_TO_PRE_RISING_PANIC_FRAMES;
    if p.progress_to_pre_rising >= target {
        transition(npc, BehaviorType::ConstrainedPreRising, tick, events);
        return;
    }

    if !are_feet_on_floor(npc) && !is_head_on_floor(npc) {
        p.progress_to_aerial = converge(p.progress_to_aerial, 1.0, rates::FALLING_TO_AERIAL);
        if is_at_target(p.progress_to_aerial, 1.0) {
            transition(npc, BehaviorType::ConstrainedAerial, tick, events);
            return;
        }
    } else {
        p.progress_to_aerial = 0.0;
    }

    npc.state.behavior = BehaviorState::ConstrainedFalling(p);
}

fn update_constrained_knocked_out(
    npc: &mut HumanNpc,
    mut p: RecoveryProgress,
    tick: SimulationTick,
    env: &Surroundings,
    events: &mut dyn NpcEventSink,
) {
    let feet_on_floor = are_feet_on_floor(npc);
    let head_on_floor = is_head_on_floor(npc);

    let resting = is_resting(npc, env, MAX_RELATIVE_VELOCITY_MAGNITUDE_FOR_EQUILIBRIUM);
    p.progress_to_pre_rising = step_counter(p.progress_to_pre_rising, resting);

    let target = (thresholds::KNOCKED_OUT_TO_PRE_RISING_FRAMES
        + npc.random_seed * thresholds::KNOCKED_OUT_SEED_FRAMES)
        / (1.0 + npc.state.capped_panic());
    if p.progress_to_pre_rising >= target {
        let human_dir = (env.particles.position(npc.head().particle_index)
            - env.particles.position(npc.feet().particle_index))
        .normalize();

        if feet_on_floor && !head_on_floor && human_dir.y < UPSIDE_DOWN_DIRECTION_Y {
            // Hanging by the feet from a floor: let the feet through it and start over
            if let Some(cs) = npc.feet_mut().constrained_state.as_mut() {
                cs.ghost_particle_pulse = true;
            }
            log::debug!("NPC {}: hanging upside-down; ghost pulse", npc.id);
            npc.state.behavior = BehaviorState::ConstrainedKnockedOut(RecoveryProgress::default());
        } else {
            transition(npc, BehaviorType::ConstrainedPreRising, tick, events);
        }
        return;
    }

    if !feet_on_floor && !head_on_floor {
        p.progress_to_aerial = converge(p.progress_to_aerial, 1.0, rates::KNOCKED_OUT_TO_AERIAL);
        if is_at_target(p.progress_to_aerial, 1.0) {
            transition(npc, BehaviorType::ConstrainedAerial, tick, events);
            return;
        }
    } else {
        p.progress_to_aerial = 0.0;
    }

    npc.state.behavior = BehaviorState::ConstrainedKnockedOut(p);
}

fn update_constrained_pre_rising(
    npc: &mut HumanNpc,
    mut p: PreRisingProgress,
    tick: SimulationTick,
    env: &Surroundings,
    events: &mut dyn NpcEventSink,
) {
    let resting = is_resting(npc, env, MAX_RELATIVE_VELOCITY_MAGNITUDE_FOR_EQUILIBRIUM);
    p.progress_to_rising = step_counter(p.progress_to_rising, resting);

    let target = thresholds::PRE_RISING_TO_RISING_FRAMES
        + npc.random_seed * thresholds::PRE_RISING_SEED_FRAMES;
    if p.progress_to_rising >= target {
        transition(npc, BehaviorType::ConstrainedRising, tick, events);
        return;
    }

    if !are_feet_on_floor(npc) && !is_head_on_floor(npc) {
        p.progress_to_aerial = converge(p.progress_to_aerial, 1.0, rates::PRE_RISING_TO_AERIAL);
        if is_at_target(p.progress_to_aerial, 1.0) {
            transition(npc, BehaviorType::ConstrainedAerial, tick, events);
            return;
        }
    } else {
        p.progress_to_aerial = 0.0;
    }

    npc.state.behavior = BehaviorState::ConstrainedPreRising(p);
}

//
// Constrained, up
//

/// Rising, Equilibrium and Walking share panic reactions and equilibrium maintenance.
fn update_constrained_upright<R: Rng>(
    npc: &mut HumanNpc,
    tick: SimulationTick,
    env: &Surroundings,
    params: &NpcParameters,
    rng: &mut R,
    events: &mut dyn NpcEventSink,
) {
    let kind = npc.state.current_behavior();
    let period = params.low_frequency_update_period.max(1);

    // Electrification and bombs, at low frequency; not while rising
    if tick.is_step_of(u64::from(npc.id) % period, period)
        && (kind == BehaviorType::ConstrainedEquilibrium || kind == BehaviorType::ConstrainedWalking)
    {
        if npc.is_electrified(env.ship) {
            transition(npc, BehaviorType::ConstrainedElectrified, tick, events);
            npc.state.current_face_orientation = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            npc.state.current_face_direction_x = 0.0;
            npc.state.equilibrium_torque = 1.0;
            return;
        }

        if npc.has_bomb(env.ship) {
            if npc.state.bomb_proximity_panic_level < PANIC_FLIP_THRESHOLD {
                npc.state.current_face_direction_x *= -1.0;
            }
            npc.state.bomb_proximity_panic_level = 1.0;
        }
    }

    if npc.is_on_fire() {
        if npc.state.on_fire_panic_level < PANIC_FLIP_THRESHOLD {
            npc.state.current_face_direction_x *= -1.0;
        }
        npc.state.on_fire_panic_level = 1.0;
    }

    let feet_on_floor = are_feet_on_floor(npc);

    // Standing still for a while: start walking
    if let BehaviorState::ConstrainedEquilibrium(mut p) = npc.state.behavior {
        if feet_on_floor {
            let rate = rates::EQUILIBRIUM_TO_WALKING
                + npc.state.capped_panic() * rates::EQUILIBRIUM_TO_WALKING_PANIC;
            p.progress_to_walking = converge(p.progress_to_walking, 1.0, rate);
            if is_at_target(p.progress_to_walking, 1.0) {
                transition(npc, BehaviorType::ConstrainedWalking, tick, events);
                npc.state.current_face_orientation = 0.0;
                npc.state.current_face_direction_x = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
                return;
            }
            npc.state.behavior = BehaviorState::ConstrainedEquilibrium(p);
        }
    }

    //
    // Conditions to stay
    //

    // a. Feet on floor, with some tolerance for losing contact
    let mut is_state_maintained = if feet_on_floor {
        npc.state.current_equilibrium_soft_termination_decision = 0.0;
        true
    } else {
        let rate = if kind == BehaviorType::ConstrainedWalking {
            // Faster walkers tolerate shorter flights
            let relative_walking_speed = calculate_walking_speed_adjustment(&npc.state, params);
            (rates::SOFT_TERMINATION
                - (relative_walking_speed - 1.0) / 0.5 * (rates::SOFT_TERMINATION - rates::SOFT_TERMINATION_MIN))
                .clamp(rates::SOFT_TERMINATION_MIN, rates::SOFT_TERMINATION)
        } else {
            rates::SOFT_TERMINATION
        };

        let decision = converge(npc.state.current_equilibrium_soft_termination_decision, 1.0, rate);
        npc.state.current_equilibrium_soft_termination_decision = decision;
        if is_at_target(decision, 1.0) {
            log::debug!("NPC {}: off the floor for too long", npc.id);
            false
        } else {
            true
        }
    };

    // b. Mesh-relative velocity
    let feet_mrv = npc.feet().constrained_state.map(|cs| cs.mesh_relative_velocity);
    if kind != BehaviorType::ConstrainedWalking {
        match feet_mrv {
            Some(mrv) if mrv.length() < MAX_RELATIVE_VELOCITY_MAGNITUDE_FOR_EQUILIBRIUM => {}
            _ => is_state_maintained = false,
        }
    } else {
        // Moving against the walking direction is left to the gait's flip decision
        let along_walk = feet_mrv
            .unwrap_or(Vec2::ZERO)
            .dot(Vec2::new(npc.state.current_face_direction_x, 0.0));
        if along_walk >= MAX_WALKING_RELATIVE_VELOCITY {
            log::debug!("NPC {}: moving too fast along walk direction", npc.id);
            is_state_maintained = false;
        }
    }

    let feet_index = npc.feet().particle_index;
    let head_index = npc.head().particle_index;

    if !is_state_maintained
        || !check_and_maintain_human_equilibrium(
            feet_index,
            head_index,
            &mut npc.state,
            feet_on_floor,
            env.particles,
        )
    {
        if feet_on_floor {
            transition(npc, BehaviorType::ConstrainedFalling, tick, events);
            face_direction_of_fall(npc, env);
        } else {
            transition(npc, BehaviorType::ConstrainedAerial, tick, events);
        }
        return;
    }

    match npc.state.current_behavior() {
        BehaviorType::ConstrainedRising => {
            // Torque stays raised for this frame, carrying over into equilibrium
            if is_fully_risen(
                env.particles.position(feet_index),
                env.particles.position(head_index),
            ) {
                transition(npc, BehaviorType::ConstrainedEquilibrium, tick, events);
            }
        }
        BehaviorType::ConstrainedWalking if feet_on_floor => {
            let mrv = npc.feet_mesh_relative_velocity();
            run_walking_human_state_machine(&mut npc.state, mrv, params);
        }
        _ => {}
    }
}

//
// Constrained, other
//

fn update_constrained_in_water(
    npc: &mut HumanNpc,
    tick: SimulationTick,
    env: &Surroundings,
    events: &mut dyn NpcEventSink,
) {
    let particles = env.particles;
    if particles.any_waterness(npc.feet().particle_index) < thresholds::CONSTRAINED_OUT_OF_WATER_WATERNESS
        && particles.any_waterness(npc.head().particle_index) < thresholds::CONSTRAINED_OUT_OF_WATER_WATERNESS
    {
        transition(npc, BehaviorType::ConstrainedAerial, tick, events);
        return;
    }

    if let BehaviorState::ConstrainedInWater(mut p) = npc.state.behavior {
        p.progress_to_swimming = converge(p.progress_to_swimming, 1.0, rates::CONSTRAINED_TO_SWIMMING);
        if is_at_target(p.progress_to_swimming, thresholds::CONSTRAINED_SWIMMING) {
            let swim_style = if npc.state.current_face_orientation != 0.0 {
                BehaviorType::ConstrainedSwimmingStyle1
            } else {
                BehaviorType::ConstrainedSwimmingStyle2
            };
            transition(npc, swim_style, tick, events);
            return;
        }
        npc.state.behavior = BehaviorState::ConstrainedInWater(p);
    }
}

fn update_constrained_electrified(
    npc: &mut HumanNpc,
    mut p: ElectrifiedProgress,
    tick: SimulationTick,
    env: &Surroundings,
    events: &mut dyn NpcEventSink,
) {
    let is_electrified = npc.is_electrified(env.ship);
    p.progress_to_leaving = step_counter(p.progress_to_leaving, !is_electrified);

    if p.progress_to_leaving >= thresholds::ELECTRIFIED_TO_KNOCKED_OUT_FRAMES {
        transition(npc, BehaviorType::ConstrainedKnockedOut, tick, events);
        return;
    }

    // Kept upright while shaking
    npc.state.equilibrium_torque = 1.0;
    npc.state.behavior = BehaviorState::ConstrainedElectrified(p);
}

//
// Free
//

fn update_free_aerial(
    npc: &mut HumanNpc,
    mut p: FreeAerialProgress,
    tick: SimulationTick,
    env: &Surroundings,
    events: &mut dyn NpcEventSink,
) {
    let particles = env.particles;
    if particles.any_waterness(npc.feet().particle_index) > 0.0
        || particles.any_waterness(npc.head().particle_index) > 0.0
    {
        transition(npc, BehaviorType::FreeInWater, tick, events);
        return;
    }

    let target = if average_applicable_speed(npc, env) < thresholds::FREE_KNOCKED_OUT_VELOCITY {
        1.0
    } else {
        0.0
    };
    p.progress_to_knocked_out = converge(p.progress_to_knocked_out, target, rates::FREE_TO_KNOCKED_OUT);
    if is_at_target(p.progress_to_knocked_out, 1.0) {
        transition(npc, BehaviorType::FreeKnockedOut, tick, events);
        return;
    }

    npc.state.behavior = BehaviorState::FreeAerial(p);
}

fn update_free_knocked_out(
    npc: &mut HumanNpc,
    mut p: FreeKnockedOutProgress,
    tick: SimulationTick,
    env: &Surroundings,
    events: &mut dyn NpcEventSink,
) {
    let target = if average_applicable_speed(npc, env) > thresholds::FREE_AERIAL_VELOCITY {
        1.0
    } else {
        0.0
    };
    p.progress_to_aerial = converge(p.progress_to_aerial, target, rates::FREE_KNOCKED_OUT_TO_AERIAL);
    if is_at_target(p.progress_to_aerial, 1.0) {
        transition(npc, BehaviorType::FreeAerial, tick, events);
        return;
    }

    npc.state.behavior = BehaviorState::FreeKnockedOut(p);
}

fn update_free_in_water<R: Rng>(
    npc: &mut HumanNpc,
    tick: SimulationTick,
    env: &Surroundings,
    rng: &mut R,
    events: &mut dyn NpcEventSink,
) {
    let particles = env.particles;
    let feet = npc.feet().particle_index;
    let head = npc.head().particle_index;

    if particles.any_waterness(feet) == 0.0 && particles.any_waterness(head) == 0.0 {
        transition(npc, BehaviorType::FreeAerial, tick, events);
        return;
    }

    if let BehaviorState::FreeInWater(mut p) = npc.state.behavior {
        // Swim once not tumbling and head above feet
        let rotation_magnitude = (particles.velocity(head) - particles.velocity(feet)).length();
        let target_swim = (1.0 - step(thresholds::FREE_SWIMMING_MAX_ROTATION, rotation_magnitude))
            * step(particles.position(feet).y, particles.position(head).y);

        p.progress_to_swimming = converge(p.progress_to_swimming, target_swim, rates::FREE_TO_SWIMMING);
        if is_at_target(p.progress_to_swimming, thresholds::FREE_SWIMMING) {
            let swim_style = match rng.gen_range(0..4) {
                0 | 1 => BehaviorType::FreeSwimmingStyle1,
                2 => BehaviorType::FreeSwimmingStyle2,
                _ => BehaviorType::FreeSwimmingStyle3,
            };
            transition(npc, swim_style, tick, events);
            npc.state.current_face_orientation = 1.0;
            npc.state.current_face_direction_x = 0.0;
            return;
        }
        npc.state.behavior = BehaviorState::FreeInWater(p);
    }
}
