//! Engine flows: placement, falling into the ship, disturbances and the
//! selected-NPC notification filter, on a small box hull.

use std::cell::RefCell;
use std::rc::Rc;

use floatsand_core::prelude::*;
use floatsand_logic::config::NpcParameters;
use floatsand_logic::events::NpcEventSink;

// ── Helpers ────────────────────────────────────────────────────────────

/// Event sink whose recording stays readable after it is handed to the engine.
#[derive(Clone, Default)]
struct SharedTrace(Rc<RefCell<Vec<(NpcId, BehaviorType)>>>);

impl NpcEventSink for SharedTrace {
    fn on_human_behavior_changed(&mut self, npc_id: NpcId, new_behavior: BehaviorType) {
        self.0.borrow_mut().push((npc_id, new_behavior));
    }
}

impl SharedTrace {
    fn behaviors(&self) -> Vec<BehaviorType> {
        self.0.borrow().iter().map(|(_, b)| *b).collect()
    }

    fn ids(&self) -> Vec<NpcId> {
        self.0.borrow().iter().map(|(id, _)| *id).collect()
    }
}

/// One deck, three 2 m cells, 2.5 m high, dry.
fn deck_engine() -> NpcSimulationEngine {
    let ship = ShipMesh::box_hull(Vec2::ZERO, 2.0, 2.5, 3, 1);
    let mut engine = NpcSimulationEngine::new(ship, Ocean::new(-10.0));
    engine.seed_rng(42);
    engine
}

fn traced(engine: &mut NpcSimulationEngine, npc_id: NpcId) -> SharedTrace {
    let trace = SharedTrace::default();
    engine.set_event_sink(Box::new(trace.clone()));
    engine.select_npc(Some(npc_id));
    trace
}

/// Step until the NPC reaches `behavior`; returns the number of steps taken.
fn steps_until(engine: &mut NpcSimulationEngine, npc_id: NpcId, behavior: BehaviorType, max_steps: usize) -> Option<usize> {
    (1..=max_steps).find(|_| {
        engine.step();
        engine.behavior_of(npc_id) == Some(behavior)
    })
}

/// A placed human forced into the walking state, facing right.
fn walking_human(engine: &mut NpcSimulationEngine, x: f32) -> NpcId {
    let id = engine.add_human(Vec2::new(x, 0.0), 1.65, 0.5);
    engine.end_placement(id).expect("known NPC");
    let sim_time = engine.sim_time;
    let npc = engine.npc_mut(id).expect("known NPC");
    npc.state.transition_to_state(BehaviorType::ConstrainedWalking, sim_time);
    npc.state.current_face_orientation = 0.0;
    npc.state.current_face_direction_x = 1.0;
    id
}

// ── Placement ──────────────────────────────────────────────────────────

#[test]
fn test_placed_on_floor_stands_up_and_walks() {
    let mut engine = deck_engine();
    let id = engine.add_human(Vec2::new(3.0, 0.0), 1.65, 0.5);
    let trace = traced(&mut engine, id);

    assert_eq!(engine.end_placement(id), Ok(BehaviorType::ConstrainedAerial));

    let steps = steps_until(&mut engine, id, BehaviorType::ConstrainedWalking, 200);
    assert!(steps.is_some(), "never started walking: {:?}", trace.behaviors());

    assert_eq!(
        trace.behaviors(),
        vec![
            BehaviorType::ConstrainedAerial,
            BehaviorType::ConstrainedRising,
            BehaviorType::ConstrainedEquilibrium,
            BehaviorType::ConstrainedWalking,
        ]
    );

    // And actually goes somewhere
    for _ in 0..100 {
        engine.step();
    }
    let feet = engine.particle_position(id, ParticleOrdinal::Feet).unwrap_or_default();
    assert!((feet.x - 3.0).abs() > 0.3, "feet at {:?}", feet);
    assert!(feet.y.abs() < 0.01);
    assert!(engine.npc(id).is_some_and(|npc| npc.feet().is_on_floor()));
}

#[test]
fn test_placed_above_ship_falls_in_and_is_knocked_out() {
    let mut engine = deck_engine();
    let id = engine.add_human(Vec2::new(3.0, 4.0), 1.65, 0.5);
    let trace = traced(&mut engine, id);

    assert_eq!(engine.end_placement(id), Ok(BehaviorType::FreeAerial));

    let steps = steps_until(&mut engine, id, BehaviorType::ConstrainedKnockedOut, 100);
    assert!(steps.is_some(), "never caught by the ship: {:?}", trace.behaviors());
    assert_eq!(
        trace.behaviors()[..2],
        [BehaviorType::FreeAerial, BehaviorType::ConstrainedKnockedOut]
    );
    assert!(engine.npc(id).is_some_and(|npc| !npc.is_free()));
}

#[test]
fn test_placed_in_sea_swims() {
    let ship = ShipMesh::box_hull(Vec2::ZERO, 2.0, 2.5, 3, 1);
    let mut engine = NpcSimulationEngine::new(ship, Ocean::new(0.0));
    let id = engine.add_human(Vec2::new(12.0, -3.0), 1.65, 0.5);

    assert_eq!(engine.end_placement(id), Ok(BehaviorType::FreeAerial));

    // Wet from placement on, without waiting for the low-frequency sample
    let steps = steps_until(&mut engine, id, BehaviorType::FreeInWater, 4);
    assert_eq!(steps, Some(1));
}

#[test]
fn test_parameters_from_json() {
    let params: NpcParameters =
        serde_json::from_str(r#"{ "human_walking_speed_adjustment": 2.0 }"#).expect("valid parameters");
    let engine = deck_engine().with_parameters(params);

    assert_eq!(engine.params.human_walking_speed_adjustment, 2.0);
    assert_eq!(engine.params.low_frequency_update_period, NpcParameters::default().low_frequency_update_period);
}

#[test]
fn test_zero_step_from_json_does_not_stall() {
    let params: NpcParameters = serde_json::from_str(r#"{ "simulation_step": 0.0 }"#).expect("valid parameters");
    let mut engine = deck_engine().with_parameters(params);

    assert_eq!(engine.params.simulation_step, NpcParameters::default().simulation_step);
    engine.update(4.0 / 64.0);
    assert_eq!(engine.sequence_number(), 4);
}

#[test]
fn test_moved_human_released_elsewhere() {
    let mut engine = deck_engine();
    let id = engine.add_human(Vec2::new(1.0, 4.0), 1.65, 0.5);

    engine.move_human_to(id, Vec2::new(5.0, 0.0)).expect("being placed");
    assert_eq!(engine.particle_position(id, ParticleOrdinal::Feet), Some(Vec2::new(5.0, 0.0)));
    let head = engine.particle_position(id, ParticleOrdinal::Head).unwrap_or_default();
    assert!((head - Vec2::new(5.0, 1.65)).length() < 1e-4);

    // On the deck now, so it lands constrained
    assert_eq!(engine.end_placement(id), Ok(BehaviorType::ConstrainedAerial));
    assert_eq!(
        engine.move_human_to(id, Vec2::new(1.0, 0.0)),
        Err(NpcError::NotBeingPlaced(id))
    );

    // Picked up again
    engine.begin_move_human(id).expect("known NPC");
    assert_eq!(engine.behavior_of(id), Some(BehaviorType::BeingPlaced));
    assert!(engine.npc(id).is_some_and(|npc| npc.is_free()));
    engine.move_human_to(id, Vec2::new(1.0, 0.0)).expect("being placed");
    assert_eq!(engine.particle_position(id, ParticleOrdinal::Feet), Some(Vec2::new(1.0, 0.0)));
}

#[test]
fn test_removed_human_is_gone() {
    let mut engine = deck_engine();
    let a = engine.add_human(Vec2::new(1.0, 0.0), 1.65, 0.2);
    let b = engine.add_human(Vec2::new(5.0, 0.0), 1.65, 0.8);
    engine.end_placement(b).expect("known NPC");
    let trace = traced(&mut engine, a);

    // Abandoning a human still being placed
    engine.remove_human(a).expect("known NPC");
    assert_eq!(engine.npc_count(), 1);
    assert_eq!(engine.npc_ids(), vec![b]);
    assert_eq!(engine.particles.len(), 2);
    assert_eq!(engine.selected_npc(), None);
    assert_eq!(engine.remove_human(a), Err(NpcError::UnknownNpc(a)));
    assert_eq!(engine.behavior_of(a), None);

    // The survivor keeps running on its own particles
    for _ in 0..30 {
        engine.step();
    }
    assert!(engine.behavior_of(b).is_some());
    assert!(trace.ids().is_empty());

    // New humans reuse the freed slots
    let c = engine.add_human(Vec2::new(3.0, 0.0), 1.65, 0.5);
    assert_ne!(c, a);
    assert_eq!(engine.particles.len(), 4);
    assert_eq!(engine.particle_position(c, ParticleOrdinal::Feet), Some(Vec2::new(3.0, 0.0)));
}

// ── Stimuli ────────────────────────────────────────────────────────────

#[test]
fn test_disturbance_turns_walker_once() {
    let mut engine = deck_engine();
    let id = walking_human(&mut engine, 3.0);

    // Ahead of it
    assert_eq!(engine.on_disturbance(Vec2::new(4.0, 1.65), 2.0), 1);
    let direction = engine.npc(id).map(|npc| npc.state.current_face_direction_x);
    assert_eq!(direction, Some(-1.0));

    // Now ahead again, but it was just scared
    assert_eq!(engine.on_disturbance(Vec2::new(2.0, 1.65), 2.0), 0);
    let direction = engine.npc(id).map(|npc| npc.state.current_face_direction_x);
    assert_eq!(direction, Some(-1.0));
}

#[test]
fn test_disturbance_out_of_range_or_behind() {
    let mut engine = deck_engine();
    let id = walking_human(&mut engine, 3.0);

    assert_eq!(engine.on_disturbance(Vec2::new(5.5, 1.65), 1.0), 0);
    // Behind: no flip, but it still counts as a scare
    assert_eq!(engine.on_disturbance(Vec2::new(2.0, 1.65), 2.0), 0);
    assert_eq!(engine.on_disturbance(Vec2::new(4.0, 1.65), 2.0), 0);

    let timer = engine.npc(id).map(|npc| npc.state.attraction_decay_timer);
    assert_eq!(timer, Some(1.0));
}

#[test]
fn test_flip_walk_only_when_walking() {
    let mut engine = deck_engine();
    let standing = engine.add_human(Vec2::new(1.0, 0.0), 1.65, 0.5);
    let walker = walking_human(&mut engine, 4.0);

    assert_eq!(engine.flip_human_walk(standing), Ok(false));
    assert_eq!(engine.flip_human_walk(walker), Ok(true));
    assert_eq!(engine.npc(walker).map(|npc| npc.state.current_face_direction_x), Some(-1.0));
}

#[test]
fn test_panicked_walker_stays_inside_hull() {
    let mut engine = deck_engine();
    let id = engine.add_human(Vec2::new(1.0, 0.0), 1.65, 0.5);
    engine.set_generalized_panic_level(1.0);
    engine.end_placement(id).expect("known NPC");

    let mut walked = false;
    for step in 0..600 {
        engine.step();
        walked |= engine.behavior_of(id) == Some(BehaviorType::ConstrainedWalking);

        let feet = engine.particle_position(id, ParticleOrdinal::Feet).unwrap_or_default();
        assert!(engine.npc(id).is_some_and(|npc| !npc.is_free()), "left the ship at step {}: {:?}", step, feet);
        assert!(feet.y > -0.01, "through the floor at step {}: {:?}", step, feet);
        assert!((-0.01..=6.01).contains(&feet.x), "through a wall at step {}: {:?}", step, feet);
    }
    assert!(walked);
}

#[test]
fn test_turnaround() {
    let mut engine = deck_engine();
    let standing = engine.add_human(Vec2::new(1.0, 0.0), 1.65, 0.5);
    let walker = walking_human(&mut engine, 4.0);

    // Facing the viewer: turns its back
    engine.turnaround_human(standing).expect("known NPC");
    assert_eq!(engine.npc(standing).map(|npc| npc.state.current_face_orientation), Some(-1.0));

    engine.turnaround_human(walker).expect("known NPC");
    assert_eq!(engine.npc(walker).map(|npc| npc.state.current_face_direction_x), Some(-1.0));
    assert_eq!(engine.behavior_of(walker), Some(BehaviorType::ConstrainedWalking));

    assert_eq!(engine.turnaround_human(99), Err(NpcError::UnknownNpc(99)));
}

#[test]
fn test_flip_front_back() {
    let mut engine = deck_engine();
    let id = engine.add_human(Vec2::new(1.0, 0.0), 1.65, 0.5);

    engine.flip_human_front_back(id).expect("known NPC");
    assert_eq!(engine.npc(id).map(|npc| npc.state.current_face_orientation), Some(-1.0));
    assert_eq!(engine.flip_human_front_back(99), Err(NpcError::UnknownNpc(99)));
}

#[test]
fn test_head_impact_knocks_out_standing_human() {
    let mut engine = deck_engine();
    let id = engine.add_human(Vec2::new(3.0, 0.0), 1.65, 0.5);
    engine.end_placement(id).expect("known NPC");
    let sim_time = engine.sim_time;
    engine
        .npc_mut(id)
        .expect("known NPC")
        .state
        .transition_to_state(BehaviorType::ConstrainedEquilibrium, sim_time);

    // Below the threshold
    engine
        .on_impact(id, ParticleOrdinal::Head, Vec2::new(0.0, -1.0), Vec2::new(0.0, 1.0))
        .expect("known NPC");
    assert_eq!(engine.behavior_of(id), Some(BehaviorType::ConstrainedEquilibrium));

    engine
        .on_impact(id, ParticleOrdinal::Head, Vec2::new(0.0, -2.0), Vec2::new(0.0, 1.0))
        .expect("known NPC");
    assert_eq!(engine.behavior_of(id), Some(BehaviorType::ConstrainedKnockedOut));
}

// ── Observation ────────────────────────────────────────────────────────

#[test]
fn test_only_selected_npc_is_reported() {
    let mut engine = deck_engine();
    let a = engine.add_human(Vec2::new(1.0, 0.0), 1.65, 0.2);
    let b = engine.add_human(Vec2::new(5.0, 0.0), 1.65, 0.8);
    let trace = traced(&mut engine, b);

    engine.end_placement(a).expect("known NPC");
    engine.end_placement(b).expect("known NPC");
    for _ in 0..60 {
        engine.step();
    }

    assert!(!trace.ids().is_empty());
    assert!(trace.ids().iter().all(|id| *id == b));

    // Deselecting silences everything
    let before = trace.ids().len();
    engine.select_npc(None);
    let sim_time = engine.sim_time;
    engine
        .npc_mut(b)
        .expect("known NPC")
        .state
        .transition_to_state(BehaviorType::ConstrainedKnockedOut, sim_time);
    for _ in 0..60 {
        engine.step();
    }
    assert_eq!(trace.ids().len(), before);
}
