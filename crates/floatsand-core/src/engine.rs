//! Simulation engine - main entry point for running NPCs on a ship

use std::collections::HashMap;

use floatsand_logic::behavior::BehaviorType;
use floatsand_logic::config::NpcParameters;
use floatsand_logic::environment::{ParticleSubstrate, SimulationTick, Surroundings};
use floatsand_logic::events::{NpcEventSink, NullEventSink};
use floatsand_logic::human::calculate_human_behavior;
use floatsand_logic::impact::on_human_impact;
use floatsand_logic::npc::{CombustionState, ConstrainedState, HumanNpc, NpcId, ParticleOrdinal};
use floatsand_logic::panic::{flip_human_front_back, on_disturbance};
use floatsand_logic::vec2::Vec2;
use floatsand_logic::walking::flip_human_walk;
use hecs::{Entity, World};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::persistence::SaveError;
use crate::substrate::{NpcParticles, Ocean, ShipMesh};
use crate::systems::*;

/// Main simulation engine
pub struct NpcSimulationEngine {
    /// ECS world holding one `HumanNpc` per entity
    pub world: World,
    /// NPC particle buffer
    pub particles: NpcParticles,
    /// Ship the NPCs live on
    pub ship: ShipMesh,
    pub ocean: Ocean,
    pub params: NpcParameters,
    /// Simulation time in seconds
    pub sim_time: f32,

    sequence_number: u64,
    generalized_panic_level: f32,
    next_npc_id: NpcId,
    npc_entities: HashMap<NpcId, Entity>,

    // Time not yet consumed by fixed steps
    step_accumulator: f32,

    // Observation
    selected_npc: Option<NpcId>,
    event_sink: Box<dyn NpcEventSink>,

    rng_seed: u64,
    rng: StdRng,
}

impl NpcSimulationEngine {
    /// Create an engine with no NPCs
    pub fn new(ship: ShipMesh, ocean: Ocean) -> Self {
        Self {
            world: World::new(),
            particles: NpcParticles::new(),
            ship,
            ocean,
            params: NpcParameters::default(),
            sim_time: 0.0,
            sequence_number: 0,
            generalized_panic_level: 0.0,
            next_npc_id: 0,
            npc_entities: HashMap::new(),
            step_accumulator: 0.0,
            selected_npc: None,
            event_sink: Box::new(NullEventSink),
            rng_seed: 0,
            rng: StdRng::seed_from_u64(0),
        }
    }

    /// Replace the parameters. A non-positive step falls back to the default one.
    pub fn with_parameters(mut self, params: NpcParameters) -> Self {
        self.params = params;
        if !has_valid_step(&self.params) {
            let default_step = NpcParameters::default().simulation_step;
            log::warn!(
                "Invalid simulation step {}, using {}",
                self.params.simulation_step,
                default_step
            );
            self.params.simulation_step = default_step;
        }
        self
    }

    /// Reseed the behavior RNG, for reproducible runs
    pub fn seed_rng(&mut self, seed: u64) {
        self.rng_seed = seed;
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Sink receiving the selected NPC's notifications
    pub fn set_event_sink(&mut self, sink: Box<dyn NpcEventSink>) {
        self.event_sink = sink;
    }

    // ── Placement ──────────────────────────────────────────────────────

    /// Add a human standing at `position`, held in placement until
    /// [`end_placement`](Self::end_placement)
    pub fn add_human(&mut self, position: Vec2, height: f32, random_seed: f32) -> NpcId {
        let id = self.next_npc_id;
        self.next_npc_id += 1;

        let feet = self.particles.add(position);
        let head = self.particles.add(position + Vec2::new(0.0, height));
        let npc = HumanNpc::new(id, random_seed, height, feet, head, self.sim_time);

        let entity = self.world.spawn((npc,));
        self.npc_entities.insert(id, entity);

        log::info!("Placing NPC {} at ({:.2}, {:.2}), height {:.2}", id, position.x, position.y, height);
        id
    }

    /// Release a human from placement, attaching its particles to the ship
    /// where they lie inside it
    pub fn end_placement(&mut self, npc_id: NpcId) -> Result<BehaviorType, NpcError> {
        let npc = find_npc(&mut self.world, &self.npc_entities, npc_id)?;

        for particle in npc.particles.iter_mut() {
            let position = self.particles.position(particle.particle_index);
            particle.constrained_state = self.ship.find_triangle(position).map(ConstrainedState::new);

            // Don't wait for the next low-frequency sample
            if let Some(data) = self.particles.get_mut(particle.particle_index) {
                data.any_waterness = self.ocean.waterness_at(position);
            }
        }

        let behavior = calculate_human_behavior(npc);
        npc.state.transition_to_state(behavior, self.sim_time);

        if self.selected_npc == Some(npc_id) {
            self.event_sink.on_human_behavior_changed(npc_id, behavior);
        }

        log::info!("NPC {} placed as {}", npc_id, behavior);
        Ok(behavior)
    }

    /// Pick up a human for moving: its particles detach from the ship and
    /// it is held in placement until [`end_placement`](Self::end_placement)
    pub fn begin_move_human(&mut self, npc_id: NpcId) -> Result<(), NpcError> {
        let npc = find_npc(&mut self.world, &self.npc_entities, npc_id)?;

        for particle in npc.particles.iter_mut() {
            particle.constrained_state = None;
        }
        npc.state.transition_to_state(BehaviorType::BeingPlaced, self.sim_time);

        if self.selected_npc == Some(npc_id) {
            self.event_sink.on_human_behavior_changed(npc_id, BehaviorType::BeingPlaced);
        }
        Ok(())
    }

    /// Move a human being placed so that its feet are at `position`.
    /// The move is remembered as velocity, so a released human keeps some of it.
    pub fn move_human_to(&mut self, npc_id: NpcId, position: Vec2) -> Result<(), NpcError> {
        let dt = self.params.simulation_step;
        let npc = find_npc(&mut self.world, &self.npc_entities, npc_id)?;
        if npc.state.current_behavior() != BehaviorType::BeingPlaced {
            return Err(NpcError::NotBeingPlaced(npc_id));
        }

        let delta = position - self.particles.position(npc.feet().particle_index);
        let velocity = if dt > 0.0 {
            (delta / dt).clamp_length_upper(MAX_MOVE_VELOCITY)
        } else {
            Vec2::ZERO
        };

        for particle in npc.particles.iter() {
            let index = particle.particle_index;
            let moved = self.particles.position(index) + delta;
            self.particles.set_position(index, moved);
            self.particles.set_velocity(index, velocity);
        }
        Ok(())
    }

    /// Remove a human, placed or not, and free its particles
    pub fn remove_human(&mut self, npc_id: NpcId) -> Result<(), NpcError> {
        let entity = self
            .npc_entities
            .remove(&npc_id)
            .ok_or(NpcError::UnknownNpc(npc_id))?;

        if let Ok(npc) = self.world.remove_one::<HumanNpc>(entity) {
            for particle in npc.particles.iter() {
                self.particles.retire(particle.particle_index);
            }
        }
        let _ = self.world.despawn(entity);

        if self.selected_npc == Some(npc_id) {
            self.selected_npc = None;
        }

        log::info!("Removed NPC {}", npc_id);
        Ok(())
    }

    // ── Simulation ─────────────────────────────────────────────────────

    /// Advance by `delta_seconds`, running as many fixed steps as fit
    pub fn update(&mut self, delta_seconds: f32) {
        if !has_valid_step(&self.params) {
            log::warn!("Not updating: invalid simulation step {}", self.params.simulation_step);
            return;
        }

        self.step_accumulator += delta_seconds;
        while self.step_accumulator >= self.params.simulation_step {
            self.step_accumulator -= self.params.simulation_step;
            self.step();
        }
    }

    /// Run exactly one fixed step
    pub fn step(&mut self) {
        if !has_valid_step(&self.params) {
            log::warn!("Not stepping: invalid simulation step {}", self.params.simulation_step);
            return;
        }

        self.sequence_number += 1;
        self.sim_time += self.params.simulation_step;
        let tick = self.tick();

        // Low-frequency: waterness
        if tick.is_step_of(0, self.params.low_frequency_update_period.max(1)) {
            waterness_system(&mut self.particles, &self.ocean);
        }

        let mut events = SelectedNpcSink {
            selected_npc: self.selected_npc,
            inner: self.event_sink.as_mut(),
        };

        let env = Surroundings {
            particles: &self.particles,
            ship: &self.ship,
            ocean: &self.ocean,
        };
        human_behavior_system(
            &mut self.world,
            tick,
            &env,
            &self.params,
            self.generalized_panic_level,
            &mut self.rng,
            &mut events,
        );

        integration_system(
            &mut self.world,
            &mut self.particles,
            &self.ship,
            &self.params,
            tick,
            &mut events,
        );
    }

    fn tick(&self) -> SimulationTick {
        SimulationTick::new(self.sim_time, self.sequence_number)
    }

    /// Report a particle bounce from an external collision pass
    pub fn on_impact(
        &mut self,
        npc_id: NpcId,
        particle: ParticleOrdinal,
        normal_response: Vec2,
        bounce_edge_normal: Vec2,
    ) -> Result<(), NpcError> {
        let tick = self.tick();
        let npc = find_npc(&mut self.world, &self.npc_entities, npc_id)?;
        let mut events = SelectedNpcSink {
            selected_npc: self.selected_npc,
            inner: self.event_sink.as_mut(),
        };
        on_human_impact(npc, particle, normal_response, bounce_edge_normal, tick, &mut events);
        Ok(())
    }

    // ── External stimuli ───────────────────────────────────────────────

    /// Ship-wide panic, applied to every human at the next update
    pub fn set_generalized_panic_level(&mut self, level: f32) {
        self.generalized_panic_level = level.clamp(0.0, 1.0);
    }

    pub fn generalized_panic_level(&self) -> f32 {
        self.generalized_panic_level
    }

    /// Scare walking humans whose head is within `radius` of `position`.
    /// Returns how many turned around.
    pub fn on_disturbance(&mut self, position: Vec2, radius: f32) -> usize {
        let mut flipped = 0;
        for (_, npc) in self.world.query_mut::<&mut HumanNpc>() {
            let head = self.particles.position(npc.head().particle_index);
            if head.distance(&position) <= radius && on_disturbance(npc, position, &self.particles) {
                flipped += 1;
            }
        }
        flipped
    }

    /// Turn a walking human around immediately. Returns whether it was walking.
    pub fn flip_human_walk(&mut self, npc_id: NpcId) -> Result<bool, NpcError> {
        let npc = find_npc(&mut self.world, &self.npc_entities, npc_id)?;
        if npc.state.current_behavior() != BehaviorType::ConstrainedWalking {
            return Ok(false);
        }
        flip_human_walk(&mut npc.state, true);
        Ok(true)
    }

    pub fn flip_human_front_back(&mut self, npc_id: NpcId) -> Result<(), NpcError> {
        let npc = find_npc(&mut self.world, &self.npc_entities, npc_id)?;
        flip_human_front_back(&mut npc.state);
        Ok(())
    }

    /// Turn a human around: walkers flip their walk, others their facing
    pub fn turnaround_human(&mut self, npc_id: NpcId) -> Result<(), NpcError> {
        let npc = find_npc(&mut self.world, &self.npc_entities, npc_id)?;
        if npc.state.current_behavior() == BehaviorType::ConstrainedWalking {
            flip_human_walk(&mut npc.state, true);
        } else if npc.state.current_face_direction_x != 0.0 {
            npc.state.current_face_direction_x *= -1.0;
        } else {
            npc.state.current_face_orientation *= -1.0;
        }
        Ok(())
    }

    /// Set a human on fire, or put it out
    pub fn set_combustion(&mut self, npc_id: NpcId, is_on_fire: bool) -> Result<(), NpcError> {
        let sim_time = self.sim_time;
        let npc = find_npc(&mut self.world, &self.npc_entities, npc_id)?;
        if !is_on_fire {
            npc.combustion = None;
        } else if npc.combustion.is_none() {
            npc.combustion = Some(CombustionState {
                ignition_simulation_time: sim_time,
            });
        }
        Ok(())
    }

    /// Choose the NPC whose notifications reach the event sink
    pub fn select_npc(&mut self, npc_id: Option<NpcId>) {
        self.selected_npc = npc_id;
    }

    pub fn selected_npc(&self) -> Option<NpcId> {
        self.selected_npc
    }

    // ── Queries ────────────────────────────────────────────────────────

    pub fn npc_count(&self) -> usize {
        self.npc_entities.len()
    }

    /// Ids of all NPCs, ascending
    pub fn npc_ids(&self) -> Vec<NpcId> {
        let mut ids: Vec<NpcId> = self.npc_entities.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Snapshot of an NPC
    pub fn npc(&self, npc_id: NpcId) -> Option<HumanNpc> {
        let entity = *self.npc_entities.get(&npc_id)?;
        self.world.get::<&HumanNpc>(entity).ok().map(|npc| (*npc).clone())
    }

    pub fn behavior_of(&self, npc_id: NpcId) -> Option<BehaviorType> {
        self.npc(npc_id).map(|npc| npc.state.current_behavior())
    }

    /// Current position of one of an NPC's particles
    pub fn particle_position(&self, npc_id: NpcId, particle: ParticleOrdinal) -> Option<Vec2> {
        self.npc(npc_id)
            .map(|npc| self.particles.position(npc.particle(particle).particle_index))
    }

    /// Mutable access to an NPC, for tools and tests that poke at state
    pub fn npc_mut(&mut self, npc_id: NpcId) -> Result<&mut HumanNpc, NpcError> {
        find_npc(&mut self.world, &self.npc_entities, npc_id)
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    // ── Persistence ────────────────────────────────────────────────────

    /// Save simulation state to a writer
    pub fn save<W: std::io::Write>(&self, writer: W) -> Result<(), SaveError> {
        let mut humans: Vec<HumanNpc> = self
            .world
            .query::<&HumanNpc>()
            .iter()
            .map(|(_, npc)| npc.clone())
            .collect();
        humans.sort_by_key(|npc| npc.id);

        crate::persistence::save_simulation(
            writer,
            self.sim_time,
            self.sequence_number,
            self.generalized_panic_level,
            self.next_npc_id,
            &self.params,
            &self.particles,
            &self.ship,
            &self.ocean,
            humans,
        )
    }

    /// Load simulation state from a reader
    pub fn load<R: std::io::Read>(&mut self, reader: R) -> Result<(), SaveError> {
        let loaded = crate::persistence::load_simulation(reader)?;

        self.sim_time = loaded.sim_time;
        self.sequence_number = loaded.sequence_number;
        self.generalized_panic_level = loaded.generalized_panic_level;
        self.next_npc_id = loaded.next_npc_id;
        self.params = loaded.params;
        self.particles = loaded.particles;
        self.ship = loaded.ship;
        self.ocean = loaded.ocean;
        self.step_accumulator = 0.0;

        // Rebuild the world and the id index
        self.world = World::new();
        self.npc_entities.clear();
        for npc in loaded.humans {
            let id = npc.id;
            let entity = self.world.spawn((npc,));
            self.npc_entities.insert(id, entity);
        }

        if self.selected_npc.is_some_and(|id| !self.npc_entities.contains_key(&id)) {
            self.selected_npc = None;
        }

        // Continue with a stream that depends on where the save was taken
        self.rng = StdRng::seed_from_u64(self.rng_seed ^ self.sequence_number);

        log::info!(
            "Loaded {} NPCs at t={:.3}s (step {})",
            self.npc_entities.len(),
            self.sim_time,
            self.sequence_number
        );
        Ok(())
    }
}

/// Fastest a human can be dragged around while being placed (m/s)
const MAX_MOVE_VELOCITY: f32 = 4.0;

fn has_valid_step(params: &NpcParameters) -> bool {
    params.simulation_step > 0.0 && params.simulation_step.is_finite()
}

fn find_npc<'w>(
    world: &'w mut World,
    npc_entities: &HashMap<NpcId, Entity>,
    npc_id: NpcId,
) -> Result<&'w mut HumanNpc, NpcError> {
    npc_entities
        .get(&npc_id)
        .and_then(|entity| world.query_one_mut::<&mut HumanNpc>(*entity).ok())
        .ok_or_else(|| {
            log::warn!("No NPC with id {}", npc_id);
            NpcError::UnknownNpc(npc_id)
        })
}

/// Forwards notifications about the selected NPC only
struct SelectedNpcSink<'a> {
    selected_npc: Option<NpcId>,
    inner: &'a mut dyn NpcEventSink,
}

impl NpcEventSink for SelectedNpcSink<'_> {
    fn on_human_behavior_changed(&mut self, npc_id: NpcId, new_behavior: BehaviorType) {
        if self.selected_npc == Some(npc_id) {
            self.inner.on_human_behavior_changed(npc_id, new_behavior);
        }
    }

    fn on_human_state_quantity_changed(&mut self, npc_id: NpcId, quantity: Option<(&'static str, f32)>) {
        if self.selected_npc == Some(npc_id) {
            self.inner.on_human_state_quantity_changed(npc_id, quantity);
        }
    }
}

/// Errors from operations addressing a specific NPC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NpcError {
    UnknownNpc(NpcId),
    /// The operation needs the NPC to be held in placement
    NotBeingPlaced(NpcId),
}

impl std::fmt::Display for NpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NpcError::UnknownNpc(id) => write!(f, "Unknown NPC: {}", id),
            NpcError::NotBeingPlaced(id) => write!(f, "NPC {} is not being placed", id),
        }
    }
}

impl std::error::Error for NpcError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_deck_engine() -> NpcSimulationEngine {
        NpcSimulationEngine::new(ShipMesh::box_hull(Vec2::ZERO, 2.0, 2.5, 3, 1), Ocean::new(-10.0))
    }

    #[test]
    fn test_add_human_is_being_placed() {
        let mut engine = one_deck_engine();
        let id = engine.add_human(Vec2::new(1.0, 0.0), 1.65, 0.5);

        assert_eq!(engine.npc_count(), 1);
        assert_eq!(engine.particles.len(), 2);
        assert_eq!(engine.behavior_of(id), Some(BehaviorType::BeingPlaced));
        assert_eq!(engine.particle_position(id, ParticleOrdinal::Head), Some(Vec2::new(1.0, 1.65)));
    }

    #[test]
    fn test_placed_human_is_held() {
        let mut engine = one_deck_engine();
        let id = engine.add_human(Vec2::new(1.0, 1.0), 1.65, 0.5);

        for _ in 0..10 {
            engine.step();
        }

        assert_eq!(engine.behavior_of(id), Some(BehaviorType::BeingPlaced));
        assert_eq!(engine.particle_position(id, ParticleOrdinal::Feet), Some(Vec2::new(1.0, 1.0)));
    }

    #[test]
    fn test_update_runs_fixed_steps() {
        let mut engine = one_deck_engine();
        engine.update(4.0 / 64.0);
        assert_eq!(engine.sequence_number(), 4);
        engine.update(0.5 / 64.0);
        assert_eq!(engine.sequence_number(), 4);
        engine.update(0.5 / 64.0);
        assert_eq!(engine.sequence_number(), 5);
    }

    #[test]
    fn test_invalid_step_stops_updates() {
        let mut engine = one_deck_engine();
        engine.params.simulation_step = 0.0;
        engine.update(0.1);
        engine.step();
        assert_eq!(engine.sequence_number(), 0);

        engine.params.simulation_step = f32::NAN;
        engine.update(0.1);
        assert_eq!(engine.sequence_number(), 0);
    }

    #[test]
    fn test_placement_samples_waterness() {
        let mut engine = NpcSimulationEngine::new(ShipMesh::new(), Ocean::new(0.0));
        let id = engine.add_human(Vec2::new(0.0, -3.0), 1.65, 0.5);
        engine.end_placement(id).expect("known NPC");

        let npc = engine.npc(id).expect("known NPC");
        assert_eq!(engine.particles.any_waterness(npc.feet().particle_index), 1.0);
        assert_eq!(engine.particles.any_waterness(npc.head().particle_index), 1.0);
    }

    #[test]
    fn test_removal_frees_particles() {
        let mut engine = one_deck_engine();
        let id = engine.add_human(Vec2::new(1.0, 0.0), 1.65, 0.5);
        engine.select_npc(Some(id));

        engine.remove_human(id).expect("known NPC");
        assert_eq!(engine.npc_count(), 0);
        assert!(engine.particles.is_empty());
        assert_eq!(engine.world.len(), 0);
        assert_eq!(engine.selected_npc(), None);
    }

    #[test]
    fn test_move_velocity_capped() {
        let mut engine = one_deck_engine();
        let id = engine.add_human(Vec2::new(1.0, 0.0), 1.65, 0.5);
        engine.move_human_to(id, Vec2::new(5.0, 0.0)).expect("being placed");

        let npc = engine.npc(id).expect("known NPC");
        let velocity = engine.particles.velocity(npc.feet().particle_index);
        assert!((velocity.length() - MAX_MOVE_VELOCITY).abs() < 1e-4);
        assert!(velocity.x > 0.0);
    }

    #[test]
    fn test_unknown_npc() {
        let mut engine = one_deck_engine();
        assert_eq!(engine.end_placement(7), Err(NpcError::UnknownNpc(7)));
        assert_eq!(engine.flip_human_walk(7), Err(NpcError::UnknownNpc(7)));
        assert_eq!(engine.remove_human(7), Err(NpcError::UnknownNpc(7)));
        assert_eq!(NpcError::UnknownNpc(7).to_string(), "Unknown NPC: 7");
        assert_eq!(NpcError::NotBeingPlaced(7).to_string(), "NPC 7 is not being placed");
    }

    #[test]
    fn test_panic_level_clamped() {
        let mut engine = one_deck_engine();
        engine.set_generalized_panic_level(3.0);
        assert_eq!(engine.generalized_panic_level(), 1.0);
    }

    #[test]
    fn test_combustion_keeps_ignition_time() {
        let mut engine = one_deck_engine();
        let id = engine.add_human(Vec2::new(1.0, 0.0), 1.65, 0.5);

        engine.set_combustion(id, true).expect("known NPC");
        engine.step();
        engine.set_combustion(id, true).expect("known NPC");
        let ignition = engine.npc(id).and_then(|npc| npc.combustion).map(|c| c.ignition_simulation_time);
        assert_eq!(ignition, Some(0.0));

        engine.set_combustion(id, false).expect("known NPC");
        assert_eq!(engine.npc(id).map(|npc| npc.is_on_fire()), Some(false));
    }
}
