//! Human behavior system - runs the state machine of every NPC.

use floatsand_logic::config::NpcParameters;
use floatsand_logic::environment::{SimulationTick, Surroundings};
use floatsand_logic::events::NpcEventSink;
use floatsand_logic::human::update_human;
use floatsand_logic::npc::HumanNpc;
use floatsand_logic::panic::set_generalized_panic_level;
use hecs::World;
use rand::Rng;

/// Update the behavior of all humans for one step.
///
/// The ship-wide panic level is copied into each human before its update.
pub fn human_behavior_system<R: Rng>(
    world: &mut World,
    tick: SimulationTick,
    env: &Surroundings,
    params: &NpcParameters,
    generalized_panic_level: f32,
    rng: &mut R,
    events: &mut dyn NpcEventSink,
) {
    for (_, npc) in world.query_mut::<&mut HumanNpc>() {
        set_generalized_panic_level(&mut npc.state, generalized_panic_level);
        update_human(npc, tick, env, params, rng, events);
    }
}
