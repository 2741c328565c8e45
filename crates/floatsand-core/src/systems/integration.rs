//! Integration system - moves NPC particles and resolves contacts with the ship.
//!
//! Simple explicit integrator: forces, walking and the righting torque set
//! velocities; the feet-head spring is enforced on positions; then each
//! particle is clamped against the solid edges of its triangle. Impacts are
//! forwarded to the behavior logic as they happen.

use floatsand_logic::behavior::BehaviorType;
use floatsand_logic::config::NpcParameters;
use floatsand_logic::environment::SimulationTick;
use floatsand_logic::events::NpcEventSink;
use floatsand_logic::impact::on_human_impact;
use floatsand_logic::npc::{
    ConstrainedState, HumanNpc, NpcParticle, ParticleOrdinal, TriangleBCoords, TriangleEdge, TriangleIndex,
};
use floatsand_logic::vec2::Vec2;
use floatsand_logic::walking::calculate_actual_walking_absolute_speed;
use hecs::World;

use crate::substrate::{NpcParticles, ShipMesh};

/// Distance from a solid edge within which a particle counts as touching it.
const CONTACT_DISTANCE: f32 = 1e-3;

/// Slack on the edge span when testing contacts near triangle corners.
const EDGE_SPAN_SLACK: f32 = 0.01;

/// Passes over a triangle's solid edges per particle and step.
const MAX_CONTACT_PASSES: usize = 3;

/// Integrate all placed humans by one step.
pub fn integration_system(
    world: &mut World,
    particles: &mut NpcParticles,
    ship: &ShipMesh,
    params: &NpcParameters,
    tick: SimulationTick,
    events: &mut dyn NpcEventSink,
) {
    for (_, npc) in world.query_mut::<&mut HumanNpc>() {
        // Held by the user until placement ends
        if npc.state.current_behavior() == BehaviorType::BeingPlaced {
            continue;
        }

        integrate_human(npc, particles, ship, params, tick, events);
    }
}

/// Result of clamping one particle against the ship.
#[derive(Debug, Clone, Copy)]
pub struct ContactOutcome {
    pub position: Vec2,
    pub velocity: Vec2,
    /// (normal response, outward edge normal) of a bounce
    pub impact: Option<(Vec2, Vec2)>,
}

fn integrate_human(
    npc: &mut HumanNpc,
    particles: &mut NpcParticles,
    ship: &ShipMesh,
    params: &NpcParameters,
    tick: SimulationTick,
    events: &mut dyn NpcEventSink,
) {
    let dt = params.simulation_step;
    let indices = [npc.feet().particle_index, npc.head().particle_index];
    let (Some(feet_data), Some(head_data)) = (particles.get(indices[0]).copied(), particles.get(indices[1]).copied()) else {
        log::warn!("NPC {} refers to missing particles", npc.id);
        return;
    };

    let positions = [feet_data.position, head_data.position];
    let mut velocities = [feet_data.velocity, head_data.velocity];
    let waterness = [feet_data.any_waterness, head_data.any_waterness];

    let is_walking = npc.state.current_behavior() == BehaviorType::ConstrainedWalking;

    // Gravity, buoyancy, drag
    for i in 0..2 {
        let acceleration = params.gravity + Vec2::new(0.0, params.buoyancy * waterness[i]);
        velocities[i] += acceleration * dt;
        velocities[i] = velocities[i] * (1.0 - params.water_drag * waterness[i]);
    }

    // Floor friction, except for walking feet
    for (i, particle) in npc.particles.iter().enumerate() {
        if particle.is_on_floor() && !(is_walking && i == 0) {
            velocities[i].x *= 1.0 - params.floor_friction;
        }
    }

    // Walk
    if is_walking && npc.feet().is_on_floor() {
        let speed = calculate_actual_walking_absolute_speed(&npc.state, params);
        velocities[0].x = npc.state.current_face_direction_x * speed;
    }

    // Righting torque: steer the head toward straight above the feet
    if npc.state.equilibrium_torque != 0.0 {
        let ideal_head = positions[0] + velocities[0] * dt + Vec2::new(0.0, npc.height);
        let predicted_head = positions[1] + velocities[1] * dt;
        velocities[1] += (ideal_head - predicted_head) * (params.equilibrium_stiffness / dt);
    }

    let mut new_positions = [positions[0] + velocities[0] * dt, positions[1] + velocities[1] * dt];

    // Feet-head spring
    let spring = new_positions[1] - new_positions[0];
    let length = spring.length();
    if length > 0.0 {
        let correction = spring.normalize() * ((length - npc.height) * 0.5 * params.spring_stiffness);
        new_positions[0] += correction;
        new_positions[1] = new_positions[1] - correction;
    }

    for i in 0..2 {
        velocities[i] = (new_positions[i] - positions[i]) / dt;
    }

    // Contacts
    for (i, ordinal) in [(0, ParticleOrdinal::Feet), (1, ParticleOrdinal::Head)] {
        let outcome = resolve_contact(&mut npc.particles[i], new_positions[i], velocities[i], ship);

        particles.set_position(indices[i], outcome.position);
        particles.set_velocity(indices[i], outcome.velocity);

        if let Some((normal_response, edge_normal)) = outcome.impact {
            on_human_impact(npc, ordinal, normal_response, edge_normal, tick, events);
        }
    }
}

/// Clamp a particle's tentative move against the ship and update its contact state.
pub fn resolve_contact(
    particle: &mut NpcParticle,
    position: Vec2,
    velocity: Vec2,
    ship: &ShipMesh,
) -> ContactOutcome {
    let Some(mut cs) = particle.constrained_state else {
        // Free particles get caught by the ship as soon as they are inside it
        if let Some(tb) = ship.find_triangle(position) {
            let mut cs = ConstrainedState::new(tb);
            cs.mesh_relative_velocity = velocity;
            particle.constrained_state = Some(cs);
        }
        return ContactOutcome {
            position,
            velocity,
            impact: None,
        };
    };

    let mut outcome = ContactOutcome {
        position,
        velocity,
        impact: None,
    };
    let mut floor = None;
    let triangle = cs.current_bcoords.triangle;

    if !cs.ghost_particle_pulse {
        // A clamp against one edge can bring the particle within the span of
        // another one it had overshot, as at corners
        for _ in 0..MAX_CONTACT_PASSES {
            let mut clamped = false;

            for edge_ordinal in 0..3u8 {
                let edge = TriangleEdge {
                    triangle,
                    edge_ordinal,
                };
                if !ship.is_solid_edge(edge) {
                    continue;
                }

                let (a, b) = ship.edge_endpoints(edge);
                let n = ship.edge_outward_normal(edge);
                let penetration = (outcome.position - a).dot(n);
                let span = (outcome.position - a).dot(b - a) / (b - a).length_squared();

                if penetration < -CONTACT_DISTANCE || !(-EDGE_SPAN_SLACK..=1.0 + EDGE_SPAN_SLACK).contains(&span) {
                    continue;
                }

                if penetration > 0.0 {
                    outcome.position = outcome.position - n * penetration;
                    clamped = true;
                }

                let normal_velocity = outcome.velocity.dot(n);
                if normal_velocity > 0.0 {
                    outcome.velocity = outcome.velocity - n * normal_velocity;
                    outcome.impact = Some((n * -normal_velocity, n));
                }

                if ship.is_floor_edge(edge) {
                    floor = Some(edge);
                }
            }

            if !clamped {
                break;
            }
        }
    }

    // Locate in the mesh
    let bcoords = ship.to_bcoords(triangle, outcome.position);
    if ShipMesh::is_inside(&bcoords) {
        cs.current_bcoords = TriangleBCoords { triangle, bcoords };
    } else if let Some(tb) = ship.find_triangle(outcome.position) {
        cs.current_bcoords = tb;
        // Keep standing when stepping onto the next floor segment
        floor = floor.and_then(|_| touching_floor(ship, tb.triangle, outcome.position));
    } else {
        // Left the ship
        particle.constrained_state = None;
        return outcome;
    }

    cs.current_virtual_floor = floor;
    cs.mesh_relative_velocity = outcome.velocity;
    particle.constrained_state = Some(cs);

    outcome
}

fn touching_floor(ship: &ShipMesh, triangle: TriangleIndex, position: Vec2) -> Option<TriangleEdge> {
    (0..3u8)
        .map(|edge_ordinal| TriangleEdge {
            triangle,
            edge_ordinal,
        })
        .find(|edge| {
            let (a, _) = ship.edge_endpoints(*edge);
            ship.is_floor_edge(*edge) && (position - a).dot(ship.edge_outward_normal(*edge)) >= -CONTACT_DISTANCE
        })
}
