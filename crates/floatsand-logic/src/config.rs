//! Tunable parameters of the NPC simulation.
//!
//! Loaded from JSON by hosts that want to override the defaults; every field
//! falls back to its default when missing.

use serde::{Deserialize, Serialize};

use crate::vec2::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NpcParameters {
    /// Global multiplier of human walking speed.
    pub human_walking_speed_adjustment: f32,
    /// Period (in ticks) of low-frequency work: waterness sampling, electrification and bomb checks.
    pub low_frequency_update_period: u64,

    /// Fixed integration step (s).
    pub simulation_step: f32,
    pub gravity: Vec2,
    /// Fraction of along-floor velocity lost per step while not walking.
    pub floor_friction: f32,
    /// Fraction of the head offset corrected per step under equilibrium torque.
    pub equilibrium_stiffness: f32,
    /// Fraction of the feet-head length error corrected per step.
    pub spring_stiffness: f32,
    /// Fraction of velocity lost per step when fully submerged.
    pub water_drag: f32,
    /// Upward acceleration (m/s²) when fully submerged.
    pub buoyancy: f32,
}

impl Default for NpcParameters {
    fn default() -> Self {
        Self {
            human_walking_speed_adjustment: 1.0,
            low_frequency_update_period: 4,
            simulation_step: 1.0 / 64.0,
            gravity: Vec2::new(0.0, -9.80),
            floor_friction: 0.15,
            equilibrium_stiffness: 0.2,
            spring_stiffness: 0.8,
            water_drag: 0.05,
            buoyancy: 10.5,
        }
    }
}
