//! Human NPC behavior logic for Floating Sandbox.
//!
//! Humans are two-particle bodies (feet and head) riding on a ship's
//! triangle mesh or floating free. This crate decides what each human is
//! doing (standing, walking, falling, swimming, ...) from the state of its
//! particles, and tells the integrator when to keep it upright and how fast
//! to walk. It holds no particles itself: the physics engine supplies them
//! through the traits in [`environment`].
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`behavior`] | Behavior states, progress payloads, per-human state |
//! | [`config`] | Tunable parameters (serde) |
//! | [`constants`] | Thresholds and convergence rates |
//! | [`convergence`] | Exponential smoothing and frame counters |
//! | [`environment`] | Particle, ship and ocean interfaces; simulation tick |
//! | [`equilibrium`] | Upright equilibrium check and righting torque |
//! | [`events`] | Behavior-change observer hooks |
//! | [`human`] | The per-frame state machine |
//! | [`impact`] | Reactions to particle bounces |
//! | [`npc`] | Human NPC and particle contact data |
//! | [`panic`] | Ship-wide panic, disturbances, orientation flips |
//! | [`vec2`] | 2D vector math |
//! | [`walking`] | Walking gait and speed |

pub mod behavior;
pub mod config;
pub mod constants;
pub mod convergence;
pub mod environment;
pub mod equilibrium;
pub mod events;
pub mod human;
pub mod impact;
pub mod npc;
pub mod panic;
pub mod vec2;
pub mod walking;
