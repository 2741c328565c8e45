//! Behavior states of a human NPC and their per-state progress payloads.
//!
//! Every state owns exactly the progress values it needs. The payload lives
//! inside the [`BehaviorState`] variant, so a state can never observe the
//! leftovers of another one: [`HumanNpcState::transition_to_state`] is the
//! only way to switch variants and it always starts from zeroed progress.

use serde::{Deserialize, Serialize};

use crate::constants::HUMAN_NOMINAL_HEIGHT;
use crate::constants::HUMAN_WALKING_SPEED_AT_NOMINAL_HEIGHT;

/// Discriminant of [`BehaviorState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BehaviorType {
    BeingPlaced,

    ConstrainedAerial,
    ConstrainedFalling,
    ConstrainedKnockedOut,
    ConstrainedPreRising,
    ConstrainedRising,
    ConstrainedEquilibrium,
    ConstrainedWalking,
    ConstrainedInWater,
    ConstrainedSwimmingStyle1,
    ConstrainedSwimmingStyle2,
    ConstrainedElectrified,

    FreeAerial,
    FreeKnockedOut,
    FreeInWater,
    FreeSwimmingStyle1,
    FreeSwimmingStyle2,
    FreeSwimmingStyle3,
}

impl BehaviorType {
    pub const ALL: [BehaviorType; 18] = [
        BehaviorType::BeingPlaced,
        BehaviorType::ConstrainedAerial,
        BehaviorType::ConstrainedFalling,
        BehaviorType::ConstrainedKnockedOut,
        BehaviorType::ConstrainedPreRising,
        BehaviorType::ConstrainedRising,
        BehaviorType::ConstrainedEquilibrium,
        BehaviorType::ConstrainedWalking,
        BehaviorType::ConstrainedInWater,
        BehaviorType::ConstrainedSwimmingStyle1,
        BehaviorType::ConstrainedSwimmingStyle2,
        BehaviorType::ConstrainedElectrified,
        BehaviorType::FreeAerial,
        BehaviorType::FreeKnockedOut,
        BehaviorType::FreeInWater,
        BehaviorType::FreeSwimmingStyle1,
        BehaviorType::FreeSwimmingStyle2,
        BehaviorType::FreeSwimmingStyle3,
    ];

    /// States that require the primary particle to be attached to the ship.
    pub fn is_constrained(&self) -> bool {
        matches!(
            self,
            BehaviorType::ConstrainedAerial
                | BehaviorType::ConstrainedFalling
                | BehaviorType::ConstrainedKnockedOut
                | BehaviorType::ConstrainedPreRising
                | BehaviorType::ConstrainedRising
                | BehaviorType::ConstrainedEquilibrium
                | BehaviorType::ConstrainedWalking
                | BehaviorType::ConstrainedInWater
                | BehaviorType::ConstrainedSwimmingStyle1
                | BehaviorType::ConstrainedSwimmingStyle2
                | BehaviorType::ConstrainedElectrified
        )
    }

    /// States that require the primary particle to be free.
    pub fn is_free(&self) -> bool {
        matches!(
            self,
            BehaviorType::FreeAerial
                | BehaviorType::FreeKnockedOut
                | BehaviorType::FreeInWater
                | BehaviorType::FreeSwimmingStyle1
                | BehaviorType::FreeSwimmingStyle2
                | BehaviorType::FreeSwimmingStyle3
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            BehaviorType::BeingPlaced => "BeingPlaced",
            BehaviorType::ConstrainedAerial => "Constrained_Aerial",
            BehaviorType::ConstrainedFalling => "Constrained_Falling",
            BehaviorType::ConstrainedKnockedOut => "Constrained_KnockedOut",
            BehaviorType::ConstrainedPreRising => "Constrained_PreRising",
            BehaviorType::ConstrainedRising => "Constrained_Rising",
            BehaviorType::ConstrainedEquilibrium => "Constrained_Equilibrium",
            BehaviorType::ConstrainedWalking => "Constrained_Walking",
            BehaviorType::ConstrainedInWater => "Constrained_InWater",
            BehaviorType::ConstrainedSwimmingStyle1 => "Constrained_Swimming_Style1",
            BehaviorType::ConstrainedSwimmingStyle2 => "Constrained_Swimming_Style2",
            BehaviorType::ConstrainedElectrified => "Constrained_Electrified",
            BehaviorType::FreeAerial => "Free_Aerial",
            BehaviorType::FreeKnockedOut => "Free_KnockedOut",
            BehaviorType::FreeInWater => "Free_InWater",
            BehaviorType::FreeSwimmingStyle1 => "Free_Swimming_Style1",
            BehaviorType::FreeSwimmingStyle2 => "Free_Swimming_Style2",
            BehaviorType::FreeSwimmingStyle3 => "Free_Swimming_Style3",
        }
    }
}

impl std::fmt::Display for BehaviorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Aerial human deciding whether it landed sliding or standing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AerialProgress {
    pub progress_to_falling: f32,
    pub progress_to_rising: f32,
}

/// Fallen human waiting to come to rest; used by Falling and KnockedOut.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RecoveryProgress {
    /// Frame counter toward getting up.
    pub progress_to_pre_rising: f32,
    pub progress_to_aerial: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PreRisingProgress {
    pub progress_to_rising: f32,
    pub progress_to_aerial: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EquilibriumProgress {
    pub progress_to_walking: f32,
}

/// Gait state of a walking human.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WalkingProgress {
    /// 0 at start of walk or right after a flip, converging to 1.
    pub current_walk_magnitude: f32,
    pub target_flip_decision: f32,
    pub current_flip_decision: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InWaterProgress {
    pub progress_to_swimming: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ElectrifiedProgress {
    /// Frame counter of non-electrified frames.
    pub progress_to_leaving: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FreeAerialProgress {
    pub progress_to_knocked_out: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FreeKnockedOutProgress {
    pub progress_to_aerial: f32,
}

/// Current behavior together with its progress payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BehaviorState {
    BeingPlaced,

    ConstrainedAerial(AerialProgress),
    ConstrainedFalling(RecoveryProgress),
    ConstrainedKnockedOut(RecoveryProgress),
    ConstrainedPreRising(PreRisingProgress),
    ConstrainedRising,
    ConstrainedEquilibrium(EquilibriumProgress),
    ConstrainedWalking(WalkingProgress),
    ConstrainedInWater(InWaterProgress),
    ConstrainedSwimmingStyle1,
    ConstrainedSwimmingStyle2,
    ConstrainedElectrified(ElectrifiedProgress),

    FreeAerial(FreeAerialProgress),
    FreeKnockedOut(FreeKnockedOutProgress),
    FreeInWater(InWaterProgress),
    FreeSwimmingStyle1,
    FreeSwimmingStyle2,
    FreeSwimmingStyle3,
}

impl BehaviorState {
    /// Fresh state of the given type with all progress at zero.
    pub fn zeroed(kind: BehaviorType) -> Self {
        match kind {
            BehaviorType::BeingPlaced => BehaviorState::BeingPlaced,
            BehaviorType::ConstrainedAerial => BehaviorState::ConstrainedAerial(Default::default()),
            BehaviorType::ConstrainedFalling => BehaviorState::ConstrainedFalling(Default::default()),
            BehaviorType::ConstrainedKnockedOut => {
                BehaviorState::ConstrainedKnockedOut(Default::default())
            }
            BehaviorType::ConstrainedPreRising => {
                BehaviorState::ConstrainedPreRising(Default::default())
            }
            BehaviorType::ConstrainedRising => BehaviorState::ConstrainedRising,
            BehaviorType::ConstrainedEquilibrium => {
                BehaviorState::ConstrainedEquilibrium(Default::default())
            }
            BehaviorType::ConstrainedWalking => BehaviorState::ConstrainedWalking(Default::default()),
            BehaviorType::ConstrainedInWater => BehaviorState::ConstrainedInWater(Default::default()),
            BehaviorType::ConstrainedSwimmingStyle1 => BehaviorState::ConstrainedSwimmingStyle1,
            BehaviorType::ConstrainedSwimmingStyle2 => BehaviorState::ConstrainedSwimmingStyle2,
            BehaviorType::ConstrainedElectrified => {
                BehaviorState::ConstrainedElectrified(Default::default())
            }
            BehaviorType::FreeAerial => BehaviorState::FreeAerial(Default::default()),
            BehaviorType::FreeKnockedOut => BehaviorState::FreeKnockedOut(Default::default()),
            BehaviorType::FreeInWater => BehaviorState::FreeInWater(Default::default()),
            BehaviorType::FreeSwimmingStyle1 => BehaviorState::FreeSwimmingStyle1,
            BehaviorType::FreeSwimmingStyle2 => BehaviorState::FreeSwimmingStyle2,
            BehaviorType::FreeSwimmingStyle3 => BehaviorState::FreeSwimmingStyle3,
        }
    }

    pub fn kind(&self) -> BehaviorType {
        match self {
            BehaviorState::BeingPlaced => BehaviorType::BeingPlaced,
            BehaviorState::ConstrainedAerial(_) => BehaviorType::ConstrainedAerial,
            BehaviorState::ConstrainedFalling(_) => BehaviorType::ConstrainedFalling,
            BehaviorState::ConstrainedKnockedOut(_) => BehaviorType::ConstrainedKnockedOut,
            BehaviorState::ConstrainedPreRising(_) => BehaviorType::ConstrainedPreRising,
            BehaviorState::ConstrainedRising => BehaviorType::ConstrainedRising,
            BehaviorState::ConstrainedEquilibrium(_) => BehaviorType::ConstrainedEquilibrium,
            BehaviorState::ConstrainedWalking(_) => BehaviorType::ConstrainedWalking,
            BehaviorState::ConstrainedInWater(_) => BehaviorType::ConstrainedInWater,
            BehaviorState::ConstrainedSwimmingStyle1 => BehaviorType::ConstrainedSwimmingStyle1,
            BehaviorState::ConstrainedSwimmingStyle2 => BehaviorType::ConstrainedSwimmingStyle2,
            BehaviorState::ConstrainedElectrified(_) => BehaviorType::ConstrainedElectrified,
            BehaviorState::FreeAerial(_) => BehaviorType::FreeAerial,
            BehaviorState::FreeKnockedOut(_) => BehaviorType::FreeKnockedOut,
            BehaviorState::FreeInWater(_) => BehaviorType::FreeInWater,
            BehaviorState::FreeSwimmingStyle1 => BehaviorType::FreeSwimmingStyle1,
            BehaviorState::FreeSwimmingStyle2 => BehaviorType::FreeSwimmingStyle2,
            BehaviorState::FreeSwimmingStyle3 => BehaviorType::FreeSwimmingStyle3,
        }
    }

    /// Walking payload, if walking.
    pub fn walking(&self) -> Option<&WalkingProgress> {
        match self {
            BehaviorState::ConstrainedWalking(w) => Some(w),
            _ => None,
        }
    }

    pub fn walking_mut(&mut self) -> Option<&mut WalkingProgress> {
        match self {
            BehaviorState::ConstrainedWalking(w) => Some(w),
            _ => None,
        }
    }

    /// Name and value of the quantity that best describes progress in this state.
    pub fn headline_quantity(&self) -> Option<(&'static str, f32)> {
        match self {
            BehaviorState::ConstrainedAerial(p) => Some(("ProgressToFalling", p.progress_to_falling)),
            BehaviorState::ConstrainedFalling(p) | BehaviorState::ConstrainedKnockedOut(p) => {
                Some(("ProgressToPreRising", p.progress_to_pre_rising))
            }
            BehaviorState::ConstrainedPreRising(p) => Some(("ProgressToRising", p.progress_to_rising)),
            BehaviorState::ConstrainedEquilibrium(p) => {
                Some(("ProgressToWalking", p.progress_to_walking))
            }
            BehaviorState::ConstrainedWalking(p) => {
                Some(("CurrentFlipDecision", p.current_flip_decision))
            }
            BehaviorState::ConstrainedInWater(p) | BehaviorState::FreeInWater(p) => {
                Some(("ProgressToSwimming", p.progress_to_swimming))
            }
            BehaviorState::ConstrainedElectrified(p) => {
                Some(("ProgressToLeaving", p.progress_to_leaving))
            }
            BehaviorState::FreeAerial(p) => Some(("ProgressToKnockedOut", p.progress_to_knocked_out)),
            BehaviorState::FreeKnockedOut(p) => Some(("ProgressToAerial", p.progress_to_aerial)),
            _ => None,
        }
    }
}

/// Behavior-related state of a human NPC.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HumanNpcState {
    pub behavior: BehaviorState,
    pub current_state_start_simulation_time: f32,

    /// Walking speed (m/s) of this human at adjustment 1.
    pub walking_speed_base: f32,

    /// One-frame request to the integrator to right the human; 0 or 1.
    pub equilibrium_torque: f32,
    /// Smoothed decision to give up equilibrium while the feet are off the floor.
    pub current_equilibrium_soft_termination_decision: f32,

    pub on_fire_panic_level: f32,
    pub bomb_proximity_panic_level: f32,
    pub generalized_panic_level: f32,
    /// Sum of the three panic levels, recomputed each frame. Not capped.
    pub resultant_panic_level: f32,

    /// -1 back, 0 side, +1 front.
    pub current_face_orientation: f32,
    /// -1 left, 0 none, +1 right.
    pub current_face_direction_x: f32,

    /// Gates re-triggering of disturbance scares.
    pub attraction_decay_timer: f32,
}

impl HumanNpcState {
    /// A human of the given height, just placed.
    pub fn new(height: f32, current_simulation_time: f32) -> Self {
        Self {
            behavior: BehaviorState::BeingPlaced,
            current_state_start_simulation_time: current_simulation_time,
            walking_speed_base: HUMAN_WALKING_SPEED_AT_NOMINAL_HEIGHT * height
                / HUMAN_NOMINAL_HEIGHT,
            equilibrium_torque: 0.0,
            current_equilibrium_soft_termination_decision: 0.0,
            on_fire_panic_level: 0.0,
            bomb_proximity_panic_level: 0.0,
            generalized_panic_level: 0.0,
            resultant_panic_level: 0.0,
            current_face_orientation: 1.0,
            current_face_direction_x: 0.0,
            attraction_decay_timer: 0.0,
        }
    }

    pub fn current_behavior(&self) -> BehaviorType {
        self.behavior.kind()
    }

    /// Switch to `new_behavior` with zeroed progress; panic and face are untouched.
    pub fn transition_to_state(&mut self, new_behavior: BehaviorType, current_simulation_time: f32) {
        self.behavior = BehaviorState::zeroed(new_behavior);
        self.current_state_start_simulation_time = current_simulation_time;

        if new_behavior == BehaviorType::ConstrainedRising {
            self.current_equilibrium_soft_termination_decision = 0.0;
        }
    }

    /// Panic capped to 1, as used by every panic-scaled rate.
    pub fn capped_panic(&self) -> f32 {
        self.resultant_panic_level.min(1.0)
    }
}
