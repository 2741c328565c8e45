//! Observer hooks for behavior changes, used by debug overlays.

use crate::behavior::BehaviorType;
use crate::npc::NpcId;

/// Receives behavior notifications. Every method defaults to a no-op.
pub trait NpcEventSink {
    fn on_human_behavior_changed(&mut self, _npc_id: NpcId, _new_behavior: BehaviorType) {}

    /// Headline progress quantity of the current state, or `None` for states without one.
    fn on_human_state_quantity_changed(&mut self, _npc_id: NpcId, _quantity: Option<(&'static str, f32)>) {}
}

/// Sink that drops every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEventSink;

impl NpcEventSink for NullEventSink {}

/// Sink that records behavior changes in order, for traces and tests.
#[derive(Debug, Clone, Default)]
pub struct BehaviorTrace {
    pub changes: Vec<(NpcId, BehaviorType)>,
}

impl NpcEventSink for BehaviorTrace {
    fn on_human_behavior_changed(&mut self, npc_id: NpcId, new_behavior: BehaviorType) {
        self.changes.push((npc_id, new_behavior));
    }
}

impl BehaviorTrace {
    pub fn behaviors_of(&self, npc_id: NpcId) -> Vec<BehaviorType> {
        self.changes
            .iter()
            .filter(|(id, _)| *id == npc_id)
            .map(|(_, b)| *b)
            .collect()
    }
}
