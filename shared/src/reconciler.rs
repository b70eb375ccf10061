use serde::{Deserialize, Serialize};

use crate::geo::LatLng;

/// Which events are allowed to move the displayed position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitPolicy {
    /// Commit on map pan/zoom and on every timer tick.
    #[default]
    InteractionAndTick,
    /// Commit on timer ticks only.
    TickOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitTrigger {
    MapInteraction,
    Tick,
}

/// Decouples how often positions arrive from how often the marker moves.
///
/// Incoming positions land in `next`; a commit event copies `next` into
/// `current`, which is what the renderer draws. Motion is a discrete jump.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionReconciler {
    current: LatLng,
    next: Option<LatLng>,
    policy: CommitPolicy,
}

impl PositionReconciler {
    pub fn new(initial: LatLng, policy: CommitPolicy) -> Self {
        Self {
            current: initial,
            next: None,
            policy,
        }
    }

    pub fn current(&self) -> LatLng {
        self.current
    }

    pub fn next(&self) -> Option<LatLng> {
        self.next
    }

    /// Buffer a position. Last write wins.
    pub fn on_position_update(&mut self, position: LatLng) {
        self.next = Some(position);
    }

    /// Returns `true` when the displayed position changed.
    pub fn on_map_interaction(&mut self) -> bool {
        self.commit(CommitTrigger::MapInteraction)
    }

    /// Returns `true` when the displayed position changed.
    pub fn on_tick(&mut self) -> bool {
        self.commit(CommitTrigger::Tick)
    }

    fn commit(&mut self, trigger: CommitTrigger) -> bool {
        if self.policy == CommitPolicy::TickOnly && trigger == CommitTrigger::MapInteraction {
            return false;
        }
        let Some(next) = self.next else {
            return false;
        };
        let changed = next != self.current;
        self.current = next;
        changed
    }
}
