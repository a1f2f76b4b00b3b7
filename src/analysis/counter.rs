// src/analysis/counter.rs
//
// Directional crossing counters. Counts only ever go up; occupancy is
// derived and clamped at zero.

use serde::Serialize;

use super::line_crossing::CrossingEvent;
use crate::types::CrossingDirection;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub entries: u64,
    pub exits: u64,
    pub net_occupancy: u64,
}

#[derive(Debug, Default)]
pub struct CounterAggregator {
    entries: u64,
    exits: u64,
}

impl CounterAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: &CrossingEvent) {
        match event.direction {
            CrossingDirection::Entering => self.entries += 1,
            CrossingDirection::Exiting => self.exits += 1,
        }
    }

    pub fn net_occupancy(&self) -> u64 {
        self.entries.saturating_sub(self.exits)
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            entries: self.entries,
            exits: self.exits,
            net_occupancy: self.net_occupancy(),
        }
    }

    pub fn reset(&mut self) {
        self.entries = 0;
        self.exits = 0;
    }
}
