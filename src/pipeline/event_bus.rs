// src/pipeline/event_bus.rs
//
// Decoupled event system. The frame processor publishes what happened to
// tracks; the frame loop drains and routes it (logging, load tracker).

use crate::analysis::{CrossingEvent, TrackId};
use crate::types::Point;
use std::collections::VecDeque;
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    TrackCreated {
        track_id: TrackId,
        at: Point,
        frame_id: u64,
    },

    TrackEvicted {
        track_id: TrackId,
        /// Evicted because its crossing was complete, not because it was lost
        finished: bool,
        frame_id: u64,
    },

    LineCrossed(CrossingEvent),
}

/// Bounded queue drained once per frame. When the frame loop falls behind the
/// oldest event is dropped so the newest crossings are always kept.
pub struct EventBus {
    events: VecDeque<PipelineEvent>,
    capacity: usize,
    dropped: u64,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            dropped: 0,
        }
    }

    /// Queue an event. Returns `false` when an older event had to make room.
    pub fn publish(&mut self, event: PipelineEvent) -> bool {
        let mut kept_all = true;
        if self.events.len() >= self.capacity {
            if let Some(lost) = self.events.pop_front() {
                self.dropped += 1;
                kept_all = false;
                warn!(
                    "Event bus full ({} events), dropped {:?} ({} total)",
                    self.capacity, lost, self.dropped
                );
            }
        }
        self.events.push_back(event);
        kept_all
    }

    pub fn drain(&mut self) -> Vec<PipelineEvent> {
        self.events.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn created(id: TrackId) -> PipelineEvent {
        PipelineEvent::TrackCreated {
            track_id: id,
            at: Point::new(0.0, 0.0),
            frame_id: 0,
        }
    }

    #[test]
    fn test_drops_oldest_when_full() {
        let mut bus = EventBus::new(2);
        assert!(bus.publish(created(1)));
        assert!(bus.publish(created(2)));
        assert!(!bus.publish(created(3)));
        assert!(!bus.publish(created(4)));
        let drained = bus.drain();
        assert_eq!(drained, vec![created(3), created(4)]);
        assert!(bus.drain().is_empty());
    }
}
