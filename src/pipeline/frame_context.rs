// src/pipeline/frame_context.rs
//
// Read-only view of one processed frame: live tracks with trails and
// colors plus the counters. This is what the presentation side receives.

use crate::analysis::{CounterSnapshot, CrossingEvent, Track, TrackId};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackView {
    pub id: TrackId,
    pub x: f32,
    pub y: f32,
    pub age: u32,
    pub color: [u8; 3],
    pub trail: Vec<[f32; 2]>,
}

impl From<&Track> for TrackView {
    fn from(track: &Track) -> Self {
        let pos = track.position();
        Self {
            id: track.id(),
            x: pos.x,
            y: pos.y,
            age: track.age(),
            color: track.display_color(),
            trail: track.history().iter().map(|p| [p.x, p.y]).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameContext {
    pub frame_id: u64,
    pub timestamp_ms: Option<f64>,
    pub tracks: Vec<TrackView>,
    pub counters: CounterSnapshot,
    /// Crossings emitted on this frame
    #[serde(skip)]
    pub crossings: Vec<CrossingEvent>,
}

impl FrameContext {
    /// Tracks currently on screen
    pub fn visible_count(&self) -> usize {
        self.tracks.len()
    }
}
