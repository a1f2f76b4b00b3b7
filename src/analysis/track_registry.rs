// src/analysis/track_registry.rs
//
// Centroid tracker that owns every live person track.
//
// Design:
//   - Proximity policy: radial distance (default) or box tolerance
//   - Association policy: greedy nearest-pair (default) or first-match in
//     registry order
//   - A track takes at most one observation per frame, and vice versa
//   - Unmatched observations open new tracks with monotonic ids
//   - Tracks age while unobserved and are evicted once age > max_age

use std::collections::VecDeque;
use tracing::debug;

use crate::observation::Observation;
use crate::types::{AssociationPolicy, Motion, Point, ProximityKind, TrackingConfig};

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Proximity {
    /// Euclidean centroid distance strictly below the threshold
    Radial { threshold: f32 },
    /// |dx| <= observation width and |dy| <= observation height
    BoxTolerance,
}

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Frames a track survives without a match
    pub max_age: u32,
    pub proximity: Proximity,
    pub association: AssociationPolicy,
    /// Positions kept per track, current position included
    pub max_history: usize,
    /// Observations with a smaller area are treated as noise
    pub min_area: f32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_age: 15,
            proximity: Proximity::Radial { threshold: 75.0 },
            association: AssociationPolicy::Nearest,
            max_history: 64,
            min_area: 0.0,
        }
    }
}

impl RegistryConfig {
    pub fn from_tracking(cfg: &TrackingConfig, min_area: f32) -> Self {
        let proximity = match cfg.proximity {
            ProximityKind::Radial => Proximity::Radial {
                threshold: cfg.distance_threshold,
            },
            ProximityKind::BoxTolerance => Proximity::BoxTolerance,
        };
        Self {
            max_age: cfg.max_age,
            proximity,
            association: cfg.association,
            max_history: cfg.max_history.max(2),
            min_area,
        }
    }
}

// ============================================================================
// TYPES
// ============================================================================

pub type TrackId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossingState {
    NotCrossed,
    Crossed,
}

/// A persistent identity for one tracked person
#[derive(Debug, Clone)]
pub struct Track {
    id: TrackId,
    history: VecDeque<Point>,
    max_history: usize,
    age: u32,
    pub crossing_state: CrossingState,
    pub direction: Option<Motion>,
    /// Set once the track has nothing left to count; evicted next aging pass
    pub done: bool,
    touched: bool,
}

impl Track {
    fn new(id: TrackId, at: Point, max_history: usize) -> Self {
        let mut history = VecDeque::with_capacity(max_history.min(64));
        history.push_back(at);
        Self {
            id,
            history,
            max_history,
            age: 0,
            crossing_state: CrossingState::NotCrossed,
            direction: None,
            done: false,
            touched: true,
        }
    }

    pub fn id(&self) -> TrackId {
        self.id
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    /// Current position (last history entry)
    pub fn position(&self) -> Point {
        // history is seeded at creation and never drained below one entry
        self.history.back().copied().unwrap_or(Point::new(0.0, 0.0))
    }

    /// Oldest first, current position last
    pub fn history(&self) -> &VecDeque<Point> {
        &self.history
    }

    /// The two most recent positions as (previous, current)
    pub fn last_two(&self) -> Option<(Point, Point)> {
        let n = self.history.len();
        if n < 2 {
            return None;
        }
        Some((self.history[n - 2], self.history[n - 1]))
    }

    pub fn has_crossed(&self) -> bool {
        self.crossing_state == CrossingState::Crossed
    }

    /// Cosmetic RGB, stable for a given id
    pub fn display_color(&self) -> [u8; 3] {
        let mut h = self.id.wrapping_add(0x9E37_79B9_7F4A_7C15);
        h = (h ^ (h >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        h = (h ^ (h >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        h ^= h >> 31;
        [h as u8, (h >> 8) as u8, (h >> 16) as u8]
    }

    fn update_position(&mut self, at: Point) {
        self.history.push_back(at);
        while self.history.len() > self.max_history {
            self.history.pop_front();
        }
        self.age = 0;
        self.touched = true;
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

pub struct TrackRegistry {
    pub config: RegistryConfig,
    tracks: Vec<Track>,
    next_id: TrackId,
}

impl TrackRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            tracks: Vec::with_capacity(32),
            next_id: 1,
        }
    }

    fn passes_proximity(&self, track: &Track, obs: &Observation) -> bool {
        let pos = track.position();
        match self.config.proximity {
            Proximity::Radial { threshold } => pos.distance(&obs.centroid) < threshold,
            Proximity::BoxTolerance => {
                (obs.centroid.x - pos.x).abs() <= obs.bbox.width
                    && (obs.centroid.y - pos.y).abs() <= obs.bbox.height
            }
        }
    }

    /// Associate one frame of observations. Returns the ids of tracks that
    /// were updated or created, in that order.
    pub fn update(&mut self, observations: &[Observation]) -> Vec<TrackId> {
        let min_area = self.config.min_area;
        let valid: Vec<&Observation> = observations
            .iter()
            .filter(|o| o.area >= min_area)
            .collect();

        if valid.len() < observations.len() {
            debug!(
                "{} observation(s) below min area {:.0}",
                observations.len() - valid.len(),
                min_area
            );
        }

        let mut matched_tracks = vec![false; self.tracks.len()];
        let mut matched_obs = vec![false; valid.len()];
        let mut touched = Vec::with_capacity(valid.len());

        match self.config.association {
            AssociationPolicy::Nearest => {
                let mut pairs: Vec<(usize, usize, f32)> = Vec::new();
                for (ti, track) in self.tracks.iter().enumerate() {
                    for (oi, obs) in valid.iter().enumerate() {
                        if self.passes_proximity(track, obs) {
                            pairs.push((ti, oi, track.position().distance(&obs.centroid)));
                        }
                    }
                }
                // stable sort keeps (track, observation) order on distance ties
                pairs.sort_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal));

                for (ti, oi, _dist) in pairs {
                    if matched_tracks[ti] || matched_obs[oi] {
                        continue;
                    }
                    matched_tracks[ti] = true;
                    matched_obs[oi] = true;
                    self.tracks[ti].update_position(valid[oi].centroid);
                    touched.push(self.tracks[ti].id);
                }
            }
            AssociationPolicy::FirstMatch => {
                for (oi, obs) in valid.iter().enumerate() {
                    let hit = (0..self.tracks.len()).find(|&ti| {
                        !matched_tracks[ti] && self.passes_proximity(&self.tracks[ti], obs)
                    });
                    if let Some(ti) = hit {
                        matched_tracks[ti] = true;
                        matched_obs[oi] = true;
                        self.tracks[ti].update_position(obs.centroid);
                        touched.push(self.tracks[ti].id);
                    }
                }
            }
        }

        for (oi, matched) in matched_obs.iter().enumerate() {
            if *matched {
                continue;
            }
            let id = self.next_id;
            self.next_id += 1;
            let at = valid[oi].centroid;
            debug!("New track T{} at ({:.0}, {:.0})", id, at.x, at.y);
            self.tracks.push(Track::new(id, at, self.config.max_history));
            touched.push(id);
        }

        touched
    }

    /// Age every track not touched since the last call and drop the ones past
    /// `max_age` or marked done. Returns the evicted tracks.
    pub fn age_and_evict(&mut self) -> Vec<Track> {
        let max_age = self.config.max_age;
        for track in &mut self.tracks {
            if track.touched {
                track.touched = false;
            } else {
                track.age += 1;
            }
        }

        let (evicted, kept): (Vec<Track>, Vec<Track>) = std::mem::take(&mut self.tracks)
            .into_iter()
            .partition(|t| t.done || t.age > max_age);
        self.tracks = kept;

        for t in &evicted {
            if t.done {
                debug!("Track {} finished", t.id);
            } else {
                debug!("Track {} evicted (age {})", t.id, t.age);
            }
        }
        evicted
    }

    pub fn get(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn get_mut(&mut self, id: TrackId) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.id == id)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Total ids handed out so far
    pub fn total_created(&self) -> u64 {
        self.next_id - 1
    }

    /// Drop every live track. Ids keep increasing so they are never reused.
    pub fn reset(&mut self) {
        self.tracks.clear();
    }
}

// ============================================================================
// TESTS
// ============================================================================
