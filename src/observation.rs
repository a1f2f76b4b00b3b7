// src/observation.rs
//
// Per-frame observations handed to the tracker by the observation source.
//
// An observation is either a foreground blob (centroid from image moments)
// or a detector box (centroid from the box center). Degenerate regions are
// dropped here so the registry only ever sees finite, usable centroids.

use crate::types::{BBox, Point};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One frame's worth of detected blobs/boxes before association.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub centroid: Point,
    pub bbox: BBox,
    pub area: f32,
}

impl Observation {
    pub fn new(centroid: Point, bbox: BBox, area: f32) -> Self {
        Self {
            centroid,
            bbox,
            area,
        }
    }
}

/// Raw spatial moments of a foreground region
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionMoments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
}

impl RegionMoments {
    /// Area-weighted centroid. `None` when the zeroth moment vanishes.
    pub fn centroid(&self) -> Option<Point> {
        if self.m00 == 0.0 || !self.m00.is_finite() {
            return None;
        }
        let p = Point::new(
            (self.m10 / self.m00) as f32,
            (self.m01 / self.m00) as f32,
        );
        p.is_finite().then_some(p)
    }
}

/// Observation as recorded in a replay file.
///
/// `bbox` is `[x, y, width, height]`. The centroid comes from `centroid` when
/// present, then from `moments`, then from the box center.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawObservation {
    pub bbox: [f32; 4],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub centroid: Option<[f32; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moments: Option<RegionMoments>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<f32>,
}

impl RawObservation {
    pub fn into_observation(self) -> Option<Observation> {
        let bbox = BBox::new(self.bbox[0], self.bbox[1], self.bbox[2], self.bbox[3]);

        let centroid = if let Some([x, y]) = self.centroid {
            Point::new(x, y)
        } else if let Some(moments) = self.moments {
            match moments.centroid() {
                Some(c) => c,
                None => {
                    debug!("Skipping region with zero moment (bbox={:?})", self.bbox);
                    return None;
                }
            }
        } else if bbox.is_empty() {
            debug!("Skipping empty box {:?}", self.bbox);
            return None;
        } else {
            bbox.center()
        };

        if !centroid.is_finite() {
            debug!("Skipping observation with non-finite centroid");
            return None;
        }

        let area = self.area.unwrap_or_else(|| bbox.area());
        if !area.is_finite() {
            return None;
        }

        Some(Observation::new(centroid, bbox, area))
    }
}

/// All observations of one frame, as read from the source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationFrame {
    pub frame_id: u64,
    #[serde(default)]
    pub timestamp_ms: Option<f64>,
    #[serde(default)]
    pub observations: Vec<RawObservation>,
}

impl ObservationFrame {
    /// Converts raw records, dropping degenerate ones. Returns the usable
    /// observations (input order preserved) and the number dropped.
    pub fn resolve(self) -> (Vec<Observation>, usize) {
        let total = self.observations.len();
        let resolved: Vec<Observation> = self
            .observations
            .into_iter()
            .filter_map(RawObservation::into_observation)
            .collect();
        let dropped = total - resolved.len();
        (resolved, dropped)
    }
}
