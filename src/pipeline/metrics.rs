// src/pipeline/metrics.rs
//
// Counts and rates for the counting pipeline. Shared between the frame loop,
// the reporter tasks and the query API.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct PipelineMetrics {
    pub total_frames: Arc<AtomicU64>,
    pub observations_seen: Arc<AtomicU64>,
    pub observations_rejected: Arc<AtomicU64>,
    pub tracks_created: Arc<AtomicU64>,
    pub tracks_evicted: Arc<AtomicU64>,
    pub crossings: Arc<AtomicU64>,
    pub events_dropped: Arc<AtomicU64>,
    pub reports_sent: Arc<AtomicU64>,
    pub reports_failed: Arc<AtomicU64>,
    /// Pushes skipped because the in-flight limit was reached
    pub reports_skipped: Arc<AtomicU64>,
    pub frame_time_us: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            total_frames: Arc::new(AtomicU64::new(0)),
            observations_seen: Arc::new(AtomicU64::new(0)),
            observations_rejected: Arc::new(AtomicU64::new(0)),
            tracks_created: Arc::new(AtomicU64::new(0)),
            tracks_evicted: Arc::new(AtomicU64::new(0)),
            crossings: Arc::new(AtomicU64::new(0)),
            events_dropped: Arc::new(AtomicU64::new(0)),
            reports_sent: Arc::new(AtomicU64::new(0)),
            reports_failed: Arc::new(AtomicU64::new(0)),
            reports_skipped: Arc::new(AtomicU64::new(0)),
            frame_time_us: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    pub fn inc(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn set_timing(&self, counter: &AtomicU64, duration_us: u64) {
        counter.store(duration_us, Ordering::Relaxed);
    }

    pub fn fps(&self) -> f64 {
        let frames = self.total_frames.load(Ordering::Relaxed);
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.01 {
            frames as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_frames: self.total_frames.load(Ordering::Relaxed),
            fps: self.fps(),
            observations_seen: self.observations_seen.load(Ordering::Relaxed),
            observations_rejected: self.observations_rejected.load(Ordering::Relaxed),
            tracks_created: self.tracks_created.load(Ordering::Relaxed),
            tracks_evicted: self.tracks_evicted.load(Ordering::Relaxed),
            crossings: self.crossings.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            reports_sent: self.reports_sent.load(Ordering::Relaxed),
            reports_failed: self.reports_failed.load(Ordering::Relaxed),
            reports_skipped: self.reports_skipped.load(Ordering::Relaxed),
            last_frame_us: self.frame_time_us.load(Ordering::Relaxed),
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSummary {
    pub total_frames: u64,
    pub fps: f64,
    pub observations_seen: u64,
    pub observations_rejected: u64,
    pub tracks_created: u64,
    pub tracks_evicted: u64,
    pub crossings: u64,
    pub events_dropped: u64,
    pub reports_sent: u64,
    pub reports_failed: u64,
    pub reports_skipped: u64,
    pub last_frame_us: u64,
    pub elapsed_secs: f64,
}
