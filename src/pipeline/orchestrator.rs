// src/pipeline/orchestrator.rs
//
// Per-frame driver for the counting core.
//
// Single entry point: call process_frame() once per frame, in order.
//   0. band gate (dead zone only, when enabled)
//   1. registry.update(observations)
//   2. evaluator.check() on every track created or updated this frame
//   3. counter.apply() for each crossing
//   4. registry.age_and_evict()
// The returned FrameContext is a copy; nothing outside holds track refs.

use std::time::Instant;

use tracing::debug;

use super::event_bus::{EventBus, PipelineEvent};
use super::frame_context::{FrameContext, TrackView};
use super::metrics::PipelineMetrics;
use crate::analysis::{
    CounterAggregator, CounterSnapshot, CrossingPolicy, LineCrossingEvaluator, RegistryConfig,
    TrackRegistry,
};
use crate::observation::Observation;
use crate::types::{Config, CountingMode, Motion};

const MAX_PENDING_EVENTS: usize = 1024;

pub struct FrameProcessor {
    registry: TrackRegistry,
    evaluator: LineCrossingEvaluator,
    counter: CounterAggregator,
    events: EventBus,
    metrics: PipelineMetrics,
    /// Observations outside `[top, bottom)` never reach the registry
    band: Option<(f32, f32)>,
    frames_processed: u64,
}

impl FrameProcessor {
    pub fn new(
        registry: RegistryConfig,
        policy: CrossingPolicy,
        entry_motion: Motion,
        metrics: PipelineMetrics,
    ) -> Self {
        Self {
            registry: TrackRegistry::new(registry),
            evaluator: LineCrossingEvaluator::new(policy, entry_motion),
            counter: CounterAggregator::new(),
            events: EventBus::new(MAX_PENDING_EVENTS),
            metrics,
            band: None,
            frames_processed: 0,
        }
    }

    pub fn from_config(config: &Config, metrics: PipelineMetrics) -> Self {
        let registry =
            RegistryConfig::from_tracking(&config.tracking, config.min_observation_area());
        let policy = CrossingPolicy::from_config(&config.counting, config.source.frame_height);
        debug!("Counting lines at y={:?}", policy.lines());

        let gated = config.counting.band_gate && config.counting.mode == CountingMode::DeadZone;
        let band = if gated { policy.band() } else { None };
        if let Some((top, bottom)) = band {
            debug!("Band gate on: tracking only y in [{:.0}, {:.0})", top, bottom);
        }

        let mut processor = Self::new(registry, policy, config.counting.entry_motion, metrics);
        processor.band = band;
        processor
    }

    pub fn process_frame(
        &mut self,
        frame_id: u64,
        timestamp_ms: Option<f64>,
        observations: &[Observation],
    ) -> FrameContext {
        let started = Instant::now();
        let known_before = self.registry.total_created();
        self.metrics
            .add(&self.metrics.observations_seen, observations.len() as u64);

        // 0. Band gate
        let in_band: Vec<Observation>;
        let observations = match self.band {
            Some((top, bottom)) => {
                in_band = observations
                    .iter()
                    .filter(|o| o.centroid.y >= top && o.centroid.y < bottom)
                    .copied()
                    .collect();
                self.metrics.add(
                    &self.metrics.observations_rejected,
                    (observations.len() - in_band.len()) as u64,
                );
                &in_band[..]
            }
            None => observations,
        };

        // 1. Associate
        let touched = self.registry.update(observations);
        let below_area = observations
            .iter()
            .filter(|o| o.area < self.registry.config.min_area)
            .count();
        self.metrics
            .add(&self.metrics.observations_rejected, below_area as u64);

        // 2-3. Evaluate touched tracks and count
        let mut crossings = Vec::new();
        for id in touched {
            if id > known_before {
                if let Some(track) = self.registry.get(id) {
                    let created = PipelineEvent::TrackCreated {
                        track_id: id,
                        at: track.position(),
                        frame_id,
                    };
                    self.metrics.inc(&self.metrics.tracks_created);
                    self.publish(created);
                }
            }
            let Some(track) = self.registry.get_mut(id) else {
                continue;
            };
            if let Some(event) = self.evaluator.check(track, frame_id) {
                self.counter.apply(&event);
                self.metrics.inc(&self.metrics.crossings);
                self.publish(PipelineEvent::LineCrossed(event));
                crossings.push(event);
            }
        }

        // 4. Age out
        for track in self.registry.age_and_evict() {
            self.metrics.inc(&self.metrics.tracks_evicted);
            self.publish(PipelineEvent::TrackEvicted {
                track_id: track.id(),
                finished: track.done,
                frame_id,
            });
        }

        self.frames_processed += 1;
        self.metrics.inc(&self.metrics.total_frames);
        self.metrics
            .set_timing(&self.metrics.frame_time_us, started.elapsed().as_micros() as u64);

        FrameContext {
            frame_id,
            timestamp_ms,
            tracks: self.registry.tracks().iter().map(TrackView::from).collect(),
            counters: self.counter.snapshot(),
            crossings,
        }
    }

    fn publish(&mut self, event: PipelineEvent) {
        if !self.events.publish(event) {
            self.metrics.inc(&self.metrics.events_dropped);
        }
    }

    pub fn drain_events(&mut self) -> Vec<PipelineEvent> {
        self.events.drain()
    }

    /// Direction-reversal command. Returns the motion now counted as entry.
    pub fn reverse_polarity(&mut self) -> Motion {
        self.evaluator.reverse_polarity()
    }

    pub fn entry_motion(&self) -> Motion {
        self.evaluator.entry_motion()
    }

    pub fn counters(&self) -> CounterSnapshot {
        self.counter.snapshot()
    }

    pub fn live_tracks(&self) -> usize {
        self.registry.len()
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// New recording: tracks do not carry over, counters do.
    pub fn reset_tracks(&mut self) {
        if !self.registry.is_empty() {
            debug!("Dropping {} live track(s)", self.registry.len());
        }
        self.registry.reset();
    }

    /// Zero entries and exits. Live tracks keep their crossing state.
    pub fn reset_counters(&mut self) -> CounterSnapshot {
        let before = self.counter.snapshot();
        self.counter.reset();
        before
    }
}

// ============================================================================
// TESTS
// ============================================================================
