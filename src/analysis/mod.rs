// src/analysis/mod.rs
//
// People-counting core.
//
// Signal flow:
//   Observations → track_registry → line_crossing → counter
//                                                 └→ load_tracker (route deployments)
//
// Orchestrated per frame by pipeline::orchestrator::FrameProcessor.

pub mod counter;
pub mod line_crossing;
pub mod load_tracker;
pub mod track_registry;

// Re-exports for ergonomic access from main.rs
pub use counter::{CounterAggregator, CounterSnapshot};
pub use line_crossing::{CrossingEvent, CrossingPolicy, LineCrossingEvaluator};
pub use load_tracker::{LoadStatus, LoadTracker};
pub use track_registry::{RegistryConfig, Track, TrackId, TrackRegistry};
