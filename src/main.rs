// src/main.rs

mod analysis;
mod api;
mod config;
mod observation;
mod pipeline;
mod replay;
mod reporter;
mod types;

use analysis::LoadTracker;
use anyhow::{Context, Result};
use api::{AppState, LoopCommand};
use pipeline::{FrameProcessor, PipelineEvent, PipelineMetrics};
use replay::ReplayProcessor;
use reporter::CountReporter;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use types::{Config, CrossingDirection};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path =
        std::env::var("CROWD_COUNTER_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());
    let mut config = Config::load(&config_path)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "crowd_counter={},tower_http=warn",
            config.logging.level
        ))
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("👥 Crowd Counter Starting");
    info!("✓ Configuration loaded from {}", config_path);

    if let Ok(url) = std::env::var("CROWD_COUNTER_REPORT_URL") {
        config.reporting.url = url;
    }

    info!(
        "Tracking: max_age={}, proximity={:?}, association={:?}, min_area={:.0}",
        config.tracking.max_age,
        config.tracking.proximity,
        config.tracking.association,
        config.min_observation_area()
    );
    info!(
        "Counting: mode={:?}, entry on {} motion",
        config.counting.mode,
        config.counting.entry_motion.as_str()
    );

    let metrics = PipelineMetrics::new();
    let mut processor = FrameProcessor::from_config(&config, metrics.clone());
    let state = AppState::new(processor.entry_motion(), metrics.clone());

    let mut load_tracker = config.route.as_ref().and_then(LoadTracker::new);
    if let Some(lt) = &load_tracker {
        info!(
            "🚌 Route tracking: {} starting at {}",
            lt.direction(),
            lt.current_stop()
        );
        state.publish_load(Some(lt.status()));
    }

    let reporter = if config.reporting.enabled {
        info!("📡 Reporting counts to {}", config.reporting.url);
        Some(CountReporter::new(&config.reporting, metrics.clone())?)
    } else {
        None
    };

    let server = if config.api.enabled {
        Some(api::spawn_server(&config.api.bind, state.clone()).await?)
    } else {
        None
    };

    let replay = ReplayProcessor::new(config.clone());
    let recordings = replay.find_recordings()?;

    if recordings.is_empty() {
        error!("No recordings found in {}", config.source.input_dir);
    }

    for (idx, path) in recordings.iter().enumerate() {
        info!("========================================");
        info!(
            "Processing recording {}/{}: {}",
            idx + 1,
            recordings.len(),
            path.display()
        );
        info!("========================================");

        match process_recording(
            path,
            &replay,
            &mut processor,
            &mut load_tracker,
            reporter.as_ref(),
            &state,
        )
        .await
        {
            Ok(stats) => {
                info!("✓ Recording processed");
                info!("  Frames: {}", stats.frames);
                info!("  New tracks: {}", stats.tracks_created);
                info!("  ⬇️  Entries: {}", stats.entries);
                info!("  ⬆️  Exits: {}", stats.exits);
                if stats.stream_error {
                    warn!("  ⚠️  Stream ended on a malformed record");
                }
                info!("  Processing Speed: {:.1} FPS", stats.fps);
            }
            Err(e) => {
                error!("Failed to process recording: {:#}", e);
            }
        }
    }

    let counters = processor.counters();
    info!("📊 Final Report:");
    info!("  Total entered: {}", counters.entries);
    info!("  Total exited: {}", counters.exits);
    info!("  Inside now: {}", counters.net_occupancy);
    if let Ok(summary) = serde_json::to_string(&metrics.summary()) {
        debug!("Metrics: {}", summary);
    }

    if config.api.linger && server.is_some() {
        info!("Replay finished, query API stays up until ctrl-c");
        let mut tick = tokio::time::interval(Duration::from_millis(250));
        loop {
            tokio::select! {
                signal = tokio::signal::ctrl_c() => {
                    signal.context("Failed to listen for ctrl-c")?;
                    info!("Shutting down");
                    break;
                }
                _ = tick.tick() => {
                    apply_commands(&mut processor, &mut load_tracker, &state);
                }
            }
        }
    }

    Ok(())
}

struct RecordingStats {
    frames: u64,
    tracks_created: u64,
    entries: u64,
    exits: u64,
    stream_error: bool,
    fps: f64,
}

async fn process_recording(
    path: &Path,
    replay: &ReplayProcessor,
    processor: &mut FrameProcessor,
    load_tracker: &mut Option<LoadTracker>,
    reporter: Option<&CountReporter>,
    state: &AppState,
) -> Result<RecordingStats> {
    let mut reader = replay.open(path)?;
    // Track identities do not survive a cut between recordings
    processor.reset_tracks();

    let mut stats = RecordingStats {
        frames: 0,
        tracks_created: 0,
        entries: 0,
        exits: 0,
        stream_error: false,
        fps: 0.0,
    };
    let start_time = Instant::now();

    loop {
        apply_commands(processor, load_tracker, state);

        let frame = match reader.read_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(e) => {
                error!("Observation stream failed: {:#}", e);
                stats.stream_error = true;
                break;
            }
        };

        let frame_id = frame.frame_id;
        let timestamp_ms = frame.timestamp_ms;
        let (observations, dropped) = frame.resolve();
        if dropped > 0 {
            debug!("Frame {}: {} degenerate observation(s) skipped", frame_id, dropped);
            let metrics = state.metrics();
            metrics.add(&metrics.observations_rejected, dropped as u64);
        }

        let ctx = processor.process_frame(frame_id, timestamp_ms, &observations);
        stats.frames += 1;

        for event in processor.drain_events() {
            match event {
                PipelineEvent::LineCrossed(crossing) => {
                    match crossing.direction {
                        CrossingDirection::Entering => stats.entries += 1,
                        CrossingDirection::Exiting => stats.exits += 1,
                    }
                    if let Some(lt) = load_tracker.as_mut() {
                        lt.on_crossing(crossing.direction);
                    }
                }
                PipelineEvent::TrackCreated { .. } => stats.tracks_created += 1,
                PipelineEvent::TrackEvicted {
                    track_id,
                    finished,
                    frame_id,
                } => {
                    debug!(
                        "Frame {}: T{} removed ({})",
                        frame_id,
                        track_id,
                        if finished { "finished" } else { "lost" }
                    );
                }
            }
        }

        if let Some(r) = reporter {
            if r.is_due(processor.frames_processed()) {
                r.push(r.build_report(&ctx));
            }
        }

        state.publish_frame(ctx, processor.frames_processed());
        if let Some(lt) = load_tracker.as_ref() {
            state.publish_load(Some(lt.status()));
        }

        tokio::task::yield_now().await;
    }

    let elapsed = start_time.elapsed().as_secs_f64();
    if elapsed > 0.0 {
        stats.fps = stats.frames as f64 / elapsed;
    }
    Ok(stats)
}

/// Apply commands queued by the query API. Runs on the frame loop, between
/// frames, so the tracking state has a single writer.
fn apply_commands(
    processor: &mut FrameProcessor,
    load_tracker: &mut Option<LoadTracker>,
    state: &AppState,
) {
    state.apply_reverse_request(|| processor.reverse_polarity());

    for command in state.take_commands() {
        match command {
            LoopCommand::ResetCounters => {
                let before = processor.reset_counters();
                info!(
                    "🔄 Counters reset (were {} in, {} out)",
                    before.entries, before.exits
                );
                // Republish so queries see zeros even with no frame coming
                let (mut frame, frames_processed) = state.latest();
                frame.counters = processor.counters();
                state.publish_frame(frame, frames_processed);
            }
            LoopCommand::Depart => {
                if let Some(lt) = load_tracker.as_mut() {
                    lt.commit_departure();
                    let next = lt.next_stop().to_string();
                    info!("🚏 Next stop: {}", next);
                }
            }
            LoopCommand::SwitchDirection => {
                if let Some(lt) = load_tracker.as_mut() {
                    lt.switch_direction();
                }
            }
        }
    }

    if let Some(lt) = load_tracker.as_ref() {
        state.publish_load(Some(lt.status()));
    }
}
