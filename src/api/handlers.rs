// src/api/handlers.rs
//
// Axum request handlers. Everything here reads published copies or queues a
// command; the frame loop stays the only writer of tracking state.

use axum::{extract::State, http::StatusCode, Json};
use tracing::info;

use super::dto::*;
use super::state::{AppState, LoopCommand};
use crate::analysis::LoadStatus;
use crate::pipeline::{FrameContext, MetricsSummary};
use crate::types::epoch_seconds;

type ApiResult<T> = Result<T, (StatusCode, Json<ErrorResponse>)>;

fn no_route() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "no route configured".to_string(),
        }),
    )
}

/// GET /api/occupancy
pub async fn occupancy(State(state): State<AppState>) -> Json<OccupancyResponse> {
    let (frame, frames_processed) = state.latest();
    let counters = frame.counters;
    let status = if frames_processed > 0 {
        "active"
    } else {
        "inactive"
    };
    Json(OccupancyResponse {
        current_inside: counters.net_occupancy,
        total_entered: counters.entries,
        total_exited: counters.exits,
        frames_processed,
        timestamp: epoch_seconds(),
        status: status.to_string(),
    })
}

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: state.service().to_string(),
        timestamp: epoch_seconds(),
    })
}

/// GET /api/snapshot
pub async fn snapshot(State(state): State<AppState>) -> Json<FrameContext> {
    Json(state.latest_frame())
}

/// GET /api/metrics
pub async fn metrics(State(state): State<AppState>) -> Json<MetricsSummary> {
    Json(state.metrics().summary())
}

/// GET /api/load
pub async fn load(State(state): State<AppState>) -> ApiResult<Json<LoadStatus>> {
    state.load_status().map(Json).ok_or_else(no_route)
}

/// GET /api/direction
pub async fn direction(State(state): State<AppState>) -> Json<PolarityResponse> {
    Json(PolarityResponse {
        entry_motion: state.entry_motion(),
    })
}

/// POST /api/direction/reverse
pub async fn reverse_direction(State(state): State<AppState>) -> Json<PolarityResponse> {
    let entry_motion = state.request_reverse();
    info!(
        "↩️ Direction reversal requested, entry motion will be {}",
        entry_motion.as_str()
    );
    Json(PolarityResponse { entry_motion })
}

/// POST /api/counters/reset
pub async fn reset_counters(
    State(state): State<AppState>,
) -> (StatusCode, Json<AcceptedResponse>) {
    info!("🔄 Counter reset requested");
    accept(&state, LoopCommand::ResetCounters, "reset_counters")
}

/// POST /api/route/depart
pub async fn route_depart(
    State(state): State<AppState>,
) -> ApiResult<(StatusCode, Json<AcceptedResponse>)> {
    queue_route(&state, LoopCommand::Depart, "depart")
}

/// POST /api/route/switch
pub async fn route_switch(
    State(state): State<AppState>,
) -> ApiResult<(StatusCode, Json<AcceptedResponse>)> {
    queue_route(&state, LoopCommand::SwitchDirection, "switch_direction")
}

fn queue_route(
    state: &AppState,
    command: LoopCommand,
    label: &str,
) -> ApiResult<(StatusCode, Json<AcceptedResponse>)> {
    if state.load_status().is_none() {
        return Err(no_route());
    }
    Ok(accept(state, command, label))
}

fn accept(
    state: &AppState,
    command: LoopCommand,
    label: &str,
) -> (StatusCode, Json<AcceptedResponse>) {
    state.queue_command(command);
    (
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            accepted: label.to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::CounterSnapshot;
    use crate::pipeline::PipelineMetrics;
    use crate::types::Motion;

    fn state() -> AppState {
        AppState::new(Motion::Down, PipelineMetrics::new())
    }

    fn load_status() -> LoadStatus {
        LoadStatus {
            direction: "outbound".to_string(),
            current_stop: "A".to_string(),
            stop_index: 0,
            load: 0,
            capacity: 80,
            pending_boarded: 0,
            pending_alighted: 0,
        }
    }

    #[tokio::test]
    async fn test_occupancy_inactive_before_first_frame() {
        let Json(body) = occupancy(State(state())).await;
        assert_eq!(body.status, "inactive");
        assert_eq!(body.frames_processed, 0);
        assert_eq!(body.current_inside, 0);
    }

    #[tokio::test]
    async fn test_occupancy_reflects_published_frame() {
        let state = state();
        state.publish_frame(
            FrameContext {
                frame_id: 41,
                counters: CounterSnapshot {
                    entries: 5,
                    exits: 7,
                    net_occupancy: 0,
                },
                ..Default::default()
            },
            42,
        );
        let Json(body) = occupancy(State(state)).await;
        assert_eq!(body.status, "active");
        assert_eq!(body.total_entered, 5);
        assert_eq!(body.total_exited, 7);
        assert_eq!(body.current_inside, 0);
        assert_eq!(body.frames_processed, 42);
    }

    #[tokio::test]
    async fn test_health() {
        let Json(body) = health(State(state())).await;
        assert_eq!(body.status, "healthy");
        assert_eq!(body.service, "crowd-counter");
    }

    #[tokio::test]
    async fn test_timestamps_serialize_as_epoch_seconds() {
        let Json(body) = occupancy(State(state())).await;
        let v = serde_json::to_value(&body).unwrap();
        assert!(v["timestamp"].is_number());
        assert!(v["timestamp"].as_f64().unwrap() > 1.6e9);

        let Json(body) = health(State(state())).await;
        let v = serde_json::to_value(&body).unwrap();
        assert!(v["timestamp"].is_number());
        assert!(v["timestamp"].as_f64().unwrap() > 1.6e9);
    }

    #[tokio::test]
    async fn test_load_404_without_route() {
        let err = load(State(state())).await.unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);

        let err = route_depart(State(state())).await.unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_route_commands_queued_with_route() {
        let state = state();
        state.publish_load(Some(load_status()));
        let Json(status) = load(State(state.clone())).await.unwrap();
        assert_eq!(status.capacity, 80);

        let (code, _) = route_switch(State(state.clone())).await.unwrap();
        assert_eq!(code, StatusCode::ACCEPTED);
        assert_eq!(state.take_commands(), vec![LoopCommand::SwitchDirection]);
    }

    #[tokio::test]
    async fn test_reverse_direction_reports_new_polarity() {
        let state = state();
        let Json(body) = reverse_direction(State(state.clone())).await;
        assert_eq!(body.entry_motion, Motion::Up);

        let Json(current) = direction(State(state.clone())).await;
        assert_eq!(current.entry_motion, Motion::Up);
        assert_eq!(state.apply_reverse_request(|| Motion::Up), Some(Motion::Up));
    }

    #[tokio::test]
    async fn test_counter_reset_is_queued_without_route() {
        let state = state();
        let (code, Json(body)) = reset_counters(State(state.clone())).await;
        assert_eq!(code, StatusCode::ACCEPTED);
        assert_eq!(body.accepted, "reset_counters");
        assert_eq!(state.take_commands(), vec![LoopCommand::ResetCounters]);
    }

    #[tokio::test]
    async fn test_metrics_summary() {
        let state = state();
        state.metrics().inc(&state.metrics().total_frames);
        let Json(summary) = metrics(State(state)).await;
        assert_eq!(summary.total_frames, 1);
    }
}
