// src/reporter.rs
//
// Pushes the current people count to a collector endpoint.
//
// Pushes are fire & forget: the frame loop spawns a task per report and never
// waits on the network. At most `max_in_flight` pushes run at once; a push
// arriving while all slots are busy is skipped, so a stalled collector cannot
// pile up tasks. Failures are logged and counted, nothing more.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::pipeline::{FrameContext, PipelineMetrics};
use crate::types::{epoch_seconds, CountSource, ReportingConfig};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CountReport {
    pub camera_id: String,
    pub people_count: u64,
    /// Seconds since the Unix epoch
    pub timestamp: f64,
}

#[derive(Clone)]
pub struct CountReporter {
    http_client: reqwest::Client,
    url: String,
    camera_id: String,
    count_source: CountSource,
    every_frames: u64,
    in_flight: Arc<Semaphore>,
    metrics: PipelineMetrics,
}

impl CountReporter {
    pub fn new(config: &ReportingConfig, metrics: PipelineMetrics) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http_client,
            url: config.url.clone(),
            camera_id: config.camera_id.clone(),
            count_source: config.count_source,
            every_frames: config.every_frames.max(1),
            in_flight: Arc::new(Semaphore::new(config.max_in_flight.max(1))),
            metrics,
        })
    }

    /// Whether the n-th processed frame (1-based) should be reported
    pub fn is_due(&self, frames_processed: u64) -> bool {
        frames_processed > 0 && frames_processed % self.every_frames == 0
    }

    pub fn build_report(&self, ctx: &FrameContext) -> CountReport {
        let people_count = match self.count_source {
            CountSource::Visible => ctx.visible_count() as u64,
            CountSource::Occupancy => ctx.counters.net_occupancy,
        };
        CountReport {
            camera_id: self.camera_id.clone(),
            people_count,
            timestamp: epoch_seconds(),
        }
    }

    /// Spawn the push on the runtime and return immediately. Returns `false`
    /// when every in-flight slot is taken and the report was skipped.
    pub fn push(&self, report: CountReport) -> bool {
        let Ok(permit) = self.in_flight.clone().try_acquire_owned() else {
            debug!(
                "📡 Collector busy, skipping count of {} for {}",
                report.people_count, report.camera_id
            );
            self.metrics.inc(&self.metrics.reports_skipped);
            return false;
        };
        let reporter = self.clone();
        tokio::spawn(async move {
            reporter.send(&report).await;
            drop(permit);
        });
        true
    }

    /// Send one report. Returns whether the collector accepted it.
    pub async fn send(&self, report: &CountReport) -> bool {
        match self.http_client.post(&self.url).json(report).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(
                    "📡 Reported {} people for {}",
                    report.people_count, report.camera_id
                );
                self.metrics.inc(&self.metrics.reports_sent);
                true
            }
            Ok(response) => {
                warn!("📡 Collector at {} returned {}", self.url, response.status());
                self.metrics.inc(&self.metrics.reports_failed);
                false
            }
            Err(e) => {
                warn!("📡 Failed to send count: {}", e);
                self.metrics.inc(&self.metrics.reports_failed);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::CounterSnapshot;
    use crate::pipeline::frame_context::TrackView;
    use std::time::Duration;

    fn config(count_source: CountSource) -> ReportingConfig {
        ReportingConfig {
            enabled: true,
            // Nothing listens on port 9 locally; connect fails fast
            url: "http://127.0.0.1:9/update_count".to_string(),
            camera_id: "door_1".to_string(),
            timeout_ms: 200,
            every_frames: 5,
            count_source,
            max_in_flight: 2,
        }
    }

    fn ctx() -> FrameContext {
        let track = TrackView {
            id: 1,
            x: 0.0,
            y: 0.0,
            age: 0,
            color: [0, 0, 0],
            trail: vec![],
        };
        FrameContext {
            frame_id: 9,
            timestamp_ms: None,
            tracks: vec![track.clone(), TrackView { id: 2, ..track }],
            counters: CounterSnapshot {
                entries: 7,
                exits: 2,
                net_occupancy: 5,
            },
            crossings: vec![],
        }
    }

    #[tokio::test]
    async fn test_people_count_source() {
        let visible = CountReporter::new(&config(CountSource::Visible), PipelineMetrics::new())
            .unwrap()
            .build_report(&ctx());
        assert_eq!(visible.people_count, 2);
        assert_eq!(visible.camera_id, "door_1");
        assert!(visible.timestamp > 1_600_000_000.0);

        let occupancy =
            CountReporter::new(&config(CountSource::Occupancy), PipelineMetrics::new())
                .unwrap()
                .build_report(&ctx());
        assert_eq!(occupancy.people_count, 5);
    }

    #[tokio::test]
    async fn test_is_due_every_n_frames() {
        let r = CountReporter::new(&config(CountSource::Visible), PipelineMetrics::new()).unwrap();
        assert!(!r.is_due(0));
        assert!(!r.is_due(4));
        assert!(r.is_due(5));
        assert!(r.is_due(10));
    }

    #[tokio::test]
    async fn test_unreachable_collector_is_counted_not_raised() {
        let metrics = PipelineMetrics::new();
        let r = CountReporter::new(&config(CountSource::Visible), metrics.clone()).unwrap();
        let report = r.build_report(&ctx());
        assert!(!r.send(&report).await);
        assert_eq!(metrics.summary().reports_failed, 1);
        assert_eq!(metrics.summary().reports_sent, 0);
    }

    #[tokio::test]
    async fn test_stalled_collector_caps_in_flight_pushes() {
        // Accepts connections and holds them open without ever answering
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let metrics = PipelineMetrics::new();
        let r = CountReporter::new(
            &ReportingConfig {
                url: format!("http://{}/update_count", addr),
                timeout_ms: 2000,
                ..config(CountSource::Visible)
            },
            metrics.clone(),
        )
        .unwrap();

        let report = r.build_report(&ctx());
        let started: usize = (0..50).filter(|_| r.push(report.clone())).count();
        assert_eq!(started, 2);
        assert_eq!(metrics.summary().reports_skipped, 48);

        // Both slots stay taken while the collector hangs
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!r.push(report));
        let summary = metrics.summary();
        assert_eq!(summary.reports_skipped, 49);
        assert_eq!(summary.reports_sent + summary.reports_failed, 0);
    }

    #[test]
    fn test_report_wire_format() {
        let report = CountReport {
            camera_id: "camera_0".to_string(),
            people_count: 3,
            timestamp: 1.5,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"camera_id": "camera_0", "people_count": 3, "timestamp": 1.5})
        );
    }
}
