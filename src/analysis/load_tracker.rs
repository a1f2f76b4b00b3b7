// src/analysis/load_tracker.rs
//
// Vehicle load accounting for a door-mounted counter on a fixed route.
//
// Crossings are buffered while the vehicle sits at a stop and committed when
// it departs: load = clamp(load + boarded - alighted, 0, capacity).

use serde::Serialize;
use tracing::info;

use crate::types::{CrossingDirection, RouteConfig};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopReport {
    pub stop: String,
    pub direction: String,
    pub boarded: u32,
    pub alighted: u32,
    pub load: u32,
    pub capacity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadStatus {
    pub direction: String,
    pub current_stop: String,
    pub stop_index: usize,
    pub load: u32,
    pub capacity: u32,
    pub pending_boarded: u32,
    pub pending_alighted: u32,
}

pub struct LoadTracker {
    capacity: u32,
    /// Stop order for the configured direction
    stops: Vec<String>,
    forward_label: String,
    reverse_label: String,
    reversed: bool,
    idx: usize,
    load: u32,
    boarded: u32,
    alighted: u32,
}

impl LoadTracker {
    /// Returns `None` for a route without stops.
    pub fn new(route: &RouteConfig) -> Option<Self> {
        if route.stops.is_empty() {
            return None;
        }
        Some(Self {
            capacity: route.capacity,
            stops: route.stops.clone(),
            forward_label: route.direction_label.clone(),
            reverse_label: route.reverse_label.clone(),
            reversed: false,
            idx: 0,
            load: 0,
            boarded: 0,
            alighted: 0,
        })
    }

    fn ordered_stop(&self, idx: usize) -> &str {
        let i = if self.reversed {
            self.stops.len() - 1 - idx
        } else {
            idx
        };
        &self.stops[i]
    }

    pub fn current_stop(&self) -> &str {
        self.ordered_stop(self.idx)
    }

    pub fn direction(&self) -> &str {
        if self.reversed {
            &self.reverse_label
        } else {
            &self.forward_label
        }
    }

    pub fn on_crossing(&mut self, direction: CrossingDirection) {
        match direction {
            CrossingDirection::Entering => self.boarded += 1,
            CrossingDirection::Exiting => self.alighted += 1,
        }
    }

    /// Doors closed: fold the buffered crossings into the load.
    pub fn commit_departure(&mut self) -> StopReport {
        let next = self.load as i64 + self.boarded as i64 - self.alighted as i64;
        self.load = next.clamp(0, self.capacity as i64) as u32;

        let report = StopReport {
            stop: self.current_stop().to_string(),
            direction: self.direction().to_string(),
            boarded: self.boarded,
            alighted: self.alighted,
            load: self.load,
            capacity: self.capacity,
        };
        info!(
            "🚌 Departed {}: +{} -{} → load {}/{}",
            report.stop, report.boarded, report.alighted, report.load, report.capacity
        );

        self.boarded = 0;
        self.alighted = 0;
        report
    }

    /// Advance along the route, holding at the terminus.
    pub fn next_stop(&mut self) -> &str {
        self.idx = (self.idx + 1).min(self.stops.len() - 1);
        self.current_stop()
    }

    /// Turn around at the terminus: reversed stop order, empty vehicle.
    pub fn switch_direction(&mut self) {
        self.reversed = !self.reversed;
        self.idx = 0;
        self.load = 0;
        self.boarded = 0;
        self.alighted = 0;
        info!(
            "🔁 Route direction now {} starting at {}",
            self.direction(),
            self.current_stop()
        );
    }

    pub fn status(&self) -> LoadStatus {
        LoadStatus {
            direction: self.direction().to_string(),
            current_stop: self.current_stop().to_string(),
            stop_index: self.idx,
            load: self.load,
            capacity: self.capacity,
            pending_boarded: self.boarded,
            pending_alighted: self.alighted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(capacity: u32) -> RouteConfig {
        RouteConfig {
            capacity,
            stops: vec!["A".into(), "B".into(), "C".into()],
            direction_label: "north".into(),
            reverse_label: "south".into(),
        }
    }

    #[test]
    fn test_commit_clamps_to_capacity() {
        let mut lt = LoadTracker::new(&route(2)).unwrap();
        for _ in 0..5 {
            lt.on_crossing(CrossingDirection::Entering);
        }
        let report = lt.commit_departure();
        assert_eq!(report.stop, "A");
        assert_eq!(report.boarded, 5);
        assert_eq!(report.load, 2);
        assert_eq!(lt.status().pending_boarded, 0);
    }

    #[test]
    fn test_commit_clamps_at_zero() {
        let mut lt = LoadTracker::new(&route(80)).unwrap();
        lt.on_crossing(CrossingDirection::Exiting);
        assert_eq!(lt.commit_departure().load, 0);
    }

    #[test]
    fn test_next_stop_saturates() {
        let mut lt = LoadTracker::new(&route(80)).unwrap();
        assert_eq!(lt.next_stop(), "B");
        assert_eq!(lt.next_stop(), "C");
        assert_eq!(lt.next_stop(), "C");
    }

    #[test]
    fn test_switch_direction_reverses_and_empties() {
        let mut lt = LoadTracker::new(&route(80)).unwrap();
        lt.on_crossing(CrossingDirection::Entering);
        lt.commit_departure();
        lt.next_stop();
        lt.switch_direction();

        let status = lt.status();
        assert_eq!(status.direction, "south");
        assert_eq!(status.current_stop, "C");
        assert_eq!(status.load, 0);
        assert_eq!(lt.next_stop(), "B");
    }

    #[test]
    fn test_empty_route_rejected() {
        let mut r = route(80);
        r.stops.clear();
        assert!(LoadTracker::new(&r).is_none());
    }
}
