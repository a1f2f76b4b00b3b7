// src/analysis/line_crossing.rs
//
// Line-crossing evaluation for tracked people.
//
// Two schemes, selected by configuration:
//
//   SINGLE LINE   one line at y = line. Every transition across it is counted
//                 (prev < line <= curr is downward, prev > line >= curr is
//                 upward), unless `one_shot` locks the track after its first
//                 crossing.
//
//   DEAD ZONE     two lines, line_up above line_down. A track commits once:
//                 upward when it leaves line_up going up, downward when it
//                 leaves line_down going down. Jitter inside the band between
//                 the lines can never fire a second event. Committed tracks
//                 are marked done once they pass their limit line.
//
// Image y grows downward, so "down" means increasing y. Motion is mapped to
// entering/exiting through the polarity, which can be reversed at runtime.

use serde::Serialize;
use tracing::{debug, info};

use super::track_registry::{CrossingState, Track, TrackId};
use crate::types::{CountingConfig, CountingMode, CrossingDirection, Motion};

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CrossingEvent {
    pub track_id: TrackId,
    pub motion: Motion,
    pub direction: CrossingDirection,
    /// Which line fired, in pixels
    pub line_y: f32,
    pub frame_id: u64,
}

/// Line geometry in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CrossingPolicy {
    SingleLine {
        line: f32,
        one_shot: bool,
    },
    DeadZone {
        up_limit: f32,
        line_up: f32,
        line_down: f32,
        down_limit: f32,
    },
}

impl CrossingPolicy {
    /// Resolves fractional line positions against the frame height
    pub fn from_config(cfg: &CountingConfig, frame_height: u32) -> Self {
        let h = frame_height as f32;
        match cfg.mode {
            CountingMode::SingleLine => Self::SingleLine {
                line: (h * cfg.line_fraction).round(),
                one_shot: cfg.one_shot,
            },
            CountingMode::DeadZone => Self::DeadZone {
                up_limit: (h * cfg.up_limit_fraction).round(),
                line_up: (h * cfg.line_up_fraction).round(),
                line_down: (h * cfg.line_down_fraction).round(),
                down_limit: (h * cfg.down_limit_fraction).round(),
            },
        }
    }

    /// Vertical band `[up_limit, down_limit)` a dead-zone counter watches
    pub fn band(&self) -> Option<(f32, f32)> {
        match *self {
            Self::SingleLine { .. } => None,
            Self::DeadZone {
                up_limit,
                down_limit,
                ..
            } => Some((up_limit, down_limit)),
        }
    }

    /// Horizontal lines to draw, top to bottom
    pub fn lines(&self) -> Vec<f32> {
        match *self {
            Self::SingleLine { line, .. } => vec![line],
            Self::DeadZone {
                line_up, line_down, ..
            } => vec![line_up, line_down],
        }
    }
}

// ============================================================================
// EVALUATOR
// ============================================================================

pub struct LineCrossingEvaluator {
    policy: CrossingPolicy,
    entry_motion: Motion,
}

impl LineCrossingEvaluator {
    pub fn new(policy: CrossingPolicy, entry_motion: Motion) -> Self {
        Self {
            policy,
            entry_motion,
        }
    }

    pub fn entry_motion(&self) -> Motion {
        self.entry_motion
    }

    /// Flip which motion counts as entering. Returns the new entry motion.
    pub fn reverse_polarity(&mut self) -> Motion {
        self.entry_motion = self.entry_motion.opposite();
        info!(
            "Counting polarity reversed: {} is now entering",
            self.entry_motion.as_str()
        );
        self.entry_motion
    }

    pub fn direction_of(&self, motion: Motion) -> CrossingDirection {
        if motion == self.entry_motion {
            CrossingDirection::Entering
        } else {
            CrossingDirection::Exiting
        }
    }

    /// Inspect the track's last two positions. Emits at most one event and
    /// updates the track's crossing state, direction and done flag.
    pub fn check(&self, track: &mut Track, frame_id: u64) -> Option<CrossingEvent> {
        let (prev, curr) = track.last_two()?;
        let (prev_y, curr_y) = (prev.y, curr.y);

        let fired = match self.policy {
            CrossingPolicy::SingleLine { line, one_shot } => {
                if one_shot && track.has_crossed() {
                    None
                } else if prev_y < line && curr_y >= line {
                    Some((Motion::Down, line))
                } else if prev_y > line && curr_y <= line {
                    Some((Motion::Up, line))
                } else {
                    None
                }
            }
            CrossingPolicy::DeadZone {
                line_up, line_down, ..
            } => {
                if track.has_crossed() {
                    None
                } else if prev_y >= line_up && curr_y < line_up {
                    Some((Motion::Up, line_up))
                } else if prev_y <= line_down && curr_y > line_down {
                    Some((Motion::Down, line_down))
                } else {
                    None
                }
            }
        };

        let event = fired.map(|(motion, line_y)| {
            track.crossing_state = CrossingState::Crossed;
            track.direction = Some(motion);
            let direction = self.direction_of(motion);
            info!(
                "👤 T{} crossed y={:.0} going {} ({})",
                track.id(),
                line_y,
                motion.as_str(),
                direction.as_str()
            );
            CrossingEvent {
                track_id: track.id(),
                motion,
                direction,
                line_y,
                frame_id,
            }
        });

        self.mark_done_if_past_limit(track);
        event
    }

    fn mark_done_if_past_limit(&self, track: &mut Track) {
        let CrossingPolicy::DeadZone {
            up_limit,
            down_limit,
            ..
        } = self.policy
        else {
            return;
        };
        if !track.has_crossed() || track.done {
            return;
        }
        let y = track.position().y;
        let past = match track.direction {
            Some(Motion::Up) => y < up_limit,
            Some(Motion::Down) => y > down_limit,
            None => false,
        };
        if past {
            debug!("T{} left the counting band at y={:.0}", track.id(), y);
            track.done = true;
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::track_registry::{RegistryConfig, TrackRegistry};
    use crate::observation::Observation;
    use crate::types::{BBox, Point};

    fn obs(x: f32, y: f32) -> Observation {
        Observation::new(Point::new(x, y), BBox::new(x - 10.0, y - 20.0, 20.0, 40.0), 800.0)
    }

    /// Moves a single person through `ys`, returns every event emitted.
    fn run(evaluator: &LineCrossingEvaluator, ys: &[f32]) -> (Vec<CrossingEvent>, TrackRegistry) {
        let mut reg = TrackRegistry::new(RegistryConfig::default());
        let mut events = Vec::new();
        for (frame_id, y) in ys.iter().enumerate() {
            for id in reg.update(&[obs(100.0, *y)]) {
                if let Some(track) = reg.get_mut(id) {
                    events.extend(evaluator.check(track, frame_id as u64));
                }
            }
            reg.age_and_evict();
        }
        (events, reg)
    }

    fn single(line: f32) -> LineCrossingEvaluator {
        LineCrossingEvaluator::new(
            CrossingPolicy::SingleLine {
                line,
                one_shot: false,
            },
            Motion::Down,
        )
    }

    fn dead_zone() -> LineCrossingEvaluator {
        LineCrossingEvaluator::new(
            CrossingPolicy::DeadZone {
                up_limit: 100.0,
                line_up: 200.0,
                line_down: 300.0,
                down_limit: 400.0,
            },
            Motion::Down,
        )
    }

    #[test]
    fn test_single_line_enter_then_exit() {
        let (events, _) = run(&single(50.0), &[40.0, 60.0, 40.0]);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].direction, CrossingDirection::Entering);
        assert_eq!(events[0].motion, Motion::Down);
        assert_eq!(events[1].direction, CrossingDirection::Exiting);
        assert_eq!(events[1].motion, Motion::Up);
    }

    #[test]
    fn test_single_line_n_alternating_crossings() {
        let ys = [40.0, 60.0, 40.0, 60.0, 40.0, 60.0, 40.0];
        let (events, _) = run(&single(50.0), &ys);
        assert_eq!(events.len(), 6);
        for (i, e) in events.iter().enumerate() {
            let expected = if i % 2 == 0 {
                CrossingDirection::Entering
            } else {
                CrossingDirection::Exiting
            };
            assert_eq!(e.direction, expected);
        }
    }

    #[test]
    fn test_single_line_boundary_ties() {
        // Landing exactly on the line counts downward once...
        let (events, _) = run(&single(50.0), &[40.0, 50.0, 60.0]);
        assert_eq!(events.len(), 1);
        // ...and leaving it upward from the line does not fire
        let (events, _) = run(&single(50.0), &[40.0, 50.0, 45.0]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].motion, Motion::Down);
    }

    #[test]
    fn test_single_point_never_evaluates() {
        let (events, reg) = run(&single(50.0), &[50.0]);
        assert!(events.is_empty());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_one_shot_locks_track() {
        let evaluator = LineCrossingEvaluator::new(
            CrossingPolicy::SingleLine {
                line: 50.0,
                one_shot: true,
            },
            Motion::Down,
        );
        let (events, reg) = run(&evaluator, &[40.0, 60.0, 40.0, 60.0]);
        assert_eq!(events.len(), 1);
        assert!(reg.get(1).unwrap().has_crossed());
    }

    #[test]
    fn test_dead_zone_jitter_counts_once() {
        // Goes down past line_down, jitters, then drifts back up past line_up
        let ys = [
            250.0, 290.0, 310.0, 295.0, 305.0, 260.0, 230.0, 210.0, 195.0, 220.0, 280.0, 320.0,
        ];
        let (events, reg) = run(&dead_zone(), &ys);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].motion, Motion::Down);
        assert_eq!(events[0].line_y, 300.0);
        assert_eq!(reg.get(1).unwrap().direction, Some(Motion::Down));
    }

    #[test]
    fn test_dead_zone_up_and_done_marking() {
        let (events, reg) = run(&dead_zone(), &[260.0, 210.0, 190.0, 150.0, 90.0]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].motion, Motion::Up);
        assert_eq!(events[0].direction, CrossingDirection::Exiting);
        // y=90 is above up_limit: marked done and evicted on that frame's pass
        assert!(reg.is_empty());
    }

    #[test]
    fn test_dead_zone_band_motion_is_silent() {
        let (events, _) = run(&dead_zone(), &[210.0, 250.0, 290.0, 250.0, 210.0]);
        assert!(events.is_empty());
    }

    #[test]
    fn test_reverse_polarity() {
        let mut evaluator = single(50.0);
        assert_eq!(evaluator.reverse_polarity(), Motion::Up);
        let (events, _) = run(&evaluator, &[40.0, 60.0]);
        assert_eq!(events[0].direction, CrossingDirection::Exiting);
    }

    #[test]
    fn test_policy_from_config() {
        let cfg = CountingConfig {
            mode: CountingMode::DeadZone,
            ..Default::default()
        };
        let policy = CrossingPolicy::from_config(&cfg, 500);
        assert_eq!(
            policy,
            CrossingPolicy::DeadZone {
                up_limit: 100.0,
                line_up: 200.0,
                line_down: 300.0,
                down_limit: 400.0,
            }
        );
        assert_eq!(policy.lines(), vec![200.0, 300.0]);
        assert_eq!(policy.band(), Some((100.0, 400.0)));
        assert_eq!(
            CrossingPolicy::from_config(&CountingConfig::default(), 500).band(),
            None
        );
    }
}
