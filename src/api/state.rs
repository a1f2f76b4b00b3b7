// src/api/state.rs
//
// State shared between the frame loop (single writer) and the HTTP handlers
// (readers). Handlers never touch the registry; they read the last published
// snapshot and leave commands for the frame loop to apply.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::analysis::LoadStatus;
use crate::pipeline::{FrameContext, PipelineMetrics};
use crate::types::Motion;

/// Operations requested over HTTP, applied by the frame loop between frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopCommand {
    /// Commit the current route stop
    Depart,
    SwitchDirection,
    ResetCounters,
}

#[derive(Debug, Clone, Copy)]
struct Polarity {
    applied: Motion,
    /// A reversal was requested and not yet applied by the frame loop
    pending: bool,
}

impl Polarity {
    fn effective(&self) -> Motion {
        if self.pending {
            self.applied.opposite()
        } else {
            self.applied
        }
    }
}

/// Last frame and the processed-frame count it was published with
#[derive(Debug, Clone, Default)]
struct Published {
    frame: FrameContext,
    frames_processed: u64,
}

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    service: String,
    latest: RwLock<Published>,
    polarity: RwLock<Polarity>,
    load: RwLock<Option<LoadStatus>>,
    commands: Mutex<Vec<LoopCommand>>,
    metrics: PipelineMetrics,
}

impl AppState {
    pub fn new(entry_motion: Motion, metrics: PipelineMetrics) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                service: "crowd-counter".to_string(),
                latest: RwLock::new(Published::default()),
                polarity: RwLock::new(Polarity {
                    applied: entry_motion,
                    pending: false,
                }),
                load: RwLock::new(None),
                commands: Mutex::new(Vec::new()),
                metrics,
            }),
        }
    }

    pub fn service(&self) -> &str {
        &self.inner.service
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.inner.metrics
    }

    // ========================================================================
    // Frame loop side
    // ========================================================================

    pub fn publish_frame(&self, ctx: FrameContext, frames_processed: u64) {
        *self.inner.latest.write() = Published {
            frame: ctx,
            frames_processed,
        };
    }

    pub fn publish_load(&self, status: Option<LoadStatus>) {
        *self.inner.load.write() = status;
    }

    /// Apply a pending reversal, if any. `reverse` flips the evaluator and
    /// returns its new entry motion; it runs under the polarity lock, so a
    /// handler never sees the request consumed before the new motion lands.
    pub fn apply_reverse_request(&self, reverse: impl FnOnce() -> Motion) -> Option<Motion> {
        let mut polarity = self.inner.polarity.write();
        if !polarity.pending {
            return None;
        }
        polarity.applied = reverse();
        polarity.pending = false;
        Some(polarity.applied)
    }

    pub fn take_commands(&self) -> Vec<LoopCommand> {
        std::mem::take(&mut *self.inner.commands.lock())
    }

    // ========================================================================
    // Handler side
    // ========================================================================

    /// Latest frame and processed-frame count, read together
    pub fn latest(&self) -> (FrameContext, u64) {
        let published = self.inner.latest.read();
        (published.frame.clone(), published.frames_processed)
    }

    pub fn latest_frame(&self) -> FrameContext {
        self.inner.latest.read().frame.clone()
    }

    pub fn load_status(&self) -> Option<LoadStatus> {
        self.inner.load.read().clone()
    }

    /// Polarity in effect once pending requests are applied
    pub fn entry_motion(&self) -> Motion {
        self.inner.polarity.read().effective()
    }

    /// Toggle the pending reversal. Two requests before the next frame
    /// cancel out. Returns the resulting entry motion.
    pub fn request_reverse(&self) -> Motion {
        let mut polarity = self.inner.polarity.write();
        polarity.pending = !polarity.pending;
        polarity.effective()
    }

    pub fn queue_command(&self, command: LoopCommand) {
        self.inner.commands.lock().push(command);
    }
}
