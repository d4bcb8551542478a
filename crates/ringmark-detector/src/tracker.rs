//! Per-frame threshold and tracking bookkeeping.

use serde::{Deserialize, Serialize};

use crate::result::MarkerDetection;
use crate::schedule::sweep_threshold;
use crate::segment::BoundingBox;

/// Coarse state of the detector between frames.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingPhase {
    /// Last frame produced a detection.
    Tracking,
    /// Fewer than `max_failed` frames failed; alternating sweep and retry.
    Recovering,
    /// `max_failed` or more frames failed, or nothing found yet; sweeping
    /// the threshold every frame.
    Lost,
}

/// How much of the label buffer to clear before the next frame.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum ResetScope {
    Full,
    Window(BoundingBox),
}

#[derive(Clone, Debug)]
pub(crate) struct TrackingState {
    pub threshold: u32,
    /// Threshold of the last successful frame.
    pub last_threshold: u32,
    failures: u32,
    max_failed: u32,
    /// Last frame produced exactly the accepted pair and nothing else.
    clean_track: bool,
    found: bool,
}

impl TrackingState {
    pub fn new(threshold: u32, max_failed: u32) -> Self {
        Self {
            threshold,
            last_threshold: threshold,
            failures: 0,
            max_failed,
            clean_track: false,
            found: false,
        }
    }

    pub fn phase(&self) -> TrackingPhase {
        if self.found {
            TrackingPhase::Tracking
        } else if self.failures > 0 && self.failures < self.max_failed {
            TrackingPhase::Recovering
        } else {
            TrackingPhase::Lost
        }
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn record_success(&mut self, threshold: u32, clean: bool) {
        self.threshold = threshold;
        self.last_threshold = threshold;
        self.failures = 0;
        self.clean_track = clean;
        self.found = true;
    }

    pub fn record_failure(&mut self) {
        self.clean_track = false;
        self.found = false;
        if self.failures < self.max_failed {
            let n = self.failures;
            self.failures += 1;
            if n % 2 == 0 {
                self.threshold = sweep_threshold(self.failures).threshold;
            } else {
                self.threshold = self.last_threshold;
            }
        } else {
            self.failures += 1;
            let probe = sweep_threshold(self.failures);
            self.threshold = probe.threshold;
            if !probe.has_finer {
                self.failures = 0;
            }
        }
    }

    /// Clearing needed before searching for the marker again.
    pub fn reset_scope(&self, tracking: bool, last: &MarkerDetection) -> ResetScope {
        match last.bbox {
            Some(bbox) if tracking && self.clean_track && last.valid => ResetScope::Window(bbox),
            _ => ResetScope::Full,
        }
    }
}

/// Linear index where the next raster scan starts.
pub(crate) fn search_seed(tracking: bool, last: &MarkerDetection, width: usize, height: usize) -> usize {
    if !tracking || !last.valid {
        return 0;
    }
    let x = (last.center.x.round().max(0.0) as usize).min(width - 1);
    let y = (last.center.y.round().max(0.0) as usize).min(height - 1);
    y * width + x
}
