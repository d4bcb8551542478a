use std::time::Instant;

use log::debug;
use ringmark_core::{FrameSource, RgbFrame, RgbFrameView};

use crate::error::RingDetectError;
use crate::label::Label;
use crate::matcher::{find_marker, RingPair, SearchSpec};
use crate::params::{check_diameter_ratio, RingDetectorParams, RingGeometry};
use crate::result::{DetectionSink, FrameStats, MarkerDetection};
use crate::schedule::sweep_threshold;
use crate::segment::{Region, SegmentationWorkspace};
use crate::tracker::{search_seed, ResetScope, TrackingPhase, TrackingState};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Concentric-ring marker detector for a fixed frame size.
///
/// The detector keeps state between frames: the label buffer, the adapted
/// threshold and the previous detection used to seed the next search.
pub struct RingDetector {
    width: usize,
    height: usize,
    params: RingDetectorParams,
    geometry: RingGeometry,
    workspace: SegmentationWorkspace,
    regions: Vec<Region>,
    state: TrackingState,
    last: MarkerDetection,
    accepted: Option<RingPair>,
    stats: FrameStats,
}

impl RingDetector {
    pub fn new(
        width: usize,
        height: usize,
        params: RingDetectorParams,
    ) -> Result<Self, RingDetectError> {
        if width < 3 || height < 3 {
            return Err(RingDetectError::FrameTooSmall { width, height });
        }
        params.validate()?;

        let threshold = params
            .initial_threshold
            .unwrap_or_else(|| sweep_threshold(0).threshold);
        let state = TrackingState::new(threshold, params.max_failed);
        debug!(
            "ring detector {width}x{height}, d={:.4}, threshold={threshold}",
            params.diameter_ratio
        );

        Ok(Self {
            width,
            height,
            geometry: RingGeometry::new(params.diameter_ratio),
            workspace: SegmentationWorkspace::new(width, height),
            regions: Vec::new(),
            state,
            last: MarkerDetection::invalid(),
            accepted: None,
            stats: FrameStats::default(),
            params,
        })
    }

    pub fn params(&self) -> &RingDetectorParams {
        &self.params
    }

    pub fn frame_size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Change the printed inner/outer diameter ratio; takes effect next frame.
    pub fn set_diameter_ratio(&mut self, ratio: f32) -> Result<(), RingDetectError> {
        check_diameter_ratio(ratio)?;
        self.params.diameter_ratio = ratio;
        self.geometry = RingGeometry::new(ratio);
        Ok(())
    }

    /// Threshold the next frame will be segmented with.
    pub fn threshold(&self) -> u32 {
        self.state.threshold
    }

    pub fn phase(&self) -> TrackingPhase {
        self.state.phase()
    }

    pub fn last_detection(&self) -> &MarkerDetection {
        &self.last
    }

    pub fn last_stats(&self) -> &FrameStats {
        &self.stats
    }

    /// Regions examined while processing the last frame, in ordinal order.
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Search one frame for the marker.
    ///
    /// An invalid [`MarkerDetection`] means no marker was found; errors are
    /// reserved for frames that do not fit this detector, including views
    /// whose buffer is not `width * height * 3` bytes long.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, frame), fields(width = frame.width, height = frame.height))
    )]
    pub fn detect(&mut self, frame: &RgbFrameView<'_>) -> Result<MarkerDetection, RingDetectError> {
        if frame.width != self.width || frame.height != self.height {
            return Err(RingDetectError::FrameSizeMismatch {
                width: self.width,
                height: self.height,
                got_width: frame.width,
                got_height: frame.height,
            });
        }
        let frame = &RgbFrameView::new(frame.width, frame.height, frame.data)?;
        let started = Instant::now();

        match self.state.reset_scope(self.params.tracking, &self.last) {
            ResetScope::Full => self.workspace.labels.reset_full(),
            ResetScope::Window(bbox) => self
                .workspace
                .labels
                .reset_window(&bbox, self.params.tracking_margin),
        }
        self.regions.clear();

        let threshold = self.state.threshold;
        let spec = SearchSpec {
            params: &self.params,
            geometry: &self.geometry,
            threshold,
            seed: search_seed(self.params.tracking, &self.last, self.width, self.height),
            stop_at_first_pair: self.params.tracking,
        };
        let found = find_marker(&mut self.workspace, &mut self.regions, frame, &spec);

        match found {
            Some(hit) => {
                let clean = self.regions.len() == 2 && self.regions.iter().all(|r| r.valid);
                self.state.record_success(hit.threshold, clean);
                self.accepted = Some(hit.pair);
                self.last = hit.detection;
            }
            None => {
                self.state.record_failure();
                self.accepted = None;
                self.last = MarkerDetection::invalid();
            }
        }

        self.stats = FrameStats {
            regions: self.regions.len(),
            labelled_pixels: self.regions.iter().map(|r| r.size).sum(),
            frame_pixels: frame.len(),
            threshold,
            elapsed_us: started.elapsed().as_micros() as u64,
        };
        debug!(
            "frame: valid={} regions={} threshold={} -> {} phase={:?} failures={}",
            self.last.valid,
            self.stats.regions,
            threshold,
            self.state.threshold,
            self.state.phase(),
            self.state.failures()
        );
        Ok(self.last)
    }

    /// Capture one frame from `source`, detect, and hand the result to `sink`.
    pub fn run_once<S, K>(
        &mut self,
        source: &mut S,
        sink: &mut K,
    ) -> Result<MarkerDetection, RingDetectError>
    where
        S: FrameSource + ?Sized,
        K: DetectionSink + ?Sized,
    {
        let frame = source
            .capture()
            .map_err(|e| RingDetectError::Source(Box::new(e)))?;
        let detection = self.detect(&frame)?;
        sink.consume(&detection);
        Ok(detection)
    }

    /// Paint the segmentation of the last frame into `frame`.
    ///
    /// Region `k` gets channel `k % 3` zeroed and the other two saturated.
    /// Paints the accepted pair, or every examined region after a failed frame
    /// when `debug.draw_all_on_failure` is set. Returns whether anything was drawn.
    pub fn draw_overlay(&self, frame: &mut RgbFrame) -> Result<bool, RingDetectError> {
        if frame.width != self.width || frame.height != self.height {
            return Err(RingDetectError::FrameSizeMismatch {
                width: self.width,
                height: self.height,
                got_width: frame.width,
                got_height: frame.height,
            });
        }
        if !self.params.debug.draw {
            return Ok(false);
        }

        let selected: Vec<&Region> = match self.accepted {
            Some(pair) => vec![&self.regions[pair.outer], &self.regions[pair.inner]],
            None if self.params.debug.draw_all_on_failure => self.regions.iter().collect(),
            None => Vec::new(),
        };

        for region in &selected {
            let code = Label::Region(region.ordinal).encode();
            let mut rgb = [255u8; 3];
            rgb[region.ordinal % 3] = 0;
            let bbox = region.bbox;
            for y in bbox.min_y..=bbox.max_y {
                for x in bbox.min_x..=bbox.max_x {
                    if self.workspace.labels.raw(y * self.width + x) == code {
                        frame.set_pixel(x, y, rgb);
                    }
                }
            }
        }
        Ok(!selected.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point2;
    use ringmark_core::synthetic::{render_ring_marker, RingMarkerSpec};

    fn ring_frame(cx: f32, cy: f32) -> RgbFrame {
        let spec = RingMarkerSpec::dark_ring(Point2::new(cx, cy), 20.0, 5.0 / 14.0);
        render_ring_marker(96, 72, [230, 230, 230], &spec)
    }

    #[test]
    fn rejects_tiny_frames_and_bad_params() {
        assert!(matches!(
            RingDetector::new(2, 10, RingDetectorParams::default()),
            Err(RingDetectError::FrameTooSmall { .. })
        ));
        let params = RingDetectorParams {
            max_regions: 1,
            ..RingDetectorParams::default()
        };
        assert!(matches!(
            RingDetector::new(32, 32, params),
            Err(RingDetectError::InvalidRegionCap(1))
        ));
    }

    #[test]
    fn frame_size_mismatch_is_an_error() {
        let mut detector = RingDetector::new(96, 72, RingDetectorParams::default()).unwrap();
        let frame = RgbFrame::filled(64, 48, [0, 0, 0]);
        assert!(matches!(
            detector.detect(&frame.view()),
            Err(RingDetectError::FrameSizeMismatch { got_width: 64, .. })
        ));
    }

    #[test]
    fn short_buffer_is_an_error_not_a_panic() {
        let mut detector = RingDetector::new(96, 72, RingDetectorParams::default()).unwrap();
        let data = vec![200u8; 96 * 60 * 3];
        let view = RgbFrameView {
            width: 96,
            height: 72,
            data: &data,
        };
        assert!(matches!(
            detector.detect(&view),
            Err(RingDetectError::Frame(ringmark_core::FrameError::InvalidBuffer {
                expected: 20736,
                got: 17280
            }))
        ));
        // State is untouched, so a good frame still detects.
        assert!(detector.detect(&ring_frame(48.0, 36.0).view()).unwrap().valid);
    }

    #[test]
    fn clean_detection_enables_tracking_window() {
        let mut detector = RingDetector::new(96, 72, RingDetectorParams::default()).unwrap();
        let frame = ring_frame(48.0, 36.0);
        let first = detector.detect(&frame.view()).unwrap();
        assert!(first.valid);
        assert_eq!(detector.phase(), TrackingPhase::Tracking);

        // Seeded at the marker center, the second frame sees only the pair.
        let second = detector.detect(&frame.view()).unwrap();
        assert!(second.valid);
        assert_eq!(detector.last_stats().regions, 2);
        assert!((second.center - first.center).norm() < 0.5);
    }

    #[test]
    fn overlay_paints_only_when_enabled() {
        let frame = ring_frame(48.0, 36.0);
        let mut detector = RingDetector::new(96, 72, RingDetectorParams::default()).unwrap();
        detector.detect(&frame.view()).unwrap();
        let mut canvas = frame.clone();
        assert!(!detector.draw_overlay(&mut canvas).unwrap());
        assert_eq!(canvas, frame);

        let mut params = RingDetectorParams::default();
        params.debug.draw = true;
        let mut detector = RingDetector::new(96, 72, params).unwrap();
        let det = detector.detect(&frame.view()).unwrap();
        assert!(det.valid);
        assert!(detector.draw_overlay(&mut canvas).unwrap());
        assert_ne!(canvas, frame);
        // Background outside the marker is untouched.
        assert_eq!(canvas.view().pixel(2, 2), frame.view().pixel(2, 2));
    }

    #[test]
    fn diameter_ratio_can_be_changed_between_frames() {
        let mut detector = RingDetector::new(96, 72, RingDetectorParams::default()).unwrap();
        assert!(matches!(
            detector.set_diameter_ratio(0.0),
            Err(RingDetectError::InvalidDiameterRatio(_))
        ));
        detector.set_diameter_ratio(0.5).unwrap();
        assert_eq!(detector.params().diameter_ratio, 0.5);
    }
}
