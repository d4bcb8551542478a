use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

use crate::segment::BoundingBox;

/// Per-frame detection output.
///
/// When `valid` is false every other field holds its neutral value and must
/// not be interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerDetection {
    pub valid: bool,
    /// Sub-pixel centroid of the ring and disc pixels together.
    pub center: Point2<f32>,
    /// Outer semi-axes `[major, minor]` in pixels after leakage correction.
    pub semi_axes: [f32; 2],
    /// Inner disc semi-axes `[major, minor]` after leakage correction.
    pub inner_semi_axes: [f32; 2],
    /// Unit direction of the major axis.
    pub axis_direction: Vector2<f32>,
    /// Angle in radians of the offset from the disc centroid to `center`.
    pub orientation: f32,
    /// Ring plus disc pixel count.
    pub pixel_count: usize,
    /// Ring pixels per disc pixel.
    pub bw_ratio: f32,
    /// Bounding box of the outer ring.
    pub bbox: Option<BoundingBox>,
}

impl MarkerDetection {
    pub fn invalid() -> Self {
        Self {
            valid: false,
            center: Point2::origin(),
            semi_axes: [0.0; 2],
            inner_semi_axes: [0.0; 2],
            axis_direction: Vector2::x(),
            orientation: 0.0,
            pixel_count: 0,
            bw_ratio: 0.0,
            bbox: None,
        }
    }

    /// Angle of the major axis in radians.
    pub fn axis_angle(&self) -> f32 {
        self.axis_direction.y.atan2(self.axis_direction.x)
    }
}

impl Default for MarkerDetection {
    fn default() -> Self {
        Self::invalid()
    }
}

/// Bookkeeping for the last processed frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameStats {
    /// Regions flood-filled this frame.
    pub regions: usize,
    /// Pixels assigned to those regions.
    pub labelled_pixels: usize,
    pub frame_pixels: usize,
    /// Threshold the frame was segmented with.
    pub threshold: u32,
    pub elapsed_us: u64,
}

impl FrameStats {
    pub fn labelled_fraction(&self) -> f32 {
        if self.frame_pixels == 0 {
            0.0
        } else {
            self.labelled_pixels as f32 / self.frame_pixels as f32
        }
    }
}

/// Receives one detection per processed frame.
pub trait DetectionSink {
    fn consume(&mut self, detection: &MarkerDetection);
}

impl DetectionSink for Vec<MarkerDetection> {
    fn consume(&mut self, detection: &MarkerDetection) {
        self.push(*detection);
    }
}
