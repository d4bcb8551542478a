use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::RingDetectError;
use crate::label::PixelClass;

/// Which way round the marker is printed.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RingPolarity {
    /// Dark annulus around a light disc.
    #[default]
    DarkRing,
    /// Light annulus around a dark disc.
    LightRing,
}

impl RingPolarity {
    #[inline]
    pub fn outer_class(self) -> PixelClass {
        match self {
            RingPolarity::DarkRing => PixelClass::Dark,
            RingPolarity::LightRing => PixelClass::Light,
        }
    }

    #[inline]
    pub fn inner_class(self) -> PixelClass {
        self.outer_class().opposite()
    }
}

/// Diagnostic overlay switches. They never change detection results.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugParams {
    /// Paint the accepted ring pair in [`crate::RingDetector::draw_overlay`].
    pub draw: bool,
    /// On a failed frame, paint every region examined instead.
    pub draw_all_on_failure: bool,
}

/// Detector configuration, fixed for the detector lifetime
/// (except the diameter ratio, see [`crate::RingDetector::set_diameter_ratio`]).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RingDetectorParams {
    /// Inner/outer diameter ratio of the printed marker.
    pub diameter_ratio: f32,
    pub polarity: RingPolarity,
    /// Regions with at most this many pixels are ignored.
    pub min_region_pixels: usize,
    /// Upper bound on regions examined per frame.
    pub max_regions: usize,
    /// Accepted deviation of the bbox roundness score from 1.0.
    pub roundness_tolerance: f32,
    /// Accepted deviation of the normalized outer/inner area ratio from 1.0.
    pub area_ratio_tolerance: f32,
    /// Fixed slack in pixels for the concentricity test.
    pub center_distance_abs: f32,
    /// Slack for the concentricity test relative to the outer bbox extent.
    pub center_distance_ratio: f32,
    /// Accepted deviation of the moment-based circularity from 1.0.
    pub circularity_tolerance: f32,
    /// Consecutive failures before the threshold sweep runs every frame.
    pub max_failed: u32,
    /// Seed the next search at the previous detection.
    pub tracking: bool,
    /// Margin in pixels around the previous bbox cleared while tracking.
    pub tracking_margin: usize,
    /// Starting channel-sum threshold; `None` starts mid-range.
    pub initial_threshold: Option<u32>,
    pub debug: DebugParams,
}

impl Default for RingDetectorParams {
    fn default() -> Self {
        Self {
            diameter_ratio: 5.0 / 14.0,
            polarity: RingPolarity::DarkRing,
            min_region_pixels: 10,
            max_regions: 10_000,
            roundness_tolerance: 0.3,
            area_ratio_tolerance: 0.4,
            center_distance_abs: 5.0,
            center_distance_ratio: 1.1,
            circularity_tolerance: 0.1,
            max_failed: 0,
            tracking: true,
            tracking_margin: 2,
            initial_threshold: None,
            debug: DebugParams::default(),
        }
    }
}

impl RingDetectorParams {
    /// Check value ranges; called by [`crate::RingDetector::new`].
    pub fn validate(&self) -> Result<(), RingDetectError> {
        check_diameter_ratio(self.diameter_ratio)?;
        let tolerances = [
            ("roundness_tolerance", self.roundness_tolerance),
            ("area_ratio_tolerance", self.area_ratio_tolerance),
            ("center_distance_abs", self.center_distance_abs),
            ("center_distance_ratio", self.center_distance_ratio),
            ("circularity_tolerance", self.circularity_tolerance),
        ];
        for (name, value) in tolerances {
            if !value.is_finite() || value < 0.0 {
                return Err(RingDetectError::InvalidTolerance { name, value });
            }
        }
        if self.max_regions < 2 {
            return Err(RingDetectError::InvalidRegionCap(self.max_regions));
        }
        Ok(())
    }
}

pub(crate) fn check_diameter_ratio(ratio: f32) -> Result<(), RingDetectError> {
    if ratio.is_finite() && ratio > 0.0 && ratio < 1.0 {
        Ok(())
    } else {
        Err(RingDetectError::InvalidDiameterRatio(ratio))
    }
}

/// Area constants derived from the diameter ratio `d`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RingGeometry {
    pub diameter_ratio: f32,
    /// Annulus area over its bbox area: `π(1 − d²)/4`.
    pub outer_area_ratio: f32,
    /// Disc area over its bbox area: `π/4`.
    pub inner_area_ratio: f32,
    /// Expected annulus/disc pixel ratio: `(1 − d²)/d²`.
    pub areas_ratio: f32,
}

impl RingGeometry {
    pub fn new(diameter_ratio: f32) -> Self {
        let r = diameter_ratio * diameter_ratio;
        Self {
            diameter_ratio,
            outer_area_ratio: PI * (1.0 - r) / 4.0,
            inner_area_ratio: PI / 4.0,
            areas_ratio: (1.0 - r) / r,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn defaults_validate() {
        RingDetectorParams::default().validate().expect("valid defaults");
    }

    #[test]
    fn rejects_out_of_range_values() {
        let params = RingDetectorParams {
            diameter_ratio: 1.2,
            ..RingDetectorParams::default()
        };
        assert!(matches!(
            params.validate(),
            Err(RingDetectError::InvalidDiameterRatio(_))
        ));

        let params = RingDetectorParams {
            circularity_tolerance: f32::NAN,
            ..RingDetectorParams::default()
        };
        assert!(matches!(
            params.validate(),
            Err(RingDetectError::InvalidTolerance {
                name: "circularity_tolerance",
                ..
            })
        ));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let params: RingDetectorParams =
            serde_json::from_str(r#"{ "tracking": false, "polarity": "light_ring" }"#)
                .expect("parse");
        assert!(!params.tracking);
        assert_eq!(params.polarity, RingPolarity::LightRing);
        assert_eq!(params.min_region_pixels, 10);
    }

    #[test]
    fn geometry_matches_annulus_areas() {
        let g = RingGeometry::new(0.5);
        assert_relative_eq!(g.outer_area_ratio, PI * 0.75 / 4.0);
        assert_relative_eq!(g.areas_ratio, 3.0);
        assert_eq!(RingPolarity::LightRing.inner_class(), PixelClass::Dark);
    }
}
