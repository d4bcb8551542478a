//! Moment-based shape fit of an accepted ring pair.

use std::f32::consts::PI;

use log::trace;
use nalgebra::Point2;
use ringmark_core::{centroid, covariance, PrincipalAxes};

use crate::result::MarkerDetection;
use crate::segment::{Region, SegmentationWorkspace};

/// Axis estimates after pixel-leakage correction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LeakageCorrection {
    pub outer: [f32; 2],
    pub inner: [f32; 2],
    /// Shift moved from the inner to the outer estimate.
    pub shift: f32,
}

/// Correct semi-axes for threshold bias at the ring/disc boundary.
///
/// `outer` are the raw semi-axes of the whole marker, `inner_fraction` the
/// share of disc pixels in it. Raw inner axes are `sqrt(inner_fraction)·outer`.
/// The shift `t` is chosen so that `(i0 − t)(i1 − t) = d²(o0 + t)(o1 + t)`,
/// i.e. the corrected axes honour the printed diameter ratio `d`.
pub fn correct_pixel_leakage(
    outer: [f32; 2],
    inner_fraction: f32,
    diameter_ratio: f32,
) -> LeakageCorrection {
    let r = diameter_ratio * diameter_ratio;
    let s = inner_fraction.max(0.0).sqrt();
    let inner = [s * outer[0], s * outer[1]];

    let a = 1.0 - r;
    let b = -(inner[0] + inner[1]) - (outer[0] + outer[1]) * r;
    let c = inner[0] * inner[1] - outer[0] * outer[1] * r;
    let disc = b * b - 4.0 * a * c;
    let shift = if a.abs() > f32::EPSILON && disc >= 0.0 {
        (-b - disc.sqrt()) / (2.0 * a)
    } else {
        0.0
    };

    LeakageCorrection {
        outer: [outer[0] + shift, outer[1] + shift],
        inner: [inner[0] - shift, inner[1] - shift],
        shift,
    }
}

/// Thresholds consumed by [`fit_ring_pair`].
#[derive(Clone, Copy, Debug)]
pub(crate) struct FitSpec {
    pub diameter_ratio: f32,
    pub circularity_tolerance: f32,
}

/// Fit an ellipse to the union of `outer` and `inner` pixels.
///
/// Returns `None` when the moment-based circularity rejects the pair.
pub(crate) fn fit_ring_pair(
    ws: &SegmentationWorkspace,
    width: usize,
    outer: &Region,
    inner: &Region,
    spec: &FitSpec,
) -> Option<MarkerDetection> {
    let to_point = |&idx: &usize| Point2::new((idx % width) as f32, (idx / width) as f32);
    let outer_px = ws.pixels(&outer.pixels);
    let inner_px = ws.pixels(&inner.pixels);

    let inner_center = centroid(inner_px.iter().map(to_point))?;
    let union = || outer_px.iter().chain(inner_px.iter()).map(to_point);
    let center = centroid(union())?;
    let axes = PrincipalAxes::from_covariance(&covariance(union(), center)?);
    let raw = axes.semi_axes();

    let total = outer.size + inner.size;
    let circularity = PI * raw[0] * raw[1] / total as f32;
    if (circularity - 1.0).abs() >= spec.circularity_tolerance {
        trace!(
            "pair {}/{} rejected: circularity {circularity:.3}",
            outer.ordinal,
            inner.ordinal
        );
        return None;
    }

    let corrected = correct_pixel_leakage(
        raw,
        inner.size as f32 / total as f32,
        spec.diameter_ratio,
    );
    let offset = center - inner_center;

    Some(MarkerDetection {
        valid: true,
        center,
        semi_axes: corrected.outer,
        inner_semi_axes: corrected.inner,
        axis_direction: axes.major_direction,
        orientation: offset.y.atan2(offset.x),
        pixel_count: total,
        bw_ratio: outer.size as f32 / inner.size as f32,
        bbox: Some(outer.bbox),
    })
}
