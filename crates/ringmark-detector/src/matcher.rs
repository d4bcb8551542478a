//! Raster search for a concentric ring/disc pair.

use log::trace;
use ringmark_core::RgbFrameView;

use crate::fit::{fit_ring_pair, FitSpec};
use crate::params::{RingDetectorParams, RingGeometry};
use crate::result::MarkerDetection;
use crate::segment::{FillSpec, Region, SegmentationWorkspace};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Ordinals of an outer ring and the disc found inside it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RingPair {
    pub outer: usize,
    pub inner: usize,
}

/// Why a pair of individually round regions was not accepted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PairRejection {
    /// Normalized outer/inner pixel ratio, expected ~1.0.
    AreaRatio(f32),
    /// Bbox-center offsets that exceeded the allowed slack.
    Concentricity { dx: f32, dy: f32 },
}

/// Area-ratio and concentricity tests for a ring pair.
pub fn check_pair(
    outer: &Region,
    inner: &Region,
    geometry: &RingGeometry,
    params: &RingDetectorParams,
) -> Result<(), PairRejection> {
    let ratio = outer.size as f32 / geometry.areas_ratio / inner.size as f32;
    if (ratio - 1.0).abs() >= params.area_ratio_tolerance {
        return Err(PairRejection::AreaRatio(ratio));
    }

    let dx = (inner.center.x - outer.center.x).abs();
    let dy = (inner.center.y - outer.center.y).abs();
    let slack_x = params.center_distance_abs
        + params.center_distance_ratio * (outer.bbox.max_x - outer.bbox.min_x) as f32;
    let slack_y = params.center_distance_abs
        + params.center_distance_ratio * (outer.bbox.max_y - outer.bbox.min_y) as f32;
    if dx > slack_x || dy > slack_y {
        return Err(PairRejection::Concentricity { dx, dy });
    }
    Ok(())
}

/// Inputs of one raster search.
pub(crate) struct SearchSpec<'a> {
    pub params: &'a RingDetectorParams,
    pub geometry: &'a RingGeometry,
    pub threshold: u32,
    /// Linear pixel index where the scan starts and wraps back to.
    pub seed: usize,
    /// End the sweep at the first concentric pair.
    pub stop_at_first_pair: bool,
}

/// An accepted pair with its fitted result.
#[derive(Clone, Copy, Debug)]
pub(crate) struct MarkerMatch {
    pub pair: RingPair,
    pub detection: MarkerDetection,
    /// `(outer mean + inner mean) / 2`, the threshold to use next frame.
    pub threshold: u32,
}

/// Scan the frame once, wrapping at the end, for the marker.
///
/// Regions examined are appended to `regions`; the last accepted pair wins.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip_all, fields(seed = spec.seed, threshold = spec.threshold))
)]
pub(crate) fn find_marker(
    ws: &mut SegmentationWorkspace,
    regions: &mut Vec<Region>,
    frame: &RgbFrameView<'_>,
    spec: &SearchSpec<'_>,
) -> Option<MarkerMatch> {
    let params = spec.params;
    let width = frame.width;
    let len = frame.len();
    let outer_class = params.polarity.outer_class();
    let outer_code = outer_class.code();

    let outer_fill = FillSpec {
        threshold: spec.threshold,
        area_ratio: spec.geometry.outer_area_ratio,
        min_pixels: params.min_region_pixels,
    };

    let start = spec.seed.min(len - 1);
    let mut idx = start;
    let mut found = None;
    loop {
        if regions.len() >= params.max_regions {
            trace!("region cap {} reached", params.max_regions);
            break;
        }
        if ws.labels.classify(idx, frame, spec.threshold) == outer_code {
            ws.begin_candidate();
            let mut outer = ws.flood_fill(frame, idx, outer_class, regions.len(), &outer_fill);
            trace!(
                "region {} {:?} size={} roundness={:.3}",
                outer.ordinal,
                outer.class,
                outer.size,
                outer.roundness
            );
            let round = outer.is_round(params.roundness_tolerance);
            if round {
                outer.mean = ws.mean_brightness(frame, &outer);
            }
            regions.push(outer);

            if round {
                if let Some(inner) = examine_inner(ws, regions, frame, spec) {
                    let pair = RingPair {
                        outer: inner - 1,
                        inner,
                    };
                    match check_pair(&regions[pair.outer], &regions[pair.inner], spec.geometry, params) {
                        Ok(()) => {
                            if let Some(hit) = fit_pair(ws, regions, width, pair, spec) {
                                found = Some(hit);
                            }
                            if spec.stop_at_first_pair {
                                break;
                            }
                        }
                        Err(why) => trace!("pair {}/{} rejected: {why:?}", pair.outer, pair.inner),
                    }
                }
            }
        }

        idx += 1;
        if idx == len {
            idx = 0;
        }
        if idx == start {
            break;
        }
    }
    found
}

/// Flood-fill the disc candidate at the center of the last region.
///
/// Returns the ordinal of the new region when it is round.
fn examine_inner(
    ws: &mut SegmentationWorkspace,
    regions: &mut Vec<Region>,
    frame: &RgbFrameView<'_>,
    spec: &SearchSpec<'_>,
) -> Option<usize> {
    let params = spec.params;
    if regions.len() >= params.max_regions {
        return None;
    }
    let inner_class = params.polarity.inner_class();
    let (cx, cy) = regions.last()?.bbox.center();
    let pos = cy * frame.width + cx;
    if ws.labels.classify(pos, frame, spec.threshold) != inner_class.code() {
        return None;
    }

    let inner_fill = FillSpec {
        threshold: spec.threshold,
        area_ratio: spec.geometry.inner_area_ratio,
        min_pixels: params.min_region_pixels,
    };
    let mut inner = ws.flood_fill(frame, pos, inner_class, regions.len(), &inner_fill);
    trace!(
        "region {} {:?} size={} roundness={:.3}",
        inner.ordinal,
        inner.class,
        inner.size,
        inner.roundness
    );
    let round = inner.is_round(params.roundness_tolerance);
    if round {
        inner.mean = ws.mean_brightness(frame, &inner);
    }
    let ordinal = inner.ordinal;
    regions.push(inner);
    round.then_some(ordinal)
}

fn fit_pair(
    ws: &SegmentationWorkspace,
    regions: &mut [Region],
    width: usize,
    pair: RingPair,
    spec: &SearchSpec<'_>,
) -> Option<MarkerMatch> {
    let fit_spec = FitSpec {
        diameter_ratio: spec.geometry.diameter_ratio,
        circularity_tolerance: spec.params.circularity_tolerance,
    };
    let (outer, inner) = (&regions[pair.outer], &regions[pair.inner]);
    let detection = fit_ring_pair(ws, width, outer, inner, &fit_spec)?;
    let threshold = (outer.mean + inner.mean) / 2;

    regions[pair.outer].center = detection.center;
    regions[pair.inner].center = detection.center;
    Some(MarkerMatch {
        pair,
        detection,
        threshold,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::PixelClass;
    use crate::segment::BoundingBox;
    use nalgebra::Point2;

    fn region(ordinal: usize, size: usize, bbox: BoundingBox) -> Region {
        let (cx, cy) = bbox.center();
        Region {
            ordinal,
            class: PixelClass::Dark,
            bbox,
            size,
            center: Point2::new(cx as f32, cy as f32),
            roundness: 1.0,
            mean: 0,
            valid: true,
            pixels: 0..size,
        }
    }

    fn square(x0: usize, y0: usize, side: usize) -> BoundingBox {
        BoundingBox {
            min_x: x0,
            max_x: x0 + side - 1,
            min_y: y0,
            max_y: y0 + side - 1,
        }
    }

    #[test]
    fn accepts_expected_area_ratio() {
        let params = RingDetectorParams::default();
        let geometry = RingGeometry::new(0.5);
        let outer = region(0, 300, square(10, 10, 40));
        let inner = region(1, 100, square(20, 20, 20));
        assert_eq!(check_pair(&outer, &inner, &geometry, &params), Ok(()));
    }

    #[test]
    fn rejects_wrong_area_ratio_even_when_round() {
        let params = RingDetectorParams::default();
        let geometry = RingGeometry::new(0.5);
        let outer = region(0, 600, square(10, 10, 40));
        let inner = region(1, 100, square(20, 20, 20));
        assert!(outer.is_round(params.roundness_tolerance));
        assert!(inner.is_round(params.roundness_tolerance));
        match check_pair(&outer, &inner, &geometry, &params) {
            Err(PairRejection::AreaRatio(ratio)) => assert!((ratio - 2.0).abs() < 1e-6),
            other => panic!("expected area-ratio rejection, got {other:?}"),
        }
    }

    #[test]
    fn concentricity_slack_scales_with_marker_size() {
        let params = RingDetectorParams {
            center_distance_abs: 1.0,
            center_distance_ratio: 0.1,
            ..RingDetectorParams::default()
        };
        let geometry = RingGeometry::new(0.5);
        let outer = region(0, 300, square(10, 10, 41));
        // Allowed offset is 1 + 0.1 * 40 = 5 px.
        let near = region(1, 100, square(25, 20, 20));
        let far = region(1, 100, square(26, 20, 20));
        assert_eq!(check_pair(&outer, &near, &geometry, &params), Ok(()));
        assert!(matches!(
            check_pair(&outer, &far, &geometry, &params),
            Err(PairRejection::Concentricity { .. })
        ));
    }
}
