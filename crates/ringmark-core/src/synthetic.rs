//! Synthetic ring-marker frames for tests, benches and demos.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::image::RgbFrame;

/// Geometry and colors of one rendered marker.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct RingMarkerSpec {
    pub center: Point2<f32>,
    /// Outer radius of the annulus in pixels.
    pub outer_radius: f32,
    /// Inner/outer diameter ratio.
    pub diameter_ratio: f32,
    /// Optional anisotropic scale `(sx, sy)` applied around the center.
    pub scale: [f32; 2],
    pub ring_rgb: [u8; 3],
    pub disc_rgb: [u8; 3],
}

impl RingMarkerSpec {
    /// Black ring around a white disc.
    pub fn dark_ring(center: Point2<f32>, outer_radius: f32, diameter_ratio: f32) -> Self {
        Self {
            center,
            outer_radius,
            diameter_ratio,
            scale: [1.0, 1.0],
            ring_rgb: [0, 0, 0],
            disc_rgb: [255, 255, 255],
        }
    }

    pub fn inner_radius(&self) -> f32 {
        self.outer_radius * self.diameter_ratio
    }
}

/// Paint `marker` into `frame`, leaving pixels outside the outer radius untouched.
///
/// A pixel belongs to the ring when its (scaled) distance `r` from the center
/// satisfies `inner <= r <= outer`, and to the disc when `r < inner`.
pub fn draw_ring_marker(frame: &mut RgbFrame, marker: &RingMarkerSpec) {
    let [sx, sy] = marker.scale;
    let reach_x = marker.outer_radius * sx + 1.0;
    let reach_y = marker.outer_radius * sy + 1.0;
    let x0 = (marker.center.x - reach_x).floor().max(0.0) as usize;
    let y0 = (marker.center.y - reach_y).floor().max(0.0) as usize;
    let x1 = ((marker.center.x + reach_x).ceil() as usize).min(frame.width.saturating_sub(1));
    let y1 = ((marker.center.y + reach_y).ceil() as usize).min(frame.height.saturating_sub(1));
    let inner = marker.inner_radius();

    for y in y0..=y1 {
        for x in x0..=x1 {
            let dx = (x as f32 - marker.center.x) / sx;
            let dy = (y as f32 - marker.center.y) / sy;
            let r = (dx * dx + dy * dy).sqrt();
            if r < inner {
                frame.set_pixel(x, y, marker.disc_rgb);
            } else if r <= marker.outer_radius {
                frame.set_pixel(x, y, marker.ring_rgb);
            }
        }
    }
}

/// A `width × height` frame with uniform `background` and one marker.
pub fn render_ring_marker(
    width: usize,
    height: usize,
    background: [u8; 3],
    marker: &RingMarkerSpec,
) -> RgbFrame {
    let mut frame = RgbFrame::filled(width, height, background);
    draw_ring_marker(&mut frame, marker);
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_pixels_follow_radii() {
        let spec = RingMarkerSpec::dark_ring(Point2::new(20.0, 20.0), 10.0, 0.5);
        let frame = render_ring_marker(40, 40, [255, 255, 255], &spec);
        let v = frame.view();
        assert_eq!(v.pixel(20, 20), [255, 255, 255]);
        assert_eq!(v.pixel(27, 20), [0, 0, 0]);
        assert_eq!(v.pixel(20, 30), [0, 0, 0]);
        assert_eq!(v.pixel(20, 31), [255, 255, 255]);
        assert_eq!(v.pixel(0, 0), [255, 255, 255]);
    }
}
