//! Track a synthetic marker moving on a circle, with a dropout in the middle.
//!
//! Run with `cargo run -p ringmark-detector --example synthetic_track -- debug`.

use std::convert::Infallible;

use log::{info, LevelFilter};
use nalgebra::Point2;
use ringmark_core::synthetic::{draw_ring_marker, RingMarkerSpec};
use ringmark_core::{init_with_level, parse_level, FrameSource, RgbFrame, RgbFrameView};
use ringmark_detector::{DetectionSink, MarkerDetection, RingDetector, RingDetectorParams};

const W: usize = 320;
const H: usize = 240;

struct Orbit {
    frame: RgbFrame,
    tick: usize,
}

impl FrameSource for Orbit {
    type Error = Infallible;

    fn frame_size(&self) -> (usize, usize) {
        (W, H)
    }

    fn capture(&mut self) -> Result<RgbFrameView<'_>, Infallible> {
        let t = self.tick as f32 * 0.05;
        self.tick += 1;
        self.frame = RgbFrame::filled(W, H, [210, 210, 210]);
        // Frames 20..25 show no marker.
        if !(20..25).contains(&(self.tick - 1)) {
            let center = Point2::new(160.0 + 60.0 * t.cos(), 120.0 + 40.0 * t.sin());
            let spec = RingMarkerSpec::dark_ring(center, 30.0, 5.0 / 14.0);
            draw_ring_marker(&mut self.frame, &spec);
        }
        Ok(self.frame.view())
    }
}

struct Printer;

impl DetectionSink for Printer {
    fn consume(&mut self, det: &MarkerDetection) {
        if det.valid {
            println!(
                "center=({:7.2}, {:7.2}) axes=({:5.2}, {:5.2})",
                det.center.x, det.center.y, det.semi_axes[0], det.semi_axes[1]
            );
        } else {
            println!("no marker");
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let level = std::env::args()
        .nth(1)
        .map(|s| parse_level(&s))
        .unwrap_or(LevelFilter::Info);
    init_with_level(level)?;

    let mut source = Orbit {
        frame: RgbFrame::filled(W, H, [0, 0, 0]),
        tick: 0,
    };
    let (w, h) = source.frame_size();
    let mut detector = RingDetector::new(w, h, RingDetectorParams::default())?;
    let mut sink = Printer;
    for _ in 0..40 {
        detector.run_once(&mut source, &mut sink)?;
        info!(
            "phase={:?} next threshold={} regions={} {}us",
            detector.phase(),
            detector.threshold(),
            detector.last_stats().regions,
            detector.last_stats().elapsed_us
        );
    }
    Ok(())
}
