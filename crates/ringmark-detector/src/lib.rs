//! Concentric-ring fiducial detector.
//!
//! A marker is a dark annulus around a light disc (or the inverse, see
//! [`RingPolarity`]) with a known inner/outer diameter ratio. Frames are
//! binarized against one channel-sum threshold and segmented with a
//! breadth-first flood fill. Round ring regions whose center holds a round
//! disc with the expected area ratio are fitted with second moments.
//!
//! The detector is stateful across frames:
//! - after a detection the threshold moves to the mean of ring and disc
//!   brightness and the next search starts at the previous center;
//! - after failures the threshold sweeps the channel-sum range
//!   coarse-to-fine (see [`sweep_threshold`]).
//!
//! ```no_run
//! use ringmark_core::RgbFrame;
//! use ringmark_detector::{RingDetector, RingDetectorParams};
//!
//! let frame = RgbFrame::filled(640, 480, [255, 255, 255]);
//! let mut detector = RingDetector::new(640, 480, RingDetectorParams::default())?;
//! let det = detector.detect(&frame.view())?;
//! if det.valid {
//!     println!("marker at {:?}", det.center);
//! }
//! # Ok::<(), ringmark_detector::RingDetectError>(())
//! ```

mod detector;
mod error;
mod fit;
pub mod io;
mod label;
mod matcher;
mod params;
mod result;
mod schedule;
mod segment;
mod tracker;

pub use detector::RingDetector;
pub use error::RingDetectError;
pub use fit::{correct_pixel_leakage, LeakageCorrection};
pub use io::{FrameReport, RingDetectConfig, RingDetectReport, RingIoError};
pub use label::{Label, PixelClass};
pub use matcher::{check_pair, PairRejection, RingPair};
pub use params::{DebugParams, RingDetectorParams, RingGeometry, RingPolarity};
pub use result::{DetectionSink, FrameStats, MarkerDetection};
pub use schedule::{sweep_threshold, ThresholdProbe, CHANNEL_LEVELS, MIN_SWEEP_STEP};
pub use segment::{BoundingBox, Region};
pub use tracker::TrackingPhase;
