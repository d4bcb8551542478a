//! High-level facade crate for the `ringmark-*` workspace.
//!
//! This crate provides:
//! - re-exports of the frame types and the ring detector
//! - (feature-gated) helpers that decode image files with the `image` crate
//!   and feed them to the detector, one by one or as a sequence
//! - (feature `cli`) the `ringmark` binary, which runs a JSON-configured
//!   image sequence and writes a JSON report plus optional overlays
//!
//! ## Quickstart
//!
//! ```no_run
//! use ringmark::detect;
//! use ringmark::RingDetectorParams;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let img = detect::load_rgb("frame.png")?;
//! let det = detect::detect_image(&img, RingDetectorParams::default())?;
//! if det.valid {
//!     println!("marker at {:?}, semi-axes {:?}", det.center, det.semi_axes);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `ringmark::core`: frame views, the `FrameSource` trait, moment math,
//!   synthetic markers, logging setup.
//! - `ringmark::detector`: segmentation, ring matching, tracking and
//!   threshold adaptation.
//! - `ringmark::detect` (feature `image`): helpers over `image::RgbImage`.

pub use ringmark_core as core;
pub use ringmark_detector as detector;

pub use ringmark_core::{FrameSource, RgbFrame, RgbFrameView};
pub use ringmark_detector::{
    MarkerDetection, RingDetectError, RingDetector, RingDetectorParams, RingPolarity,
    TrackingPhase,
};

#[cfg(feature = "image")]
pub mod detect;
