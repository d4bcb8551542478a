//! Core types for concentric-ring marker detection.
//!
//! This crate holds the pieces that do not depend on the detector itself:
//! packed RGB frame views, the [`FrameSource`] trait implemented by frame
//! acquisition code, second-moment shape math, and synthetic marker rendering.

mod image;
mod logger;
mod moments;
pub mod synthetic;

pub use image::{FrameError, FrameSource, RgbFrame, RgbFrameView, CHANNELS, MAX_CHANNEL_SUM};
pub use moments::{centroid, covariance, PrincipalAxes};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, parse_level};
