use ringmark_core::FrameError;

/// Errors returned by the ring detector.
///
/// A frame without a marker is not an error; it yields an invalid
/// [`crate::MarkerDetection`].
#[derive(thiserror::Error, Debug)]
pub enum RingDetectError {
    #[error("frame too small for detection (width={width}, height={height}, need at least 3x3)")]
    FrameTooSmall { width: usize, height: usize },

    #[error("frame size {got_width}x{got_height} does not match detector size {width}x{height}")]
    FrameSizeMismatch {
        width: usize,
        height: usize,
        got_width: usize,
        got_height: usize,
    },

    #[error("diameter ratio must be in (0, 1), got {0}")]
    InvalidDiameterRatio(f32),

    #[error("{name} must be finite and non-negative, got {value}")]
    InvalidTolerance { name: &'static str, value: f32 },

    #[error("max_regions must be at least 2, got {0}")]
    InvalidRegionCap(usize),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("frame source failed")]
    Source(#[source] Box<dyn std::error::Error + Send + Sync>),
}
