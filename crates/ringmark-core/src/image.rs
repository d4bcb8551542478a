/// Number of interleaved samples per pixel.
pub const CHANNELS: usize = 3;

/// Largest possible channel sum of one pixel (`3 * 255`).
pub const MAX_CHANNEL_SUM: u32 = 3 * 255;

/// Errors raised when wrapping a raw buffer as a frame.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("invalid RGB buffer length (expected {expected} bytes, got {got})")]
    InvalidBuffer { expected: usize, got: usize },

    #[error("invalid frame dimensions (width={width}, height={height})")]
    InvalidDimensions { width: usize, height: usize },
}

/// Borrowed RGB frame, three interleaved 8-bit samples per pixel.
#[derive(Clone, Copy, Debug)]
pub struct RgbFrameView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h*3
}

impl<'a> RgbFrameView<'a> {
    /// Wrap a packed row-major RGB buffer, checking its length.
    pub fn new(width: usize, height: usize, data: &'a [u8]) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::InvalidDimensions { width, height });
        }
        let expected = width * height * CHANNELS;
        if data.len() != expected {
            return Err(FrameError::InvalidBuffer {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of the three channel samples at linear pixel index `idx`.
    #[inline]
    pub fn channel_sum(&self, idx: usize) -> u32 {
        let p = &self.data[idx * CHANNELS..idx * CHANNELS + CHANNELS];
        p[0] as u32 + p[1] as u32 + p[2] as u32
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let o = (y * self.width + x) * CHANNELS;
        [self.data[o], self.data[o + 1], self.data[o + 2]]
    }
}

/// Owned RGB frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgbFrame {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl RgbFrame {
    /// Frame of the given size with every pixel set to `rgb`.
    pub fn filled(width: usize, height: usize, rgb: [u8; 3]) -> Self {
        let mut data = Vec::with_capacity(width * height * CHANNELS);
        for _ in 0..width * height {
            data.extend_from_slice(&rgb);
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Result<Self, FrameError> {
        RgbFrameView::new(width, height, &data)?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn view(&self) -> RgbFrameView<'_> {
        RgbFrameView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn set_pixel(&mut self, x: usize, y: usize, rgb: [u8; 3]) {
        let o = (y * self.width + x) * CHANNELS;
        self.data[o..o + CHANNELS].copy_from_slice(&rgb);
    }
}

/// Synchronous producer of fixed-size frames.
///
/// Each call to [`FrameSource::capture`] hands out the next frame; the view
/// stays valid until the following call.
pub trait FrameSource {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Frame dimensions `(width, height)`; constant for the source lifetime.
    fn frame_size(&self) -> (usize, usize);

    fn capture(&mut self) -> Result<RgbFrameView<'_>, Self::Error>;
}
