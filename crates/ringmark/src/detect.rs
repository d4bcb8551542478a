use std::path::{Path, PathBuf};

use ::image::{ImageReader, RgbImage};

use crate::core::{FrameError, FrameSource, RgbFrame, RgbFrameView};
use crate::detector::{MarkerDetection, RingDetectError, RingDetector, RingDetectorParams};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Errors produced by the high-level facade helpers.
#[derive(thiserror::Error, Debug)]
pub enum DetectError {
    #[error("failed to read image {path}")]
    Image {
        path: PathBuf,
        #[source]
        source: ::image::ImageError,
    },

    #[error("image {path} is {got_width}x{got_height}, sequence frames are {width}x{height}")]
    SizeMismatch {
        path: PathBuf,
        width: usize,
        height: usize,
        got_width: usize,
        got_height: usize,
    },

    #[error("image sequence is empty")]
    EmptySequence,

    #[error("image sequence exhausted")]
    Exhausted,

    #[error(transparent)]
    Detect(#[from] RingDetectError),
}

/// Borrow an `image::RgbImage` as the lightweight frame view.
pub fn rgb_view(img: &RgbImage) -> RgbFrameView<'_> {
    RgbFrameView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Copy an `image::RgbImage` into an owned frame.
///
/// Fails only for zero-sized images.
pub fn rgb_frame(img: &RgbImage) -> Result<RgbFrame, FrameError> {
    RgbFrame::from_raw(
        img.width() as usize,
        img.height() as usize,
        img.as_raw().clone(),
    )
}

/// Convert a frame back for saving; `None` if its dimensions overflow `u32`.
pub fn frame_to_image(frame: &RgbFrame) -> Option<RgbImage> {
    let width = u32::try_from(frame.width).ok()?;
    let height = u32::try_from(frame.height).ok()?;
    RgbImage::from_raw(width, height, frame.data.clone())
}

/// Decode any supported image file to 8-bit RGB.
pub fn load_rgb(path: impl AsRef<Path>) -> Result<RgbImage, DetectError> {
    let path = path.as_ref();
    let wrap = |source| DetectError::Image {
        path: path.to_path_buf(),
        source,
    };
    let reader = ImageReader::open(path).map_err(|e| wrap(::image::ImageError::IoError(e)))?;
    Ok(reader.decode().map_err(wrap)?.to_rgb8())
}

/// Run a fresh detector on a single image.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(img, params), fields(width = img.width(), height = img.height()))
)]
pub fn detect_image(
    img: &RgbImage,
    params: RingDetectorParams,
) -> Result<MarkerDetection, DetectError> {
    let view = rgb_view(img);
    let mut detector = RingDetector::new(view.width, view.height, params)?;
    Ok(detector.detect(&view)?)
}

/// Frame source that decodes image files in order.
///
/// The frame size is fixed by the first image; later images of another size
/// fail to capture without stopping the sequence.
pub struct ImageSequence {
    paths: Vec<PathBuf>,
    next: usize,
    width: usize,
    height: usize,
    current: Option<RgbImage>,
    preloaded: Option<RgbImage>,
}

impl ImageSequence {
    pub fn open<I, P>(paths: I) -> Result<Self, DetectError>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let paths: Vec<PathBuf> = paths.into_iter().map(Into::into).collect();
        let first = paths.first().ok_or(DetectError::EmptySequence)?;
        let img = load_rgb(first)?;
        Ok(Self {
            width: img.width() as usize,
            height: img.height() as usize,
            preloaded: Some(img),
            current: None,
            next: 0,
            paths,
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Path the next [`FrameSource::capture`] call will read.
    pub fn next_path(&self) -> Option<&Path> {
        self.paths.get(self.next).map(PathBuf::as_path)
    }

    /// Last successfully captured image.
    pub fn current(&self) -> Option<&RgbImage> {
        self.current.as_ref()
    }
}

impl FrameSource for ImageSequence {
    type Error = DetectError;

    fn frame_size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn capture(&mut self) -> Result<RgbFrameView<'_>, DetectError> {
        let idx = self.next;
        let path = self.paths.get(idx).ok_or(DetectError::Exhausted)?;
        // Unreadable files are skipped, not retried.
        self.next += 1;
        let img = match self.preloaded.take() {
            Some(img) => img,
            None => load_rgb(path)?,
        };

        let (got_width, got_height) = (img.width() as usize, img.height() as usize);
        if (got_width, got_height) != (self.width, self.height) {
            return Err(DetectError::SizeMismatch {
                path: path.clone(),
                width: self.width,
                height: self.height,
                got_width,
                got_height,
            });
        }
        Ok(rgb_view(self.current.insert(img)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::synthetic::{render_ring_marker, RingMarkerSpec};

    fn save(frame: &RgbFrame, path: &Path) {
        frame_to_image(frame).unwrap().save(path).unwrap();
    }

    #[test]
    fn single_image_round_trips_through_png() {
        let spec = RingMarkerSpec::dark_ring([40.0, 30.0].into(), 16.0, 5.0 / 14.0);
        let frame = render_ring_marker(80, 60, [240, 240, 240], &spec);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ring.png");
        save(&frame, &path);

        let img = load_rgb(&path).unwrap();
        assert_eq!(rgb_frame(&img).unwrap(), frame);
        assert!(rgb_frame(&RgbImage::new(0, 4)).is_err());
        let det = detect_image(&img, RingDetectorParams::default()).unwrap();
        assert!(det.valid);
    }

    #[test]
    fn sequence_rejects_mismatched_sizes_and_ends() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        save(&RgbFrame::filled(32, 24, [9, 9, 9]), &a);
        save(&RgbFrame::filled(16, 24, [9, 9, 9]), &b);

        let mut seq = ImageSequence::open([&a, &b, &a]).unwrap();
        assert_eq!(seq.frame_size(), (32, 24));
        assert_eq!(seq.len(), 3);
        assert!(seq.capture().is_ok());
        assert_eq!(seq.next_path(), Some(b.as_path()));
        assert!(matches!(
            seq.capture(),
            Err(DetectError::SizeMismatch { got_width: 16, .. })
        ));
        assert!(seq.capture().is_ok());
        assert!(matches!(seq.capture(), Err(DetectError::Exhausted)));
        assert!(matches!(
            ImageSequence::open(Vec::<PathBuf>::new()),
            Err(DetectError::EmptySequence)
        ));
    }
}
