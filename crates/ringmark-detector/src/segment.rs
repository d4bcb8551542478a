//! Breadth-first flood-fill segmentation over the label buffer.

use std::ops::Range;

use nalgebra::Point2;
use ringmark_core::RgbFrameView;
use serde::{Deserialize, Serialize};

use crate::label::{Label, LabelBuffer, PixelClass};

/// Inclusive pixel bounding box.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: usize,
    pub max_x: usize,
    pub min_y: usize,
    pub max_y: usize,
}

impl BoundingBox {
    #[inline]
    fn at(x: usize, y: usize) -> Self {
        Self {
            min_x: x,
            max_x: x,
            min_y: y,
            max_y: y,
        }
    }

    #[inline]
    fn include(&mut self, x: usize, y: usize) {
        self.min_x = self.min_x.min(x);
        self.max_x = self.max_x.max(x);
        self.min_y = self.min_y.min(y);
        self.max_y = self.max_y.max(y);
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.max_x - self.min_x + 1
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.max_y - self.min_y + 1
    }

    /// Integer midpoint of the box.
    #[inline]
    pub fn center(&self) -> (usize, usize) {
        ((self.min_x + self.max_x) / 2, (self.min_y + self.max_y) / 2)
    }
}

/// One connected region produced by [`SegmentationWorkspace::flood_fill`].
#[derive(Clone, Debug)]
pub struct Region {
    pub ordinal: usize,
    pub class: PixelClass,
    pub bbox: BoundingBox,
    /// Pixel count.
    pub size: usize,
    /// Bounding-box center; replaced by the true centroid after a shape fit.
    pub center: Point2<f32>,
    /// `bbox area * expected area ratio / size`, ~1.0 for the expected shape.
    pub roundness: f32,
    /// Mean channel sum; only filled in for round regions.
    pub mean: u32,
    /// `size > min_pixels`; `center` and `roundness` are meaningless otherwise.
    pub valid: bool,
    /// Window of the workspace queue holding this region's pixel indices.
    pub pixels: Range<usize>,
}

impl Region {
    #[inline]
    pub fn is_round(&self, tolerance: f32) -> bool {
        self.valid && (self.roundness - 1.0).abs() < tolerance
    }
}

/// Parameters of one flood-fill call.
#[derive(Clone, Copy, Debug)]
pub(crate) struct FillSpec {
    pub threshold: u32,
    pub area_ratio: f32,
    pub min_pixels: usize,
}

/// Label buffer plus the reusable pixel queue.
///
/// Queue windows of the current candidate stay readable until
/// [`SegmentationWorkspace::begin_candidate`] is called again, so the shape
/// fit can walk the outer and inner pixels after both fills completed.
pub(crate) struct SegmentationWorkspace {
    pub(crate) labels: LabelBuffer,
    queue: Vec<usize>,
    queue_end: usize,
}

impl SegmentationWorkspace {
    pub(crate) fn new(width: usize, height: usize) -> Self {
        Self {
            labels: LabelBuffer::new(width, height),
            queue: vec![0; width * height],
            queue_end: 0,
        }
    }

    /// Drop the queue contents of the previous candidate.
    #[inline]
    pub(crate) fn begin_candidate(&mut self) {
        self.queue_end = 0;
    }

    #[inline]
    pub(crate) fn pixels(&self, window: &Range<usize>) -> &[usize] {
        &self.queue[window.clone()]
    }

    /// Flood-fill the 4-connected region containing `seed`.
    ///
    /// `seed` must already be classified as `class` and must not lie on the
    /// border. Every visited pixel is relabelled with `ordinal`.
    pub(crate) fn flood_fill(
        &mut self,
        frame: &RgbFrameView<'_>,
        seed: usize,
        class: PixelClass,
        ordinal: usize,
        spec: &FillSpec,
    ) -> Region {
        let width = self.labels.width();
        let class_code = class.code();
        debug_assert_eq!(self.labels.get(seed), Label::Classified(class));
        let region_code = Label::Region(ordinal).encode();

        let start = self.queue_end;
        self.labels.set_raw(seed, region_code);
        self.queue[self.queue_end] = seed;
        self.queue_end += 1;
        let mut bbox = BoundingBox::at(seed % width, seed / width);

        let mut head = start;
        while head < self.queue_end {
            let pos = self.queue[head];
            head += 1;
            // Border sentinels guarantee every neighbor index is in range.
            for next in [pos + 1, pos - 1, pos - width, pos + width] {
                if self.labels.classify(next, frame, spec.threshold) == class_code {
                    self.labels.set_raw(next, region_code);
                    self.queue[self.queue_end] = next;
                    self.queue_end += 1;
                    bbox.include(next % width, next / width);
                }
            }
        }

        let size = self.queue_end - start;
        let mut region = Region {
            ordinal,
            class,
            bbox,
            size,
            center: Point2::origin(),
            roundness: 0.0,
            mean: 0,
            valid: size > spec.min_pixels,
            pixels: start..self.queue_end,
        };
        if region.valid {
            let (cx, cy) = bbox.center();
            region.center = Point2::new(cx as f32, cy as f32);
            region.roundness =
                (bbox.width() * bbox.height()) as f32 * spec.area_ratio / size as f32;
        }
        region
    }

    /// Mean channel sum over the pixels of `region`.
    pub(crate) fn mean_brightness(&self, frame: &RgbFrameView<'_>, region: &Region) -> u32 {
        if region.size == 0 {
            return 0;
        }
        let total: u64 = self
            .pixels(&region.pixels)
            .iter()
            .map(|&idx| frame.channel_sum(idx) as u64)
            .sum();
        (total / region.size as u64) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringmark_core::RgbFrame;

    const SPEC: FillSpec = FillSpec {
        threshold: 384,
        area_ratio: 1.0,
        min_pixels: 3,
    };

    fn frame_with_dark_rect(x0: usize, y0: usize, x1: usize, y1: usize) -> RgbFrame {
        let mut frame = RgbFrame::filled(12, 10, [255, 255, 255]);
        for y in y0..=y1 {
            for x in x0..=x1 {
                frame.set_pixel(x, y, [0, 0, 0]);
            }
        }
        frame
    }

    #[test]
    fn fills_rectangle_with_exact_bbox_and_size() {
        let frame = frame_with_dark_rect(2, 3, 6, 5);
        let view = frame.view();
        let mut ws = SegmentationWorkspace::new(12, 10);
        let seed = 3 * 12 + 2;
        assert_eq!(ws.labels.classify(seed, &view, SPEC.threshold), -2);

        ws.begin_candidate();
        let region = ws.flood_fill(&view, seed, PixelClass::Dark, 0, &SPEC);
        assert!(region.valid);
        assert_eq!(region.class, PixelClass::Dark);
        assert_eq!(region.size, 15);
        assert_eq!(
            region.bbox,
            BoundingBox {
                min_x: 2,
                max_x: 6,
                min_y: 3,
                max_y: 5
            }
        );
        assert_eq!(region.center, Point2::new(4.0, 4.0));
        assert!((region.roundness - 1.0).abs() < 1e-6);
        assert_eq!(ws.labels.get(4 * 12 + 4), Label::Region(0));
        assert_eq!(ws.labels.get(4 * 12 + 7), Label::Classified(PixelClass::Light));
        assert_eq!(ws.mean_brightness(&view, &region), 0);
    }

    #[test]
    fn small_region_is_not_valid() {
        let frame = frame_with_dark_rect(4, 4, 5, 4);
        let view = frame.view();
        let mut ws = SegmentationWorkspace::new(12, 10);
        let seed = 4 * 12 + 4;
        ws.labels.classify(seed, &view, SPEC.threshold);
        ws.begin_candidate();
        let region = ws.flood_fill(&view, seed, PixelClass::Dark, 0, &SPEC);
        assert_eq!(region.size, 2);
        assert!(!region.valid);
        assert!(!region.is_round(10.0));
    }

    #[test]
    fn consecutive_fills_share_the_queue() {
        let frame = frame_with_dark_rect(2, 2, 8, 7);
        let view = frame.view();
        let mut ws = SegmentationWorkspace::new(12, 10);

        let dark_seed = 2 * 12 + 2;
        ws.labels.classify(dark_seed, &view, SPEC.threshold);
        ws.begin_candidate();
        let dark = ws.flood_fill(&view, dark_seed, PixelClass::Dark, 0, &SPEC);

        let light_seed = 12 + 1;
        ws.labels.classify(light_seed, &view, SPEC.threshold);
        let light = ws.flood_fill(&view, light_seed, PixelClass::Light, 1, &SPEC);

        assert_eq!(dark.pixels, 0..42);
        assert_eq!(light.pixels.start, 42);
        // Interior light ring between the border and the dark block.
        assert_eq!(light.size, 10 * 8 - 42);
        assert!(ws.pixels(&light.pixels).iter().all(|&idx| {
            let (x, y) = (idx % 12, idx / 12);
            !(2..=8).contains(&x) || !(2..=7).contains(&y)
        }));
    }
}
