//! Per-pixel label buffer shared by all flood-fills of a frame.
//!
//! Labels are stored packed as `i32` for cache locality. The encoding is a
//! closed set, see [`Label::decode`]:
//!
//! | raw     | meaning                                   |
//! |---------|-------------------------------------------|
//! | `0`     | not classified yet                        |
//! | `-1`    | light (channel sum above threshold)       |
//! | `-2`    | dark (channel sum at or below threshold)  |
//! | `-1000` | one-pixel image border sentinel           |
//! | `k > 0` | member of the region with ordinal `k - 1` |

use ringmark_core::RgbFrameView;

use crate::segment::BoundingBox;

pub(crate) const UNCLASSIFIED: i32 = 0;
pub(crate) const BORDER: i32 = -1000;

/// Binary intensity class of a pixel relative to the current threshold.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelClass {
    Light,
    Dark,
}

impl PixelClass {
    #[inline]
    pub fn of_sum(channel_sum: u32, threshold: u32) -> Self {
        if channel_sum > threshold {
            PixelClass::Light
        } else {
            PixelClass::Dark
        }
    }

    #[inline]
    pub(crate) const fn code(self) -> i32 {
        match self {
            PixelClass::Light => -1,
            PixelClass::Dark => -2,
        }
    }

    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            PixelClass::Light => PixelClass::Dark,
            PixelClass::Dark => PixelClass::Light,
        }
    }
}

/// Decoded view of one packed label.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Label {
    Unclassified,
    Classified(PixelClass),
    Border,
    /// Member of the region with this ordinal.
    Region(usize),
}

impl Label {
    /// Decode a raw label. Values outside the encoding table are treated as border.
    pub fn decode(raw: i32) -> Self {
        match raw {
            UNCLASSIFIED => Label::Unclassified,
            -1 => Label::Classified(PixelClass::Light),
            -2 => Label::Classified(PixelClass::Dark),
            k if k > 0 => Label::Region(k as usize - 1),
            _ => Label::Border,
        }
    }

    pub fn encode(self) -> i32 {
        match self {
            Label::Unclassified => UNCLASSIFIED,
            Label::Classified(class) => class.code(),
            Label::Border => BORDER,
            Label::Region(ordinal) => ordinal as i32 + 1,
        }
    }
}

/// Label buffer sized once for a fixed frame geometry.
pub(crate) struct LabelBuffer {
    width: usize,
    height: usize,
    labels: Vec<i32>,
}

impl LabelBuffer {
    pub(crate) fn new(width: usize, height: usize) -> Self {
        let mut buf = Self {
            width,
            height,
            labels: vec![UNCLASSIFIED; width * height],
        };
        buf.reset_full();
        buf
    }

    #[inline]
    pub(crate) fn width(&self) -> usize {
        self.width
    }

    /// Forget every classification and rewrite the border sentinels.
    pub(crate) fn reset_full(&mut self) {
        self.labels.fill(UNCLASSIFIED);
        let (w, h) = (self.width, self.height);
        let last_row = (h - 1) * w;
        for x in 0..w {
            self.labels[x] = BORDER;
            self.labels[last_row + x] = BORDER;
        }
        for y in 0..h {
            self.labels[y * w] = BORDER;
            self.labels[y * w + w - 1] = BORDER;
        }
    }

    /// Clear only `bbox` grown by `margin`, clamped so the border stays intact.
    ///
    /// Labels outside the window keep their previous-frame values.
    pub(crate) fn reset_window(&mut self, bbox: &BoundingBox, margin: usize) {
        let (w, h) = (self.width, self.height);
        let x0 = bbox.min_x.saturating_sub(margin).max(1);
        let x1 = (bbox.max_x + margin).min(w - 2);
        let y0 = bbox.min_y.saturating_sub(margin).max(1);
        let y1 = (bbox.max_y + margin).min(h - 2);
        if x0 > x1 || y0 > y1 {
            return;
        }
        for y in y0..=y1 {
            let row = y * w;
            self.labels[row + x0..=row + x1].fill(UNCLASSIFIED);
        }
    }

    #[inline]
    pub(crate) fn raw(&self, idx: usize) -> i32 {
        self.labels[idx]
    }

    #[inline]
    pub(crate) fn set_raw(&mut self, idx: usize, raw: i32) {
        self.labels[idx] = raw;
    }

    #[inline]
    pub(crate) fn get(&self, idx: usize) -> Label {
        Label::decode(self.labels[idx])
    }

    /// Classify `idx` on first visit and return its raw label.
    ///
    /// Already classified, labelled or border pixels are returned unchanged.
    #[inline]
    pub(crate) fn classify(&mut self, idx: usize, frame: &RgbFrameView<'_>, threshold: u32) -> i32 {
        let raw = self.labels[idx];
        if raw != UNCLASSIFIED {
            return raw;
        }
        let code = PixelClass::of_sum(frame.channel_sum(idx), threshold).code();
        self.labels[idx] = code;
        code
    }
}
