use std::ops::Range;

use crate::foundation::error::{StackError, StackResult};

/// Dimensions of every buffer in a stack: rows, columns and channels per pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Shape {
    /// Number of rows (image height).
    pub height: usize,
    /// Number of columns (image width).
    pub width: usize,
    /// Scalars per pixel.
    pub channels: usize,
}

impl Shape {
    /// Create a validated shape (see [`Shape::validate`]).
    pub fn new(height: usize, width: usize, channels: usize) -> StackResult<Self> {
        let shape = Self {
            height,
            width,
            channels,
        };
        shape.validate()?;
        Ok(shape)
    }

    /// Reject shapes no buffer can have: zero channels, or a sample count that overflows
    /// `usize`.
    ///
    /// Buffer, stack and cache constructors call this on every shape they accept.
    pub fn validate(self) -> StackResult<()> {
        if self.channels == 0 {
            return Err(StackError::validation("shape channels must be >= 1"));
        }
        self.height
            .checked_mul(self.width)
            .and_then(|n| n.checked_mul(self.channels))
            .ok_or_else(|| {
                StackError::validation(format!("shape {self} overflows the sample count"))
            })?;
        Ok(())
    }

    /// Number of pixels (`height * width`).
    pub fn pixel_count(self) -> usize {
        self.height * self.width
    }

    /// Number of scalars in a buffer of this shape (`height * width * channels`).
    ///
    /// Compositing and the history cache operate on this flattened sample index space.
    pub fn sample_count(self) -> usize {
        self.pixel_count() * self.channels
    }

    /// Scalars per row.
    pub fn row_len(self) -> usize {
        self.width * self.channels
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}x{}", self.height, self.width, self.channels)
    }
}

/// Row-major, channel-interleaved `u8` image.
///
/// For overlay layers a zero scalar means "transparent". For the base layer zero is an
/// ordinary colour value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    shape: Shape,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// All-zero buffer.
    pub fn new(shape: Shape) -> StackResult<Self> {
        shape.validate()?;
        Ok(Self {
            shape,
            data: vec![0; shape.sample_count()],
        })
    }

    /// Wrap existing samples; `data.len()` must equal `shape.sample_count()`.
    pub fn from_vec(shape: Shape, data: Vec<u8>) -> StackResult<Self> {
        shape.validate()?;
        if data.len() != shape.sample_count() {
            return Err(StackError::shape(format!(
                "buffer of {} samples does not match shape {shape} ({} samples)",
                data.len(),
                shape.sample_count()
            )));
        }
        Ok(Self { shape, data })
    }

    pub(crate) fn from_samples(shape: Shape, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), shape.sample_count());
        Self { shape, data }
    }

    /// Buffer with every pixel set to `color`.
    pub fn filled(shape: Shape, color: &[u8]) -> StackResult<Self> {
        shape.validate()?;
        check_color(shape, color)?;
        Ok(Self {
            shape,
            data: color.repeat(shape.pixel_count()),
        })
    }

    /// Buffer shape.
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Flattened samples.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable flattened samples.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Consume the buffer and return its samples.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Channel values of the pixel at `(row, col)`, or `None` outside the buffer.
    pub fn pixel(&self, row: usize, col: usize) -> Option<&[u8]> {
        if row >= self.shape.height || col >= self.shape.width {
            return None;
        }
        let start = (row * self.shape.width + col) * self.shape.channels;
        Some(&self.data[start..start + self.shape.channels])
    }

    /// Overwrite the pixel at `(row, col)`; out-of-range coordinates are ignored.
    pub fn set_pixel(&mut self, row: usize, col: usize, color: &[u8]) -> StackResult<()> {
        check_color(self.shape, color)?;
        if row >= self.shape.height || col >= self.shape.width {
            return Ok(());
        }
        let start = (row * self.shape.width + col) * self.shape.channels;
        self.data[start..start + self.shape.channels].copy_from_slice(color);
        Ok(())
    }

    /// Fill the box region with `color`, leaving the rest untouched.
    pub fn fill_box(&mut self, bbox: BoundingBox, color: &[u8]) -> StackResult<()> {
        check_color(self.shape, color)?;
        bbox.check_within(self.shape)?;
        let row_len = self.shape.row_len();
        let ch = self.shape.channels;
        for r in bbox.rows() {
            let row = &mut self.data[r * row_len..(r + 1) * row_len];
            for px in row[bbox.col0 * ch..bbox.col1 * ch].chunks_exact_mut(ch) {
                px.copy_from_slice(color);
            }
        }
        Ok(())
    }

    /// Tight bounding box around every pixel with a non-zero channel.
    ///
    /// Returns [`BoundingBox::EMPTY`] for an all-zero buffer.
    pub fn nonzero_bounds(&self) -> BoundingBox {
        let ch = self.shape.channels;
        let mut found = false;
        let (mut r0, mut c0, mut r1, mut c1) = (usize::MAX, usize::MAX, 0, 0);
        for (i, px) in self.data.chunks_exact(ch).enumerate() {
            if px.iter().all(|&v| v == 0) {
                continue;
            }
            let (r, c) = (i / self.shape.width, i % self.shape.width);
            found = true;
            r0 = r0.min(r);
            c0 = c0.min(c);
            r1 = r1.max(r + 1);
            c1 = c1.max(c + 1);
        }
        if !found {
            return BoundingBox::EMPTY;
        }
        BoundingBox {
            row0: r0,
            col0: c0,
            row1: r1,
            col1: c1,
        }
    }

    /// Convert an 8-bit RGB image into a 3-channel buffer.
    pub fn from_rgb8(img: &image::RgbImage) -> Self {
        let shape = Shape {
            height: img.height() as usize,
            width: img.width() as usize,
            channels: 3,
        };
        Self {
            shape,
            data: img.as_raw().clone(),
        }
    }

    /// Convert any decoded image into a 3-channel buffer.
    pub fn from_dynamic(img: image::DynamicImage) -> Self {
        Self::from_rgb8(&img.into_rgb8())
    }

    /// Convert to an 8-bit RGB image. Single-channel buffers are expanded to grey.
    pub fn to_rgb8(&self) -> StackResult<image::RgbImage> {
        let w = u32::try_from(self.shape.width)
            .map_err(|_| StackError::validation("buffer width exceeds u32"))?;
        let h = u32::try_from(self.shape.height)
            .map_err(|_| StackError::validation("buffer height exceeds u32"))?;
        let raw = match self.shape.channels {
            3 => self.data.clone(),
            1 => self.data.iter().flat_map(|&v| [v, v, v]).collect(),
            n => {
                return Err(StackError::shape(format!(
                    "rgb8 conversion expects 1 or 3 channels, got {n}"
                )));
            }
        };
        image::RgbImage::from_raw(w, h, raw)
            .ok_or_else(|| StackError::shape("rgb8 buffer length does not match dimensions"))
    }
}

pub(crate) fn check_color(shape: Shape, color: &[u8]) -> StackResult<()> {
    if color.len() != shape.channels {
        return Err(StackError::validation(format!(
            "color has {} channels, buffer expects {}",
            color.len(),
            shape.channels
        )));
    }
    Ok(())
}

/// Painted region of a layer: rows `[row0, row1)` and columns `[col0, col1)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct BoundingBox {
    /// First row (inclusive).
    pub row0: usize,
    /// First column (inclusive).
    pub col0: usize,
    /// Last row (exclusive).
    pub row1: usize,
    /// Last column (exclusive).
    pub col1: usize,
}

impl BoundingBox {
    /// The "no region" box.
    pub const EMPTY: Self = Self {
        row0: 0,
        col0: 0,
        row1: 0,
        col1: 0,
    };

    /// Create a validated box. Inverted extents are rejected, never clamped.
    pub fn new(row0: usize, col0: usize, row1: usize, col1: usize) -> StackResult<Self> {
        if row1 < row0 || col1 < col0 {
            return Err(StackError::degenerate(format!(
                "({row0}, {col0}, {row1}, {col1}) has inverted extents"
            )));
        }
        Ok(Self {
            row0,
            col0,
            row1,
            col1,
        })
    }

    /// Validate signed coordinates (as decoded from external metadata).
    pub fn from_signed(row0: i64, col0: i64, row1: i64, col1: i64) -> StackResult<Self> {
        let conv = |v: i64| {
            usize::try_from(v).map_err(|_| {
                StackError::degenerate(format!(
                    "({row0}, {col0}, {row1}, {col1}) has negative coordinates"
                ))
            })
        };
        Self::new(conv(row0)?, conv(col0)?, conv(row1)?, conv(col1)?)
    }

    /// Box covering a whole buffer of `shape`.
    pub fn full(shape: Shape) -> Self {
        Self {
            row0: 0,
            col0: 0,
            row1: shape.height,
            col1: shape.width,
        }
    }

    /// Rows covered.
    pub fn height(self) -> usize {
        self.row1.saturating_sub(self.row0)
    }

    /// Columns covered.
    pub fn width(self) -> usize {
        self.col1.saturating_sub(self.col0)
    }

    /// Pixel area.
    pub fn area(self) -> usize {
        self.height() * self.width()
    }

    /// `true` when the box covers no pixel. Region-scoped operations skip such boxes.
    pub fn is_empty(self) -> bool {
        self.area() == 0
    }

    /// Row range `[row0, row1)`.
    pub fn rows(self) -> Range<usize> {
        self.row0..self.row1
    }

    /// Column range `[col0, col1)`.
    pub fn cols(self) -> Range<usize> {
        self.col0..self.col1
    }

    /// `true` when `(row, col)` lies inside the box.
    pub fn contains(self, row: usize, col: usize) -> bool {
        self.rows().contains(&row) && self.cols().contains(&col)
    }

    /// Reject boxes that reach outside a buffer of `shape`.
    pub fn check_within(self, shape: Shape) -> StackResult<()> {
        if self.row1 < self.row0 || self.col1 < self.col0 {
            return Err(StackError::degenerate(format!(
                "({}, {}, {}, {}) has inverted extents",
                self.row0, self.col0, self.row1, self.col1
            )));
        }
        if self.row1 > shape.height || self.col1 > shape.width {
            return Err(StackError::out_of_bounds(format!(
                "({}, {}, {}, {}) exceeds buffer {shape}",
                self.row0, self.col0, self.row1, self.col1
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
