//! Boolean annotation masks and their conversion to and from overlay layers.
//!
//! Annotations travel as single-plane boolean masks; the compositor works on full-colour
//! overlay layers. A set mask pixel becomes a pixel of the annotation colour, everything else
//! stays transparent.

use crate::{
    foundation::core::{BoundingBox, PixelBuffer, Shape, check_color},
    foundation::error::{StackError, StackResult},
    stack::layer::Layer,
};

/// Sample value used for set mask pixels when no colour is given.
pub const MASK_VALUE: u8 = 255;

/// Row-major boolean mask.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mask {
    height: usize,
    width: usize,
    bits: Vec<bool>,
}

impl Mask {
    /// Empty (all unset) mask.
    pub fn new(height: usize, width: usize) -> Self {
        Self {
            height,
            width,
            bits: vec![false; height * width],
        }
    }

    /// Wrap existing bits; `bits.len()` must equal `height * width`.
    pub fn from_bits(height: usize, width: usize, bits: Vec<bool>) -> StackResult<Self> {
        if bits.len() != height * width {
            return Err(StackError::shape(format!(
                "mask of {} bits does not match {height}x{width}",
                bits.len()
            )));
        }
        Ok(Self {
            height,
            width,
            bits,
        })
    }

    /// Decode C-order bytes, one per pixel; any non-zero byte is set.
    pub fn from_bytes(height: usize, width: usize, bytes: &[u8]) -> StackResult<Self> {
        Self::from_bits(height, width, bytes.iter().map(|&b| b != 0).collect())
    }

    /// Encode as C-order bytes, `1` for set and `0` for unset.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.bits.iter().map(|&b| u8::from(b)).collect()
    }

    /// Rows.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Bit at `(row, col)`; `false` outside the mask.
    pub fn get(&self, row: usize, col: usize) -> bool {
        row < self.height && col < self.width && self.bits[row * self.width + col]
    }

    /// Set or clear the bit at `(row, col)`; out-of-range coordinates are ignored.
    pub fn set(&mut self, row: usize, col: usize, value: bool) {
        if row < self.height && col < self.width {
            self.bits[row * self.width + col] = value;
        }
    }

    /// Number of set pixels.
    pub fn count(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    /// Tight box around the set pixels, [`BoundingBox::EMPTY`] when none are set.
    pub fn bounds(&self) -> BoundingBox {
        let mut rows = (usize::MAX, 0);
        let mut cols = (usize::MAX, 0);
        for (i, _) in self.bits.iter().enumerate().filter(|(_, b)| **b) {
            let (r, c) = (i / self.width, i % self.width);
            rows = (rows.0.min(r), rows.1.max(r + 1));
            cols = (cols.0.min(c), cols.1.max(c + 1));
        }
        if rows.0 == usize::MAX {
            return BoundingBox::EMPTY;
        }
        BoundingBox {
            row0: rows.0,
            col0: cols.0,
            row1: rows.1,
            col1: cols.1,
        }
    }
}

/// Overlay layer painting `color` (or [`MASK_VALUE`] on every channel) where `mask` is set.
///
/// The layer's bounding box is the mask's tight bounds.
pub fn mask_to_layer(mask: &Mask, channels: usize, color: Option<&[u8]>) -> StackResult<Layer> {
    let shape = Shape::new(mask.height, mask.width, channels)?;
    let white = vec![MASK_VALUE; channels];
    let color = color.unwrap_or(&white);
    check_color(shape, color)?;
    if color.iter().all(|&v| v == 0) {
        return Err(StackError::validation(
            "mask color must have a non-zero channel to be visible",
        ));
    }

    let mut data = vec![0u8; shape.sample_count()];
    for (px, _) in data
        .chunks_exact_mut(channels)
        .zip(&mask.bits)
        .filter(|(_, set)| **set)
    {
        px.copy_from_slice(color);
    }
    Ok(Layer::new(
        PixelBuffer::from_samples(shape, data),
        mask.bounds(),
    ))
}

/// Mask of every pixel with at least one non-zero channel.
pub fn layer_to_mask(pixels: &PixelBuffer) -> Mask {
    let shape = pixels.shape();
    let bits = pixels
        .data()
        .chunks_exact(shape.channels)
        .map(|px| px.iter().any(|&v| v != 0))
        .collect();
    Mask {
        height: shape.height,
        width: shape.width,
        bits,
    }
}

#[cfg(test)]
#[path = "../tests/unit/mask.rs"]
mod tests;
