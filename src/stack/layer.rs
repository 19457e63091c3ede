use crate::foundation::core::{BoundingBox, PixelBuffer};

/// An overlay produced by a drawing tool or generator, ready to be pushed onto a
/// [`LayerStack`](crate::LayerStack).
///
/// Zero samples are transparent. `bbox` is the region the layer actually paints; region-scoped
/// composites never read outside it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layer {
    /// Full-size layer pixels, same shape as the base.
    pub pixels: PixelBuffer,
    /// Painted region.
    pub bbox: BoundingBox,
    /// Initial visibility.
    pub visible: bool,
}

impl Layer {
    /// Visible layer with an explicit painted region.
    pub fn new(pixels: PixelBuffer, bbox: BoundingBox) -> Self {
        Self {
            pixels,
            bbox,
            visible: true,
        }
    }

    /// Visible layer whose region is the tight box around its non-zero pixels.
    pub fn from_pixels(pixels: PixelBuffer) -> Self {
        let bbox = pixels.nonzero_bounds();
        Self::new(pixels, bbox)
    }

    /// Same layer, pushed hidden.
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

/// Borrowed view of a layer stored in a stack.
#[derive(Clone, Copy, Debug)]
pub struct LayerRef<'a> {
    /// Creation-order index; `0` is the base.
    pub index: usize,
    /// Flattened samples.
    pub samples: &'a [u8],
    /// Painted region.
    pub bbox: BoundingBox,
    /// Current visibility flag.
    pub visible: bool,
}
