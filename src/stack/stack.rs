use std::sync::atomic::{AtomicU64, Ordering};

use crate::{
    foundation::core::{BoundingBox, PixelBuffer, Shape},
    foundation::error::{StackError, StackResult},
    stack::layer::{Layer, LayerRef},
};

/// Growth controls for [`LayerStack`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct StackOpts {
    /// Layers (base included) stored before the first reallocation. Raised to at least 1.
    pub initial_capacity: usize,
    /// Capacity multiplier applied when the slab is full. Must be >= 2.
    pub growth_factor: usize,
}

impl Default for StackOpts {
    fn default() -> Self {
        Self {
            initial_capacity: 8,
            growth_factor: 4,
        }
    }
}

static NEXT_STACK_ID: AtomicU64 = AtomicU64::new(1);

fn next_stack_id() -> u64 {
    NEXT_STACK_ID.fetch_add(1, Ordering::Relaxed)
}

/// Append-only stack of equally shaped layers over a permanent base image.
///
/// All layer samples live in one contiguous slab, one layer after another, so growth is a
/// single copy of everything pushed so far and layer `i` always occupies
/// `[i * n, (i + 1) * n)` for `n = shape.sample_count()`.
///
/// Mutation (`push`, `set_visible`) takes `&mut self`, so a composite borrowing the stack can
/// never overlap with it.
#[derive(Debug)]
pub struct LayerStack {
    id: u64,
    shape: Shape,
    growth_factor: usize,
    capacity: usize,
    slab: Vec<u8>,
    bounds: Vec<BoundingBox>,
    visible: Vec<bool>,
    reallocations: usize,
}

impl LayerStack {
    /// Create a stack whose layer 0 is `base`.
    pub fn new(base: PixelBuffer, opts: StackOpts) -> StackResult<Self> {
        if opts.growth_factor < 2 {
            return Err(StackError::validation("stack growth_factor must be >= 2"));
        }
        let shape = base.shape();
        shape.validate()?;
        let capacity = opts.initial_capacity.max(1);
        let mut slab = reserve(slab_len(shape, capacity)?, "layer slab")?;
        slab.extend_from_slice(base.data());

        let mut bounds = reserve(capacity, "layer bounds")?;
        bounds.push(BoundingBox::full(shape));
        let mut visible = reserve(capacity, "layer visibility")?;
        visible.push(true);

        Ok(Self {
            id: next_stack_id(),
            shape,
            growth_factor: opts.growth_factor,
            capacity,
            slab,
            bounds,
            visible,
            reallocations: 0,
        })
    }

    /// Shape shared by every layer.
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Number of layers, base included (always >= 1).
    pub fn layer_count(&self) -> usize {
        self.bounds.len()
    }

    /// Number of overlay layers (`layer_count() - 1`).
    pub fn overlay_count(&self) -> usize {
        self.bounds.len() - 1
    }

    /// Layers that fit before the next reallocation.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// How many times the slab has been reallocated.
    pub fn reallocations(&self) -> usize {
        self.reallocations
    }

    /// Append an overlay and return its index.
    ///
    /// Rejects layers whose shape differs from the base or whose box leaves the buffer.
    /// A full slab is grown by `growth_factor`; existing layer data is copied unchanged.
    pub fn push(&mut self, layer: Layer) -> StackResult<usize> {
        if layer.pixels.shape() != self.shape {
            return Err(StackError::shape(format!(
                "layer shape {} does not match stack shape {}",
                layer.pixels.shape(),
                self.shape
            )));
        }
        layer.bbox.check_within(self.shape)?;
        if self.layer_count() >= u32::MAX as usize {
            return Err(StackError::validation("layer stack is limited to u32::MAX layers"));
        }

        if self.layer_count() == self.capacity {
            self.grow()?;
        }

        let index = self.layer_count();
        self.slab.extend_from_slice(layer.pixels.data());
        self.bounds.push(layer.bbox);
        self.visible.push(layer.visible);
        Ok(index)
    }

    // Leaves the stack untouched when any reservation fails.
    fn grow(&mut self) -> StackResult<()> {
        let new_capacity = self
            .capacity
            .checked_mul(self.growth_factor)
            .ok_or_else(|| {
                StackError::capacity(format!(
                    "{} layers x growth factor {} overflows",
                    self.capacity, self.growth_factor
                ))
            })?;
        let mut slab = reserve(slab_len(self.shape, new_capacity)?, "layer slab")?;
        self.bounds
            .try_reserve_exact(new_capacity - self.bounds.len())
            .map_err(|e| StackError::capacity(format!("layer bounds: {e}")))?;
        self.visible
            .try_reserve_exact(new_capacity - self.visible.len())
            .map_err(|e| StackError::capacity(format!("layer visibility: {e}")))?;
        slab.extend_from_slice(&self.slab);
        self.slab = slab;
        tracing::debug!(
            from = self.capacity,
            to = new_capacity,
            layers = self.layer_count(),
            "layer stack grown"
        );
        self.capacity = new_capacity;
        self.reallocations += 1;
        Ok(())
    }

    /// View of layer `index`.
    pub fn layer_at(&self, index: usize) -> StackResult<LayerRef<'_>> {
        self.check_index(index)?;
        Ok(LayerRef {
            index,
            samples: self.samples(index),
            bbox: self.bounds[index],
            visible: self.visible[index],
        })
    }

    /// Samples of the base layer.
    pub fn base(&self) -> &[u8] {
        self.samples(0)
    }

    /// Copy of the base layer.
    pub fn base_buffer(&self) -> PixelBuffer {
        PixelBuffer::from_samples(self.shape, self.base().to_vec())
    }

    /// Set the visibility flag of layer `index`.
    ///
    /// Layer 0 accepts the flag but always contributes to composites as the fallback.
    pub fn set_visible(&mut self, index: usize, visible: bool) -> StackResult<()> {
        self.check_index(index)?;
        self.visible[index] = visible;
        Ok(())
    }

    /// Visibility flag of layer `index`.
    pub fn is_visible(&self, index: usize) -> StackResult<bool> {
        self.check_index(index)?;
        Ok(self.visible[index])
    }

    /// Visibility flags of every layer, base included.
    pub fn visibility(&self) -> &[bool] {
        &self.visible
    }

    /// Bounding boxes of every layer; entry 0 covers the whole base.
    pub fn bounds(&self) -> &[BoundingBox] {
        &self.bounds
    }

    /// Bounding boxes of the overlays only.
    pub fn overlay_bounds(&self) -> &[BoundingBox] {
        &self.bounds[1..]
    }

    /// Process-unique identity; clones get a fresh one.
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn samples(&self, index: usize) -> &[u8] {
        let n = self.shape.sample_count();
        &self.slab[index * n..(index + 1) * n]
    }

    fn check_index(&self, index: usize) -> StackResult<()> {
        if index >= self.layer_count() {
            return Err(StackError::invalid_index(index, self.layer_count()));
        }
        Ok(())
    }
}

impl Clone for LayerStack {
    fn clone(&self) -> Self {
        Self {
            id: next_stack_id(),
            shape: self.shape,
            growth_factor: self.growth_factor,
            capacity: self.capacity,
            slab: self.slab.clone(),
            bounds: self.bounds.clone(),
            visible: self.visible.clone(),
            reallocations: self.reallocations,
        }
    }
}

fn slab_len(shape: Shape, layers: usize) -> StackResult<usize> {
    layers.checked_mul(shape.sample_count()).ok_or_else(|| {
        StackError::capacity(format!("{layers} layers of shape {shape} overflow the slab size"))
    })
}

fn reserve<T>(len: usize, what: &str) -> StackResult<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|e| StackError::capacity(format!("{what} of {len}: {e}")))?;
    Ok(v)
}

#[cfg(test)]
#[path = "../../tests/unit/stack/stack.rs"]
mod tests;
