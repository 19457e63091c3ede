//! annostack is the layer compositing engine of an image annotation tool.
//!
//! A base image carries a growing stack of sparse overlay layers (masks, boxes, shapes drawn
//! by a user or produced by a generator). On every redraw the stack is flattened into a single
//! buffer under one rule: for each sample, the most recently pushed visible layer with a
//! non-zero value wins, and the base supplies the value where no overlay does.
//!
//! # Pieces
//!
//! - [`LayerStack`]: append-only, geometrically growing storage of equally shaped layers plus
//!   their bounding boxes and visibility flags.
//! - [`Compositor`]: runs one of the [`ComposeStrategy`] variants (full scan, history-cached,
//!   region-scoped, single-layer preview) over a shared worker pool.
//! - [`HistoryCache`]: per-sample owner hints that let the cached variant skip work between
//!   frames without ever diverging from the full scan.
//! - [`draw_boxes`]: hollow rectangle strokes for displaying layer boxes.
//! - [`Mask`] and [`AnnotationMeta`]: the annotation-side views of a layer.
//!
//! The crate does no IO: decoding, transport and persistence belong to the caller.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod compose;
mod foundation;
mod overlay;
mod stack;

/// Boolean annotation masks.
pub mod mask;
/// Annotation metadata records.
pub mod meta;

pub use crate::compose::cached::{ComposeStats, HistoryCache};
pub use crate::compose::compositor::{ComposeStrategy, Compositor, CompositorOpts};
pub use crate::compose::parallel::ComposeThreading;
pub use crate::foundation::core::{BoundingBox, PixelBuffer, Shape};
pub use crate::foundation::error::{StackError, StackResult};
pub use crate::mask::{Mask, layer_to_mask, mask_to_layer};
pub use crate::meta::AnnotationMeta;
pub use crate::overlay::bounds::draw_boxes;
pub use crate::stack::layer::{Layer, LayerRef};
pub use crate::stack::stack::{LayerStack, StackOpts};
