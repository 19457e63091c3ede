use crate::{
    compose::cached::{ComposeStats, HistoryCache, compose_cached},
    compose::full::compose_full,
    compose::parallel::{ComposeThreading, Workers},
    compose::region::{compose_all_regions, compose_bounded_select},
    foundation::core::{BoundingBox, PixelBuffer, Shape},
    foundation::error::{StackError, StackResult},
    overlay::bounds::draw_boxes_with,
    stack::stack::LayerStack,
};

/// Which flatten routine [`Compositor::compose`] runs. All produce the same topmost-wins
/// result for the layers they consider; they differ in cost.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComposeStrategy {
    /// Scan every visible layer for every sample.
    Full,
    /// Reuse the compositor's history cache; cost tracks what changed since the last call.
    Cached,
    /// Merge each visible overlay only inside its bounding box.
    Regions,
    /// Base plus a single layer's box (`None` or `Some(0)` yields the base).
    BoundedSelect(Option<usize>),
}

/// Compositor configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CompositorOpts {
    /// Worker pool and chunking.
    pub threading: ComposeThreading,
}

/// Flattens a [`LayerStack`] into a single [`PixelBuffer`].
///
/// Owns the worker pool and the [`HistoryCache`] used by [`ComposeStrategy::Cached`]. The
/// cache is sized at construction for one stack shape.
pub struct Compositor {
    shape: Shape,
    workers: Workers,
    history: HistoryCache,
    last_stats: ComposeStats,
}

impl Compositor {
    /// Compositor for stacks of `shape`.
    pub fn new(shape: Shape, opts: CompositorOpts) -> StackResult<Self> {
        Ok(Self {
            shape,
            workers: Workers::new(&opts.threading)?,
            history: HistoryCache::new(shape)?,
            last_stats: ComposeStats::default(),
        })
    }

    /// Compositor sized for `stack`.
    pub fn for_stack(stack: &LayerStack, opts: CompositorOpts) -> StackResult<Self> {
        Self::new(stack.shape(), opts)
    }

    /// Shape this compositor was built for.
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Run `strategy` over `stack`.
    #[tracing::instrument(skip(self, stack), fields(layers = stack.layer_count()))]
    pub fn compose(
        &mut self,
        stack: &LayerStack,
        strategy: ComposeStrategy,
    ) -> StackResult<PixelBuffer> {
        self.check_shape(stack)?;
        match strategy {
            ComposeStrategy::Full => Ok(compose_full(stack, &self.workers)),
            ComposeStrategy::Cached => self.compose_cached(stack),
            ComposeStrategy::Regions => compose_all_regions(stack, stack.visibility(), &self.workers),
            ComposeStrategy::BoundedSelect(target) => {
                compose_bounded_select(stack, target, &self.workers)
            }
        }
    }

    /// Exhaustive topmost-wins flatten of every visible layer.
    pub fn compose_full(&self, stack: &LayerStack) -> StackResult<PixelBuffer> {
        self.check_shape(stack)?;
        Ok(compose_full(stack, &self.workers))
    }

    /// Cached flatten using the compositor's own history cache.
    pub fn compose_cached(&mut self, stack: &LayerStack) -> StackResult<PixelBuffer> {
        self.check_shape(stack)?;
        let (out, stats) = compose_cached(stack, &mut self.history, &self.workers)?;
        tracing::trace!(
            changed_hits = stats.changed_hits,
            cached_hits = stats.cached_hits,
            rescans = stats.rescans,
            "cached composite"
        );
        self.last_stats = stats;
        Ok(out)
    }

    /// Cached flatten against a caller-owned cache.
    pub fn compose_cached_with(
        &self,
        stack: &LayerStack,
        history: &mut HistoryCache,
    ) -> StackResult<(PixelBuffer, ComposeStats)> {
        self.check_shape(stack)?;
        compose_cached(stack, history, &self.workers)
    }

    /// Base with only layer `target`'s bounding box merged on top.
    pub fn compose_bounded_select(
        &self,
        stack: &LayerStack,
        target: Option<usize>,
    ) -> StackResult<PixelBuffer> {
        self.check_shape(stack)?;
        compose_bounded_select(stack, target, &self.workers)
    }

    /// Region-scoped flatten honouring an explicit visibility vector.
    pub fn compose_all_regions(
        &self,
        stack: &LayerStack,
        visible: &[bool],
    ) -> StackResult<PixelBuffer> {
        self.check_shape(stack)?;
        compose_all_regions(stack, visible, &self.workers)
    }

    /// Stroke hollow rectangles around `boxes`, using the compositor's workers.
    pub fn draw_boxes(
        &self,
        buffer: &mut PixelBuffer,
        boxes: &[BoundingBox],
        color: &[u8],
        thickness: usize,
    ) -> StackResult<()> {
        draw_boxes_with(&self.workers, buffer, boxes, color, thickness)
    }

    /// History cache used by [`ComposeStrategy::Cached`].
    pub fn history(&self) -> &HistoryCache {
        &self.history
    }

    /// Counters from the most recent [`Compositor::compose_cached`] call.
    pub fn last_cached_stats(&self) -> ComposeStats {
        self.last_stats
    }

    fn check_shape(&self, stack: &LayerStack) -> StackResult<()> {
        if stack.shape() != self.shape {
            return Err(StackError::shape(format!(
                "compositor built for {}, stack is {}",
                self.shape,
                stack.shape()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compose/compositor.rs"]
mod tests;
