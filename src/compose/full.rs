use crate::{
    compose::parallel::Workers, foundation::core::PixelBuffer, stack::stack::LayerStack,
};

/// Visible overlays ordered from the most recently pushed down to layer 1.
pub(crate) fn visible_top_down(stack: &LayerStack) -> Vec<(usize, &[u8])> {
    let vis = stack.visibility();
    (1..stack.layer_count())
        .rev()
        .filter(|&k| vis[k])
        .map(|k| (k, stack.samples(k)))
        .collect()
}

/// First layer in `layers` (top-down order) with a non-zero sample at `i`.
#[inline]
pub(crate) fn first_opaque(layers: &[(usize, &[u8])], i: usize) -> Option<(usize, u8)> {
    layers.iter().find_map(|&(k, samples)| {
        let v = samples[i];
        (v != 0).then_some((k, v))
    })
}

/// Topmost-wins flatten of every visible layer over the whole image.
///
/// O(layers × samples); samples are independent and split across workers.
pub(crate) fn compose_full(stack: &LayerStack, workers: &Workers) -> PixelBuffer {
    let shape = stack.shape();
    let layers = visible_top_down(stack);
    let base = stack.base();

    let mut out = vec![0u8; shape.sample_count()];
    workers.chunks(&mut out, workers.chunk_len(), |offset, chunk| {
        for (j, dst) in chunk.iter_mut().enumerate() {
            let i = offset + j;
            *dst = match first_opaque(&layers, i) {
                Some((_, v)) => v,
                None => base[i],
            };
        }
    });
    PixelBuffer::from_samples(shape, out)
}
