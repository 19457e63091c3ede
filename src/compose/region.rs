use crate::{
    compose::parallel::Workers,
    foundation::core::PixelBuffer,
    foundation::error::{StackError, StackResult},
    stack::stack::LayerStack,
};

/// Base image with only layer `target`'s box merged on top ("preview up to this layer").
///
/// `None`, `Some(0)`, a hidden target or an empty box all return the base unchanged.
/// Cost is the box area plus one copy of the base.
pub(crate) fn compose_bounded_select(
    stack: &LayerStack,
    target: Option<usize>,
    workers: &Workers,
) -> StackResult<PixelBuffer> {
    let shape = stack.shape();
    let mut out = stack.base().to_vec();
    let Some(target) = target else {
        return Ok(PixelBuffer::from_samples(shape, out));
    };
    let layer = stack.layer_at(target)?;
    if target == 0 || !layer.visible || layer.bbox.is_empty() {
        return Ok(PixelBuffer::from_samples(shape, out));
    }

    let row_len = shape.row_len();
    let bbox = layer.bbox;
    let (s0, s1) = (bbox.col0 * shape.channels, bbox.col1 * shape.channels);
    let region = &mut out[bbox.row0 * row_len..bbox.row1 * row_len];
    workers.chunks(region, row_len, |offset, row| {
        let r = bbox.row0 + offset / row_len;
        let src = &layer.samples[r * row_len + s0..r * row_len + s1];
        for (dst, &v) in row[s0..s1].iter_mut().zip(src) {
            if v != 0 {
                *dst = v;
            }
        }
    });
    Ok(PixelBuffer::from_samples(shape, out))
}

/// Topmost-wins flatten where each overlay is read only inside its own bounding box.
///
/// Layers are merged from the top down into a running output; a per-sample `claimed` mask
/// keeps lower layers from overwriting a value a higher layer already supplied. Work per layer
/// is proportional to its box area. `visible` must hold one flag per layer; the base flag is
/// ignored.
pub(crate) fn compose_all_regions(
    stack: &LayerStack,
    visible: &[bool],
    workers: &Workers,
) -> StackResult<PixelBuffer> {
    let shape = stack.shape();
    if visible.len() != stack.layer_count() {
        return Err(StackError::validation(format!(
            "visibility vector has {} entries, stack has {} layers",
            visible.len(),
            stack.layer_count()
        )));
    }

    let mut out = stack.base().to_vec();
    if stack.overlay_count() == 0 {
        return Ok(PixelBuffer::from_samples(shape, out));
    }

    let row_len = shape.row_len();
    let mut claimed = vec![false; shape.sample_count()];
    for k in (1..stack.layer_count()).rev() {
        let bbox = stack.bounds()[k];
        if !visible[k] || bbox.is_empty() {
            continue;
        }
        let samples = stack.samples(k);
        let (s0, s1) = (bbox.col0 * shape.channels, bbox.col1 * shape.channels);
        let rows = bbox.row0 * row_len..bbox.row1 * row_len;
        workers.chunks2(
            &mut out[rows.clone()],
            &mut claimed[rows],
            row_len,
            |offset, out_row, claimed_row| {
                let r = bbox.row0 + offset / row_len;
                let src = &samples[r * row_len + s0..r * row_len + s1];
                for ((dst, taken), &v) in out_row[s0..s1]
                    .iter_mut()
                    .zip(claimed_row[s0..s1].iter_mut())
                    .zip(src)
                {
                    if !*taken && v != 0 {
                        *dst = v;
                        *taken = true;
                    }
                }
            },
        );
    }
    Ok(PixelBuffer::from_samples(shape, out))
}

#[cfg(test)]
#[path = "../../tests/unit/compose/region.rs"]
mod tests;
