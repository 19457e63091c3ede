use crate::{
    compose::parallel::Workers,
    foundation::core::{BoundingBox, PixelBuffer, check_color},
    foundation::error::{StackError, StackResult},
};

/// Stroke a hollow rectangle around each box.
///
/// The stroke is the `thickness`-wide band just outside the box on all four sides, clipped to
/// the buffer. Box interiors are never written and empty boxes are skipped.
///
/// Unlike [`LayerStack::push`](crate::LayerStack::push), boxes reaching past the buffer are
/// not rejected: only their in-buffer part of the band is drawn, and a box lying wholly
/// outside draws nothing. Inverted boxes are still a
/// [`StackError::DegenerateBoundingBox`].
pub fn draw_boxes(
    buffer: &mut PixelBuffer,
    boxes: &[BoundingBox],
    color: &[u8],
    thickness: usize,
) -> StackResult<()> {
    draw_boxes_with(&Workers::serial(), buffer, boxes, color, thickness)
}

// Work is split by buffer row; each row paints the bands of every box crossing it, so writes
// stay disjoint even when boxes overlap.
pub(crate) fn draw_boxes_with(
    workers: &Workers,
    buffer: &mut PixelBuffer,
    boxes: &[BoundingBox],
    color: &[u8],
    thickness: usize,
) -> StackResult<()> {
    let shape = buffer.shape();
    check_color(shape, color)?;
    if let Some(b) = boxes.iter().find(|b| b.row1 < b.row0 || b.col1 < b.col0) {
        return Err(StackError::degenerate(format!(
            "({}, {}, {}, {}) has inverted extents",
            b.row0, b.col0, b.row1, b.col1
        )));
    }

    let boxes: Vec<BoundingBox> = boxes.iter().copied().filter(|b| !b.is_empty()).collect();
    if thickness == 0 || boxes.is_empty() || shape.sample_count() == 0 {
        return Ok(());
    }

    let (w, h, ch) = (shape.width, shape.height, shape.channels);
    let row_len = shape.row_len();
    workers.chunks(buffer.data_mut(), row_len, |offset, row| {
        let r = offset / row_len;
        let mut paint = |c0: usize, c1: usize| {
            for px in row[c0.min(w) * ch..c1.min(w) * ch].chunks_exact_mut(ch) {
                px.copy_from_slice(color);
            }
        };
        for b in &boxes {
            let outer_r0 = b.row0.saturating_sub(thickness);
            let outer_r1 = b.row1.saturating_add(thickness).min(h);
            if r < outer_r0 || r >= outer_r1 {
                continue;
            }
            let outer_c0 = b.col0.saturating_sub(thickness);
            let outer_c1 = b.col1.saturating_add(thickness);
            if b.rows().contains(&r) {
                paint(outer_c0, b.col0);
                paint(b.col1, outer_c1);
            } else {
                paint(outer_c0, outer_c1);
            }
        }
    });
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/overlay/bounds.rs"]
mod tests;
