use super::*;
use crate::{
    compose::full::compose_full,
    compose::parallel::ComposeThreading,
    foundation::core::{BoundingBox, Shape},
    stack::layer::Layer,
    stack::stack::StackOpts,
};

fn toy(base: &[u8]) -> LayerStack {
    let shape = Shape::new(1, base.len(), 1).unwrap();
    LayerStack::new(
        PixelBuffer::from_vec(shape, base.to_vec()).unwrap(),
        StackOpts::default(),
    )
    .unwrap()
}

fn push_boxed(stack: &mut LayerStack, values: &[u8], col0: usize, col1: usize) {
    let px = PixelBuffer::from_vec(stack.shape(), values.to_vec()).unwrap();
    let bbox = BoundingBox::new(0, col0, 1, col1).unwrap();
    stack.push(Layer::new(px, bbox)).unwrap();
}

fn workers() -> Workers {
    Workers::new(&ComposeThreading {
        parallel: true,
        threads: Some(2),
        chunk_len: 4,
    })
    .unwrap()
}

/// base `[5,5,5,5]`, layer 1 boxed `[0,2)` with `[9,0]`, layer 2 boxed `[1,3)` with `[7,0]`.
fn two_box_stack() -> LayerStack {
    let mut stack = toy(&[5, 5, 5, 5]);
    push_boxed(&mut stack, &[9, 0, 0, 0], 0, 2);
    push_boxed(&mut stack, &[0, 7, 0, 0], 1, 3);
    stack
}

#[test]
fn all_regions_merges_topmost_within_boxes() {
    let stack = two_box_stack();
    let out = compose_all_regions(&stack, stack.visibility(), &workers()).unwrap();
    assert_eq!(out.data(), &[9, 7, 5, 5]);
    assert_eq!(out, compose_full(&stack, &Workers::serial()));
}

#[test]
fn bounded_select_merges_only_the_target() {
    let stack = two_box_stack();
    let w = workers();
    let one = compose_bounded_select(&stack, Some(1), &w).unwrap();
    assert_eq!(one.data(), &[9, 5, 5, 5]);
    let two = compose_bounded_select(&stack, Some(2), &w).unwrap();
    assert_eq!(two.data(), &[5, 7, 5, 5]);
}

#[test]
fn bounded_select_of_base_or_none_is_base() {
    let stack = two_box_stack();
    let w = workers();
    assert_eq!(
        compose_bounded_select(&stack, None, &w).unwrap().data(),
        stack.base()
    );
    assert_eq!(
        compose_bounded_select(&stack, Some(0), &w).unwrap().data(),
        stack.base()
    );
}

#[test]
fn bounded_select_of_hidden_target_is_base() {
    let mut stack = two_box_stack();
    stack.set_visible(1, false).unwrap();
    let out = compose_bounded_select(&stack, Some(1), &workers()).unwrap();
    assert_eq!(out.data(), &[5, 5, 5, 5]);
}

#[test]
fn bounded_select_rejects_unknown_index() {
    let stack = two_box_stack();
    let err = compose_bounded_select(&stack, Some(3), &workers()).unwrap_err();
    assert!(matches!(
        err,
        StackError::InvalidLayerIndex { index: 3, count: 3 }
    ));
}

#[test]
fn bounded_select_never_mutates_the_base() {
    let stack = two_box_stack();
    let before = stack.base().to_vec();
    compose_bounded_select(&stack, Some(2), &workers()).unwrap();
    compose_all_regions(&stack, stack.visibility(), &workers()).unwrap();
    assert_eq!(stack.base(), &before[..]);
}

#[test]
fn all_regions_without_overlays_copies_base() {
    let stack = toy(&[1, 2, 3]);
    let out = compose_all_regions(&stack, &[true], &workers()).unwrap();
    assert_eq!(out.data(), &[1, 2, 3]);
}

#[test]
fn all_regions_honours_explicit_visibility() {
    let stack = two_box_stack();
    let out = compose_all_regions(&stack, &[true, true, false], &workers()).unwrap();
    assert_eq!(out.data(), &[9, 5, 5, 5]);
    // Base flag is ignored.
    let out = compose_all_regions(&stack, &[false, false, false], &workers()).unwrap();
    assert_eq!(out.data(), &[5, 5, 5, 5]);
}

#[test]
fn all_regions_rejects_short_visibility_vector() {
    let stack = two_box_stack();
    let err = compose_all_regions(&stack, &[true, true], &workers()).unwrap_err();
    assert!(matches!(err, StackError::Validation(_)));
}

#[test]
fn higher_value_equal_to_base_is_not_overwritten() {
    // A top layer may paint exactly the base colour; lower layers must not show through.
    let mut stack = toy(&[5, 5]);
    push_boxed(&mut stack, &[8, 8], 0, 2);
    push_boxed(&mut stack, &[5, 0], 0, 1);
    let out = compose_all_regions(&stack, stack.visibility(), &workers()).unwrap();
    assert_eq!(out.data(), &[5, 8]);
}

#[test]
fn empty_boxes_are_skipped() {
    let mut stack = toy(&[1, 1, 1]);
    push_boxed(&mut stack, &[0, 0, 0], 2, 2);
    push_boxed(&mut stack, &[0, 4, 0], 1, 2);
    let out = compose_all_regions(&stack, stack.visibility(), &workers()).unwrap();
    assert_eq!(out.data(), &[1, 4, 1]);
}

#[test]
fn multi_row_multi_channel_regions_match_full_scan() {
    let shape = Shape::new(6, 7, 3).unwrap();
    let base = PixelBuffer::filled(shape, &[10, 20, 30]).unwrap();
    let mut stack = LayerStack::new(base, StackOpts::default()).unwrap();
    for (i, (r0, c0, r1, c1)) in [(0, 0, 3, 3), (2, 2, 6, 5), (1, 4, 4, 7), (3, 0, 5, 6)]
        .into_iter()
        .enumerate()
    {
        let mut px = PixelBuffer::new(shape).unwrap();
        let bbox = BoundingBox::new(r0, c0, r1, c1).unwrap();
        let v = 40 + i as u8 * 30;
        px.fill_box(bbox, &[v, 0, v + 1]).unwrap();
        stack.push(Layer::new(px, bbox)).unwrap();
    }
    stack.set_visible(2, false).unwrap();
    let out = compose_all_regions(&stack, stack.visibility(), &workers()).unwrap();
    assert_eq!(out, compose_full(&stack, &workers()));
}
