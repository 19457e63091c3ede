use super::*;
use crate::{
    foundation::core::PixelBuffer,
    stack::{layer::Layer, stack::LayerStack, stack::StackOpts},
};

#[test]
fn record_for_a_stacked_layer_round_trips_through_json() {
    let shape = Shape::new(6, 9, 3).unwrap();
    let mut stack = LayerStack::new(PixelBuffer::new(shape).unwrap(), StackOpts::default()).unwrap();
    let bbox = BoundingBox::new(1, 2, 4, 8).unwrap();
    let mut px = PixelBuffer::new(shape).unwrap();
    px.fill_box(bbox, &[3, 3, 3]).unwrap();
    let idx = stack.push(Layer::new(px, bbox)).unwrap();

    let meta = AnnotationMeta::for_layer("cat-1", "cat", &stack.layer_at(idx).unwrap(), shape);
    assert_eq!(meta.bbox, bbox);

    let json = meta.to_json().unwrap();
    assert!(json.contains("\"class_name\": \"cat\""));
    assert_eq!(AnnotationMeta::from_json(&json).unwrap(), meta);
}

#[test]
fn box_outside_source_image_is_rejected() {
    let json = r#"{
        "name": "a",
        "class_name": "b",
        "bbox": { "row0": 0, "col0": 0, "row1": 5, "col1": 2 },
        "source_shape": { "height": 4, "width": 4, "channels": 3 }
    }"#;
    let err = AnnotationMeta::from_json(json).unwrap_err();
    assert!(matches!(err, StackError::BoxOutOfBounds(_)));
}

#[test]
fn malformed_json_is_a_serde_error() {
    let err = AnnotationMeta::from_json("{ \"name\": 1 }").unwrap_err();
    assert!(matches!(err, StackError::Serde(_)));
    assert!(err.to_string().starts_with("serialization error:"));
}

#[test]
fn zero_channel_source_shape_is_rejected() {
    let json = r#"{
        "name": "a",
        "class_name": "b",
        "bbox": { "row0": 0, "col0": 0, "row1": 1, "col1": 1 },
        "source_shape": { "height": 4, "width": 4, "channels": 0 }
    }"#;
    let err = AnnotationMeta::from_json(json).unwrap_err();
    assert!(matches!(err, StackError::Validation(_)));
}
