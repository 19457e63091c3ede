use super::*;

fn rgb(h: usize, w: usize) -> Shape {
    Shape::new(h, w, 3).unwrap()
}

#[test]
fn shape_counts() {
    let s = rgb(4, 5);
    assert_eq!(s.pixel_count(), 20);
    assert_eq!(s.sample_count(), 60);
    assert_eq!(s.row_len(), 15);
    assert!(Shape::new(2, 2, 0).is_err());
}

#[test]
fn overflowing_shape_is_rejected() {
    let err = Shape::new(usize::MAX / 2, 3, 1).unwrap_err();
    assert!(matches!(err, StackError::Validation(_)));
    assert!(Shape::new(usize::MAX, 1, 1).is_ok());
}

#[test]
fn buffers_recheck_hand_built_shapes() {
    let zero_channels = Shape {
        height: 2,
        width: 2,
        channels: 0,
    };
    assert!(matches!(
        PixelBuffer::new(zero_channels).unwrap_err(),
        StackError::Validation(_)
    ));
    assert!(PixelBuffer::from_vec(zero_channels, Vec::new()).is_err());
    assert!(PixelBuffer::filled(zero_channels, &[]).is_err());

    let parsed: Shape =
        serde_json::from_str(r#"{ "height": 4, "width": 4, "channels": 0 }"#).unwrap();
    assert!(parsed.validate().is_err());

    let huge = Shape {
        height: usize::MAX,
        width: 2,
        channels: 3,
    };
    assert!(PixelBuffer::new(huge).is_err());
}

#[test]
fn from_vec_rejects_wrong_length() {
    let err = PixelBuffer::from_vec(rgb(2, 2), vec![0; 11]).unwrap_err();
    assert!(matches!(err, StackError::ShapeMismatch(_)));
    assert!(PixelBuffer::from_vec(rgb(2, 2), vec![0; 12]).is_ok());
}

#[test]
fn filled_and_pixel_access() {
    let mut buf = PixelBuffer::filled(rgb(2, 3), &[1, 2, 3]).unwrap();
    assert_eq!(buf.pixel(1, 2), Some(&[1u8, 2, 3][..]));
    assert_eq!(buf.pixel(2, 0), None);

    buf.set_pixel(0, 1, &[9, 9, 9]).unwrap();
    assert_eq!(buf.pixel(0, 1), Some(&[9u8, 9, 9][..]));
    assert!(buf.set_pixel(0, 0, &[1, 2]).is_err());
    // Out-of-range writes are ignored.
    buf.set_pixel(7, 7, &[4, 4, 4]).unwrap();
}

#[test]
fn fill_box_only_touches_region() {
    let s = Shape::new(4, 4, 1).unwrap();
    let mut buf = PixelBuffer::new(s).unwrap();
    buf.fill_box(BoundingBox::new(1, 1, 3, 2).unwrap(), &[5]).unwrap();
    #[rustfmt::skip]
    let expected = vec![
        0, 0, 0, 0,
        0, 5, 0, 0,
        0, 5, 0, 0,
        0, 0, 0, 0,
    ];
    assert_eq!(buf.data(), &expected[..]);
}

#[test]
fn nonzero_bounds_is_tight() {
    let s = Shape::new(5, 6, 2).unwrap();
    let mut buf = PixelBuffer::new(s).unwrap();
    assert_eq!(buf.nonzero_bounds(), BoundingBox::EMPTY);

    buf.set_pixel(1, 4, &[0, 3]).unwrap();
    buf.set_pixel(3, 2, &[8, 0]).unwrap();
    assert_eq!(buf.nonzero_bounds(), BoundingBox::new(1, 2, 4, 5).unwrap());
}

#[test]
fn bbox_rejects_inverted_extents() {
    let err = BoundingBox::new(3, 0, 2, 4).unwrap_err();
    assert!(matches!(err, StackError::DegenerateBoundingBox(_)));
    assert!(BoundingBox::new(0, 4, 1, 3).is_err());
    assert!(BoundingBox::from_signed(-1, 0, 2, 2).is_err());
    assert_eq!(
        BoundingBox::from_signed(0, 1, 2, 3).unwrap(),
        BoundingBox::new(0, 1, 2, 3).unwrap()
    );
}

#[test]
fn bbox_empty_and_bounds_checks() {
    assert!(BoundingBox::EMPTY.is_empty());
    assert!(BoundingBox::new(2, 2, 2, 5).unwrap().is_empty());
    assert!(!BoundingBox::new(2, 2, 3, 5).unwrap().is_empty());

    let s = rgb(4, 4);
    assert!(BoundingBox::full(s).check_within(s).is_ok());
    let err = BoundingBox::new(0, 0, 5, 4).unwrap().check_within(s).unwrap_err();
    assert!(matches!(err, StackError::BoxOutOfBounds(_)));
}

#[test]
fn rgb8_round_trip_preserves_samples() {
    let mut img = image::RgbImage::new(3, 2);
    img.put_pixel(2, 1, image::Rgb([10, 20, 30]));
    let buf = PixelBuffer::from_rgb8(&img);
    assert_eq!(buf.shape(), rgb(2, 3));
    assert_eq!(buf.pixel(1, 2), Some(&[10u8, 20, 30][..]));
    assert_eq!(buf.to_rgb8().unwrap(), img);
}

#[test]
fn gray_expands_to_rgb8() {
    let buf = PixelBuffer::from_vec(Shape::new(1, 2, 1).unwrap(), vec![7, 0]).unwrap();
    let img = buf.to_rgb8().unwrap();
    assert_eq!(img.get_pixel(0, 0).0, [7, 7, 7]);
    assert_eq!(img.get_pixel(1, 0).0, [0, 0, 0]);

    let two = PixelBuffer::new(Shape::new(1, 1, 2).unwrap()).unwrap();
    assert!(two.to_rgb8().is_err());
}
