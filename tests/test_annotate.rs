//! Integration tests for the aggregation and annotation pass.

mod common;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use radai::annotation::draw::label_origin;
use radai::annotation::encode::{encode_image, save_image};
use radai::{AnnotationStyle, Annotator};

use common::*;

fn builtin_font() -> LabelFont {
    LabelFont::builtin(20.0)
}

fn assert_close(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < 1e-5,
        "expected {}, got {}",
        expected,
        actual
    );
}

#[test]
fn test_empty_detections_leave_image_untouched() {
    let input = make_test_image(120, 80);
    let annotation = aggregate_and_annotate(DynamicImage::ImageRgb8(input.clone()), &[], &builtin_font());

    assert_eq!(annotation.verdict, Verdict::NoneDetected);
    assert_eq!(annotation.drawn, 0);
    assert!(annotation.skipped.is_empty());
    assert_eq!(annotation.image, input);
}

#[test]
fn test_alpha_channel_is_dropped() {
    let input = make_test_image_rgba(64, 48);
    let expected = input.to_rgb8();
    let annotation = aggregate_and_annotate(input, &[], &builtin_font());

    assert_eq!(annotation.image.dimensions(), (64, 48));
    assert_eq!(annotation.image, expected);
}

#[test]
fn test_stone_confidences_are_averaged() {
    let detections = vec![
        stone(0.9, 10.0, 40.0, 60.0, 90.0),
        stone(0.7, 100.0, 40.0, 150.0, 90.0),
    ];
    let annotation = aggregate_and_annotate(
        DynamicImage::ImageRgb8(make_test_image(200, 200)),
        &detections,
        &builtin_font(),
    );

    match annotation.verdict {
        Verdict::StoneDetected { average_confidence } => assert_close(average_confidence, 0.8),
        other => panic!("expected stone verdict, got {:?}", other),
    }
    assert_eq!(annotation.drawn, 2);
}

#[test]
fn test_single_normal_detection() {
    let detections = vec![normal(0.6, 30.0, 30.0, 120.0, 100.0)];
    let annotation = aggregate_and_annotate(
        DynamicImage::ImageRgb8(make_test_image(200, 200)),
        &detections,
        &builtin_font(),
    );

    match annotation.verdict {
        Verdict::NormalKidney { average_confidence } => assert_close(average_confidence, 0.6),
        other => panic!("expected normal verdict, got {:?}", other),
    }
}

#[test]
fn test_stone_takes_precedence_over_normal() {
    let detections = vec![
        normal(0.3, 10.0, 30.0, 50.0, 70.0),
        normal(0.4, 60.0, 30.0, 90.0, 70.0),
        stone(0.9, 100.0, 30.0, 150.0, 70.0),
    ];

    let verdict = aggregate(&detections);
    match verdict {
        Verdict::StoneDetected { average_confidence } => assert_close(average_confidence, 0.9),
        other => panic!("expected stone verdict, got {:?}", other),
    }

    let annotation = aggregate_and_annotate(
        DynamicImage::ImageRgb8(make_test_image(200, 200)),
        &detections,
        &builtin_font(),
    );
    assert_eq!(annotation.verdict, verdict);
    assert_eq!(annotation.drawn, 3);
}

#[test]
fn test_unrelated_class_is_drawn_but_not_counted() {
    let detections = vec![Detection::new("cyst", 0.95, BoundingBox::new(20.0, 30.0, 80.0, 90.0))];
    let annotation = aggregate_and_annotate(
        DynamicImage::ImageRgb8(RgbImage::new(120, 120)),
        &detections,
        &builtin_font(),
    );

    assert_eq!(annotation.verdict, Verdict::NoneDetected);
    assert_eq!(annotation.drawn, 1);
    assert_eq!(*annotation.image.get_pixel(20, 30), RED);
}

#[test]
fn test_label_near_top_edge_goes_below_box() {
    let detection = stone(0.9, 20.0, 2.0, 100.0, 40.0);
    let bbox = detection.pixel_box(200, 200).expect("box should be valid");
    let (x, y) = label_origin(&bbox);
    assert_eq!((x, y), (20, 45));

    let annotation = aggregate_and_annotate(
        DynamicImage::ImageRgb8(RgbImage::new(200, 200)),
        &[detection],
        &builtin_font(),
    );

    let label_rows = 45..60;
    let has_label_pixels = label_rows
        .flat_map(|y| (20..200).map(move |x| (x, y)))
        .any(|(x, y)| *annotation.image.get_pixel(x, y) == RED);
    assert!(has_label_pixels, "label should be rendered below the box");
}

#[test]
fn test_label_goes_above_box_when_room() {
    let detection = stone(0.5, 20.0, 100.0, 100.0, 150.0);
    let bbox = detection.pixel_box(200, 200).expect("box should be valid");
    assert_eq!(label_origin(&bbox), (20, 85));
}

#[test]
fn test_inverted_box_is_skipped() {
    let detections = vec![
        stone(0.2, 80.0, 10.0, 40.0, 50.0),
        normal(0.7, 20.0, 60.0, 90.0, 110.0),
    ];
    let annotation = aggregate_and_annotate(
        DynamicImage::ImageRgb8(RgbImage::new(150, 150)),
        &detections,
        &builtin_font(),
    );

    assert_eq!(annotation.drawn, 1);
    assert_eq!(annotation.skipped.len(), 1);
    assert_eq!(annotation.skipped[0].index, 0);
    assert!(matches!(
        annotation.skipped[0].reason,
        ValidationError::InvertedBox { .. }
    ));
    // The skipped stone must not win the verdict
    match annotation.verdict {
        Verdict::NormalKidney { average_confidence } => assert_close(average_confidence, 0.7),
        other => panic!("expected normal verdict, got {:?}", other),
    }
    assert_eq!(*annotation.image.get_pixel(20, 60), RED);
}

#[test]
fn test_invalid_confidence_is_skipped() {
    let detections = vec![stone(1.5, 10.0, 10.0, 40.0, 40.0), stone(f32::NAN, 10.0, 10.0, 40.0, 40.0)];
    let annotation = aggregate_and_annotate(
        DynamicImage::ImageRgb8(RgbImage::new(100, 100)),
        &detections,
        &builtin_font(),
    );

    assert_eq!(annotation.verdict, Verdict::NoneDetected);
    assert_eq!(annotation.skipped.len(), 2);
    assert!(matches!(
        annotation.skipped[0].reason,
        ValidationError::ConfidenceOutOfRange { .. }
    ));
    assert!(matches!(annotation.skipped[1].reason, ValidationError::NonFinite { .. }));
    assert_eq!(annotation.image, RgbImage::new(100, 100));
}

#[test]
fn test_box_outside_image_is_skipped() {
    let detections = vec![stone(0.9, 300.0, 300.0, 400.0, 400.0)];
    let annotation = aggregate_and_annotate(
        DynamicImage::ImageRgb8(RgbImage::new(100, 100)),
        &detections,
        &builtin_font(),
    );

    assert_eq!(annotation.verdict, Verdict::NoneDetected);
    assert!(matches!(
        annotation.skipped[0].reason,
        ValidationError::OutsideImage { width: 100, height: 100, .. }
    ));
    // The drawn count reported to the user excludes the off-image box
    assert_eq!(annotation.drawn, 0);
}

#[test]
fn test_image_aware_verdict_matches_annotation() {
    let detections = vec![
        stone(0.9, 300.0, 300.0, 400.0, 400.0),
        normal(0.6, 10.0, 20.0, 50.0, 60.0),
    ];
    let annotation = aggregate_and_annotate(
        DynamicImage::ImageRgb8(RgbImage::new(100, 100)),
        &detections,
        &builtin_font(),
    );

    assert_eq!(aggregate_in_image(&detections, 100, 100), annotation.verdict);
    assert!(matches!(annotation.verdict, Verdict::NormalKidney { .. }));
    // Without image bounds the off-image stone still counts
    assert!(aggregate(&detections).is_stone());
}

#[test]
fn test_partially_outside_box_is_clipped() {
    let detections = vec![stone(0.9, -20.0, 50.0, 60.0, 250.0)];
    let annotation = aggregate_and_annotate(
        DynamicImage::ImageRgb8(RgbImage::new(100, 100)),
        &detections,
        &builtin_font(),
    );

    assert!(annotation.skipped.is_empty());
    assert!(annotation.verdict.is_stone());
    assert_eq!(*annotation.image.get_pixel(0, 70), RED);
    assert_eq!(*annotation.image.get_pixel(60, 99), RED);
}

#[test]
fn test_custom_style_is_used() {
    let green = Rgb([0, 255, 0]);
    let style = AnnotationStyle {
        box_color: green,
        label_color: green,
        line_width: 1,
    };
    let font = builtin_font();
    let annotation = Annotator::new(&font)
        .with_style(style)
        .annotate(DynamicImage::ImageRgb8(RgbImage::new(100, 100)), &[stone(0.9, 20.0, 40.0, 60.0, 80.0)]);

    assert_eq!(*annotation.image.get_pixel(20, 40), green);
    assert_eq!(*annotation.image.get_pixel(21, 41), Rgb([0, 0, 0]));
}

#[test]
fn test_later_boxes_draw_over_earlier_ones() {
    let font = builtin_font();
    let first = Annotator::new(&font).with_style(AnnotationStyle {
        box_color: Rgb([0, 0, 255]),
        label_color: Rgb([0, 0, 255]),
        line_width: 1,
    });
    let image = first.annotate(
        DynamicImage::ImageRgb8(RgbImage::new(100, 100)),
        &[stone(0.9, 20.0, 40.0, 60.0, 80.0)],
    );
    let annotation = aggregate_and_annotate(
        DynamicImage::ImageRgb8(image.image),
        &[stone(0.9, 20.0, 40.0, 60.0, 80.0)],
        &font,
    );
    assert_eq!(*annotation.image.get_pixel(20, 40), RED);
}

#[test]
fn test_encoded_image_round_trips_dimensions() {
    let detections = vec![stone(0.9, 10.0, 40.0, 60.0, 90.0)];
    let annotation = aggregate_and_annotate(
        make_test_image_rgba(97, 61),
        &detections,
        &builtin_font(),
    );

    for format in [ImageFormat::Png, ImageFormat::Jpeg] {
        let bytes = encode_image(&annotation.image, format).expect("encode");
        let decoded = image::load_from_memory_with_format(&bytes, format).expect("decode");
        assert_eq!((decoded.width(), decoded.height()), (97, 61));
    }
}

#[test]
fn test_save_image_uses_extension() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("annotated_image.jpg");
    let annotation = aggregate_and_annotate(
        DynamicImage::ImageRgb8(make_test_image(40, 30)),
        &[],
        &builtin_font(),
    );

    save_image(&annotation.image, &path)?;
    let reloaded = image::open(&path)?;
    assert_eq!((reloaded.width(), reloaded.height()), (40, 30));

    assert!(save_image(&annotation.image, &dir.path().join("annotated.unknown")).is_err());
    Ok(())
}

#[test]
fn test_calls_on_separate_images_run_concurrently() {
    let font = builtin_font();
    let verdicts: Vec<Verdict> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let font = &font;
                scope.spawn(move || {
                    let detections = vec![stone(0.5 + i as f32 * 0.1, 10.0, 30.0, 50.0, 70.0)];
                    aggregate_and_annotate(
                        DynamicImage::ImageRgb8(make_test_image(80, 80)),
                        &detections,
                        font,
                    )
                    .verdict
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().expect("thread panicked")).collect()
    });

    for (i, verdict) in verdicts.iter().enumerate() {
        assert_close(verdict.average_confidence().expect("stone"), 0.5 + i as f32 * 0.1);
    }
}

#[test]
fn test_annotate_from_file_and_response() -> anyhow::Result<()> {
    let file = create_test_image_file(160, 120);
    let img = image::open(file.path())?;
    let json = response_json(&[stone(0.88, 20.0, 30.0, 90.0, 100.0)]);
    let parsed = parse_response(&json)?;

    let annotation: Annotation = aggregate_and_annotate(img, &parsed.detections, &builtin_font());
    assert_eq!(
        annotation.verdict.to_string(),
        "Kidney Stone Detected (average confidence: 0.88)"
    );
    Ok(())
}

#[test]
fn test_verdict_display() {
    assert_eq!(
        Verdict::NormalKidney { average_confidence: 0.6 }.to_string(),
        "Normal Kidney (average confidence: 0.60)"
    );
    assert_eq!(Verdict::NoneDetected.to_string(), "No Kidney Detected");
    assert_eq!(Verdict::NoneDetected.average_confidence(), None);
}
