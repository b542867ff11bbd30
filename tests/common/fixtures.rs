use image::{DynamicImage, ImageBuffer, Rgb, RgbImage, Rgba};
use radai::{BoundingBox, Detection};
use tempfile::NamedTempFile;

/// Creates a width x height RGB gradient standing in for an ultrasound frame.
pub fn make_test_image(width: u32, height: u32) -> RgbImage {
    ImageBuffer::from_fn(width, height, |x, y| {
        let r = (x * 255 / width.max(1)) as u8;
        let g = (y * 255 / height.max(1)) as u8;
        Rgb([r, g, 96])
    })
}

/// Same gradient with a semi-transparent alpha channel.
pub fn make_test_image_rgba(width: u32, height: u32) -> DynamicImage {
    let rgba = ImageBuffer::from_fn(width, height, |x, y| {
        let r = (x * 255 / width.max(1)) as u8;
        let g = (y * 255 / height.max(1)) as u8;
        Rgba([r, g, 96, 128])
    });
    DynamicImage::ImageRgba8(rgba)
}

/// Writes a test image to a temporary PNG file.
/// The file will be automatically cleaned up when dropped.
pub fn create_test_image_file(width: u32, height: u32) -> NamedTempFile {
    let file = tempfile::Builder::new()
        .suffix(".png")
        .tempfile()
        .expect("Failed to create temp image file");
    make_test_image(width, height)
        .save_with_format(file.path(), image::ImageFormat::Png)
        .expect("Failed to save test image");
    file
}

pub fn stone(confidence: f32, x1: f32, y1: f32, x2: f32, y2: f32) -> Detection {
    Detection::new("kidney-stone", confidence, BoundingBox::new(x1, y1, x2, y2))
}

pub fn normal(confidence: f32, x1: f32, y1: f32, x2: f32, y2: f32) -> Detection {
    Detection::new("Normal Kidney", confidence, BoundingBox::new(x1, y1, x2, y2))
}

/// Builds a response body in the shape returned by the inference endpoint.
pub fn response_json(detections: &[Detection]) -> String {
    let results: Vec<serde_json::Value> = detections
        .iter()
        .map(|d| {
            serde_json::json!({
                "class": 0,
                "name": d.class_name,
                "confidence": d.confidence,
                "box": {
                    "x1": d.bounding_box.x1,
                    "y1": d.bounding_box.y1,
                    "x2": d.bounding_box.x2,
                    "y2": d.bounding_box.y2,
                },
            })
        })
        .collect();

    serde_json::json!({
        "images": [{ "shape": [480, 640], "results": results }],
        "metadata": { "version": "test" },
    })
    .to_string()
}

pub const RED: Rgb<u8> = Rgb([255, 0, 0]);
