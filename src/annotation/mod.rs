pub mod aggregate;
pub mod draw;
pub mod encode;
pub mod font;

use image::{DynamicImage, Rgb, RgbImage};

use crate::error::SkippedDetection;
use crate::models::{Detection, Verdict};
use aggregate::VerdictAccumulator;
use font::LabelFont;

pub use aggregate::{aggregate, aggregate_in_image, KidneyClass};

/// Colors and stroke used for boxes and labels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnotationStyle {
    pub box_color: Rgb<u8>,
    pub label_color: Rgb<u8>,
    pub line_width: u32,
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self {
            box_color: Rgb([255, 0, 0]),
            label_color: Rgb([255, 0, 0]),
            line_width: 3,
        }
    }
}

/// Result of annotating one image
#[derive(Debug, Clone)]
pub struct Annotation {
    /// Opaque RGB copy of the input with boxes and labels drawn in
    pub image: RgbImage,
    pub verdict: Verdict,
    /// Number of detections that were drawn
    pub drawn: usize,
    pub skipped: Vec<SkippedDetection>,
}

/// Draws detections onto an image and derives the verdict
pub struct Annotator<'a> {
    font: &'a LabelFont,
    pub style: AnnotationStyle,
}

impl<'a> Annotator<'a> {
    pub fn new(font: &'a LabelFont) -> Self {
        Self {
            font,
            style: AnnotationStyle::default(),
        }
    }

    pub fn with_style(mut self, style: AnnotationStyle) -> Self {
        self.style = style;
        self
    }

    /// Annotate `image` with `detections`, in sequence order.
    ///
    /// Alpha is dropped before drawing. Detections with a malformed box, a
    /// box fully outside the image or an invalid confidence are skipped and
    /// reported in [`Annotation::skipped`]; boxes partly outside the image
    /// are clipped.
    pub fn annotate(&self, image: DynamicImage, detections: &[Detection]) -> Annotation {
        let mut canvas = image.into_rgb8();
        let (width, height) = canvas.dimensions();

        let mut acc = VerdictAccumulator::new();
        let mut skipped = Vec::new();
        let mut drawn = 0;

        for (index, detection) in detections.iter().enumerate() {
            let bbox = match detection.pixel_box(width, height) {
                Ok(bbox) => bbox,
                Err(reason) => {
                    log::warn!("Skipping detection {}: {}", index, reason);
                    skipped.push(SkippedDetection { index, reason });
                    continue;
                }
            };

            let class = acc.push(detection);
            log::debug!(
                "Detection {}: '{}' conf={:.2} class={:?} box=({}, {})-({}, {})",
                index,
                detection.class_name,
                detection.confidence,
                class,
                bbox.min_x,
                bbox.min_y,
                bbox.max_x,
                bbox.max_y
            );

            draw::draw_box_outline(&mut canvas, &bbox, self.style.box_color, self.style.line_width);
            draw::draw_label(&mut canvas, &bbox, &detection.label(), self.style.label_color, self.font);
            drawn += 1;
        }

        let verdict = acc.verdict();
        log::debug!(
            "Verdict: {} (stone={}, normal={}, skipped={})",
            verdict,
            acc.stone_count(),
            acc.normal_count(),
            skipped.len()
        );

        Annotation {
            image: canvas,
            verdict,
            drawn,
            skipped,
        }
    }
}

/// Draw `detections` onto `image` with the default style and classify the result
pub fn aggregate_and_annotate(
    image: DynamicImage,
    detections: &[Detection],
    label_font: &LabelFont,
) -> Annotation {
    Annotator::new(label_font).annotate(image, detections)
}
