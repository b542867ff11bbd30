use serde::Deserialize;
use std::fmt;

use crate::error::ValidationError;

/// Box corners in image pixel coordinates, as returned by the inference API
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn is_finite(&self) -> bool {
        self.x1.is_finite() && self.y1.is_finite() && self.x2.is_finite() && self.y2.is_finite()
    }

    /// Clip the box to a `width` x `height` image.
    ///
    /// Returns `None` when nothing of the box remains inside the image.
    pub fn clip(&self, width: u32, height: u32) -> Option<PixelBox> {
        if width == 0 || height == 0 || !self.is_finite() {
            return None;
        }

        let max_x = (width - 1) as f32;
        let max_y = (height - 1) as f32;

        if self.x2 < 0.0 || self.y2 < 0.0 || self.x1 > max_x || self.y1 > max_y {
            return None;
        }

        let clipped = PixelBox {
            min_x: self.x1.round().clamp(0.0, max_x) as u32,
            min_y: self.y1.round().clamp(0.0, max_y) as u32,
            max_x: self.x2.round().clamp(0.0, max_x) as u32,
            max_y: self.y2.round().clamp(0.0, max_y) as u32,
        };

        if clipped.min_x > clipped.max_x || clipped.min_y > clipped.max_y {
            return None;
        }

        Some(clipped)
    }
}

/// Integer box with inclusive corners, guaranteed to lie inside its image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBox {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl PixelBox {
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }
}

/// One labeled box returned by the object-detection model
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Detection {
    #[serde(rename = "name")]
    pub class_name: String,
    pub confidence: f32,
    #[serde(rename = "box")]
    pub bounding_box: BoundingBox,
}

impl Detection {
    pub fn new(class_name: impl Into<String>, confidence: f32, bounding_box: BoundingBox) -> Self {
        Self {
            class_name: class_name.into(),
            confidence,
            bounding_box,
        }
    }

    /// Check the record on its own, without reference to an image
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.confidence.is_finite() || !self.bounding_box.is_finite() {
            return Err(ValidationError::NonFinite {
                class_name: self.class_name.clone(),
            });
        }

        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(ValidationError::ConfidenceOutOfRange {
                class_name: self.class_name.clone(),
                confidence: self.confidence,
            });
        }

        let b = &self.bounding_box;
        if b.x1 >= b.x2 || b.y1 >= b.y2 {
            return Err(ValidationError::InvertedBox {
                class_name: self.class_name.clone(),
                x1: b.x1,
                y1: b.y1,
                x2: b.x2,
                y2: b.y2,
            });
        }

        Ok(())
    }

    /// Validate and clip the box to a `width` x `height` image
    pub fn pixel_box(&self, width: u32, height: u32) -> Result<PixelBox, ValidationError> {
        self.validate()?;
        self.bounding_box
            .clip(width, height)
            .ok_or_else(|| ValidationError::OutsideImage {
                class_name: self.class_name.clone(),
                width,
                height,
            })
    }

    /// Text drawn next to the box, e.g. `kidney-stone (0.87)`
    pub fn label(&self) -> String {
        format!("{} ({:.2})", self.class_name, self.confidence)
    }
}

/// Final classification for one image.
///
/// Confidences are raw fractions in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    StoneDetected { average_confidence: f32 },
    NormalKidney { average_confidence: f32 },
    NoneDetected,
}

impl Verdict {
    pub fn average_confidence(&self) -> Option<f32> {
        match self {
            Verdict::StoneDetected { average_confidence }
            | Verdict::NormalKidney { average_confidence } => Some(*average_confidence),
            Verdict::NoneDetected => None,
        }
    }

    pub fn is_stone(&self) -> bool {
        matches!(self, Verdict::StoneDetected { .. })
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::StoneDetected { average_confidence } => write!(
                f,
                "Kidney Stone Detected (average confidence: {:.2})",
                average_confidence
            ),
            Verdict::NormalKidney { average_confidence } => write!(
                f,
                "Normal Kidney (average confidence: {:.2})",
                average_confidence
            ),
            Verdict::NoneDetected => write!(f, "No Kidney Detected"),
        }
    }
}
