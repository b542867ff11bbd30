use thiserror::Error;

/// Reasons a single detection record is rejected.
///
/// A rejected detection is skipped: it is neither drawn nor counted towards
/// the verdict, and the rest of the detections are processed normally.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("malformed detection record: {0}")]
    MalformedRecord(String),

    #[error("non-finite value in detection '{class_name}'")]
    NonFinite { class_name: String },

    #[error("confidence {confidence} of '{class_name}' is outside [0, 1]")]
    ConfidenceOutOfRange { class_name: String, confidence: f32 },

    #[error("inverted box ({x1}, {y1})-({x2}, {y2}) for '{class_name}'")]
    InvertedBox {
        class_name: String,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
    },

    #[error("box for '{class_name}' lies outside the {width}x{height} image")]
    OutsideImage {
        class_name: String,
        width: u32,
        height: u32,
    },
}

/// A detection that was dropped, with its position in the input sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedDetection {
    pub index: usize,
    pub reason: ValidationError,
}
