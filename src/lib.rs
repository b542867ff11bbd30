pub mod annotation;
pub mod config;
pub mod error;
pub mod inference;
pub mod models;

pub use annotation::font::LabelFont;
pub use annotation::{aggregate, aggregate_and_annotate, aggregate_in_image, Annotation, AnnotationStyle, Annotator};
pub use config::Config;
pub use error::{SkippedDetection, ValidationError};
pub use inference::{parse_response, InferenceClient, ParsedResponse};
pub use models::{BoundingBox, Detection, PixelBox, Verdict};
