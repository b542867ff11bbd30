mod fixtures;
pub use fixtures::*;

// Re-export commonly used types for tests
pub use radai::{
    aggregate, aggregate_and_annotate, aggregate_in_image, parse_response, Annotation, BoundingBox, Detection,
    LabelFont, ValidationError, Verdict,
};
