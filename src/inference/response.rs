use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{SkippedDetection, ValidationError};
use crate::models::Detection;

#[derive(Debug, Deserialize)]
struct ResponseEnvelope {
    #[serde(default)]
    images: Vec<ImageResults>,
}

#[derive(Debug, Deserialize)]
struct ImageResults {
    #[serde(default)]
    results: Vec<Value>,
}

/// Detections decoded from an inference response
#[derive(Debug, Clone, Default)]
pub struct ParsedResponse {
    /// Number of entries in the response's `images` list
    pub image_count: usize,
    /// Well-formed detections of the first image, in response order
    pub detections: Vec<Detection>,
    /// Records of the first image that were rejected, indexed by position in `results`
    pub rejected: Vec<SkippedDetection>,
}

/// Parse the JSON body returned by the inference endpoint.
///
/// Only the first image's results are used. Each record is decoded on its
/// own; records with missing fields or invalid values are rejected without
/// affecting the others. An empty `images` list yields no detections.
pub fn parse_response(json: &str) -> Result<ParsedResponse> {
    let value: Value = serde_json::from_str(json).context("Inference response is not valid JSON")?;
    parse_response_value(value)
}

pub fn parse_response_value(value: Value) -> Result<ParsedResponse> {
    let envelope: ResponseEnvelope =
        serde_json::from_value(value).context("Unexpected inference response shape")?;

    let image_count = envelope.images.len();
    if image_count > 1 {
        log::warn!(
            "Response contains {} images; only the first is used",
            image_count
        );
    }

    let Some(first) = envelope.images.into_iter().next() else {
        log::debug!("Response contains no images");
        return Ok(ParsedResponse::default());
    };

    let mut detections = Vec::new();
    let mut rejected = Vec::new();

    for (index, record) in first.results.into_iter().enumerate() {
        let decoded = serde_json::from_value::<Detection>(record)
            .map_err(|e| ValidationError::MalformedRecord(e.to_string()))
            .and_then(|detection| detection.validate().map(|_| detection));

        match decoded {
            Ok(detection) => detections.push(detection),
            Err(reason) => {
                log::warn!("Rejecting detection record {}: {}", index, reason);
                rejected.push(SkippedDetection { index, reason });
            }
        }
    }

    Ok(ParsedResponse {
        image_count,
        detections,
        rejected,
    })
}
