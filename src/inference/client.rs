use anyhow::{bail, Context, Result};
use image::ImageFormat;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::config::Config;
use crate::inference::response::{parse_response, ParsedResponse};

/// Form fields sent alongside the image
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceParams {
    pub model: String,
    pub imgsz: u32,
    pub conf: f32,
    pub iou: f32,
}

impl InferenceParams {
    fn form_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("model", self.model.clone()),
            ("imgsz", self.imgsz.to_string()),
            ("conf", self.conf.to_string()),
            ("iou", self.iou.to_string()),
        ]
    }
}

/// Body returned by the endpoint, raw and decoded
#[derive(Debug, Clone)]
pub struct InferenceResponse {
    pub raw: String,
    pub parsed: ParsedResponse,
}

/// Blocking client for the hosted detection endpoint
pub struct InferenceClient {
    agent: ureq::Agent,
    endpoint: String,
    api_key: String,
    params: InferenceParams,
}

impl InferenceClient {
    /// Build a client for `model` (a name from the config's model table or a model URL)
    pub fn from_config(config: &Config, model: Option<&str>) -> Result<Self> {
        let api_key = config.require_api_key()?.to_string();
        let params = InferenceParams {
            model: config.resolve_model(model)?,
            imgsz: config.imgsz,
            conf: config.conf,
            iou: config.iou,
        };
        Ok(Self::new(&config.endpoint, api_key, params, config.timeout))
    }

    pub fn new(endpoint: &str, api_key: String, params: InferenceParams, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            endpoint: endpoint.to_string(),
            api_key,
            params,
        }
    }

    pub fn params(&self) -> &InferenceParams {
        &self.params
    }

    /// Upload an encoded image and decode the detections
    pub fn predict(&self, image_bytes: &[u8], file_name: &str) -> Result<InferenceResponse> {
        let boundary = make_boundary();
        let content_type = ImageFormat::from_path(Path::new(file_name))
            .map(|f| f.to_mime_type())
            .unwrap_or("application/octet-stream");
        let body = multipart_body(
            &boundary,
            &self.params.form_fields(),
            file_name,
            content_type,
            image_bytes,
        );

        log::info!(
            "Sending {} ({} bytes) to {} with model {}",
            file_name,
            image_bytes.len(),
            self.endpoint,
            self.params.model
        );

        let response = match self
            .agent
            .post(&self.endpoint)
            .set("x-api-key", &self.api_key)
            .set(
                "Content-Type",
                &format!("multipart/form-data; boundary={}", boundary),
            )
            .send_bytes(&body)
        {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                let detail = response.into_string().unwrap_or_default();
                bail!("Inference endpoint returned HTTP {}: {}", code, detail.trim());
            }
            Err(e) => bail!("Failed to reach {}: {}", self.endpoint, e),
        };

        let raw = response
            .into_string()
            .context("Failed to read inference response")?;
        let parsed = parse_response(&raw)?;

        log::info!(
            "Received {} detections ({} rejected)",
            parsed.detections.len(),
            parsed.rejected.len()
        );

        Ok(InferenceResponse { raw, parsed })
    }
}

fn make_boundary() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("----radai-{:x}", nanos)
}

/// Encode form fields and one file part as `multipart/form-data`
pub fn multipart_body(
    boundary: &str,
    fields: &[(&str, String)],
    file_name: &str,
    content_type: &str,
    file_bytes: &[u8],
) -> Vec<u8> {
    let mut body = Vec::with_capacity(file_bytes.len() + 512);

    for (name, value) in fields {
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            file_name.replace('"', "")
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(file_bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    body
}
