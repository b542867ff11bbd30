pub mod client;
pub mod response;

pub use client::{InferenceClient, InferenceParams, InferenceResponse};
pub use response::{parse_response, ParsedResponse};
