//! JSON bodies exchanged between the chat page and the server.

use serde::{Deserialize, Deserializer, Serialize};

use crate::Sentiment;

/// Label sent back in place of a sentiment when a request fails.
pub const ERROR_LABEL: &str = "Error";

/// `POST /predict` body. A missing or `null` `text` field is an empty string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictRequest {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub text: String,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// `POST /predict` response.
///
/// On success `error` is omitted. On failure `label` is `"Error"`,
/// `probability` is `0.0`, and `error` carries a human-readable message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub label: String,
    pub probability: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PredictResponse {
    pub fn ok(label: Sentiment, probability: f32) -> Self {
        Self {
            label: label.to_string(),
            probability,
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            label: ERROR_LABEL.to_string(),
            probability: 0.0,
            error: Some(message.into()),
        }
    }
}

/// `GET /health` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
}
