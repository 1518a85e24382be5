use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerateRequest {
    /// caption model identifier, e.g. "moondream:1.8b"
    pub model: String,
    /// base64 encoded JPEG or PNG, optionally as a data URL
    pub image: String,
    pub language: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub kind: String,
    pub stage: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial_caption: Option<String>,
}
