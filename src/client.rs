use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::{
    error::PipelineError,
    transport::{HttpReply, Transport, TransportError},
};

const GENERATE_PATH: &str = "/api/generate";
const TAGS_PATH: &str = "/api/tags";

/// A single generation call against the model server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelRequest {
    /// Model identifier as known to the server.
    pub model_name: String,
    /// Instruction sent with the request.
    pub prompt: String,
    /// Base64 encoded image for vision models.
    pub image_payload: Option<String>,
    /// Streaming is not consumed; always false on the wire.
    pub stream: bool,
}

impl ModelRequest {
    /// Creates a non-streaming text-only request.
    pub fn text(model_name: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            prompt: prompt.into(),
            image_payload: None,
            stream: false,
        }
    }

    /// Attaches a base64 encoded image.
    pub fn with_image(mut self, image_base64: String) -> Self {
        self.image_payload = Some(image_base64);
        self
    }
}

/// Text produced by one generation call, plus call telemetry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelResponse {
    /// Generated text.
    pub text: String,
    /// HTTP status of the reply.
    pub raw_status: u16,
    /// Time spent waiting for the reply.
    pub latency: Duration,
}

#[derive(Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<[&'a str; 1]>,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateReply {
    response: String,
}

#[derive(Deserialize)]
struct ErrorReply {
    error: String,
}

#[derive(Deserialize)]
struct TagsReply {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Deserialize)]
struct TagEntry {
    name: String,
}

/// Request helper shared by both pipeline stages.
///
/// Serializes [`ModelRequest`]s to the server's wire format, sends them
/// through the injected [`Transport`] and maps every failure onto
/// [`PipelineError`]. Makes exactly one attempt per call.
#[derive(Clone, Debug)]
pub struct ModelClient<T> {
    transport: T,
    base_url: String,
}

impl<T: Transport> ModelClient<T> {
    /// Creates a client for the server at `base_url`.
    pub fn new(transport: T, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            transport,
            base_url,
        }
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Runs one generation call and returns the raw (untrimmed) model text.
    pub fn generate(
        &self,
        request: &ModelRequest,
        timeout: Duration,
    ) -> Result<ModelResponse, PipelineError> {
        let body = GenerateBody {
            model: &request.model_name,
            prompt: &request.prompt,
            images: request.image_payload.as_deref().map(|image| [image]),
            stream: request.stream,
        };
        let body = serde_json::to_string(&body)
            .map_err(|e| PipelineError::InvalidInput(format!("cannot encode request: {e}")))?;

        log::debug!(
            "Sending generate request to {} (model {}, image: {})",
            self.base_url,
            request.model_name,
            request.image_payload.is_some()
        );

        let start = Instant::now();
        let reply = self
            .transport
            .post_json(&self.url(GENERATE_PATH), body, timeout)
            .map_err(|e| map_transport_error(e, timeout))?;
        let latency = start.elapsed();

        let reply = check_status(reply)?;
        let decoded: GenerateReply = serde_json::from_str(&reply.body).map_err(|e| {
            PipelineError::MalformedResponse(format!(
                "generate reply from {}: {e}",
                request.model_name
            ))
        })?;

        log::debug!("Model {} answered in {:?}", request.model_name, latency);

        Ok(ModelResponse {
            text: decoded.response,
            raw_status: reply.status,
            latency,
        })
    }

    /// Lists the names of the models installed on the server.
    pub fn installed_models(&self, timeout: Duration) -> Result<Vec<String>, PipelineError> {
        let reply = self
            .transport
            .get(&self.url(TAGS_PATH), timeout)
            .map_err(|e| map_transport_error(e, timeout))?;
        let reply = check_status(reply)?;

        let tags: TagsReply = serde_json::from_str(&reply.body)
            .map_err(|e| PipelineError::MalformedResponse(format!("model listing: {e}")))?;

        Ok(tags.models.into_iter().map(|entry| entry.name).collect())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn map_transport_error(err: TransportError, timeout: Duration) -> PipelineError {
    match err {
        TransportError::Timeout => PipelineError::Timeout(timeout),
        TransportError::Connect(msg) | TransportError::Other(msg) => {
            PipelineError::ServerUnavailable(msg)
        }
    }
}

fn check_status(reply: HttpReply) -> Result<HttpReply, PipelineError> {
    if reply.is_success() {
        return Ok(reply);
    }

    // the server reports failures as {"error": "..."}; keep the raw body otherwise
    let body = match serde_json::from_str::<ErrorReply>(&reply.body) {
        Ok(err) => err.error,
        Err(_) => reply.body.trim().to_string(),
    };
    Err(PipelineError::ModelError {
        status: reply.status,
        body,
    })
}
