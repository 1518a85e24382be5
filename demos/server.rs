use argh::FromArgs;
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use std::sync::Arc;
use vlm_relay::{
    CaptionModel, HttpTransport, Pipeline, PipelineConfig, PipelineError, PipelineFailure,
    PipelineStage, ServerStatus, TargetLanguage,
};

mod messages;

// defaults for the server
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 5000;

type AppState = Arc<Pipeline<HttpTransport>>;
type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(FromArgs)]
/// Relay server: captions uploaded images and translates the caption.
struct ServerArgs {
    /// the host to run the server on
    #[argh(option, short = 'h', default = "DEFAULT_HOST.to_string()")]
    host: String,

    /// the port to run the server on
    #[argh(option, short = 'p', default = "DEFAULT_PORT")]
    port: u16,

    /// model server URL, overrides OLLAMA_HOST
    #[argh(option, short = 'm')]
    model_server: Option<String>,
}

async fn index(State(pipeline): State<AppState>) -> impl IntoResponse {
    let models: Vec<_> = CaptionModel::ALL
        .iter()
        .map(|model| json!({ "id": model.id(), "label": model.label() }))
        .collect();
    let languages: Vec<_> = TargetLanguage::ALL.iter().map(|lang| lang.name()).collect();

    Json(json!({
        "models": models,
        "languages": languages,
        "translator_model": pipeline.config().translator_model,
    }))
}

async fn health(State(pipeline): State<AppState>) -> impl IntoResponse {
    let status = tokio::task::spawn_blocking(move || pipeline.check_server()).await;

    match status {
        Ok(Ok(ServerStatus::Available)) => {
            (StatusCode::OK, Json(json!({ "status": "available" })))
        }
        Ok(Ok(ServerStatus::MissingModels(missing))) => (
            StatusCode::OK,
            Json(json!({ "status": "warning", "missing_models": missing })),
        ),
        Ok(Err(e)) => {
            log::warn!("Model server check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "error", "kind": e.kind(), "message": e.to_string() })),
            )
        }
        Err(e) => {
            log::error!("Health check task failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "error", "message": e.to_string() })),
            )
        }
    }
}

async fn generate(
    State(pipeline): State<AppState>,
    payload: Result<Json<messages::GenerateRequest>, JsonRejection>,
) -> impl IntoResponse {
    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(rejection) => {
            log::debug!("Rejected generate request: {}", rejection.body_text());
            return (StatusCode::BAD_REQUEST, Json(rejection_body(&rejection)));
        }
    };

    // both model calls block, keep them off the async workers
    let outcome = tokio::task::spawn_blocking(move || {
        pipeline.run_base64(&payload.image, &payload.model, &payload.language)
    })
    .await;

    match outcome {
        Ok(Ok(result)) => {
            log::info!(
                "Generated {} description with {}",
                result.target_language,
                result.selected_caption_model
            );
            (
                StatusCode::OK,
                Json(json!({ "status": "success", "response": result })),
            )
        }
        Ok(Err(failure)) => (status_for(&failure.error), Json(error_body(failure))),
        Err(e) => {
            log::error!("Pipeline task failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "error", "message": e.to_string() })),
            )
        }
    }
}

fn status_for(error: &PipelineError) -> StatusCode {
    match error {
        PipelineError::InvalidInput(_)
        | PipelineError::UnsupportedModel(_)
        | PipelineError::UnsupportedLanguage(_) => StatusCode::BAD_REQUEST,
        PipelineError::ServerUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        PipelineError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        PipelineError::ModelError { .. } | PipelineError::MalformedResponse(_) => {
            StatusCode::BAD_GATEWAY
        }
    }
}

fn error_body(failure: PipelineFailure) -> serde_json::Value {
    if failure.stage != PipelineStage::Validation {
        log::warn!("Request failed during {}: {}", failure.stage, failure.error);
    }
    let error = messages::ErrorResponse {
        kind: failure.error.kind().to_string(),
        stage: failure.stage.to_string(),
        message: failure.error.to_string(),
        partial_caption: failure.partial_caption,
    };
    json!({ "status": "error", "error": error })
}

fn rejection_body(rejection: &JsonRejection) -> serde_json::Value {
    let error = messages::ErrorResponse {
        kind: "invalid_input".to_string(),
        stage: PipelineStage::Validation.to_string(),
        message: format!("model, language and image are required: {}", rejection.body_text()),
        partial_caption: None,
    };
    json!({ "status": "error", "error": error })
}

/// Builds the HTTP pipeline off the async workers; the blocking client starts
/// a runtime of its own.
async fn build_pipeline(config: PipelineConfig) -> Result<AppState, BoxError> {
    let pipeline = tokio::task::spawn_blocking(move || Pipeline::http(config)).await??;
    Ok(Arc::new(pipeline))
}

fn app(pipeline: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/generate", post(generate))
        .with_state(pipeline)
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    env_logger::init();
    let args: ServerArgs = argh::from_env();

    let mut config = PipelineConfig::from_env()?;
    if let Some(url) = args.model_server {
        config = config.with_base_url(url);
    }

    // format the host and port
    let addr = format!("{}:{}", args.host, args.port);

    log::info!("Using model server at {}", config.base_url);
    let pipeline = build_pipeline(config).await?;

    log::info!("Listening on: {}", addr);
    log::info!("Press Ctrl+C to stop the server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(pipeline)).await?;

    Ok(())
}
