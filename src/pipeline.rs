use std::{collections::BTreeSet, fmt};

use serde::Serialize;
use thiserror::Error;

use crate::{
    catalog::{CaptionModel, TargetLanguage},
    client::ModelClient,
    config::PipelineConfig,
    error::PipelineError,
    image::ImagePayload,
    stage::{CaptionStage, TranslationStage},
    transport::{HttpTransport, Transport},
};

/// Outcome of one successful pipeline run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PipelineResult {
    /// English description produced by the vision model.
    pub caption: String,
    /// Caption in the target language. Equal to `caption` for English.
    pub translation: String,
    /// Identifier of the vision model that produced the caption.
    pub selected_caption_model: String,
    /// English name of the target language.
    pub target_language: String,
}

/// Step of the pipeline a failure came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Input checks, before any network call.
    Validation,
    /// The vision model call.
    Caption,
    /// The translator model call.
    Translation,
}

impl PipelineStage {
    /// Lowercase name of the stage.
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Validation => "validation",
            PipelineStage::Caption => "caption",
            PipelineStage::Translation => "translation",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error side of a pipeline run.
///
/// When translation fails the caption that was already produced is kept in
/// `partial_caption`, so callers can still show it.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{stage} failed: {error}")]
pub struct PipelineFailure {
    /// Stage that failed.
    pub stage: PipelineStage,
    /// What went wrong.
    #[source]
    pub error: PipelineError,
    /// Caption produced before a translation failure.
    pub partial_caption: Option<String>,
}

impl PipelineFailure {
    fn at(stage: PipelineStage, error: PipelineError) -> Self {
        Self {
            stage,
            error,
            partial_caption: None,
        }
    }
}

/// Model availability reported by [`Pipeline::check_server`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServerStatus {
    /// Every required model is installed.
    Available,
    /// The server answers but lacks some of the models the pipeline needs.
    MissingModels(Vec<String>),
}

/// Caption-then-translate pipeline over an injected transport.
///
/// Holds no mutable state: a single instance can serve concurrent requests
/// from several worker threads when `T` is `Sync`.
pub struct Pipeline<T> {
    client: ModelClient<T>,
    config: PipelineConfig,
}

impl Pipeline<HttpTransport> {
    /// Creates a pipeline talking HTTP to `config.base_url`.
    pub fn http(config: PipelineConfig) -> Result<Self, PipelineError> {
        let transport =
            HttpTransport::new().map_err(|e| PipelineError::ServerUnavailable(e.to_string()))?;
        Ok(Self::new(config, transport))
    }
}

impl<T: Transport> Pipeline<T> {
    /// Creates a pipeline over `transport`.
    pub fn new(config: PipelineConfig, transport: T) -> Self {
        let client = ModelClient::new(transport, config.base_url.clone());
        Self { client, config }
    }

    /// Configuration the pipeline was built with.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Shared request helper used by both stages.
    pub fn client(&self) -> &ModelClient<T> {
        &self.client
    }

    /// Caption stage bound to this pipeline's client and timeout.
    pub fn caption_stage(&self) -> CaptionStage<'_, T> {
        CaptionStage::new(&self.client, self.config.caption_timeout)
    }

    /// Translation stage bound to this pipeline's client, model and timeout.
    pub fn translation_stage(&self) -> TranslationStage<'_, T> {
        TranslationStage::new(
            &self.client,
            &self.config.translator_model,
            self.config.translation_timeout,
        )
    }

    /// Runs the pipeline on raw image bytes with caller supplied identifiers.
    ///
    /// The image, model and language are all validated before any network
    /// call is made.
    pub fn run(
        &self,
        image: impl Into<Vec<u8>>,
        caption_model: &str,
        target_language: &str,
    ) -> Result<PipelineResult, PipelineFailure> {
        let image = ImagePayload::from_bytes(image)
            .map_err(|e| PipelineFailure::at(PipelineStage::Validation, e))?;
        self.run_checked(&image, caption_model, target_language)
    }

    /// Same as [`Pipeline::run`] for a base64 image, as posted by browsers.
    pub fn run_base64(
        &self,
        image_base64: &str,
        caption_model: &str,
        target_language: &str,
    ) -> Result<PipelineResult, PipelineFailure> {
        let image = ImagePayload::from_base64(image_base64)
            .map_err(|e| PipelineFailure::at(PipelineStage::Validation, e))?;
        self.run_checked(&image, caption_model, target_language)
    }

    fn run_checked(
        &self,
        image: &ImagePayload,
        caption_model: &str,
        target_language: &str,
    ) -> Result<PipelineResult, PipelineFailure> {
        let validate = |e| PipelineFailure::at(PipelineStage::Validation, e);
        let model = caption_model.parse::<CaptionModel>().map_err(validate)?;
        let language = target_language.parse::<TargetLanguage>().map_err(validate)?;
        self.run_typed(image, model, language)
    }

    /// Runs both stages in order. Translation only starts once a non-empty
    /// caption is available, and is skipped for English.
    pub fn run_typed(
        &self,
        image: &ImagePayload,
        model: CaptionModel,
        language: TargetLanguage,
    ) -> Result<PipelineResult, PipelineFailure> {
        log::debug!("Starting caption stage with {} for {}", model.id(), language);

        let caption = self
            .caption_stage()
            .run(image, model, language.caption_detail())
            .map_err(|e| {
                log::error!("Caption stage failed ({}): {}", model.id(), e);
                PipelineFailure::at(PipelineStage::Caption, e)
            })?
            .text;

        let translation = if language.needs_translation() {
            log::debug!("Starting translation stage to {}", language);
            self.translation_stage()
                .run(&caption, language)
                .map_err(|e| {
                    log::error!("Translation stage failed ({}): {}", language, e);
                    PipelineFailure {
                        stage: PipelineStage::Translation,
                        error: e,
                        partial_caption: Some(caption.clone()),
                    }
                })?
                .text
        } else {
            caption.clone()
        };

        Ok(PipelineResult {
            caption,
            translation,
            selected_caption_model: model.id().to_string(),
            target_language: language.name().to_string(),
        })
    }

    /// Checks that the model server is reachable and has every model the
    /// pipeline may call.
    pub fn check_server(&self) -> Result<ServerStatus, PipelineError> {
        let installed: BTreeSet<String> = self
            .client
            .installed_models(self.config.health_timeout)?
            .into_iter()
            .collect();

        let missing: Vec<String> = CaptionModel::ALL
            .iter()
            .map(|model| model.id())
            .chain(std::iter::once(self.config.translator_model.as_str()))
            .filter(|name| !installed.contains(*name))
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if missing.is_empty() {
            Ok(ServerStatus::Available)
        } else {
            log::warn!("Model server is missing models: {}", missing.join(", "));
            Ok(ServerStatus::MissingModels(missing))
        }
    }
}
