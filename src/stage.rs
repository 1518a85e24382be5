use std::time::Duration;

use crate::{
    catalog::{CaptionDetail, CaptionModel, TargetLanguage},
    client::{ModelClient, ModelRequest, ModelResponse},
    error::PipelineError,
    image::ImagePayload,
    transport::Transport,
};

/// Builds the instruction sent to the translator model.
pub fn translation_prompt(caption: &str, language: TargetLanguage) -> String {
    format!(
        "Translate the following English description into the {language} language. \
         Provide ONLY the translated text, nothing else. \
         Description:\n\n'{caption}'"
    )
}

/// Image to English description, using one of the vision models.
pub struct CaptionStage<'a, T> {
    client: &'a ModelClient<T>,
    timeout: Duration,
}

impl<'a, T: Transport> CaptionStage<'a, T> {
    /// Creates a caption stage with a per-call timeout.
    pub fn new(client: &'a ModelClient<T>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Captions `image` with `model`. The returned text is trimmed and never
    /// empty; image validity is guaranteed by [`ImagePayload`].
    pub fn run(
        &self,
        image: &ImagePayload,
        model: CaptionModel,
        detail: CaptionDetail,
    ) -> Result<ModelResponse, PipelineError> {
        let request = ModelRequest::text(model.id(), detail.prompt()).with_image(image.to_base64());
        let mut response = self.client.generate(&request, self.timeout)?;

        response.text = response.text.trim().to_string();
        if response.text.is_empty() {
            log::warn!("Caption model {} returned an empty description", model.id());
            return Err(PipelineError::MalformedResponse(format!(
                "{} returned an empty caption",
                model.id()
            )));
        }

        log::info!(
            "Captioned {} byte {} image with {} in {:?}",
            image.len(),
            image.format().mime_type(),
            model.id(),
            response.latency
        );
        Ok(response)
    }
}

/// English caption to target language, using the fixed translator model.
pub struct TranslationStage<'a, T> {
    client: &'a ModelClient<T>,
    model: &'a str,
    timeout: Duration,
}

impl<'a, T: Transport> TranslationStage<'a, T> {
    /// Creates a translation stage for `model` with a per-call timeout.
    pub fn new(client: &'a ModelClient<T>, model: &'a str, timeout: Duration) -> Self {
        Self {
            client,
            model,
            timeout,
        }
    }

    /// Translates `caption` into `language`. The returned text is trimmed and
    /// never empty.
    pub fn run(
        &self,
        caption: &str,
        language: TargetLanguage,
    ) -> Result<ModelResponse, PipelineError> {
        let caption = caption.trim();
        if caption.is_empty() {
            return Err(PipelineError::InvalidInput(
                "caption to translate is empty".into(),
            ));
        }

        let request = ModelRequest::text(self.model, translation_prompt(caption, language));
        let mut response = self.client.generate(&request, self.timeout)?;

        response.text = response.text.trim().to_string();
        if response.text.is_empty() {
            log::warn!("Translator {} produced no text for {}", self.model, language);
            return Err(PipelineError::MalformedResponse(format!(
                "{} produced no {} text",
                self.model, language
            )));
        }

        log::info!(
            "Translated caption to {} with {} in {:?}",
            language,
            self.model,
            response.latency
        );
        Ok(response)
    }
}
