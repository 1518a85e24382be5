use std::time::Duration;

use crate::error::ConfigError;

/// Default address of a locally running Ollama server.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:11434";
/// Default multilingual model used for translation.
pub const DEFAULT_TRANSLATOR_MODEL: &str = "qwen2:7b";

const DEFAULT_CAPTION_TIMEOUT: Duration = Duration::from_secs(180);
const DEFAULT_TRANSLATION_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

const ENV_BASE_URL: &str = "OLLAMA_HOST";
const ENV_TRANSLATOR_MODEL: &str = "TRANSLATOR_MODEL";
const ENV_CAPTION_TIMEOUT: &str = "CAPTION_TIMEOUT_SECS";
const ENV_TRANSLATION_TIMEOUT: &str = "TRANSLATION_TIMEOUT_SECS";

/// Settings shared by both pipeline stages.
///
/// Timeouts bound each network call on its own; there is no deadline for the
/// pipeline as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Base URL of the model server, without a trailing slash.
    pub base_url: String,
    /// Model used by the translation stage.
    pub translator_model: String,
    /// Timeout for the caption call.
    pub caption_timeout: Duration,
    /// Timeout for the translation call.
    pub translation_timeout: Duration,
    /// Timeout for the model listing used by the health check.
    pub health_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            translator_model: DEFAULT_TRANSLATOR_MODEL.to_string(),
            caption_timeout: DEFAULT_CAPTION_TIMEOUT,
            translation_timeout: DEFAULT_TRANSLATION_TIMEOUT,
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
        }
    }
}

impl PipelineConfig {
    /// Builds a configuration from the process environment, falling back to
    /// the defaults for unset variables.
    ///
    /// Reads `OLLAMA_HOST`, `TRANSLATOR_MODEL`, `CAPTION_TIMEOUT_SECS` and
    /// `TRANSLATION_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`PipelineConfig::from_env`] but reads variables through
    /// `lookup`, which keeps tests away from the real environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_BASE_URL) {
            config = config.with_base_url(non_empty(ENV_BASE_URL, url)?);
        }
        if let Some(model) = lookup(ENV_TRANSLATOR_MODEL) {
            config.translator_model = non_empty(ENV_TRANSLATOR_MODEL, model)?;
        }
        if let Some(secs) = lookup(ENV_CAPTION_TIMEOUT) {
            config.caption_timeout = parse_secs(ENV_CAPTION_TIMEOUT, secs)?;
        }
        if let Some(secs) = lookup(ENV_TRANSLATION_TIMEOUT) {
            config.translation_timeout = parse_secs(ENV_TRANSLATION_TIMEOUT, secs)?;
        }

        Ok(config)
    }

    /// Sets the model server URL; a trailing slash is dropped.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Sets the model used by the translation stage.
    pub fn with_translator_model(mut self, model: impl Into<String>) -> Self {
        self.translator_model = model.into();
        self
    }

    /// Sets the timeout for the caption call.
    pub fn with_caption_timeout(mut self, timeout: Duration) -> Self {
        self.caption_timeout = timeout;
        self
    }

    /// Sets the timeout for the translation call.
    pub fn with_translation_timeout(mut self, timeout: Duration) -> Self {
        self.translation_timeout = timeout;
        self
    }

    /// Sets the timeout for the health check.
    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }
}

fn non_empty(name: &'static str, value: String) -> Result<String, ConfigError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ConfigError::Empty { name });
    }
    Ok(value.to_string())
}

fn parse_secs(name: &'static str, value: String) -> Result<Duration, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidTimeout { name, value }),
    }
}
