//! Caption-then-translate pipeline over a local vision/language model server.
//!
//! An image is described in English by a vision model, then the description
//! is translated by a multilingual text model on the same server. Both calls
//! are blocking, single-attempt requests against an Ollama-compatible API.

mod catalog;
mod client;
mod config;
mod error;
mod image;
mod pipeline;
mod stage;
mod transport;

pub use catalog::{CaptionDetail, CaptionModel, TargetLanguage};
pub use client::{ModelClient, ModelRequest, ModelResponse};
pub use config::{DEFAULT_BASE_URL, DEFAULT_TRANSLATOR_MODEL, PipelineConfig};
pub use error::{ConfigError, PipelineError};
pub use image::{ImageFormat, ImagePayload};
pub use pipeline::{Pipeline, PipelineFailure, PipelineResult, PipelineStage, ServerStatus};
pub use stage::{CaptionStage, TranslationStage, translation_prompt};
pub use transport::{HttpReply, HttpTransport, Transport, TransportError};
