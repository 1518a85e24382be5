//! Fixed sets of caption models and target languages the pipeline accepts.

use std::{fmt, str::FromStr};

use crate::error::PipelineError;

const BRIEF_CAPTION_PROMPT: &str = "Describe the image in a single, short sentence in English.";
const EXHAUSTIVE_CAPTION_PROMPT: &str = concat!(
    "Provide a highly detailed and exhaustive description of the image. ",
    "List all visible objects, their actions, their spatial relationship, ",
    "and the overall context of the scene in English."
);

/// Vision models available for captioning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CaptionModel {
    /// Small, fast captioner.
    Fast,
    /// Larger model for detailed object analysis.
    Detailed,
}

impl CaptionModel {
    /// Every supported caption model.
    pub const ALL: [CaptionModel; 2] = [CaptionModel::Fast, CaptionModel::Detailed];

    /// Model identifier sent to the model server.
    pub fn id(&self) -> &'static str {
        match self {
            CaptionModel::Fast => "moondream:1.8b",
            CaptionModel::Detailed => "llava:latest",
        }
    }

    /// Human readable description for selection lists.
    pub fn label(&self) -> &'static str {
        match self {
            CaptionModel::Fast => "Fast Captioning (VLM)",
            CaptionModel::Detailed => "Detailed Object Analysis (VLM)",
        }
    }
}

impl fmt::Display for CaptionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for CaptionModel {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        CaptionModel::ALL
            .into_iter()
            .find(|model| model.id() == s)
            .ok_or_else(|| PipelineError::UnsupportedModel(s.to_string()))
    }
}

/// Languages the translation stage can target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TargetLanguage {
    English,
    Chinese,
    Amharic,
    French,
    Spanish,
}

impl TargetLanguage {
    /// Every supported target language.
    pub const ALL: [TargetLanguage; 5] = [
        TargetLanguage::English,
        TargetLanguage::Chinese,
        TargetLanguage::Amharic,
        TargetLanguage::French,
        TargetLanguage::Spanish,
    ];

    /// English name of the language, as embedded in the translation prompt.
    pub fn name(&self) -> &'static str {
        match self {
            TargetLanguage::English => "English",
            TargetLanguage::Chinese => "Chinese",
            TargetLanguage::Amharic => "Amharic",
            TargetLanguage::French => "French",
            TargetLanguage::Spanish => "Spanish",
        }
    }

    /// Low-resource languages get a one-sentence caption.
    pub fn is_low_resource(&self) -> bool {
        matches!(self, TargetLanguage::Amharic)
    }

    /// Captions are already English; no translation call is needed.
    pub fn needs_translation(&self) -> bool {
        !matches!(self, TargetLanguage::English)
    }

    /// Caption detail suited to this target language.
    pub fn caption_detail(&self) -> CaptionDetail {
        if self.is_low_resource() {
            CaptionDetail::Brief
        } else {
            CaptionDetail::Exhaustive
        }
    }
}

impl fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TargetLanguage {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        TargetLanguage::ALL
            .into_iter()
            .find(|lang| lang.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| PipelineError::UnsupportedLanguage(s.to_string()))
    }
}

/// How much the caption stage asks the vision model to say.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptionDetail {
    /// One short sentence.
    Brief,
    /// Every object, action and spatial relation.
    Exhaustive,
}

impl CaptionDetail {
    /// Captioning instruction for this level of detail.
    pub fn prompt(&self) -> &'static str {
        match self {
            CaptionDetail::Brief => BRIEF_CAPTION_PROMPT,
            CaptionDetail::Exhaustive => EXHAUSTIVE_CAPTION_PROMPT,
        }
    }
}
