//! `<provider>:<model>` identifiers and static capability profiles for
//! well-known chat models.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelIdError {
    #[error("model id '{0}' must have the form <provider>:<model-name>")]
    MissingSeparator(String),

    #[error("model id '{0}' has an empty provider")]
    EmptyProvider(String),

    #[error("model id '{0}' has an empty model name")]
    EmptyModel(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModelId {
    provider: String,
    model: String,
}

impl ModelId {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
        }
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Known capability profile for this model, if any.
    pub fn profile(&self) -> Option<ModelProfile> {
        ModelProfile::lookup(self)
    }
}

impl FromStr for ModelId {
    type Err = ModelIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (provider, model) = s
            .split_once(':')
            .ok_or_else(|| ModelIdError::MissingSeparator(s.to_string()))?;
        let (provider, model) = (provider.trim(), model.trim());
        if provider.is_empty() {
            return Err(ModelIdError::EmptyProvider(s.to_string()));
        }
        if model.is_empty() {
            return Err(ModelIdError::EmptyModel(s.to_string()));
        }
        Ok(Self::new(provider, model))
    }
}

impl TryFrom<String> for ModelId {
    type Error = ModelIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ModelId> for String {
    fn from(value: ModelId) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.model)
    }
}

/// Capability profile of a chat model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelProfile {
    pub max_input_tokens: u32,
    pub max_output_tokens: u32,
    pub tool_calling: bool,
    pub structured_output: bool,
    pub image_inputs: bool,
    pub reasoning_output: bool,
}

impl ModelProfile {
    pub fn lookup(id: &ModelId) -> Option<Self> {
        let profile = match (id.provider(), id.model()) {
            ("anthropic", model) if model.starts_with("claude-sonnet-4-5") => Self {
                max_input_tokens: 200_000,
                max_output_tokens: 64_000,
                tool_calling: true,
                structured_output: false,
                image_inputs: true,
                reasoning_output: true,
            },
            ("anthropic", model) if model.starts_with("claude-haiku-4-5") => Self {
                max_input_tokens: 200_000,
                max_output_tokens: 64_000,
                tool_calling: true,
                structured_output: false,
                image_inputs: true,
                reasoning_output: true,
            },
            ("openai", "gpt-5.1") | ("openai", "gpt-5") | ("openai", "gpt-5-mini") => Self {
                max_input_tokens: 272_000,
                max_output_tokens: 128_000,
                tool_calling: true,
                structured_output: true,
                image_inputs: true,
                reasoning_output: true,
            },
            ("openai", "gpt-4o-mini") => Self {
                max_input_tokens: 128_000,
                max_output_tokens: 16_384,
                tool_calling: true,
                structured_output: true,
                image_inputs: true,
                reasoning_output: false,
            },
            ("local", _) => Self {
                max_input_tokens: 8_192,
                max_output_tokens: 1_024,
                tool_calling: true,
                structured_output: false,
                image_inputs: false,
                reasoning_output: false,
            },
            _ => return None,
        };
        Some(profile)
    }
}
