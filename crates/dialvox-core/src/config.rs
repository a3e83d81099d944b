//! Pipeline configuration (spec §6 "Configuration (recognized options)").
//!
//! Mirrors the `Settings`/`with_defaults`/`effective_*` shape used elsewhere
//! in this codebase: every field is optional so a partial TOML document (or
//! no document at all) still produces a usable configuration, and callers
//! read values through `effective_*` accessors rather than matching on
//! `Option` at every call site.

use serde::{Deserialize, Serialize};

/// Telephony audio is fixed at 16 kHz mono; this is not configurable, but is
/// carried on `PipelineConfig` so the rest of the pipeline has one source of
/// truth for it.
pub const SAMPLE_RATE_HZ: u32 = 16_000;

/// Default VAD decision boundary (midpoint of the documented 0.4-0.6 range).
pub const DEFAULT_SPEECH_THRESHOLD: f32 = 0.5;

/// Default debounce window count before a speech episode triggers barge-in.
pub const DEFAULT_MIN_SPEECH_WINDOWS: u32 = 10;

/// Default trailing-silence window count (~1.1s at 512 samples/32ms) before
/// an episode is considered finished.
pub const DEFAULT_MIN_SILENCE_WINDOWS: u32 = 35;

const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful phone assistant. Keep responses short and conversational.";

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub speech_threshold: Option<f32>,
    pub min_speech_windows: Option<u32>,
    pub min_silence_windows: Option<u32>,
    pub system_prompt: Option<String>,
    pub recognizer: RecognizerConfig,
    pub llm: LlmConfig,
    pub synthesizer: SynthesizerConfig,
    pub region: Option<String>,
}

impl PipelineConfig {
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            speech_threshold: Some(DEFAULT_SPEECH_THRESHOLD),
            min_speech_windows: Some(DEFAULT_MIN_SPEECH_WINDOWS),
            min_silence_windows: Some(DEFAULT_MIN_SILENCE_WINDOWS),
            system_prompt: Some(DEFAULT_SYSTEM_PROMPT.to_string()),
            recognizer: RecognizerConfig::default(),
            llm: LlmConfig::default(),
            synthesizer: SynthesizerConfig::default(),
            region: None,
        }
    }

    #[must_use]
    pub fn effective_speech_threshold(&self) -> f32 {
        self.speech_threshold.unwrap_or(DEFAULT_SPEECH_THRESHOLD)
    }

    #[must_use]
    pub fn effective_min_speech_windows(&self) -> u32 {
        self.min_speech_windows.unwrap_or(DEFAULT_MIN_SPEECH_WINDOWS)
    }

    #[must_use]
    pub fn effective_min_silence_windows(&self) -> u32 {
        self.min_silence_windows.unwrap_or(DEFAULT_MIN_SILENCE_WINDOWS)
    }

    #[must_use]
    pub fn effective_system_prompt(&self) -> &str {
        self.system_prompt.as_deref().unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }

    /// Load configuration from a TOML file, falling back to defaults for any
    /// field the file omits, then apply `DIALVOX_`-prefixed environment
    /// overrides (double-underscore nesting, e.g. `DIALVOX_LLM__API_KEY`).
    ///
    /// # Errors
    /// Returns an error if the file exists but is not valid TOML.
    pub fn load(path: &std::path::Path) -> Result<Self, crate::error::CoreError> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| crate::error::CoreError::Configuration(e.to_string()))?;
            toml::from_str(&raw)
                .map_err(|e| crate::error::CoreError::Configuration(e.to_string()))?
        } else {
            Self::with_defaults()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("DIALVOX_SPEECH_THRESHOLD") {
            if let Ok(v) = v.parse() {
                self.speech_threshold = Some(v);
            }
        }
        if let Ok(v) = std::env::var("DIALVOX_RECOGNIZER__API_KEY") {
            self.recognizer.api_key = Some(v);
        }
        if let Ok(v) = std::env::var("DIALVOX_RECOGNIZER__ENDPOINT") {
            self.recognizer.endpoint = Some(v);
        }
        if let Ok(v) = std::env::var("DIALVOX_LLM__API_KEY") {
            self.llm.api_key = Some(v);
        }
        if let Ok(v) = std::env::var("DIALVOX_LLM__ENDPOINT") {
            self.llm.endpoint = Some(v);
        }
        if let Ok(v) = std::env::var("DIALVOX_LLM__MODEL_ID") {
            self.llm.model_id = Some(v);
        }
        if let Ok(v) = std::env::var("DIALVOX_SYNTHESIZER__API_KEY") {
            self.synthesizer.api_key = Some(v);
        }
        if let Ok(v) = std::env::var("DIALVOX_SYNTHESIZER__ENDPOINT") {
            self.synthesizer.endpoint = Some(v);
        }
        if let Ok(v) = std::env::var("DIALVOX_SYNTHESIZER__VOICE_ID") {
            self.synthesizer.voice_id = Some(v);
        }
    }
}

/// Streaming recognizer collaborator configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecognizerConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub language: Option<String>,
}

/// Streaming LLM collaborator configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub model_id: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// Request-response synthesizer collaborator configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SynthesizerConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub voice_id: Option<String>,
    pub language: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_values() {
        let cfg = PipelineConfig::with_defaults();
        assert!((cfg.effective_speech_threshold() - 0.5).abs() < f32::EPSILON);
        assert_eq!(cfg.effective_min_speech_windows(), 10);
        assert_eq!(cfg.effective_min_silence_windows(), 35);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = PipelineConfig::load(std::path::Path::new("/nonexistent/dialvox.toml")).unwrap();
        assert_eq!(cfg.effective_min_speech_windows(), DEFAULT_MIN_SPEECH_WINDOWS);
    }

    #[test]
    fn partial_toml_fills_in_remaining_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dialvox.toml");
        std::fs::write(&path, "speech_threshold = 0.7\n").unwrap();
        let cfg = PipelineConfig::load(&path).unwrap();
        assert!((cfg.effective_speech_threshold() - 0.7).abs() < f32::EPSILON);
        assert_eq!(cfg.effective_min_silence_windows(), DEFAULT_MIN_SILENCE_WINDOWS);
    }
}
