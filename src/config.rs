use crate::models::{ComparisonRequest, Refinement, TranslationRequest};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Maximum words accepted for a comparison message
pub const MAX_COMPARISON_WORDS: usize = 40;
/// Maximum words accepted for a single translation message
pub const MAX_TRANSLATION_WORDS: usize = 160;

/// Friendly model names and the identifiers the backend expects
const MODEL_ALIASES: &[(&str, &str)] = &[
    ("gpt-4o-mini", "gpt-4o-mini"),
    ("gemini-pro", "gemini-1.5-pro-latest"),
    ("gemini-flash", "gemini-1.5-flash-latest"),
    ("deepl", "deepl"),
];

/// Languages the backend knows how to translate between
pub const KNOWN_LANGUAGES: &[&str] = &[
    "arabic",
    "dutch",
    "english",
    "farsi",
    "french",
    "german",
    "greek",
    "hebrew",
    "hindi",
    "italian",
    "japanese",
    "korean",
    "mandarin",
    "polish",
    "portuguese",
    "russian",
    "spanish",
    "swedish",
    "thai",
    "turkish",
    "vietnamese",
    "yiddish",
];

/// Translation backend settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Base URL of the translation backend
    pub api_endpoint: String,
    /// Rate limit for backend requests per second
    #[serde(default = "default_rate_limit")]
    pub rate_limit_rps: f64,
    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Local document store settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StorageConfig {
    /// JSON-lines file holding stored comparisons and translations
    #[serde(default)]
    pub path: Option<String>,
}

/// A multi-model comparison to run
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ComparisonConfig {
    /// Optional label shown in the output
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default = "default_source_language")]
    pub source_language: String,
    #[serde(default = "default_destination_language")]
    pub destination_language: String,
    /// Text to translate and compare
    pub message: String,
    /// Candidate models, by alias or backend identifier
    pub selected_models: Vec<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

/// A single-model translation to run
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranslationConfig {
    #[serde(default = "default_translation_model")]
    pub model: String,
    #[serde(default = "default_source_language")]
    pub source_language: String,
    #[serde(default = "default_destination_language")]
    pub destination_language: String,
    pub message: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Rewrites to request after the first translation
    #[serde(default)]
    pub refinements: Vec<Refinement>,
}

fn default_rate_limit() -> f64 {
    1.0
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_temperature() -> f64 {
    0.3
}

fn default_source_language() -> String {
    "english".to_string()
}

fn default_destination_language() -> String {
    "french".to_string()
}

fn default_translation_model() -> String {
    "gemini-1.5-flash-latest".to_string()
}

/// Root configuration of a run file
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub backend: BackendConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub comparisons: Vec<ComparisonConfig>,
    #[serde(default)]
    pub translations: Vec<TranslationConfig>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.display()))
    }

    /// Check every entry before anything is sent to the backend
    pub fn validate(&self) -> Result<()> {
        self.backend.validate()?;
        for (i, comparison) in self.comparisons.iter().enumerate() {
            comparison
                .validate()
                .with_context(|| format!("Invalid comparison #{}", i + 1))?;
        }
        for (i, translation) in self.translations.iter().enumerate() {
            translation
                .validate()
                .with_context(|| format!("Invalid translation #{}", i + 1))?;
        }
        Ok(())
    }
}

impl BackendConfig {
    pub fn validate(&self) -> Result<()> {
        let rps = self.rate_limit_rps;
        if !rps.is_finite() {
            anyhow::bail!("[backend] rate_limit_rps must be a finite number (got {})", rps);
        }
        if rps > 0.0 && Duration::try_from_secs_f64(1.0 / rps).is_err() {
            anyhow::bail!("[backend] rate_limit_rps is too small (got {})", rps);
        }
        Ok(())
    }
}

impl ComparisonConfig {
    pub fn validate(&self) -> Result<()> {
        validate_message(&self.message, MAX_COMPARISON_WORDS)?;
        validate_languages(&self.source_language, &self.destination_language)?;
        validate_temperature(self.temperature)?;
        if self.selected_models.is_empty() {
            anyhow::bail!("Please select at least one model for comparison");
        }
        Ok(())
    }

    /// Build the backend request, resolving model aliases
    pub fn to_request(&self) -> ComparisonRequest {
        ComparisonRequest {
            source_language: self.source_language.to_lowercase(),
            destination_language: self.destination_language.to_lowercase(),
            message: self.message.clone(),
            selected_models: self
                .selected_models
                .iter()
                .map(|m| resolve_model(m).to_string())
                .collect(),
            temperature_value: self.temperature,
        }
    }
}

impl TranslationConfig {
    pub fn validate(&self) -> Result<()> {
        validate_message(&self.message, MAX_TRANSLATION_WORDS)?;
        validate_languages(&self.source_language, &self.destination_language)?;
        validate_temperature(self.temperature)
    }

    /// Build the first-pass backend request
    pub fn to_request(&self) -> TranslationRequest {
        TranslationRequest {
            model_choice: resolve_model(&self.model).to_string(),
            temperature_value: self.temperature,
            source_language: self.source_language.to_lowercase(),
            destination_language: self.destination_language.to_lowercase(),
            message: self.message.clone(),
            translation_text: String::new(),
            more_formal: false,
            less_formal: false,
            simpler: false,
            shorter: false,
        }
    }
}

/// Map a friendly model name to its backend identifier.
/// Unknown names are passed through unchanged.
pub fn resolve_model(name: &str) -> &str {
    MODEL_ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map_or(name, |(_, id)| *id)
}

fn validate_message(message: &str, max_words: usize) -> Result<()> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        anyhow::bail!("Please enter the message");
    }
    let words = trimmed.split_whitespace().count();
    if words > max_words {
        anyhow::bail!(
            "The message must be less than {} words (got {})",
            max_words,
            words
        );
    }
    Ok(())
}

fn validate_languages(source: &str, destination: &str) -> Result<()> {
    for language in [source, destination] {
        let lowered = language.to_lowercase();
        if !KNOWN_LANGUAGES.contains(&lowered.as_str()) {
            anyhow::bail!("Unsupported language: {}", language);
        }
    }
    Ok(())
}

fn validate_temperature(temperature: f64) -> Result<()> {
    if !(0.0..=2.0).contains(&temperature) {
        anyhow::bail!("Temperature must be between 0.0 and 2.0 (got {})", temperature);
    }
    Ok(())
}
