use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Raw evaluation record as returned by the backend, one per
/// (input text, candidate model, evaluating model) triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRecord {
    /// Original message being translated; the grouping key
    #[serde(default, deserialize_with = "null_as_empty")]
    pub input_text: String,
    /// Candidate model that produced the translation
    #[serde(default, deserialize_with = "null_as_empty")]
    pub input_model: String,
    /// Translation produced by the candidate model
    #[serde(default, deserialize_with = "null_as_empty")]
    pub output_text: String,
    /// Model that scored the translation
    #[serde(default, deserialize_with = "null_as_empty")]
    pub model: String,
    /// Serialized `{score, comment}` object
    #[serde(default, deserialize_with = "null_as_empty")]
    pub evaluation: String,
}

/// Treat an explicit JSON `null` like an absent field
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parsed evaluation payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Higher is better
    pub score: f64,
    /// Free text rationale
    pub comment: String,
}

/// One scored translation within a model ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationDetail {
    pub score: f64,
    pub comment: String,
    pub translation: String,
    pub model_name: String,
    pub evaluating_model_name: String,
}

/// A candidate model's mean score within a group and the details behind it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelRanking {
    pub model_name: String,
    pub average: f64,
    pub details: Vec<EvaluationDetail>,
}

/// All rankings for one input text, best model first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedGroup {
    pub input_text: String,
    pub models: Vec<ModelRanking>,
}

/// Body of a `POST /compareTranslate` request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonRequest {
    pub source_language: String,
    pub destination_language: String,
    pub message: String,
    pub selected_models: Vec<String>,
    pub temperature_value: f64,
}

/// Envelope returned by `POST /compareTranslate`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResponse {
    pub validated_translations: Vec<EvaluationRecord>,
}

/// Rewrites the backend can apply to a previous translation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Refinement {
    Simpler,
    Shorter,
    MoreFormal,
    LessFormal,
}

/// Body of a `POST /translate` request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationRequest {
    pub model_choice: String,
    pub temperature_value: f64,
    pub source_language: String,
    pub destination_language: String,
    pub message: String,
    /// Previous translation to refine; empty on a first pass
    pub translation_text: String,
    pub more_formal: bool,
    pub less_formal: bool,
    pub simpler: bool,
    pub shorter: bool,
}

impl TranslationRequest {
    /// Build a follow-up request that asks the backend to rewrite
    /// `previous` with the given refinements applied.
    pub fn refined(&self, previous: &str, refinements: &[Refinement]) -> Self {
        let mut next = Self {
            translation_text: previous.to_string(),
            more_formal: false,
            less_formal: false,
            simpler: false,
            shorter: false,
            ..self.clone()
        };
        for refinement in refinements {
            match refinement {
                Refinement::Simpler => next.simpler = true,
                Refinement::Shorter => next.shorter = true,
                Refinement::MoreFormal => next.more_formal = true,
                Refinement::LessFormal => next.less_formal = true,
            }
        }
        next
    }
}

/// Envelope returned by `POST /translate`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationResponse {
    pub translate: String,
}

/// Persisted comparison: the request parameters plus the ranked result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredComparison {
    #[serde(flatten)]
    pub request: ComparisonRequest,
    pub comparison: Vec<AggregatedGroup>,
    pub timestamp: DateTime<Utc>,
}

/// Persisted single-model translation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredTranslation {
    #[serde(flatten)]
    pub request: TranslationRequest,
    pub translation: String,
    pub timestamp: DateTime<Utc>,
}

/// Result of one `[[comparisons]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonOutcome {
    pub title: Option<String>,
    pub request: ComparisonRequest,
    pub groups: Vec<AggregatedGroup>,
    /// Previously stored comparisons for the same message
    pub history: Vec<StoredComparison>,
}

/// Result of one `[[translations]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationOutcome {
    pub request: TranslationRequest,
    pub translation: String,
}

/// Everything a run produced
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RunResults {
    pub translations: Vec<TranslationOutcome>,
    pub comparisons: Vec<ComparisonOutcome>,
}
