//! Ranking of raw evaluation records into per-input-text comparison groups.
//!
//! Records are grouped by input text, then by candidate model. Each model's
//! average is the plain mean of its scores; models and groups are ordered by
//! descending average with ties kept in first-encounter order.

use crate::error::AggregationError;
use crate::models::{AggregatedGroup, Evaluation, EvaluationDetail, EvaluationRecord, ModelRanking};
use std::collections::HashMap;

/// An evaluation record whose payload has been parsed and whose
/// required fields are known to be present.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecord {
    pub input_text: String,
    pub input_model: String,
    pub output_text: String,
    pub evaluating_model: String,
    pub evaluation: Evaluation,
}

impl ScoredRecord {
    /// Validate a raw record and parse its evaluation payload.
    ///
    /// `index` is the record's position in its batch and is only used
    /// for error reporting.
    pub fn try_from_record(index: usize, record: &EvaluationRecord) -> Result<Self, AggregationError> {
        require(index, "inputText", &record.input_text)?;
        require(index, "inputModel", &record.input_model)?;
        require(index, "model", &record.model)?;

        let evaluation: Evaluation = serde_json::from_str(&record.evaluation)
            .map_err(|source| AggregationError::MalformedEvaluation { index, source })?;

        Ok(Self {
            input_text: record.input_text.clone(),
            input_model: record.input_model.clone(),
            output_text: record.output_text.clone(),
            evaluating_model: record.model.clone(),
            evaluation,
        })
    }

    fn into_detail(self) -> EvaluationDetail {
        EvaluationDetail {
            score: self.evaluation.score,
            comment: self.evaluation.comment,
            translation: self.output_text,
            model_name: self.input_model,
            evaluating_model_name: self.evaluating_model,
        }
    }
}

fn require(index: usize, field: &'static str, value: &str) -> Result<(), AggregationError> {
    if value.is_empty() {
        return Err(AggregationError::InvalidRecord { index, field });
    }
    Ok(())
}

impl ModelRanking {
    /// Build a ranking entry, computing the mean score of `details`.
    pub fn from_details(
        model_name: String,
        details: Vec<EvaluationDetail>,
    ) -> Result<Self, AggregationError> {
        if details.is_empty() {
            return Err(AggregationError::InvalidState(format!(
                "model {} has no evaluation details",
                model_name
            )));
        }

        let sum: f64 = details.iter().map(|d| d.score).sum();
        let average = sum / details.len() as f64;

        Ok(Self {
            model_name,
            average,
            details,
        })
    }
}

/// Keyed buckets that remember the order in which keys first appeared.
struct OrderedBuckets<T> {
    index: HashMap<String, usize>,
    buckets: Vec<(String, T)>,
}

impl<T: Default> OrderedBuckets<T> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            buckets: Vec::new(),
        }
    }

    fn entry(&mut self, key: &str) -> &mut T {
        let slot = match self.index.get(key) {
            Some(&slot) => slot,
            None => {
                self.buckets.push((key.to_string(), T::default()));
                self.index.insert(key.to_string(), self.buckets.len() - 1);
                self.buckets.len() - 1
            }
        };
        &mut self.buckets[slot].1
    }

    fn into_vec(self) -> Vec<(String, T)> {
        self.buckets
    }
}

/// Rank a batch of raw evaluation records.
///
/// Every record is validated and parsed before any grouping happens, so a
/// single bad record fails the whole batch.
pub fn aggregate(records: &[EvaluationRecord]) -> Result<Vec<AggregatedGroup>, AggregationError> {
    let scored = records
        .iter()
        .enumerate()
        .map(|(index, record)| ScoredRecord::try_from_record(index, record))
        .collect::<Result<Vec<_>, _>>()?;

    aggregate_scored(scored)
}

/// Rank records that have already been validated.
pub fn aggregate_scored(records: Vec<ScoredRecord>) -> Result<Vec<AggregatedGroup>, AggregationError> {
    let mut groups: OrderedBuckets<OrderedBuckets<Vec<EvaluationDetail>>> = OrderedBuckets::new();

    for record in records {
        let models = groups.entry(&record.input_text);
        let details = models.entry(&record.input_model);
        details.push(record.into_detail());
    }

    let mut ranked = Vec::with_capacity(groups.buckets.len());
    for (input_text, models) in groups.into_vec() {
        let mut rankings = models
            .into_vec()
            .into_iter()
            .map(|(model_name, details)| ModelRanking::from_details(model_name, details))
            .collect::<Result<Vec<_>, _>>()?;

        // sort_by is stable: equal averages keep first-encounter order
        rankings.sort_by(|a, b| b.average.total_cmp(&a.average));

        ranked.push(AggregatedGroup {
            input_text,
            models: rankings,
        });
    }

    ranked.sort_by(|a, b| top_average(b).total_cmp(&top_average(a)));

    Ok(ranked)
}

fn top_average(group: &AggregatedGroup) -> f64 {
    group.models.first().map_or(f64::NEG_INFINITY, |m| m.average)
}

impl<T: Default> Default for OrderedBuckets<T> {
    fn default() -> Self {
        Self::new()
    }
}
