use thiserror::Error;

/// Failures raised while turning raw evaluation records into rankings.
///
/// Any of these aborts the whole aggregation; no partial output is produced.
#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("record {index}: evaluation payload is malformed: {source}")]
    MalformedEvaluation {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("record {index}: required field `{field}` is missing or empty")]
    InvalidRecord { index: usize, field: &'static str },

    #[error("invalid aggregation state: {0}")]
    InvalidState(String),
}
