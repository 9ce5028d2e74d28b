use chrono::NaiveDate;
use reqwest::StatusCode;
use std::time::Duration;

/// A record that cannot be scored.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidRecordError {
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("field `{field}` is not a number: '{value}'")]
    Unparseable { field: &'static str, value: String },
    #[error("field `{0}` is not a finite number")]
    NonFinite(&'static str),
    #[error("field `{field}` must not be negative, got {value}")]
    Negative { field: &'static str, value: f64 },
    #[error("miss distance must be positive, got {0} km")]
    NonPositiveDistance(f64),
    #[error("record does not match the feed schema: {0}")]
    Shape(String),
}

/// Batch-level failure of a feed normalization. No partial list is ever
/// returned alongside one of these.
#[derive(Debug, thiserror::Error)]
pub enum FeedFetchError {
    #[error("start date {start} is after end date {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
    #[error("feed request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("feed provider returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("feed body could not be parsed: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("feed request timed out after {0:?}")]
    Timeout(Duration),
    #[error("record {id} rejected: {source}")]
    Rejected {
        id: String,
        #[source]
        source: InvalidRecordError,
    },
}
