//! Near-earth-object feed ingestion and risk ranking.
//!
//! [`feed`] talks to the provider, [`normalize`] flattens its date-grouped
//! payload into [`RiskAssessment`]s, and [`risk`] holds the scoring
//! heuristic they are ranked by.

pub mod error;
pub mod feed;
pub mod normalize;
pub mod risk;
pub mod types;

pub use error::{FeedFetchError, InvalidRecordError};
pub use feed::{DateRange, NeoFeedSource, NeoWsClient};
pub use normalize::{FeedNormalizer, RecordPolicy, normalize_payload};
pub use risk::{RiskLevel, RiskScore};
pub use types::{FeedEntry, NeoFeedResponse, RiskAssessment};
