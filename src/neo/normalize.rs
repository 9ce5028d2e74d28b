//! Flattens a date-grouped feed into a ranked list of assessments.

use crate::neo::error::{FeedFetchError, InvalidRecordError};
use crate::neo::feed::{DateRange, NeoFeedSource};
use crate::neo::risk;
use crate::neo::types::{CloseApproach, DiameterKm, NeoFeedResponse, NeoRaw, NumericText, RiskAssessment};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

/// What to do with a record that cannot be scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordPolicy {
    /// Drop the record, log it, keep the rest of the batch.
    #[default]
    Skip,
    /// Fail the whole batch.
    Reject,
}

impl FromStr for RecordPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(RecordPolicy::Skip),
            "reject" => Ok(RecordPolicy::Reject),
            other => Err(format!("expected 'skip' or 'reject', got '{other}'")),
        }
    }
}

/// Fetches a feed window and turns it into assessments sorted by risk,
/// highest first.
pub struct FeedNormalizer<S> {
    source: S,
    timeout: Duration,
    policy: RecordPolicy,
}

impl<S: NeoFeedSource> FeedNormalizer<S> {
    pub fn new(source: S, timeout: Duration, policy: RecordPolicy) -> Self {
        Self {
            source,
            timeout,
            policy,
        }
    }

    /// Fetches `[start, end]` and normalizes it.
    ///
    /// # Errors
    ///
    /// Any upstream failure (transport, status, body, timeout) fails the
    /// whole call; so does an invalid record under [`RecordPolicy::Reject`].
    #[tracing::instrument(skip_all, fields(%start, %end, policy = ?self.policy))]
    pub async fn normalize(
        &self,
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    ) -> Result<Vec<RiskAssessment>, FeedFetchError> {
        let range = DateRange::new(start, end)?;

        let payload = tokio::time::timeout(self.timeout, self.source.fetch_feed(range))
            .await
            .map_err(|_| FeedFetchError::Timeout(self.timeout))??;

        normalize_payload(&payload, self.policy)
    }
}

/// Flattens every date bucket, scores each record and sorts by risk score
/// descending. The sort is stable: equal scores keep their feed order.
pub fn normalize_payload(
    payload: &NeoFeedResponse,
    policy: RecordPolicy,
) -> Result<Vec<RiskAssessment>, FeedFetchError> {
    let mut assessments = Vec::with_capacity(payload.record_count());
    let mut skipped = 0usize;

    for entry in payload.near_earth_objects.values().flatten() {
        match entry.record().and_then(assess) {
            Ok(assessment) => assessments.push(assessment),
            Err(e) => match policy {
                RecordPolicy::Skip => {
                    warn!(neo_id = %entry.id(), error = %e, "Skipping invalid NEO record");
                    skipped += 1;
                }
                RecordPolicy::Reject => {
                    return Err(FeedFetchError::Rejected {
                        id: entry.id().to_string(),
                        source: e,
                    });
                }
            },
        }
    }

    assessments.sort_by(|a, b| b.risk_score().total_cmp(&a.risk_score()));

    info!(count = assessments.len(), skipped, "Feed normalized");
    Ok(assessments)
}

/// Scores a single raw record from its first close-approach event.
///
/// Objects can carry several approaches; only index 0 is considered.
pub fn assess(neo: &NeoRaw) -> Result<RiskAssessment, InvalidRecordError> {
    let approach = neo
        .close_approach_data
        .first()
        .ok_or(InvalidRecordError::MissingField("close_approach_data"))?;

    let diameter = neo
        .estimated_diameter
        .as_ref()
        .and_then(|d| d.kilometers.as_ref())
        .ok_or(InvalidRecordError::MissingField("estimated_diameter.kilometers"))?;
    let diameter_max = parse_numeric(
        "estimated_diameter_max",
        diameter.estimated_diameter_max.as_ref(),
    )?;
    let diameter_min = parse_numeric(
        "estimated_diameter_min",
        diameter.estimated_diameter_min.as_ref(),
    )?;
    let is_hazardous = neo
        .is_potentially_hazardous_asteroid
        .ok_or(InvalidRecordError::MissingField("is_potentially_hazardous_asteroid"))?;
    let absolute_magnitude = neo
        .absolute_magnitude_h
        .as_ref()
        .map(|h| parse_numeric("absolute_magnitude_h", Some(h)))
        .transpose()?;

    let velocity_kmh = parse_numeric(
        "kilometers_per_hour",
        approach
            .relative_velocity
            .as_ref()
            .and_then(|v| v.kilometers_per_hour.as_ref()),
    )?;
    let miss_distance_km = parse_numeric(
        "miss_distance.kilometers",
        approach.miss_distance.as_ref().and_then(|m| m.kilometers.as_ref()),
    )?;

    let date = approach
        .close_approach_date_full
        .clone()
        .or_else(|| approach.close_approach_date.clone())
        .ok_or(InvalidRecordError::MissingField("close_approach_date"))?;

    let risk = risk::score(
        diameter_max,
        velocity_kmh,
        miss_distance_km,
        is_hazardous,
    )?;

    Ok(RiskAssessment {
        id: neo.id.clone(),
        name: neo.name.clone(),
        is_hazardous,
        absolute_magnitude,
        estimated_diameter_km: DiameterKm {
            min: diameter_min,
            max: diameter_max,
        },
        close_approach: CloseApproach {
            date,
            velocity_kmh_display: format!("{velocity_kmh:.2}"),
            velocity_kmh,
            miss_distance_km_display: format!("{miss_distance_km:.2}"),
            miss_distance_km,
            orbiting_body: approach.orbiting_body.clone().unwrap_or_default(),
        },
        risk,
    })
}

fn parse_numeric(field: &'static str, value: Option<&NumericText>) -> Result<f64, InvalidRecordError> {
    let value = value.ok_or(InvalidRecordError::MissingField(field))?;
    value.parse().ok_or_else(|| InvalidRecordError::Unparseable {
        field,
        value: value.raw(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neo::risk::RiskLevel;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use serde_json::json;

    fn neo(id: &str, diameter_max: f64, kmh: &str, km: &str, hazardous: bool) -> serde_json::Value {
        json!({
            "id": id,
            "name": format!("({id})"),
            "absolute_magnitude_h": 21.3,
            "is_potentially_hazardous_asteroid": hazardous,
            "estimated_diameter": {
                "kilometers": {
                    "estimated_diameter_min": diameter_max / 2.0,
                    "estimated_diameter_max": diameter_max
                }
            },
            "close_approach_data": [{
                "close_approach_date": "2024-01-01",
                "close_approach_date_full": "2024-Jan-01 10:15",
                "relative_velocity": { "kilometers_per_hour": kmh },
                "miss_distance": { "kilometers": km },
                "orbiting_body": "Earth"
            }]
        })
    }

    fn payload(buckets: serde_json::Value) -> NeoFeedResponse {
        serde_json::from_value(json!({
            "element_count": 0,
            "near_earth_objects": buckets
        }))
        .unwrap()
    }

    #[test]
    fn test_empty_payload_yields_empty_list() {
        let result = normalize_payload(&payload(json!({})), RecordPolicy::Skip).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_flattens_all_buckets_and_sorts_descending() {
        let feed = payload(json!({
            "2024-01-01": [
                neo("low", 0.01, "1000.0", "90000000", false),
                neo("mid", 2.5, "36000.0", "7000000", false)
            ],
            "2024-01-02": [
                neo("high", 0.24, "58032.0", "4500000", true)
            ],
            "2024-01-03": []
        }));

        let result = normalize_payload(&feed, RecordPolicy::Skip).unwrap();

        assert_eq!(result.len(), feed.record_count());
        let ids: Vec<_> = result.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["high", "mid", "low"]);
        for pair in result.windows(2) {
            assert!(pair[0].risk_score() >= pair[1].risk_score());
        }
        assert_eq!(result[0].risk.level(), RiskLevel::Extreme);
    }

    #[test]
    fn test_equal_scores_keep_feed_order() {
        let feed = payload(json!({
            "2024-01-01": [neo("first", 0.1, "1000", "1000000000", false)],
            "2024-01-02": [neo("second", 0.1, "1000", "1000000000", false)]
        }));

        let result = normalize_payload(&feed, RecordPolicy::Skip).unwrap();
        let ids: Vec<_> = result.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[test]
    fn test_display_strings_are_two_decimals() {
        let record: NeoRaw =
            serde_json::from_value(neo("a", 0.3, "58032.123456", "4500000.987", false)).unwrap();

        let assessment = assess(&record).unwrap();

        assert_eq!(assessment.close_approach.velocity_kmh_display, "58032.12");
        assert_eq!(assessment.close_approach.velocity_kmh, 58032.123456);
        assert_eq!(assessment.close_approach.miss_distance_km_display, "4500000.99");
        assert_eq!(assessment.close_approach.date, "2024-Jan-01 10:15");
        assert_eq!(assessment.close_approach.orbiting_body, "Earth");
        assert_eq!(assessment.estimated_diameter_km.max, 0.3);
        assert_eq!(assessment.absolute_magnitude, Some(21.3));
    }

    #[test]
    fn test_only_first_close_approach_is_used() {
        let mut value = neo("multi", 0.1, "1000", "1000000", false);
        value["close_approach_data"]
            .as_array_mut()
            .unwrap()
            .push(json!({
                "close_approach_date": "2030-01-01",
                "relative_velocity": { "kilometers_per_hour": "999999" },
                "miss_distance": { "kilometers": "1" },
                "orbiting_body": "Mars"
            }));
        let record: NeoRaw = serde_json::from_value(value).unwrap();

        let assessment = assess(&record).unwrap();
        assert_eq!(assessment.close_approach.velocity_kmh, 1000.0);
        assert_eq!(assessment.close_approach.orbiting_body, "Earth");
    }

    #[test]
    fn test_zero_distance_skipped_under_skip_policy() {
        let feed = payload(json!({
            "2024-01-01": [
                neo("ok", 0.1, "1000", "1000000", false),
                neo("bad", 0.1, "1000", "0", false)
            ]
        }));

        let result = normalize_payload(&feed, RecordPolicy::Skip).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "ok");
    }

    #[test]
    fn test_zero_distance_fails_batch_under_reject_policy() {
        let feed = payload(json!({
            "2024-01-01": [
                neo("ok", 0.1, "1000", "1000000", false),
                neo("bad", 0.1, "1000", "0", false)
            ]
        }));

        let err = normalize_payload(&feed, RecordPolicy::Reject).unwrap_err();
        match err {
            FeedFetchError::Rejected { id, source } => {
                assert_eq!(id, "bad");
                assert_eq!(source, InvalidRecordError::NonPositiveDistance(0.0));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unparseable_velocity_is_reported() {
        let record: NeoRaw =
            serde_json::from_value(neo("a", 0.1, "very fast", "1000000", false)).unwrap();
        assert_eq!(
            assess(&record),
            Err(InvalidRecordError::Unparseable {
                field: "kilometers_per_hour",
                value: "very fast".to_string(),
            })
        );
    }

    #[test]
    fn test_missing_approach_is_reported() {
        let mut value = neo("a", 0.1, "1", "1", false);
        value["close_approach_data"] = json!([]);
        let record: NeoRaw = serde_json::from_value(value).unwrap();
        assert_eq!(
            assess(&record),
            Err(InvalidRecordError::MissingField("close_approach_data"))
        );
    }

    #[test]
    fn test_text_diameters_and_magnitude_are_parsed() {
        let mut value = neo("text", 0.1, "1000", "1000000", false);
        value["absolute_magnitude_h"] = json!("22.1");
        value["estimated_diameter"]["kilometers"] = json!({
            "estimated_diameter_min": "0.15",
            "estimated_diameter_max": "0.3"
        });
        let feed = payload(json!({ "2024-01-01": [value] }));

        let result = normalize_payload(&feed, RecordPolicy::Skip).unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].estimated_diameter_km.min, 0.15);
        assert_eq!(result[0].estimated_diameter_km.max, 0.3);
        assert_eq!(result[0].absolute_magnitude, Some(22.1));
    }

    #[test]
    fn test_wrongly_typed_record_is_skipped() {
        let mut broken = neo("broken", 0.1, "1000", "1000000", false);
        broken["is_potentially_hazardous_asteroid"] = json!("yes");
        let mut nameless = neo("nameless", 0.1, "1000", "1000000", false);
        nameless["name"] = json!(42);
        let feed = payload(json!({
            "2024-01-01": [neo("ok", 0.1, "1000", "1000000", false), broken, nameless]
        }));

        let result = normalize_payload(&feed, RecordPolicy::Skip).unwrap();

        let ids: Vec<_> = result.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["ok"]);
    }

    #[test]
    fn test_wrongly_typed_record_fails_batch_under_reject_policy() {
        let mut broken = neo("broken", 0.1, "1000", "1000000", false);
        broken["close_approach_data"] = json!("none");
        let feed = payload(json!({
            "2024-01-01": [neo("ok", 0.1, "1000", "1000000", false), broken]
        }));

        let err = normalize_payload(&feed, RecordPolicy::Reject).unwrap_err();
        match err {
            FeedFetchError::Rejected { id, source } => {
                assert_eq!(id, "broken");
                assert!(matches!(source, InvalidRecordError::Shape(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_diameter_block_is_skipped() {
        let mut value = neo("no-size", 0.1, "1000", "1000000", false);
        value.as_object_mut().unwrap().remove("estimated_diameter");
        let record: NeoRaw = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(
            assess(&record),
            Err(InvalidRecordError::MissingField("estimated_diameter.kilometers"))
        );

        let feed = payload(json!({
            "2024-01-01": [value, neo("ok", 0.1, "1000", "1000000", false)]
        }));
        let result = normalize_payload(&feed, RecordPolicy::Skip).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "ok");
    }

    #[test]
    fn test_missing_hazard_flag_is_not_read_as_false() {
        let mut value = neo("unflagged", 0.24, "58032", "4500000", true);
        value
            .as_object_mut()
            .unwrap()
            .remove("is_potentially_hazardous_asteroid");
        let record: NeoRaw = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(
            assess(&record),
            Err(InvalidRecordError::MissingField("is_potentially_hazardous_asteroid"))
        );

        let feed = payload(json!({ "2024-01-01": [value] }));
        assert!(normalize_payload(&feed, RecordPolicy::Skip).unwrap().is_empty());
    }

    #[test]
    fn test_policy_parses() {
        assert_eq!("Skip".parse::<RecordPolicy>(), Ok(RecordPolicy::Skip));
        assert_eq!("reject".parse::<RecordPolicy>(), Ok(RecordPolicy::Reject));
        assert!("ignore".parse::<RecordPolicy>().is_err());
    }

    struct StaticSource(NeoFeedResponse);

    #[async_trait]
    impl NeoFeedSource for StaticSource {
        async fn fetch_feed(&self, _range: DateRange) -> Result<NeoFeedResponse, FeedFetchError> {
            Ok(self.0.clone())
        }
    }

    struct HangingSource;

    #[async_trait]
    impl NeoFeedSource for HangingSource {
        async fn fetch_feed(&self, _range: DateRange) -> Result<NeoFeedResponse, FeedFetchError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(NeoFeedResponse::default())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl NeoFeedSource for FailingSource {
        async fn fetch_feed(&self, _range: DateRange) -> Result<NeoFeedResponse, FeedFetchError> {
            Err(FeedFetchError::Status {
                status: reqwest::StatusCode::BAD_GATEWAY,
                body: "upstream down".to_string(),
            })
        }
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[tokio::test]
    async fn test_normalize_uses_source() {
        let feed = payload(json!({
            "2024-01-01": [neo("a", 0.1, "1000", "1000000", false)]
        }));
        let normalizer =
            FeedNormalizer::new(StaticSource(feed), Duration::from_secs(5), RecordPolicy::Skip);

        let result = normalizer
            .normalize(day("2024-01-01"), day("2024-01-01"))
            .await
            .unwrap();
        assert_eq!(result.len(), 1);
    }

    #[tokio::test]
    async fn test_normalize_rejects_inverted_range_before_fetching() {
        let normalizer = FeedNormalizer::new(HangingSource, Duration::from_secs(5), RecordPolicy::Skip);

        let err = normalizer
            .normalize(day("2024-01-02"), day("2024-01-01"))
            .await
            .unwrap_err();
        assert!(matches!(err, FeedFetchError::InvalidRange { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_normalize_times_out() {
        let normalizer = FeedNormalizer::new(HangingSource, Duration::from_secs(5), RecordPolicy::Skip);

        let err = normalizer
            .normalize(day("2024-01-01"), day("2024-01-01"))
            .await
            .unwrap_err();
        assert!(matches!(err, FeedFetchError::Timeout(d) if d == Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn test_upstream_failure_returns_no_records() {
        let normalizer = FeedNormalizer::new(FailingSource, Duration::from_secs(5), RecordPolicy::Skip);

        let result = normalizer.normalize(day("2024-01-01"), day("2024-01-01")).await;
        assert!(matches!(result, Err(FeedFetchError::Status { .. })));
    }
}
