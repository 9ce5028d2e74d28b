//! Provider payload shapes and the normalized assessment built from them.

use crate::neo::error::InvalidRecordError;
use crate::neo::risk::RiskScore;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Body of a NeoWs `feed` response.
///
/// Records are grouped by calendar date. A `BTreeMap` keeps the buckets in
/// ascending date order so flattening is deterministic.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NeoFeedResponse {
    #[serde(default)]
    pub element_count: u64,
    pub near_earth_objects: BTreeMap<String, Vec<FeedEntry>>,
}

impl NeoFeedResponse {
    /// Number of records across all date buckets.
    pub fn record_count(&self) -> usize {
        self.near_earth_objects.values().map(Vec::len).sum()
    }
}

/// One element of a date bucket.
///
/// Entries are decoded one at a time, so a record that does not fit
/// [`NeoRaw`] is kept as `Malformed` instead of failing the whole payload.
#[derive(Debug, Clone)]
pub enum FeedEntry {
    Record(NeoRaw),
    Malformed { id: String, reason: String },
}

impl FeedEntry {
    /// Provider id, or the best guess at it for a malformed entry.
    pub fn id(&self) -> &str {
        match self {
            FeedEntry::Record(neo) => &neo.id,
            FeedEntry::Malformed { id, .. } => id,
        }
    }

    pub fn record(&self) -> Result<&NeoRaw, InvalidRecordError> {
        match self {
            FeedEntry::Record(neo) => Ok(neo),
            FeedEntry::Malformed { reason, .. } => Err(InvalidRecordError::Shape(reason.clone())),
        }
    }
}

impl<'de> Deserialize<'de> for FeedEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match NeoRaw::deserialize(&value) {
            Ok(neo) => Ok(FeedEntry::Record(neo)),
            Err(e) => {
                let id = match &value["id"] {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    _ => "<unknown>".to_string(),
                };
                Ok(FeedEntry::Malformed {
                    id,
                    reason: e.to_string(),
                })
            }
        }
    }
}

/// A single near-earth object as the provider reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct NeoRaw {
    pub id: String,
    pub name: String,
    pub absolute_magnitude_h: Option<NumericText>,
    pub estimated_diameter: Option<EstimatedDiameterRaw>,
    pub is_potentially_hazardous_asteroid: Option<bool>,
    #[serde(default)]
    pub close_approach_data: Vec<CloseApproachRaw>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EstimatedDiameterRaw {
    pub kilometers: Option<DiameterRangeRaw>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiameterRangeRaw {
    pub estimated_diameter_min: Option<NumericText>,
    pub estimated_diameter_max: Option<NumericText>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CloseApproachRaw {
    pub close_approach_date: Option<String>,
    pub close_approach_date_full: Option<String>,
    pub relative_velocity: Option<RelativeVelocityRaw>,
    pub miss_distance: Option<MissDistanceRaw>,
    pub orbiting_body: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelativeVelocityRaw {
    pub kilometers_per_hour: Option<NumericText>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MissDistanceRaw {
    pub kilometers: Option<NumericText>,
}

/// A number the provider may send either as a JSON number or as text
/// (`"58032.1234"`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumericText {
    Number(f64),
    Text(String),
}

impl NumericText {
    pub fn parse(&self) -> Option<f64> {
        match self {
            NumericText::Number(n) => Some(*n),
            NumericText::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn raw(&self) -> String {
        match self {
            NumericText::Number(n) => n.to_string(),
            NumericText::Text(s) => s.clone(),
        }
    }
}

/// Scored, presentation-ready view of one object.
///
/// Serialized with the field names the existing dashboard consumes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub id: String,
    pub name: String,
    pub is_hazardous: bool,
    pub absolute_magnitude: Option<f64>,
    pub estimated_diameter_km: DiameterKm,
    #[serde(rename = "close_approach_data")]
    pub close_approach: CloseApproach,
    #[serde(flatten)]
    pub risk: RiskScore,
}

impl RiskAssessment {
    pub fn risk_score(&self) -> f64 {
        self.risk.score()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DiameterKm {
    pub min: f64,
    pub max: f64,
}

/// First close-approach event of an object. Velocity and distance are kept
/// both as the numbers used for scoring and as two-decimal display strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CloseApproach {
    pub date: String,
    #[serde(rename = "velocity_kmh")]
    pub velocity_kmh_display: String,
    #[serde(rename = "velocity_kmh_value")]
    pub velocity_kmh: f64,
    #[serde(rename = "miss_distance_km")]
    pub miss_distance_km_display: String,
    #[serde(rename = "miss_distance_km_value")]
    pub miss_distance_km: f64,
    pub orbiting_body: String,
}
