//! Heuristic danger score for a close approach.
//!
//! The score is not a physical impact probability. It exists to give a
//! stable, monotonic ordering: bigger, faster and closer objects rank higher,
//! and objects the provider already flags as potentially hazardous get a
//! 1.5x boost.

use crate::neo::error::InvalidRecordError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

pub const MAX_SCORE: f64 = 100.0;
const HAZARD_MULTIPLIER: f64 = 1.5;
const DISTANCE_SCALE_KM: f64 = 100_000_000.0;

/// Categorical bucket derived from a risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    Critical,
    Extreme,
}

impl RiskLevel {
    /// Maps a score onto its level. Lower bounds are exclusive.
    ///
    /// | Score        | Level    |
    /// |--------------|----------|
    /// | > 80         | Extreme  |
    /// | > 50         | Critical |
    /// | > 20         | Moderate |
    /// | <= 20        | Low      |
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s > 80.0 => RiskLevel::Extreme,
            s if s > 50.0 => RiskLevel::Critical,
            s if s > 20.0 => RiskLevel::Moderate,
            _ => RiskLevel::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Moderate => "Moderate",
            RiskLevel::Critical => "Critical",
            RiskLevel::Extreme => "Extreme",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "moderate" => Ok(RiskLevel::Moderate),
            "critical" => Ok(RiskLevel::Critical),
            "extreme" => Ok(RiskLevel::Extreme),
            other => Err(format!(
                "unknown risk level '{other}', expected one of: low, moderate, critical, extreme"
            )),
        }
    }
}

/// A score in `[0, 100]` together with its level.
///
/// Only [`score`] can build one, so the level always matches the score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskScore {
    #[serde(rename = "risk_score")]
    score: f64,
    #[serde(rename = "risk_level")]
    level: RiskLevel,
}

impl RiskScore {
    fn from_clamped(score: f64) -> Self {
        Self {
            score,
            level: RiskLevel::from_score(score),
        }
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn level(&self) -> RiskLevel {
        self.level
    }
}

/// Unrounded, unclamped score, including the hazard boost.
pub fn raw_score(
    diameter_max_km: f64,
    velocity_kmh: f64,
    miss_distance_km: f64,
    is_hazardous: bool,
) -> Result<f64, InvalidRecordError> {
    check_non_negative("estimated_diameter_max", diameter_max_km)?;
    check_non_negative("kilometers_per_hour", velocity_kmh)?;
    if !miss_distance_km.is_finite() {
        return Err(InvalidRecordError::NonFinite("miss_distance"));
    }
    if miss_distance_km <= 0.0 {
        return Err(InvalidRecordError::NonPositiveDistance(miss_distance_km));
    }

    let size_factor = diameter_max_km * 10.0;
    let velocity_factor = velocity_kmh / 1000.0;
    let distance_factor = DISTANCE_SCALE_KM / miss_distance_km;

    let raw = size_factor + velocity_factor + distance_factor;
    Ok(if is_hazardous {
        raw * HAZARD_MULTIPLIER
    } else {
        raw
    })
}

/// Scores one close approach: raw score rounded to two decimals, clamped to
/// `[0, 100]`, then bucketed.
///
/// # Errors
///
/// Returns [`InvalidRecordError`] for non-finite or negative inputs and for a
/// miss distance that is not strictly positive.
pub fn score(
    diameter_max_km: f64,
    velocity_kmh: f64,
    miss_distance_km: f64,
    is_hazardous: bool,
) -> Result<RiskScore, InvalidRecordError> {
    let raw = raw_score(diameter_max_km, velocity_kmh, miss_distance_km, is_hazardous)?;
    let rounded = (raw * 100.0).round() / 100.0;
    Ok(RiskScore::from_clamped(rounded.clamp(0.0, MAX_SCORE)))
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), InvalidRecordError> {
    if !value.is_finite() {
        return Err(InvalidRecordError::NonFinite(field));
    }
    if value < 0.0 {
        return Err(InvalidRecordError::Negative { field, value });
    }
    Ok(())
}
