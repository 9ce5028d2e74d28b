//! Output formatting and persistence for ranked assessments.
//!
//! Supports pretty-printing, JSON serialization, and CSV append.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::debug;

use crate::neo::{RiskAssessment, RiskLevel};
use csv::WriterBuilder;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// The ranked list as handed to the boundary.
#[derive(Debug, Serialize)]
pub struct RankedFeed<'a> {
    pub generated_at: DateTime<Utc>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub count: usize,
    pub data: &'a [RiskAssessment],
}

impl<'a> RankedFeed<'a> {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate, data: &'a [RiskAssessment]) -> Self {
        Self {
            generated_at: Utc::now(),
            start_date,
            end_date,
            count: data.len(),
            data,
        }
    }
}

/// One flattened CSV row per assessment.
#[derive(Debug, Serialize)]
struct AssessmentRow<'a> {
    timestamp: DateTime<Utc>,
    id: &'a str,
    name: &'a str,
    is_hazardous: bool,
    absolute_magnitude: Option<f64>,
    diameter_min_km: f64,
    diameter_max_km: f64,
    close_approach_date: &'a str,
    velocity_kmh: &'a str,
    miss_distance_km: &'a str,
    orbiting_body: &'a str,
    risk_score: f64,
    risk_level: RiskLevel,
}

impl<'a> AssessmentRow<'a> {
    fn new(timestamp: DateTime<Utc>, a: &'a RiskAssessment) -> Self {
        Self {
            timestamp,
            id: &a.id,
            name: &a.name,
            is_hazardous: a.is_hazardous,
            absolute_magnitude: a.absolute_magnitude,
            diameter_min_km: a.estimated_diameter_km.min,
            diameter_max_km: a.estimated_diameter_km.max,
            close_approach_date: &a.close_approach.date,
            velocity_kmh: &a.close_approach.velocity_kmh_display,
            miss_distance_km: &a.close_approach.miss_distance_km_display,
            orbiting_body: &a.close_approach.orbiting_body,
            risk_score: a.risk.score(),
            risk_level: a.risk.level(),
        }
    }
}

/// Logs assessments using Rust's debug pretty-print format.
pub fn print_pretty(assessments: &[RiskAssessment]) {
    for a in assessments {
        debug!("{:#?}", a);
    }
}

/// Writes `value` as JSON followed by a newline.
pub fn write_json<W: Write>(mut writer: W, value: &impl Serialize, pretty: bool) -> Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut writer, value)?;
    } else {
        serde_json::to_writer(&mut writer, value)?;
    }
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Appends one row per assessment to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_records(path: &str, assessments: &[RiskAssessment]) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, rows = assessments.len(), "Appending CSV records");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    let now = Utc::now();
    for a in assessments {
        writer.serialize(AssessmentRow::new(now, a))?;
    }
    writer.flush()?;

    Ok(())
}
