//! Short natural-language advisories for a scored object.
//!
//! [`AdvisoryGenerator`] asks a [`TextGenerator`] (Gemini in production) for
//! a two-sentence report and, when that fails for any reason, answers from a
//! fixed pool of simulated reports instead. Callers always get a report.

pub mod fallback;
pub mod gemini;
pub mod generator;
pub mod prompt;

pub use fallback::FallbackPool;
pub use gemini::{GeminiClient, ModelInfo};
pub use generator::{AdvisoryGenerator, UnconfiguredGenerator};

use crate::neo::{RiskAssessment, RiskLevel};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Why a live advisory could not be produced. Never reaches the caller of
/// [`AdvisoryGenerator::generate`].
#[derive(Debug, thiserror::Error)]
pub enum AdvisoryGenerationError {
    #[error("no text-generation API key configured")]
    NotConfigured,
    #[error("generation request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("generation quota exhausted or rate limited: {0}")]
    RateLimited(String),
    #[error("generation endpoint returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("generation response could not be parsed: {0}")]
    Malformed(String),
    #[error("generation response contained no text")]
    Empty,
    #[error("generation timed out after {0:?}")]
    Timeout(Duration),
}

/// Prompt-in, text-out dependency.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, AdvisoryGenerationError>;
}

#[async_trait]
impl<T: TextGenerator + ?Sized> TextGenerator for Box<T> {
    async fn generate(&self, prompt: &str) -> Result<String, AdvisoryGenerationError> {
        (**self).generate(prompt).await
    }
}

#[async_trait]
impl<T: TextGenerator + ?Sized> TextGenerator for Arc<T> {
    async fn generate(&self, prompt: &str) -> Result<String, AdvisoryGenerationError> {
        (**self).generate(prompt).await
    }
}

/// The facts an advisory is written from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdvisoryRequest {
    pub id: Option<String>,
    pub name: String,
    pub diameter_km: f64,
    pub velocity_kmh: f64,
    pub miss_distance_km: f64,
    pub risk_level: RiskLevel,
}

impl From<&RiskAssessment> for AdvisoryRequest {
    fn from(a: &RiskAssessment) -> Self {
        Self {
            id: Some(a.id.clone()),
            name: a.name.clone(),
            diameter_km: a.estimated_diameter_km.max,
            velocity_kmh: a.close_approach.velocity_kmh,
            miss_distance_km: a.close_approach.miss_distance_km,
            risk_level: a.risk.level(),
        }
    }
}

/// Where an advisory's text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisoryOrigin {
    LiveGenerated,
    SimulatedFallback,
}

/// A finished advisory. Only the text is serialized; the origin is kept for
/// logs and tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdvisoryReport {
    #[serde(rename = "summary")]
    summary_text: String,
    #[serde(skip)]
    origin: AdvisoryOrigin,
}

impl AdvisoryReport {
    pub(crate) fn live(summary_text: String) -> Self {
        Self {
            summary_text,
            origin: AdvisoryOrigin::LiveGenerated,
        }
    }

    pub(crate) fn simulated(summary_text: &str) -> Self {
        Self {
            summary_text: summary_text.to_string(),
            origin: AdvisoryOrigin::SimulatedFallback,
        }
    }

    pub fn summary_text(&self) -> &str {
        &self.summary_text
    }

    pub fn origin(&self) -> AdvisoryOrigin {
        self.origin
    }
}
