use crate::advisory::prompt::build_prompt;
use crate::advisory::{
    AdvisoryGenerationError, AdvisoryReport, AdvisoryRequest, FallbackPool, TextGenerator,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{info, warn};

/// Produces an advisory for every request, live when possible and from the
/// fallback pool otherwise.
///
/// Each call is an independent attempt; concurrent requests for the same
/// object are not coalesced.
pub struct AdvisoryGenerator<G> {
    generator: G,
    timeout: Duration,
    pool: FallbackPool,
}

impl<G: TextGenerator> AdvisoryGenerator<G> {
    pub fn new(generator: G, timeout: Duration) -> Self {
        Self {
            generator,
            timeout,
            pool: FallbackPool::standard(),
        }
    }

    pub fn with_pool(mut self, pool: FallbackPool) -> Self {
        self.pool = pool;
        self
    }

    pub fn pool(&self) -> &FallbackPool {
        &self.pool
    }

    /// Never fails. Generation errors are logged and replaced by a simulated
    /// report.
    #[tracing::instrument(skip(self, request), fields(neo_id = ?request.id, neo_name = %request.name))]
    pub async fn generate(&self, request: &AdvisoryRequest) -> AdvisoryReport {
        match self.attempt(request).await {
            Ok(text) => {
                info!(origin = "live", "Advisory generated");
                AdvisoryReport::live(text)
            }
            Err(e) => {
                warn!(error = %e, origin = "simulated", "Advisory generation failed, serving simulated report");
                AdvisoryReport::simulated(self.pool.pick())
            }
        }
    }

    async fn attempt(&self, request: &AdvisoryRequest) -> Result<String, AdvisoryGenerationError> {
        let prompt = build_prompt(request);

        let text = tokio::time::timeout(self.timeout, self.generator.generate(&prompt))
            .await
            .map_err(|_| AdvisoryGenerationError::Timeout(self.timeout))??;

        let text = text.trim();
        if text.is_empty() {
            return Err(AdvisoryGenerationError::Empty);
        }
        Ok(text.to_string())
    }
}

/// Stand-in used when no API key is configured; every attempt fails, so
/// every advisory is simulated.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredGenerator;

#[async_trait]
impl TextGenerator for UnconfiguredGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, AdvisoryGenerationError> {
        Err(AdvisoryGenerationError::NotConfigured)
    }
}
