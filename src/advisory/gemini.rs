//! Google Gemini `generateContent` adapter.

use crate::advisory::{AdvisoryGenerationError, TextGenerator};
use crate::config::{GeminiConfig, Secret};
use crate::fetch::auth::ApiKey;
use crate::fetch::{BasicClient, HttpClient, HttpReply, SetupError, get_bytes, post_json};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

const API_KEY_HEADER: &str = "x-goog-api-key";
const GENERATE_METHOD: &str = "generateContent";
const MAX_MODEL_PAGES: usize = 20;

/// Gemini client authenticated with the `x-goog-api-key` header.
pub struct GeminiClient<C = ApiKey<BasicClient>> {
    client: C,
    generate_url: Url,
    models_url: Url,
    model: String,
}

impl GeminiClient {
    pub fn from_config(config: &GeminiConfig, api_key: &Secret) -> Result<Self, SetupError> {
        let basic = BasicClient::with_timeout(config.timeout)?;
        let client = ApiKey::new(basic, API_KEY_HEADER, api_key.expose())?;
        Self::with_client(client, &config.endpoint, &config.model)
    }
}

impl<C: HttpClient> GeminiClient<C> {
    pub fn with_client(client: C, endpoint: &Url, model: &str) -> Result<Self, SetupError> {
        let base = endpoint.as_str().trim_end_matches('/');
        let generate = format!("{base}/v1beta/models/{model}:{GENERATE_METHOD}");
        let models = format!("{base}/v1beta/models");

        Ok(Self {
            client,
            generate_url: Url::parse(&generate).map_err(|_| SetupError::Endpoint(generate))?,
            models_url: Url::parse(&models).map_err(|_| SetupError::Endpoint(models))?,
            model: model.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Models visible to the key that support `generateContent`.
    #[tracing::instrument(skip(self))]
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, AdvisoryGenerationError> {
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_MODEL_PAGES {
            let mut url = self.models_url.clone();
            if let Some(token) = &page_token {
                url.query_pairs_mut().append_pair("pageToken", token);
            }

            let reply = check_status(get_bytes(&self.client, url).await?)?;
            let page: ModelPage = serde_json::from_slice(&reply.body)
                .map_err(|e| AdvisoryGenerationError::Malformed(e.to_string()))?;

            models.extend(
                page.models
                    .into_iter()
                    .filter(|m| m.supported_generation_methods.iter().any(|g| g == GENERATE_METHOD))
                    .map(ModelInfo::from),
            );

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        Ok(models)
    }
}

#[async_trait]
impl<C: HttpClient> TextGenerator for GeminiClient<C> {
    #[tracing::instrument(skip(self, prompt), fields(model = %self.model))]
    async fn generate(&self, prompt: &str) -> Result<String, AdvisoryGenerationError> {
        let payload = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });
        let body = serde_json::to_vec(&payload)
            .map_err(|e| AdvisoryGenerationError::Malformed(e.to_string()))?;

        let reply = check_status(post_json(&self.client, self.generate_url.clone(), body).await?)?;

        let value: Value = serde_json::from_slice(&reply.body)
            .map_err(|e| AdvisoryGenerationError::Malformed(e.to_string()))?;

        let candidate = value["candidates"]
            .as_array()
            .and_then(|c| c.first())
            .ok_or(AdvisoryGenerationError::Empty)?;

        if let Some(reason) = candidate["finishReason"].as_str() {
            debug!(finish_reason = reason, "Gemini candidate finished");
        }

        let text = candidate["content"]["parts"]
            .as_array()
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p["text"].as_str())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default();

        let text = text.trim();
        if text.is_empty() {
            return Err(AdvisoryGenerationError::Empty);
        }
        Ok(text.to_string())
    }
}

fn check_status(reply: HttpReply) -> Result<HttpReply, AdvisoryGenerationError> {
    if reply.is_success() {
        return Ok(reply);
    }
    if reply.status == StatusCode::TOO_MANY_REQUESTS {
        return Err(AdvisoryGenerationError::RateLimited(reply.body_snippet(320)));
    }
    Err(AdvisoryGenerationError::Status {
        status: reply.status,
        body: reply.body_snippet(320),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelPage {
    #[serde(default)]
    models: Vec<ModelEntry>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelEntry {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

/// A text-generation model available to the configured key.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ModelInfo {
    pub name: String,
    pub description: String,
}

impl From<ModelEntry> for ModelInfo {
    fn from(entry: ModelEntry) -> Self {
        let name = entry
            .name
            .strip_prefix("models/")
            .unwrap_or(&entry.name)
            .to_string();
        Self {
            name,
            description: entry.description,
        }
    }
}
