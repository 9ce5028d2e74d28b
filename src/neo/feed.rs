//! NeoWs feed provider: the date-range query and its HTTP implementation.

use crate::config::NeoFeedConfig;
use crate::fetch::auth::UrlParam;
use crate::fetch::{BasicClient, HttpClient, SetupError, get_bytes};
use crate::neo::error::FeedFetchError;
use crate::neo::types::NeoFeedResponse;
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Url;
use std::fmt;
use tracing::{debug, warn};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Inclusive calendar-date window for a feed query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, FeedFetchError> {
        if start > end {
            return Err(FeedFetchError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Fills in whichever bound the caller left out with `today`.
    pub fn resolve(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<Self, FeedFetchError> {
        Self::new(start.unwrap_or(today), end.unwrap_or(today))
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}..={}",
            self.start.format(DATE_FORMAT),
            self.end.format(DATE_FORMAT)
        )
    }
}

/// Abstraction over the upstream NEO feed.
#[async_trait]
pub trait NeoFeedSource: Send + Sync {
    /// Returns the raw, date-grouped payload for `range`.
    async fn fetch_feed(&self, range: DateRange) -> Result<NeoFeedResponse, FeedFetchError>;
}

/// HTTP client for the NeoWs `feed` endpoint.
pub struct NeoWsClient<C = UrlParam<BasicClient>> {
    client: C,
    url: Url,
}

impl NeoWsClient {
    /// Client that appends the configured key as `api_key` on every request.
    pub fn from_config(config: &NeoFeedConfig) -> Result<Self, SetupError> {
        let basic = BasicClient::with_timeout(config.timeout)?;
        let client = UrlParam::new(basic, "api_key", config.api_key.expose());
        Ok(Self::with_client(client, config.url.clone()))
    }
}

impl<C: HttpClient> NeoWsClient<C> {
    pub fn with_client(client: C, url: Url) -> Self {
        Self { client, url }
    }

    fn feed_url(&self, range: DateRange) -> Url {
        let mut url = self.url.clone();
        url.query_pairs_mut()
            .append_pair("start_date", &range.start.format(DATE_FORMAT).to_string())
            .append_pair("end_date", &range.end.format(DATE_FORMAT).to_string());
        url
    }
}

#[async_trait]
impl<C: HttpClient> NeoFeedSource for NeoWsClient<C> {
    #[tracing::instrument(skip_all, fields(range = %range))]
    async fn fetch_feed(&self, range: DateRange) -> Result<NeoFeedResponse, FeedFetchError> {
        let reply = get_bytes(&self.client, self.feed_url(range)).await?;

        if !reply.is_success() {
            return Err(FeedFetchError::Status {
                status: reply.status,
                body: reply.body_snippet(320),
            });
        }

        debug!(bytes = reply.body.len(), "Feed body received, parsing");
        let feed: NeoFeedResponse = serde_json::from_slice(&reply.body)?;

        let records = feed.record_count();
        if feed.element_count as usize != records {
            warn!(
                element_count = feed.element_count,
                records, "Provider element_count disagrees with grouped records"
            );
        }

        Ok(feed)
    }
}
