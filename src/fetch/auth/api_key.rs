use super::CredentialError;
use crate::fetch::client::HttpClient;
use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};

/// An [`HttpClient`] wrapper that injects an API key as an HTTP header.
///
/// The header name and value are validated once, at construction, so a bad
/// key surfaces at startup rather than on the first request.
pub struct ApiKey<C> {
    inner: C,
    header_name: HeaderName,
    key: HeaderValue,
}

impl<C> ApiKey<C> {
    pub fn new(inner: C, header_name: &str, key: &str) -> Result<Self, CredentialError> {
        let name = HeaderName::from_bytes(header_name.as_bytes())
            .map_err(|_| CredentialError::HeaderName(header_name.to_string()))?;
        let mut value = HeaderValue::from_str(key)
            .map_err(|_| CredentialError::HeaderValue(header_name.to_string()))?;
        value.set_sensitive(true);

        Ok(Self {
            inner,
            header_name: name,
            key: value,
        })
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for ApiKey<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        req.headers_mut()
            .insert(self.header_name.clone(), self.key.clone());
        self.inner.execute(req).await
    }
}
