//! Credential-injecting [`HttpClient`](super::HttpClient) wrappers.
//!
//! The NeoWs feed takes its key as an `api_key` query parameter
//! ([`UrlParam`]); Gemini takes it as the `x-goog-api-key` header
//! ([`ApiKey`]).

mod api_key;
mod url_param;

pub use api_key::ApiKey;
pub use url_param::UrlParam;

/// A credential that cannot be placed on a request.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("invalid header name '{0}'")]
    HeaderName(String),
    #[error("credential for header '{0}' is not a valid header value")]
    HeaderValue(String),
}
