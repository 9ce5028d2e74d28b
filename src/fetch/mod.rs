//! Thin HTTP plumbing shared by the feed provider and the text generator.
//!
//! Every outbound call goes through an [`HttpClient`], so credentials can be
//! layered on with the wrappers in [`auth`] and tests can point the real
//! clients at a mock server.

mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;

use bytes::Bytes;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderValue};
use reqwest::{Method, Request, StatusCode, Url};

/// A client that could not be constructed from its configuration.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("http client: {0}")]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Credential(#[from] auth::CredentialError),
    #[error("invalid endpoint '{0}'")]
    Endpoint(String),
}

/// Status and body of a completed HTTP exchange.
///
/// Non-success statuses are not errors at this layer; each caller maps them
/// onto its own error type.
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: StatusCode,
    pub body: Bytes,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Body as lossy UTF-8, cut to `max_chars` for log and error messages.
    pub fn body_snippet(&self, max_chars: usize) -> String {
        let text = String::from_utf8_lossy(&self.body);
        let mut chars = text.chars();
        let truncated: String = chars.by_ref().take(max_chars).collect();
        if chars.next().is_some() {
            format!("{truncated}...")
        } else {
            truncated
        }
    }
}

/// Issues a `GET` for `url` and reads the whole body.
pub async fn get_bytes<C: HttpClient>(client: &C, url: Url) -> reqwest::Result<HttpReply> {
    let mut req = Request::new(Method::GET, url);
    req.headers_mut()
        .insert(ACCEPT, HeaderValue::from_static("application/json"));

    send(client, req).await
}

/// Issues a `POST` with an already-encoded JSON body and reads the whole reply.
pub async fn post_json<C: HttpClient>(
    client: &C,
    url: Url,
    body: Vec<u8>,
) -> reqwest::Result<HttpReply> {
    let mut req = Request::new(Method::POST, url);
    req.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    req.headers_mut()
        .insert(ACCEPT, HeaderValue::from_static("application/json"));
    *req.body_mut() = Some(body.into());

    send(client, req).await
}

async fn send<C: HttpClient>(client: &C, req: Request) -> reqwest::Result<HttpReply> {
    let resp = client.execute(req).await?;
    let status = resp.status();
    let body = resp.bytes().await?;
    Ok(HttpReply { status, body })
}
