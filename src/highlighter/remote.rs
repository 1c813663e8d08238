//! Remote highlight service client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::{HighlightOptions, HighlightResult, ThemeSelection};
use crate::error::{HighlightError, Result};

/// Route served by the highlight service
pub const HIGHLIGHT_PATH: &str = "/api/_mdc/highlight";

/// Encoded code length at which requests switch from GET to POST
pub const POST_THRESHOLD: usize = 15 * 1024;

/// Length of `text` after URI-component percent-encoding
pub fn encoded_len(text: &str) -> usize {
    text.bytes()
        .map(|byte| match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => 1,
            _ => 3,
        })
        .sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMethod {
    Get,
    Post,
}

/// Arguments of one highlight call, also the POST body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightRequest {
    pub code: String,
    #[serde(default)]
    pub lang: String,
    #[serde(default)]
    pub theme: ThemeSelection,
    #[serde(default)]
    pub options: HighlightOptions,
}

impl HighlightRequest {
    pub fn new(code: &str, lang: &str, theme: &ThemeSelection, options: &HighlightOptions) -> Self {
        Self {
            code: code.to_string(),
            lang: lang.to_string(),
            theme: theme.clone(),
            options: options.clone(),
        }
    }

    /// GET while the encoded code stays under [`POST_THRESHOLD`]
    pub fn method(&self) -> TransportMethod {
        if encoded_len(&self.code) >= POST_THRESHOLD {
            TransportMethod::Post
        } else {
            TransportMethod::Get
        }
    }

    /// Query parameters for GET; `theme` and `options` are JSON-encoded
    pub fn query_params(&self) -> Result<[(&'static str, String); 4]> {
        Ok([
            ("code", self.code.clone()),
            ("lang", self.lang.clone()),
            ("theme", serde_json::to_string(&self.theme)?),
            ("options", serde_json::to_string(&self.options)?),
        ])
    }
}

/// Carries a highlight request to the remote service
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fails with [`HighlightError::TransportUnavailable`] when the service
    /// does not exist (404)
    async fn fetch(&self, request: &HighlightRequest) -> Result<HighlightResult>;
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpTransport {
    /// Client for `endpoint` (scheme and host, without the route)
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: format!("{}{}", endpoint.trim_end_matches('/'), HIGHLIGHT_PATH),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, request: &HighlightRequest) -> Result<HighlightResult> {
        let method = request.method();
        let builder = match method {
            TransportMethod::Get => self.client.get(&self.url).query(&request.query_params()?),
            TransportMethod::Post => self.client.post(&self.url).json(request),
        };

        let response = builder.send().await?;
        let status = response.status();
        tracing::debug!(?method, %status, lang = %request.lang, "remote highlight response");

        if status == StatusCode::NOT_FOUND {
            return Err(HighlightError::TransportUnavailable);
        }
        if !status.is_success() {
            return Err(HighlightError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}
