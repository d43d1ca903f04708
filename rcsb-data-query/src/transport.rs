//! Sending synthesized GraphQL documents to the data endpoint.
use std::time::Duration;

use async_trait::async_trait;
use displaydoc::Display;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use url::Url;

/// Error raised by a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Display)]
#[non_exhaustive]
pub enum TransportError {
    /// request to {target} timed out after {timeout:?}
    Timeout { target: String, timeout: Duration },
    /// request to {url} failed: {reason}
    Request { url: String, reason: String },
    /// HTTP fetch failed from '{url}': {status}
    HttpStatus { url: String, status: u16 },
    /// could not decode response from '{url}': {reason}
    MalformedResponse { url: String, reason: String },
}

/// A single entry of a GraphQL `errors` array.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Error {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

/// GraphQL response envelope.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Response {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<Error>,
}

impl Response {
    pub fn from_data(data: Value) -> Self {
        Self {
            data: Some(data),
            errors: Vec::new(),
        }
    }

    pub fn from_errors(messages: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            data: None,
            errors: messages
                .into_iter()
                .map(|message| Error {
                    message: message.into(),
                    path: None,
                    extensions: None,
                })
                .collect(),
        }
    }
}

/// Executes a GraphQL document against some backend.
///
/// Implementations are shared between concurrent chunk requests, so they must be `Send + Sync`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, query: &str, timeout: Duration) -> Result<Response, TransportError>;
}

/// Posts documents as `application/graphql` bodies to an HTTP GraphQL endpoint.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpTransport {
    pub fn new(endpoint: Url) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .gzip(true)
            .build()
            .map_err(|err| TransportError::Request {
                url: endpoint.to_string(),
                reason: err.to_string(),
            })?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, query: &str, timeout: Duration) -> Result<Response, TransportError> {
        let url = self.endpoint.to_string();
        tracing::debug!(%url, "sending GraphQL request");
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/graphql")
            .body(query.to_owned())
            .timeout(timeout)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    TransportError::Timeout {
                        target: url.clone(),
                        timeout,
                    }
                } else {
                    TransportError::Request {
                        url: url.clone(),
                        reason: err.to_string(),
                    }
                }
            })?;

        let status = response.status();
        // GraphQL servers may report validation errors with a 4xx status and an `errors` body, so
        // only give up on the body when it isn't JSON.
        let body = response
            .bytes()
            .await
            .map_err(|err| TransportError::Request {
                url: url.clone(),
                reason: err.to_string(),
            })?;
        match serde_json::from_slice::<Response>(&body) {
            Ok(response) => Ok(response),
            Err(_) if !status.is_success() => Err(TransportError::HttpStatus {
                url,
                status: status.as_u16(),
            }),
            Err(err) => Err(TransportError::MalformedResponse {
                url,
                reason: err.to_string(),
            }),
        }
    }
}
