//! HTTP transport: JSON POST per step.

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde_json::Value;
use uuid::Uuid;

use super::{Endpoint, StepProcessor};
use crate::error::ClientError;

/// Header carrying the conversation session id.
pub const SESSION_HEADER: &str = "x-quote-session";

/// Talks to a step-processor over HTTP.
pub struct HttpStepProcessor {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpStepProcessor {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        // Join treats the last segment as a file unless it ends with '/'.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(&normalized).map_err(|e| ClientError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            base_url,
            client: reqwest::Client::new(),
        })
    }

    pub fn endpoint_url(&self, endpoint: Endpoint) -> Result<Url, ClientError> {
        self.base_url
            .join(endpoint.path())
            .map_err(|e| ClientError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl StepProcessor for HttpStepProcessor {
    async fn call(
        &self,
        session_id: Uuid,
        endpoint: Endpoint,
        payload: Value,
    ) -> Result<Value, ClientError> {
        let resp = self
            .client
            .post(self.endpoint_url(endpoint)?)
            .header(SESSION_HEADER, session_id.to_string())
            .json(&payload)
            .send()
            .await
            .map_err(|e| ClientError::RequestFailed {
                endpoint,
                reason: e.to_string(),
            })?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| ClientError::RequestFailed {
            endpoint,
            reason: e.to_string(),
        })?;
        decode(endpoint, status, &text)
    }
}

/// Decode a response body. A failed status only counts as a reply when its
/// body explains the failure with an `error` string.
fn decode(endpoint: Endpoint, status: StatusCode, text: &str) -> Result<Value, ClientError> {
    let body = serde_json::from_str::<Value>(text);
    if !status.is_success() {
        return match body {
            Ok(body) if body.get("error").is_some_and(Value::is_string) => Ok(body),
            _ => Err(ClientError::Status {
                endpoint,
                status: status.as_u16(),
            }),
        };
    }
    body.map_err(|e| ClientError::InvalidResponse {
        endpoint,
        reason: e.to_string(),
    })
}
