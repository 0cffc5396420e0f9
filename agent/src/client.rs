//
// Copyright 2025 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Rate-limit aware API client
//!
//! Wraps a [`Transport`] and handles:
//! - Throttled (429) responses by waiting until the advertised reset time
//! - A bounded number of throttle retries per call
//! - Turning error responses into [`ApiError`] with the most specific message available

mod http;

pub use http::ReqwestTransport;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Status code the remote service uses for throttling.
pub const THROTTLED_STATUS: u16 = 429;

/// Throttle retries allowed per call before giving up.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Errors produced by API calls.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// The service kept throttling after every permitted retry.
    #[error("Rate limit still exceeded after {attempts} attempts ({waited:?} spent waiting)")]
    RateLimitExceeded { attempts: u32, waited: Duration },

    /// Non-success HTTP status.
    #[error("{message}")]
    Status { status: u16, message: String },

    /// Success status whose payload carries an `error` field.
    #[error("API reported an error: {0}")]
    External(String),

    /// The request never produced a response.
    #[error("Request failed: {0}")]
    Transport(String),

    /// The response body could not be understood.
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn is_throttled(&self) -> bool {
        matches!(self, ApiError::RateLimitExceeded { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

/// A single call against the remote API, relative to the transport's base URL
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: Method::Delete,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

/// Raw response as seen by the client, before any interpretation
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    /// Epoch seconds from the `x-rate-limit-reset` header, when present and numeric.
    pub rate_limit_reset: Option<i64>,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            rate_limit_reset: None,
            body: body.into(),
        }
    }

    pub fn throttled(reset: Option<i64>) -> Self {
        Self {
            status: THROTTLED_STATUS,
            rate_limit_reset: reset,
            body: String::new(),
        }
    }
}

/// Sends requests and returns whatever came back
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, ApiError>;
}

/// API client that waits out throttling up to a retry cap
pub struct RateLimitedClient<T> {
    transport: T,
    max_retries: u32,
    clock: fn() -> DateTime<Utc>,
}

impl<T: Transport> RateLimitedClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            max_retries: DEFAULT_MAX_RETRIES,
            clock: Utc::now,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Wall clock used to turn reset times into wait durations
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Perform a call, waiting out throttled responses.
    ///
    /// A throttled response is retried after sleeping until its reset time
    /// (immediately when the reset is missing or already past). After
    /// `max_retries` retries the call fails with [`ApiError::RateLimitExceeded`].
    pub async fn call(&self, request: &ApiRequest) -> Result<Value, ApiError> {
        let mut retries = 0;
        let mut waited = Duration::ZERO;

        loop {
            let response = self.transport.send(request).await?;
            if response.status != THROTTLED_STATUS {
                return interpret(response);
            }

            if retries >= self.max_retries {
                tracing::warn!(
                    "Giving up on {:?} {} after {} throttled attempts",
                    request.method,
                    request.path,
                    retries + 1
                );
                return Err(ApiError::RateLimitExceeded {
                    attempts: retries + 1,
                    waited,
                });
            }

            let backoff = self.backoff(&response);
            retries += 1;
            tracing::warn!(
                "Rate limited on {:?} {}, waiting {}s (retry {}/{})",
                request.method,
                request.path,
                backoff.as_secs(),
                retries,
                self.max_retries
            );
            tokio::time::sleep(backoff).await;
            waited += backoff;
        }
    }

    fn backoff(&self, response: &RawResponse) -> Duration {
        let now = (self.clock)().timestamp();
        let seconds = response
            .rate_limit_reset
            .map(|reset| reset.saturating_sub(now).max(0))
            .unwrap_or(0);
        Duration::from_secs(seconds as u64)
    }
}

/// Turn a non-throttled response into a payload or an error
pub fn interpret(response: RawResponse) -> Result<Value, ApiError> {
    if !(200..300).contains(&response.status) {
        return Err(ApiError::Status {
            status: response.status,
            message: error_message(response.status, &response.body),
        });
    }

    if response.body.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }

    let payload: Value =
        serde_json::from_str(&response.body).map_err(|e| ApiError::Decode(e.to_string()))?;
    match payload.get("error") {
        Some(error) => Err(ApiError::External(describe(error))),
        None => Ok(payload),
    }
}

/// Most specific message in an error body, falling back to status and raw text
pub fn error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|payload| structured_message(&payload))
        .unwrap_or_else(|| format!("API returned status code {}: {}", status, body))
}

fn structured_message(payload: &Value) -> Option<String> {
    let first = payload
        .get("errors")
        .and_then(|errors| errors.get(0))
        .and_then(|error| error.get("message"))
        .and_then(Value::as_str);
    if let Some(message) = first {
        return Some(message.to_string());
    }

    match payload.get("error")? {
        Value::String(message) => Some(message.clone()),
        error => error.get("message").and_then(Value::as_str).map(str::to_string),
    }
}

fn describe(error: &Value) -> String {
    match error {
        Value::String(message) => message.clone(),
        other => other
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| other.to_string()),
    }
}
