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

use super::{ApiError, ApiRequest, Method, RawResponse, Transport};
use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use std::time::Duration;

const RATE_LIMIT_RESET: &str = "x-rate-limit-reset";

/// [`Transport`] over HTTPS with bearer authentication
pub struct ReqwestTransport {
    base_url: String,
    bearer_token: Option<String>,
    user_agent: String,
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(
        base_url: impl Into<String>,
        bearer_token: Option<String>,
        user_agent: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer_token,
            user_agent: user_agent.into(),
            client,
        })
    }

    fn url(&self, request: &ApiRequest) -> Result<reqwest::Url, ApiError> {
        let raw = format!("{}/{}", self.base_url, request.path.trim_start_matches('/'));
        let mut url = reqwest::Url::parse(&raw)
            .map_err(|e| ApiError::Transport(format!("Invalid URL '{}': {}", raw, e)))?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(request.query.iter());
        }
        Ok(url)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, ApiError> {
        let url = self.url(request)?;
        let mut builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
            Method::Delete => self.client.delete(url),
        }
        .header(USER_AGENT, &self.user_agent);

        if let Some(token) = &self.bearer_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let rate_limit_reset = response
            .headers()
            .get(RATE_LIMIT_RESET)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<i64>().ok());
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(format!("Failed to read response body: {}", e)))?;

        tracing::debug!("{:?} {} -> {}", request.method, request.path, status);
        Ok(RawResponse {
            status,
            rate_limit_reset,
            body,
        })
    }
}
