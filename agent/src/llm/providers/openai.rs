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

use super::{LlmProvider, api_error, http_client};
use crate::llm::types::{LlmConfig, LlmError, LlmMessage, LlmRequest, LlmResponse};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [LlmMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
    model: String,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: LlmMessage,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: u32,
}

/// OpenAI-compatible `/chat/completions` endpoint (OpenAI, LM Studio, vLLM)
pub struct OpenAiProvider {
    config: LlmConfig,
    client: reqwest::Client,
}

impl OpenAiProvider {
    /// The hosted OpenAI endpoint requires an API key; local compatible servers do not.
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        if config.provider.eq_ignore_ascii_case("openai") && config.api_key.is_none() {
            return Err(LlmError::ConfigError("OpenAI requires an API key".to_string()));
        }
        let client = http_client(&config)?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        let body = CompletionRequest {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request.json_output.then(|| json!({ "type": "json_object" })),
        };

        let mut builder = self.client.post(&self.config.endpoint).json(&body);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| LlmError::NetworkError(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::ApiError(format!("Failed to parse response: {}", e)))?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::ApiError("No choices in response".to_string()))?;

        Ok(LlmResponse {
            content: choice.message.content,
            model: completion.model,
            total_tokens: completion.usage.map(|u| u.total_tokens),
        })
    }

    async fn is_available(&self) -> bool {
        self.client.get(&self.config.endpoint).send().await.is_ok()
    }

    fn name(&self) -> &str {
        &self.config.provider
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_requires_api_key() {
        let mut config = LlmConfig::openai("sk-test", "gpt-4o-mini");
        config.api_key = None;
        assert!(OpenAiProvider::new(config).is_err());
    }

    #[test]
    fn test_local_compatible_server_needs_no_key() {
        let config = LlmConfig {
            provider: "lmstudio".to_string(),
            endpoint: "http://localhost:1234/v1/chat/completions".to_string(),
            api_key: None,
            model: "local".to_string(),
            timeout_seconds: 60,
        };
        let provider = OpenAiProvider::new(config).unwrap();
        assert_eq!(provider.name(), "lmstudio");
    }
}
