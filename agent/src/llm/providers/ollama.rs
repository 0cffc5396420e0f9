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

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [LlmMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<ChatOptions>,
}

#[derive(Serialize)]
struct ChatOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: LlmMessage,
    model: String,
    #[serde(default)]
    eval_count: Option<u32>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
}

/// Local Ollama server via `/api/chat`
pub struct OllamaProvider {
    config: LlmConfig,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = http_client(&config)?;
        Ok(Self { config, client })
    }

    fn tags_url(&self) -> String {
        format!("{}/api/tags", self.config.endpoint.trim_end_matches("/api/chat"))
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        let options = (request.temperature.is_some() || request.max_tokens.is_some()).then(|| ChatOptions {
            temperature: request.temperature,
            num_predict: request.max_tokens,
        });
        let body = ChatRequest {
            model: &request.model,
            messages: &request.messages,
            stream: false,
            format: request.json_output.then_some("json"),
            options,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::NetworkError(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::ApiError(format!("Failed to parse response: {}", e)))?;

        tracing::debug!("Ollama model {} answered", chat.model);
        Ok(LlmResponse {
            content: chat.message.content,
            model: chat.model,
            total_tokens: match (chat.prompt_eval_count, chat.eval_count) {
                (Some(prompt), Some(eval)) => Some(prompt + eval),
                _ => None,
            },
        })
    }

    async fn is_available(&self) -> bool {
        self.client.get(self.tags_url()).send().await.is_ok()
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let messages = vec![LlmMessage::user("hi")];
        let body = ChatRequest {
            model: "llama3.2:1b",
            messages: &messages,
            stream: false,
            format: Some("json"),
            options: None,
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["format"], "json");
        assert_eq!(json["stream"], false);
        assert!(json.get("options").is_none());
    }

    #[test]
    fn test_tags_url() {
        let provider = OllamaProvider::new(LlmConfig::ollama("http://localhost:11434/api/chat", "m")).unwrap();
        assert_eq!(provider.tags_url(), "http://localhost:11434/api/tags");
    }
}
