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

//! LLM provider implementations

mod ollama;
mod openai;

pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

use super::types::{LlmConfig, LlmError, LlmRequest, LlmResponse};
use async_trait::async_trait;

/// Trait for LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a request to the LLM
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Check if the provider is reachable
    async fn is_available(&self) -> bool;

    fn name(&self) -> &str;
}

/// Build the provider named by `config.provider`
pub fn create_provider(config: LlmConfig) -> Result<Box<dyn LlmProvider>, LlmError> {
    match config.provider.to_ascii_lowercase().as_str() {
        "ollama" => Ok(Box::new(OllamaProvider::new(config)?)),
        "openai" | "lmstudio" => Ok(Box::new(OpenAiProvider::new(config)?)),
        other => Err(LlmError::ConfigError(format!("Unknown LLM provider '{}'", other))),
    }
}

/// Read a non-success response into an [`LlmError`]
async fn api_error(response: reqwest::Response) -> LlmError {
    let status = response.status();
    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    LlmError::ApiError(format!("API returned {}: {}", status, text))
}

fn http_client(config: &LlmConfig) -> Result<reqwest::Client, LlmError> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(config.timeout_seconds))
        .build()
        .map_err(|e| LlmError::ConfigError(format!("Failed to create HTTP client: {}", e)))
}
