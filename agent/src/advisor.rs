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

//! Optional external advisor
//!
//! An advisor sees the same ranking the scheduler computed and may suggest a
//! different action along with the parameters needed to perform it. The
//! scheduler stays in charge: suggestions it cannot execute are ignored.

use crate::history::HistoryEntry;
use crate::llm::{LlmError, LlmMessage, LlmProvider, LlmRequest};
use crate::social::ActionParams;
use async_trait::async_trait;
use herald_common::{ActionKind, Metrics, NeedValues, RankedAction};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("Advisor backend failed: {0}")]
    Backend(#[from] LlmError),

    #[error("Advisor returned malformed suggestion: {0}")]
    Malformed(String),

    #[error("Advisor suggested unknown action '{0}'")]
    UnknownAction(String),

    #[error("Advisor confidence {0} is outside [0, 1]")]
    InvalidConfidence(f64),
}

/// What the advisor gets to see
#[derive(Debug, Clone, Serialize)]
pub struct AdvisorContext {
    pub needs: NeedValues,
    pub metrics: Metrics,
    /// Highest utility first
    pub ranking: Vec<RankedAction>,
    /// Oldest first
    pub recent_actions: Vec<HistoryEntry>,
    pub available_actions: Vec<ActionKind>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub action: ActionKind,
    pub confidence: f64,
    pub reasoning: String,
    pub parameters: ActionParams,
}

#[derive(Deserialize)]
struct RawSuggestion {
    action_type: String,
    confidence: f64,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    parameters: Value,
}

impl Suggestion {
    /// Parse an advisor reply. Tolerates prose or code fences around the JSON object.
    pub fn parse(content: &str) -> Result<Suggestion, AdvisorError> {
        let json = match (content.find('{'), content.rfind('}')) {
            (Some(start), Some(end)) if start < end => &content[start..=end],
            _ => return Err(AdvisorError::Malformed("no JSON object in reply".to_string())),
        };
        let raw: RawSuggestion =
            serde_json::from_str(json).map_err(|e| AdvisorError::Malformed(e.to_string()))?;

        let action = raw
            .action_type
            .parse::<ActionKind>()
            .map_err(|_| AdvisorError::UnknownAction(raw.action_type.clone()))?;
        if !raw.confidence.is_finite() || !(0.0..=1.0).contains(&raw.confidence) {
            return Err(AdvisorError::InvalidConfidence(raw.confidence));
        }

        Ok(Suggestion {
            action,
            confidence: raw.confidence,
            reasoning: raw.reasoning,
            parameters: parameters_from(&raw.parameters),
        })
    }
}

fn parameters_from(value: &Value) -> ActionParams {
    let field = |name: &str| match value.get(name) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };
    ActionParams {
        text: field("text"),
        reply_to_id: field("reply_to_id").or_else(|| field("in_reply_to_tweet_id")),
        tweet_id: field("tweet_id"),
        user_id: field("user_id").or_else(|| field("target_user_id")),
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Advisor: Send + Sync {
    async fn advise(&self, context: &AdvisorContext) -> Result<Suggestion, AdvisorError>;
}

const SYSTEM_PROMPT: &str = "You are a social media engagement optimization agent. \
Choose the next action that best restores the account's lowest needs. \
Respond only with a JSON object.";

/// [`Advisor`] backed by an LLM
pub struct LlmAdvisor {
    provider: Box<dyn LlmProvider>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl LlmAdvisor {
    pub fn new(provider: Box<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: 500,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    fn prompt(context: &AdvisorContext) -> Result<String, AdvisorError> {
        let state = serde_json::to_string_pretty(context)
            .map_err(|e| AdvisorError::Malformed(format!("Failed to encode context: {}", e)))?;
        let actions: Vec<&str> = context.available_actions.iter().map(|a| a.as_str()).collect();

        Ok(format!(
            "Current state:\n{state}\n\n\
             Needs range from 0 (starved) to 100 (satisfied). The ranking lists each \
             action's utility for the current needs.\n\n\
             Reply with JSON of the form:\n\
             {{\"action_type\": one of {actions:?}, \"confidence\": number between 0 and 1, \
             \"reasoning\": string, \"parameters\": {{\"text\": string for post/reply, \
             \"reply_to_id\": string for reply, \"tweet_id\": string for like, \
             \"user_id\": string for follow}}}}"
        ))
    }
}

#[async_trait]
impl Advisor for LlmAdvisor {
    async fn advise(&self, context: &AdvisorContext) -> Result<Suggestion, AdvisorError> {
        let request = LlmRequest::new(&self.model)
            .with_message(LlmMessage::system(SYSTEM_PROMPT))
            .with_message(LlmMessage::user(Self::prompt(context)?))
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
            .with_json_output();

        let response = self.provider.complete(request).await?;
        tracing::debug!("Advisor reply from {}: {}", response.model, response.content);
        Suggestion::parse(&response.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmResponse;

    struct Canned {
        reply: String,
    }

    #[async_trait]
    impl LlmProvider for Canned {
        async fn complete(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
            assert!(request.json_output);
            Ok(LlmResponse::new(self.reply.clone(), "canned"))
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    fn context() -> AdvisorContext {
        AdvisorContext {
            needs: NeedValues::default(),
            metrics: Metrics::default(),
            ranking: Vec::new(),
            recent_actions: Vec::new(),
            available_actions: vec![ActionKind::Post, ActionKind::Like],
        }
    }

    #[test]
    fn test_parse_fenced_reply() {
        let reply = "Sure!\n```json\n{\"action_type\": \"Like\", \"confidence\": 0.8, \
                     \"reasoning\": \"cheap win\", \"parameters\": {\"tweet_id\": 12345}}\n```";
        let suggestion = Suggestion::parse(reply).unwrap();

        assert_eq!(suggestion.action, ActionKind::Like);
        assert_eq!(suggestion.confidence, 0.8);
        assert_eq!(suggestion.parameters.tweet_id.as_deref(), Some("12345"));
    }

    #[test]
    fn test_parse_rejects_bad_replies() {
        assert!(matches!(Suggestion::parse("no idea"), Err(AdvisorError::Malformed(_))));
        assert!(matches!(
            Suggestion::parse(r#"{"action_type": "dance", "confidence": 0.5}"#),
            Err(AdvisorError::UnknownAction(_))
        ));
        assert!(matches!(
            Suggestion::parse(r#"{"action_type": "post", "confidence": 1.5}"#),
            Err(AdvisorError::InvalidConfidence(_))
        ));
        assert!(matches!(
            Suggestion::parse(r#"{"confidence": 0.5}"#),
            Err(AdvisorError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_llm_advisor_requests_json() {
        let advisor = LlmAdvisor::new(
            Box::new(Canned {
                reply: r#"{"action_type": "post", "confidence": 0.9, "parameters": {"text": "gm"}}"#
                    .to_string(),
            }),
            "llama3.2:1b",
        );

        let suggestion = advisor.advise(&context()).await.unwrap();
        assert_eq!(suggestion.action, ActionKind::Post);
        assert_eq!(suggestion.parameters.text.as_deref(), Some("gm"));
        assert_eq!(advisor.provider_name(), "canned");

        let prompt = LlmAdvisor::prompt(&context()).unwrap();
        assert!(prompt.contains("\"engagement\": 100.0"));
        assert!(prompt.contains("[\"post\", \"like\"]"));
    }
}
