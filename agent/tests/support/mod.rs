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

//! Shared fakes for agent integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use herald_agent::advisor::{Advisor, AdvisorContext, AdvisorError, Suggestion};
use herald_agent::client::{ApiError, ApiRequest, RateLimitedClient, RawResponse, Transport};
use herald_agent::social::{ActionParams, HttpSocialApi};
use herald_common::ActionKind;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub const EPOCH_SECONDS: i64 = 1_700_000_000;

pub fn epoch() -> DateTime<Utc> {
    DateTime::from_timestamp(EPOCH_SECONDS, 0).unwrap()
}

pub fn hours(h: i64) -> DateTime<Utc> {
    epoch() + chrono::Duration::hours(h)
}

#[derive(Default)]
struct Script {
    responses: VecDeque<RawResponse>,
    sent: Vec<ApiRequest>,
}

/// Transport that replays canned responses and records what was sent
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new(responses: impl IntoIterator<Item = RawResponse>) -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                responses: responses.into_iter().collect(),
                sent: Vec::new(),
            })),
        }
    }

    pub fn sent(&self) -> Vec<ApiRequest> {
        self.script.lock().unwrap().sent.clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, ApiError> {
        let mut script = self.script.lock().unwrap();
        script.sent.push(request.clone());
        script
            .responses
            .pop_front()
            .ok_or_else(|| ApiError::Transport(format!("unexpected request to {}", request.path)))
    }
}

pub fn api(transport: &ScriptedTransport) -> Arc<HttpSocialApi<ScriptedTransport>> {
    Arc::new(HttpSocialApi::new(
        RateLimitedClient::new(transport.clone()).with_clock(epoch),
    ))
}

/// Advisor that always suggests the same thing
pub struct FixedAdvisor(pub Suggestion);

impl FixedAdvisor {
    pub fn post(text: &str) -> Arc<Self> {
        Self::with(
            ActionKind::Post,
            ActionParams {
                text: Some(text.to_string()),
                ..ActionParams::default()
            },
        )
    }

    pub fn with(action: ActionKind, parameters: ActionParams) -> Arc<Self> {
        Arc::new(Self(Suggestion {
            action,
            confidence: 0.75,
            reasoning: "scripted".to_string(),
            parameters,
        }))
    }
}

#[async_trait]
impl Advisor for FixedAdvisor {
    async fn advise(&self, _context: &AdvisorContext) -> Result<Suggestion, AdvisorError> {
        Ok(self.0.clone())
    }
}
