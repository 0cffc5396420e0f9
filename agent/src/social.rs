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

//! Social platform actions
//!
//! [`ActionRequest`] validates an action and its parameters before any I/O;
//! [`SocialApi`] performs it.

use crate::client::{ApiError, ApiRequest, RateLimitedClient, Transport};
use async_trait::async_trait;
use herald_common::ActionKind;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tokio::sync::OnceCell;

/// Longest post the platform accepts, in characters.
pub const MAX_POST_CHARS: usize = 280;

/// Action kinds that can actually be performed.
pub const EXECUTABLE: [ActionKind; 4] = [
    ActionKind::Post,
    ActionKind::Reply,
    ActionKind::Like,
    ActionKind::Follow,
];

pub fn is_executable(kind: ActionKind) -> bool {
    EXECUTABLE.contains(&kind)
}

/// Why an action did not succeed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActionError {
    /// Known to the catalog but not performable.
    #[error("Action '{0}' is not supported")]
    UnsupportedAction(ActionKind),

    #[error("Action '{action}' requires parameter '{name}'")]
    MissingParameter {
        action: ActionKind,
        name: &'static str,
    },

    #[error("Invalid parameters for '{action}': {reason}")]
    InvalidParameter { action: ActionKind, reason: String },

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl ActionError {
    /// True when the failure happened before any request was sent
    pub fn is_validation(&self) -> bool {
        !matches!(self, ActionError::Api(_))
    }

    pub fn is_throttled(&self) -> bool {
        matches!(self, ActionError::Api(error) if error.is_throttled())
    }
}

/// Free-form inputs an action may need
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tweet_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// A validated, ready-to-dispatch action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionRequest {
    Post { text: String },
    Reply { text: String, reply_to_id: String },
    Like { tweet_id: String },
    Follow { user_id: String },
}

impl ActionRequest {
    pub fn build(kind: ActionKind, params: &ActionParams) -> Result<Self, ActionError> {
        let required = |value: &Option<String>, name: &'static str| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or(ActionError::MissingParameter { action: kind, name })
        };

        let request = match kind {
            ActionKind::Post => ActionRequest::Post {
                text: required(&params.text, "text")?,
            },
            ActionKind::Reply => ActionRequest::Reply {
                text: required(&params.text, "text")?,
                reply_to_id: required(&params.reply_to_id, "reply_to_id")?,
            },
            ActionKind::Like => ActionRequest::Like {
                tweet_id: required(&params.tweet_id, "tweet_id")?,
            },
            ActionKind::Follow => ActionRequest::Follow {
                user_id: required(&params.user_id, "user_id")?,
            },
            other => return Err(ActionError::UnsupportedAction(other)),
        };

        if let ActionRequest::Post { text } | ActionRequest::Reply { text, .. } = &request {
            let length = text.chars().count();
            if length > MAX_POST_CHARS {
                return Err(ActionError::InvalidParameter {
                    action: kind,
                    reason: format!(
                        "text is {} characters, limit is {}",
                        length, MAX_POST_CHARS
                    ),
                });
            }
        }
        Ok(request)
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            ActionRequest::Post { .. } => ActionKind::Post,
            ActionRequest::Reply { .. } => ActionKind::Reply,
            ActionRequest::Like { .. } => ActionKind::Like,
            ActionRequest::Follow { .. } => ActionKind::Follow,
        }
    }

    pub async fn dispatch(self, api: &dyn SocialApi) -> Result<Value, ApiError> {
        match self {
            ActionRequest::Post { text } => api.create_post(text, None).await,
            ActionRequest::Reply { text, reply_to_id } => {
                api.create_post(text, Some(reply_to_id)).await
            }
            ActionRequest::Like { tweet_id } => api.like(tweet_id).await,
            ActionRequest::Follow { user_id } => api.follow(user_id).await,
        }
    }
}

/// Operations against the social platform
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SocialApi: Send + Sync {
    async fn create_post(&self, text: String, reply_to_id: Option<String>) -> Result<Value, ApiError>;

    async fn like(&self, tweet_id: String) -> Result<Value, ApiError>;

    async fn follow(&self, user_id: String) -> Result<Value, ApiError>;

    /// Own profile including public metrics
    async fn profile(&self) -> Result<Value, ApiError>;
}

/// [`SocialApi`] over the platform's v2 REST endpoints
pub struct HttpSocialApi<T> {
    client: RateLimitedClient<T>,
    user_id: OnceCell<String>,
}

impl<T: Transport> HttpSocialApi<T> {
    pub fn new(client: RateLimitedClient<T>) -> Self {
        Self {
            client,
            user_id: OnceCell::new(),
        }
    }

    pub fn client(&self) -> &RateLimitedClient<T> {
        &self.client
    }

    /// Authenticated user's id, fetched once
    pub async fn user_id(&self) -> Result<String, ApiError> {
        self.user_id
            .get_or_try_init(|| async {
                let payload = self.client.call(&ApiRequest::get("users/me")).await?;
                payload
                    .pointer("/data/id")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| ApiError::Decode("users/me response has no data.id".to_string()))
            })
            .await
            .cloned()
    }
}

#[async_trait]
impl<T: Transport> SocialApi for HttpSocialApi<T> {
    async fn create_post(&self, text: String, reply_to_id: Option<String>) -> Result<Value, ApiError> {
        let mut body = json!({ "text": text });
        if let Some(id) = reply_to_id {
            body["reply"] = json!({ "in_reply_to_tweet_id": id });
        }
        self.client.call(&ApiRequest::post("tweets", body)).await
    }

    async fn like(&self, tweet_id: String) -> Result<Value, ApiError> {
        let me = self.user_id().await?;
        let request = ApiRequest::post(format!("users/{}/likes", me), json!({ "tweet_id": tweet_id }));
        self.client.call(&request).await
    }

    async fn follow(&self, user_id: String) -> Result<Value, ApiError> {
        let me = self.user_id().await?;
        let request = ApiRequest::post(
            format!("users/{}/following", me),
            json!({ "target_user_id": user_id }),
        );
        self.client.call(&request).await
    }

    async fn profile(&self) -> Result<Value, ApiError> {
        let request = ApiRequest::get("users/me").with_query("user.fields", "public_metrics");
        self.client.call(&request).await
    }
}
