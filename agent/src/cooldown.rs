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

//! Wait between decision cycles

use crate::social::ActionError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Seconds to wait after each kind of cycle outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CooldownPolicy {
    pub success_seconds: u64,
    pub failure_seconds: u64,
    /// Used when the action gave up on rate limiting
    pub throttled_seconds: u64,
}

impl Default for CooldownPolicy {
    fn default() -> Self {
        Self {
            success_seconds: 300,
            failure_seconds: 300,
            throttled_seconds: 900,
        }
    }
}

impl CooldownPolicy {
    pub fn after(&self, outcome: &Result<Value, ActionError>) -> Duration {
        let seconds = match outcome {
            Ok(_) => self.success_seconds,
            Err(error) if error.is_throttled() => self.throttled_seconds,
            Err(_) => self.failure_seconds,
        };
        Duration::from_secs(seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ApiError;
    use herald_common::ActionKind;

    #[test]
    fn test_cooldown_by_outcome() {
        let policy = CooldownPolicy::default();
        assert_eq!(policy.after(&Ok(Value::Null)), Duration::from_secs(300));
        assert_eq!(
            policy.after(&Err(ActionError::UnsupportedAction(ActionKind::Search))),
            Duration::from_secs(300)
        );
        let throttled = ActionError::Api(ApiError::RateLimitExceeded {
            attempts: 6,
            waited: Duration::from_secs(60),
        });
        assert_eq!(policy.after(&Err(throttled)), Duration::from_secs(900));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let policy: CooldownPolicy = serde_yaml::from_str("success_seconds: 60").unwrap();
        assert_eq!(policy.success_seconds, 60);
        assert_eq!(policy.throttled_seconds, 900);
    }
}
