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

//! Account performance metrics

use crate::snapshot::timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Performance metrics tracked alongside the need state
///
/// Read-only with respect to decision making: metrics are reported as impact
/// but never feed back into decay or scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    #[serde(default)]
    pub followers: u64,
    #[serde(default)]
    pub following: u64,
    #[serde(default)]
    pub tweets: u64,
    #[serde(default)]
    pub engagement_rate: f64,
    #[serde(default)]
    pub impression_rate: f64,
    #[serde(default = "Utc::now", with = "timestamp")]
    pub last_updated: DateTime<Utc>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            followers: 0,
            following: 0,
            tweets: 0,
            engagement_rate: 0.0,
            impression_rate: 0.0,
            last_updated: Utc::now(),
        }
    }
}

impl Metrics {
    /// Update counters from a user profile payload
    ///
    /// Accepts either the bare user object or the `{"data": user}` envelope.
    /// Counters absent from `public_metrics` keep their previous value.
    pub fn update_from_profile(&mut self, profile: &Value, now: DateTime<Utc>) {
        let user = profile.get("data").unwrap_or(profile);
        if let Some(public) = user.get("public_metrics") {
            let count = |key: &str| public.get(key).and_then(Value::as_u64);
            if let Some(followers) = count("followers_count") {
                self.followers = followers;
            }
            if let Some(following) = count("following_count") {
                self.following = following;
            }
            if let Some(tweets) = count("tweet_count") {
                self.tweets = tweets;
            }
        }
        self.last_updated = now;
    }

    /// Numeric fields by name
    pub fn numeric(&self) -> BTreeMap<&'static str, f64> {
        BTreeMap::from([
            ("followers", self.followers as f64),
            ("following", self.following as f64),
            ("tweets", self.tweets as f64),
            ("engagement_rate", self.engagement_rate),
            ("impression_rate", self.impression_rate),
        ])
    }

    /// Change of every numeric field from `before` to `self`
    pub fn diff(&self, before: &Metrics) -> BTreeMap<&'static str, f64> {
        let before = before.numeric();
        self.numeric()
            .into_iter()
            .map(|(name, value)| (name, value - before.get(name).copied().unwrap_or(0.0)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_values() {
        let metrics = Metrics::default();
        assert_eq!(metrics.followers, 0);
        assert_eq!(metrics.following, 0);
        assert_eq!(metrics.tweets, 0);
        assert_eq!(metrics.engagement_rate, 0.0);
        assert_eq!(metrics.impression_rate, 0.0);
    }

    #[test]
    fn test_update_from_profile() {
        let mut metrics = Metrics::default();
        let now = Utc::now();
        metrics.update_from_profile(
            &json!({
                "public_metrics": {
                    "followers_count": 100,
                    "following_count": 50,
                    "tweet_count": 25
                }
            }),
            now,
        );
        assert_eq!(metrics.followers, 100);
        assert_eq!(metrics.following, 50);
        assert_eq!(metrics.tweets, 25);
        assert_eq!(metrics.last_updated, now);
    }

    #[test]
    fn test_update_from_enveloped_profile_keeps_missing_counts() {
        let mut metrics = Metrics {
            following: 7,
            ..Metrics::default()
        };
        metrics.update_from_profile(
            &json!({"data": {"id": "1", "public_metrics": {"followers_count": 3}}}),
            Utc::now(),
        );
        assert_eq!(metrics.followers, 3);
        assert_eq!(metrics.following, 7);
    }

    #[test]
    fn test_diff() {
        let before = Metrics {
            followers: 10,
            engagement_rate: 0.5,
            ..Metrics::default()
        };
        let after = Metrics {
            followers: 13,
            engagement_rate: 0.25,
            ..before.clone()
        };
        let diff = after.diff(&before);
        assert_eq!(diff["followers"], 3.0);
        assert_eq!(diff["engagement_rate"], -0.25);
        assert_eq!(diff["tweets"], 0.0);
    }

    #[test]
    fn test_missing_fields_default() {
        let metrics: Metrics = serde_json::from_str(r#"{"followers": 4}"#).unwrap();
        assert_eq!(metrics.followers, 4);
        assert_eq!(metrics.tweets, 0);
    }
}
