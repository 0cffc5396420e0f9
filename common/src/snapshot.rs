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

//! Persisted state snapshot

use crate::metrics::Metrics;
use crate::need::{NeedPool, NeedValues};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Everything that survives a restart, saved and loaded as one unit
///
/// `needs` are the values as of `last_action_time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    #[serde(default)]
    pub needs: NeedValues,
    #[serde(default)]
    pub metrics: Metrics,
    #[serde(default = "Utc::now", with = "timestamp")]
    pub last_action_time: DateTime<Utc>,
}

impl StateSnapshot {
    /// First-run state: every need full, no metrics yet
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            needs: NeedValues::default(),
            metrics: Metrics {
                last_updated: now,
                ..Metrics::default()
            },
            last_action_time: now,
        }
    }

    pub fn capture(pool: &NeedPool, metrics: &Metrics) -> Self {
        Self {
            needs: *pool.settled(),
            metrics: metrics.clone(),
            last_action_time: pool.last_action_time(),
        }
    }

    pub fn into_parts(self) -> (NeedPool, Metrics) {
        (
            NeedPool::from_settled(self.needs, self.last_action_time),
            self.metrics,
        )
    }
}

/// Timestamp codec for persisted state
///
/// Writes RFC 3339 in UTC. Reads RFC 3339, and also offset-less ISO-8601
/// timestamps, which are taken as UTC.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub fn parse(raw: &str) -> Result<DateTime<Utc>, String> {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Ok(parsed.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, NAIVE_FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(|e| format!("Invalid timestamp '{}': {}", raw, e))
    }
}
