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

//! Needs that drive action selection
//!
//! A need is a bounded score in `[0, 100]` that erodes linearly with time and is
//! replenished by successful actions. The set of needs is closed; each variant
//! carries its own decay rate.

use crate::action::NeedEffect;
use chrono::{DateTime, Utc};
use serde::de::{IgnoredAny, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

/// Lowest value a need can hold
pub const MIN_NEED: f64 = 0.0;

/// Highest value a need can hold, and the value of every need on first run
pub const MAX_NEED: f64 = 100.0;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Core needs that drive behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Need {
    Engagement,
    Reach,
    Relevance,
    Authority,
    Conversion,
}

impl Need {
    /// Number of needs in the enumeration
    pub const COUNT: usize = 5;

    /// Every need, in declaration order
    pub const ALL: [Need; Need::COUNT] = [
        Need::Engagement,
        Need::Reach,
        Need::Relevance,
        Need::Authority,
        Need::Conversion,
    ];

    /// Points per hour this need loses while no qualifying action succeeds
    pub fn decay_rate(self) -> f64 {
        match self {
            Need::Engagement => 0.5,
            Need::Reach => 0.3,
            Need::Relevance => 0.2,
            Need::Authority => 0.1,
            Need::Conversion => 0.4,
        }
    }

    /// Stable name used in persisted state and prompts
    pub fn as_str(self) -> &'static str {
        match self {
            Need::Engagement => "engagement",
            Need::Reach => "reach",
            Need::Relevance => "relevance",
            Need::Authority => "authority",
            Need::Conversion => "conversion",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Need {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a name outside the need enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownNeed(pub String);

impl fmt::Display for UnknownNeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown need: {}", self.0)
    }
}

impl std::error::Error for UnknownNeed {}

impl FromStr for Need {
    type Err = UnknownNeed;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Need::ALL
            .into_iter()
            .find(|need| need.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownNeed(s.to_string()))
    }
}

/// One value per need, indexed by [`Need`]
///
/// Serialized as a map keyed by need name. On deserialization unknown names are
/// ignored and missing names keep [`MAX_NEED`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeedValues([f64; Need::COUNT]);

impl NeedValues {
    /// All needs at the same value, clamped into range
    pub fn splat(value: f64) -> Self {
        Self([clamp(value); Need::COUNT])
    }

    /// Builder-style setter, clamped into range
    pub fn with(mut self, need: Need, value: f64) -> Self {
        self.set(need, value);
        self
    }

    pub fn get(&self, need: Need) -> f64 {
        self.0[need.index()]
    }

    /// Set a need, clamped into `[MIN_NEED, MAX_NEED]`
    pub fn set(&mut self, need: Need, value: f64) {
        self.0[need.index()] = clamp(value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Need, f64)> + '_ {
        Need::ALL.into_iter().map(move |need| (need, self.get(need)))
    }

    /// Per-need change from `before` to `self`
    pub fn diff(&self, before: &NeedValues) -> BTreeMap<Need, f64> {
        self.iter()
            .map(|(need, value)| (need, value - before.get(need)))
            .collect()
    }
}

impl Default for NeedValues {
    fn default() -> Self {
        Self::splat(MAX_NEED)
    }
}

impl Index<Need> for NeedValues {
    type Output = f64;

    fn index(&self, need: Need) -> &Self::Output {
        &self.0[need.index()]
    }
}

impl IndexMut<Need> for NeedValues {
    fn index_mut(&mut self, need: Need) -> &mut Self::Output {
        &mut self.0[need.index()]
    }
}

impl Serialize for NeedValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Need::COUNT))?;
        for (need, value) in self.iter() {
            map.serialize_entry(need.as_str(), &value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for NeedValues {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct NeedValuesVisitor;

        impl<'de> Visitor<'de> for NeedValuesVisitor {
            type Value = NeedValues;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of need names to values between 0 and 100")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut values = NeedValues::default();
                while let Some(key) = map.next_key::<String>()? {
                    match key.parse::<Need>() {
                        Ok(need) => {
                            let value: f64 = map.next_value()?;
                            if !value.is_finite() {
                                return Err(serde::de::Error::custom(format!(
                                    "need {} has non-finite value",
                                    need
                                )));
                            }
                            values.set(need, value);
                        }
                        Err(_) => {
                            tracing::debug!("Ignoring unknown need '{}' in stored state", key);
                            map.next_value::<IgnoredAny>()?;
                        }
                    }
                }
                Ok(values)
            }
        }

        deserializer.deserialize_map(NeedValuesVisitor)
    }
}

fn clamp(value: f64) -> f64 {
    value.clamp(MIN_NEED, MAX_NEED)
}

/// Hours between two instants, never negative
pub fn elapsed_hours(since: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - since).num_milliseconds().max(0) as f64 / MILLIS_PER_HOUR
}

/// The live need state of the agent
///
/// `settled` holds the values as of `last_action_time`; `current` is what
/// [`NeedPool::decay`] derived from them for the latest observation. Decay always
/// starts from the settled values, so observing twice without an action in
/// between never compounds.
#[derive(Debug, Clone, PartialEq)]
pub struct NeedPool {
    settled: NeedValues,
    current: NeedValues,
    last_action_time: DateTime<Utc>,
}

impl NeedPool {
    /// A fresh pool with every need at [`MAX_NEED`]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self::from_settled(NeedValues::default(), now)
    }

    /// Rebuild a pool from values recorded at `last_action_time`
    pub fn from_settled(values: NeedValues, last_action_time: DateTime<Utc>) -> Self {
        Self {
            settled: values,
            current: values,
            last_action_time,
        }
    }

    /// Values as of the latest decay or apply
    pub fn values(&self) -> &NeedValues {
        &self.current
    }

    /// Values as of `last_action_time`, which is what gets persisted
    pub fn settled(&self) -> &NeedValues {
        &self.settled
    }

    pub fn value(&self, need: Need) -> f64 {
        self.current.get(need)
    }

    pub fn last_action_time(&self) -> DateTime<Utc> {
        self.last_action_time
    }

    /// Erode every need by `rate * hours since last_action_time`, floored at zero
    ///
    /// Does not touch `last_action_time`.
    pub fn decay(&mut self, now: DateTime<Utc>) {
        let hours = elapsed_hours(self.last_action_time, now);
        for need in Need::ALL {
            self.current[need] = (self.settled[need] - need.decay_rate() * hours).max(MIN_NEED);
        }
    }

    /// Replenish needs by the given effects, capped at [`MAX_NEED`], and settle at `now`
    pub fn apply(&mut self, effects: &[NeedEffect], now: DateTime<Utc>) {
        let mut next = self.current;
        for effect in effects {
            next[effect.need] = (next[effect.need] + effect.magnitude).min(MAX_NEED);
        }
        self.settled = next;
        self.current = next;
        self.last_action_time = self.last_action_time.max(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(hours: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap() + Duration::hours(hours)
    }

    #[test]
    fn test_decay_rates() {
        assert_eq!(Need::Engagement.decay_rate(), 0.5);
        assert_eq!(Need::Reach.decay_rate(), 0.3);
        assert_eq!(Need::Relevance.decay_rate(), 0.2);
        assert_eq!(Need::Authority.decay_rate(), 0.1);
        assert_eq!(Need::Conversion.decay_rate(), 0.4);
    }

    #[test]
    fn test_need_from_str() {
        assert_eq!("engagement".parse::<Need>(), Ok(Need::Engagement));
        assert_eq!("REACH".parse::<Need>(), Ok(Need::Reach));
        assert!("charisma".parse::<Need>().is_err());
    }

    #[test]
    fn test_initial_pool_is_full() {
        let pool = NeedPool::new(at(0));
        for need in Need::ALL {
            assert_eq!(pool.value(need), MAX_NEED);
        }
    }

    #[test]
    fn test_decay_after_ten_hours() {
        let mut pool = NeedPool::new(at(0));
        pool.decay(at(10));

        assert!((pool.value(Need::Engagement) - 95.0).abs() < 1e-9);
        assert!((pool.value(Need::Reach) - 97.0).abs() < 1e-9);
        assert!((pool.value(Need::Authority) - 99.0).abs() < 1e-9);
        assert_eq!(pool.last_action_time(), at(0));
    }

    #[test]
    fn test_decay_floors_at_zero() {
        let mut pool = NeedPool::new(at(0));
        pool.decay(at(10_000));
        for need in Need::ALL {
            assert_eq!(pool.value(need), MIN_NEED);
        }
    }

    #[test]
    fn test_repeated_decay_does_not_compound() {
        let mut pool = NeedPool::new(at(0));
        pool.decay(at(4));
        pool.decay(at(4));
        pool.decay(at(4));
        assert!((pool.value(Need::Engagement) - 98.0).abs() < 1e-9);
    }

    #[test]
    fn test_decay_with_clock_behind_is_noop() {
        let mut pool = NeedPool::new(at(5));
        pool.decay(at(1));
        assert_eq!(pool.values(), &NeedValues::default());
    }

    #[test]
    fn test_apply_caps_and_advances_timestamp() {
        let values = NeedValues::splat(50.0).with(Need::Engagement, 95.0);
        let mut pool = NeedPool::from_settled(values, at(0));
        pool.apply(
            &[
                NeedEffect::new(Need::Engagement, 15.0),
                NeedEffect::new(Need::Reach, 10.0),
            ],
            at(2),
        );

        assert_eq!(pool.value(Need::Engagement), MAX_NEED);
        assert_eq!(pool.value(Need::Reach), 60.0);
        assert_eq!(pool.value(Need::Relevance), 50.0);
        assert_eq!(pool.last_action_time(), at(2));
        assert_eq!(pool.settled(), pool.values());
    }

    #[test]
    fn test_apply_settles_decayed_values() {
        let mut pool = NeedPool::new(at(0));
        pool.decay(at(20));
        pool.apply(&[NeedEffect::new(Need::Reach, 1.0)], at(20));

        // Engagement keeps the decay it had accrued when the action landed.
        assert!((pool.settled().get(Need::Engagement) - 90.0).abs() < 1e-9);
        pool.decay(at(20));
        assert!((pool.value(Need::Engagement) - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_last_action_time_never_moves_backwards() {
        let mut pool = NeedPool::new(at(10));
        pool.apply(&[], at(3));
        assert_eq!(pool.last_action_time(), at(10));
    }

    #[test]
    fn test_need_values_serde_by_name() {
        let values = NeedValues::splat(42.0).with(Need::Conversion, 7.5);
        let json = serde_json::to_value(values).unwrap();
        assert_eq!(json["engagement"], 42.0);
        assert_eq!(json["conversion"], 7.5);

        let parsed: NeedValues = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, values);
    }

    #[test]
    fn test_need_values_defaults_and_unknowns() {
        let parsed: NeedValues =
            serde_json::from_str(r#"{"reach": 12.0, "charisma": "lots"}"#).unwrap();
        assert_eq!(parsed.get(Need::Reach), 12.0);
        assert_eq!(parsed.get(Need::Engagement), MAX_NEED);
        assert_eq!(parsed.get(Need::Conversion), MAX_NEED);
    }

    #[test]
    fn test_need_values_reject_non_numeric_known_need() {
        let parsed = serde_json::from_str::<NeedValues>(r#"{"reach": "high"}"#);
        assert!(parsed.is_err());
    }
}
