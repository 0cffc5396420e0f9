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

//! Action kinds and the static catalog of their need effects

use crate::need::Need;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Actions the agent knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Post,
    Reply,
    Quote,
    Retweet,
    Like,
    Follow,
    Search,
}

impl ActionKind {
    /// Every action kind, in catalog iteration order
    pub const ALL: [ActionKind; 7] = [
        ActionKind::Post,
        ActionKind::Reply,
        ActionKind::Quote,
        ActionKind::Retweet,
        ActionKind::Like,
        ActionKind::Follow,
        ActionKind::Search,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Post => "post",
            ActionKind::Reply => "reply",
            ActionKind::Quote => "quote",
            ActionKind::Retweet => "retweet",
            ActionKind::Like => "like",
            ActionKind::Follow => "follow",
            ActionKind::Search => "search",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a name outside the action enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAction(pub String);

impl fmt::Display for UnknownAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown action: {}", self.0)
    }
}

impl std::error::Error for UnknownAction {}

impl FromStr for ActionKind {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}

/// Replenishment of a single need by a successful action
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeedEffect {
    pub need: Need,
    pub magnitude: f64,
}

impl NeedEffect {
    pub fn new(need: Need, magnitude: f64) -> Self {
        Self { need, magnitude }
    }
}

/// Static mapping from action kind to the needs it replenishes
///
/// Iteration follows insertion order, which is what ranking uses to break ties.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionCatalog {
    entries: Vec<(ActionKind, Vec<NeedEffect>)>,
}

impl ActionCatalog {
    /// An empty catalog
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add or replace the effects of an action
    ///
    /// Effects with a non-positive magnitude are dropped.
    pub fn with_action(mut self, kind: ActionKind, effects: Vec<NeedEffect>) -> Self {
        let effects: Vec<NeedEffect> = effects
            .into_iter()
            .filter(|effect| effect.magnitude > 0.0)
            .collect();
        match self.entries.iter_mut().find(|(k, _)| *k == kind) {
            Some((_, existing)) => *existing = effects,
            None => self.entries.push((kind, effects)),
        }
        self
    }

    /// Effects of an action, or `None` when it is not in the catalog
    pub fn effects(&self, kind: ActionKind) -> Option<&[NeedEffect]> {
        self.entries
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, effects)| effects.as_slice())
    }

    pub fn contains(&self, kind: ActionKind) -> bool {
        self.effects(kind).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ActionKind, &[NeedEffect])> {
        self.entries
            .iter()
            .map(|(kind, effects)| (*kind, effects.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ActionCatalog {
    fn default() -> Self {
        Self::new()
            .with_action(
                ActionKind::Post,
                vec![
                    NeedEffect::new(Need::Engagement, 15.0),
                    NeedEffect::new(Need::Reach, 10.0),
                    NeedEffect::new(Need::Relevance, 5.0),
                ],
            )
            .with_action(
                ActionKind::Reply,
                vec![
                    NeedEffect::new(Need::Engagement, 20.0),
                    NeedEffect::new(Need::Authority, 5.0),
                ],
            )
            .with_action(
                ActionKind::Like,
                vec![
                    NeedEffect::new(Need::Engagement, 5.0),
                    NeedEffect::new(Need::Relevance, 2.0),
                ],
            )
            .with_action(
                ActionKind::Follow,
                vec![
                    NeedEffect::new(Need::Reach, 10.0),
                    NeedEffect::new(Need::Authority, 5.0),
                ],
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_entries() {
        let catalog = ActionCatalog::default();
        assert!(catalog.contains(ActionKind::Post));
        assert!(catalog.contains(ActionKind::Reply));
        assert!(catalog.contains(ActionKind::Like));
        assert!(catalog.contains(ActionKind::Follow));
        assert!(!catalog.contains(ActionKind::Quote));
        assert!(!catalog.contains(ActionKind::Search));
        assert_eq!(catalog.len(), 4);
    }

    #[test]
    fn test_default_catalog_order() {
        let kinds: Vec<ActionKind> = ActionCatalog::default().iter().map(|(k, _)| k).collect();
        assert_eq!(
            kinds,
            vec![
                ActionKind::Post,
                ActionKind::Reply,
                ActionKind::Like,
                ActionKind::Follow
            ]
        );
    }

    #[test]
    fn test_post_effects() {
        let catalog = ActionCatalog::default();
        let effects = catalog.effects(ActionKind::Post).unwrap();
        assert_eq!(effects.len(), 3);
        assert_eq!(effects[0], NeedEffect::new(Need::Engagement, 15.0));
    }

    #[test]
    fn test_with_action_replaces_and_filters() {
        let catalog = ActionCatalog::new()
            .with_action(ActionKind::Like, vec![NeedEffect::new(Need::Reach, 1.0)])
            .with_action(
                ActionKind::Like,
                vec![
                    NeedEffect::new(Need::Engagement, 3.0),
                    NeedEffect::new(Need::Reach, 0.0),
                ],
            );
        assert_eq!(catalog.len(), 1);
        assert_eq!(
            catalog.effects(ActionKind::Like).unwrap(),
            &[NeedEffect::new(Need::Engagement, 3.0)]
        );
    }

    #[test]
    fn test_action_kind_parse() {
        assert_eq!("POST".parse::<ActionKind>(), Ok(ActionKind::Post));
        assert_eq!(" follow ".parse::<ActionKind>(), Ok(ActionKind::Follow));
        assert!("dance".parse::<ActionKind>().is_err());
    }
}
