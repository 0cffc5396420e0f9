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

//! Utility scoring of catalog actions against the current need state

use crate::action::{ActionCatalog, ActionKind, NeedEffect};
use crate::need::{MAX_NEED, NeedValues};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A catalog action with its utility for the current need state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankedAction {
    pub action: ActionKind,
    pub score: f64,
}

/// Ranks catalog actions by how much they would relieve depleted needs
pub struct UtilityScorer;

impl UtilityScorer {
    /// `Σ magnitude × (1 − value/100)` over the action's effects
    pub fn score(effects: &[NeedEffect], needs: &NeedValues) -> f64 {
        effects
            .iter()
            .map(|effect| effect.magnitude * (1.0 - needs.get(effect.need) / MAX_NEED))
            .sum()
    }

    /// Every catalog action, highest score first
    ///
    /// The sort is stable, so equal scores keep catalog order. Actions without a
    /// catalog entry never appear.
    pub fn rank(catalog: &ActionCatalog, needs: &NeedValues) -> Vec<RankedAction> {
        let mut ranked: Vec<RankedAction> = catalog
            .iter()
            .map(|(action, effects)| RankedAction {
                action,
                score: Self::score(effects, needs),
            })
            .collect();
        ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        ranked
    }
}
