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

//! Short in-memory record of recent actions, used as advisor context

use chrono::{DateTime, Utc};
use herald_common::ActionKind;
use herald_common::snapshot::timestamp;
use serde::Serialize;

pub const DEFAULT_HISTORY_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    pub action: ActionKind,
    pub success: bool,
    /// Advisor confidence when the advisor picked the action
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Oldest entries are dropped once `limit` is reached
#[derive(Debug, Clone)]
pub struct ActionHistory {
    entries: Vec<HistoryEntry>,
    limit: usize,
}

impl ActionHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: Vec::with_capacity(limit),
            limit,
        }
    }

    pub fn record(&mut self, entry: HistoryEntry) {
        if self.limit == 0 {
            return;
        }
        if self.entries.len() >= self.limit {
            let excess = self.entries.len() + 1 - self.limit;
            self.entries.drain(..excess);
        }
        self.entries.push(entry);
    }

    /// Oldest first
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ActionHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}
