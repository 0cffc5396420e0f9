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

//! Decision cycle
//!
//! One cycle runs decay, ranking, optional advice, execution, and on success
//! applies the action's effects and persists the result. A failed action
//! leaves the need pool and `last_action_time` untouched.

use crate::advisor::{Advisor, AdvisorContext, Suggestion};
use crate::cooldown::CooldownPolicy;
use crate::history::{ActionHistory, HistoryEntry};
use crate::social::{self, ActionError, ActionParams, ActionRequest, SocialApi};
use chrono::{DateTime, Utc};
use herald_common::{
    ActionCatalog, ActionKind, Metrics, Need, NeedPool, NeedValues, RankedAction, StateSnapshot,
    StateStore, StoreError, StoreResult, UtilityScorer,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("The action catalog is empty")]
    NoCandidates,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of a save attempt
#[must_use]
#[derive(Debug)]
pub enum SaveStatus {
    Saved,
    /// Nothing changed, nothing written
    Skipped,
    /// State is kept in memory and the save will be retried
    Failed(StoreError),
}

impl SaveStatus {
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveStatus::Saved)
    }
}

/// Change caused by a cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Impact {
    /// Post-apply minus post-decay
    pub needs: BTreeMap<Need, f64>,
    pub metrics: BTreeMap<&'static str, f64>,
}

#[must_use]
#[derive(Debug)]
pub struct CycleReport {
    pub chosen: RankedAction,
    pub ranking: Vec<RankedAction>,
    /// Advisor suggestion that replaced the utility choice, if any
    pub suggestion: Option<Suggestion>,
    pub outcome: Result<Value, ActionError>,
    pub impact: Impact,
    pub next_wait: Duration,
    pub persistence: SaveStatus,
}

impl CycleReport {
    pub fn succeeded(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Sole owner and mutator of the need pool and its persisted snapshot
pub struct Scheduler {
    catalog: ActionCatalog,
    pool: NeedPool,
    metrics: Metrics,
    store: Arc<dyn StateStore>,
    api: Arc<dyn SocialApi>,
    advisor: Option<Arc<dyn Advisor>>,
    history: ActionHistory,
    cooldown: CooldownPolicy,
    refresh_metrics: bool,
    dirty: bool,
}

impl Scheduler {
    /// Restore state from `store`. A corrupt store is an error, never a reset.
    pub fn load(
        catalog: ActionCatalog,
        store: Arc<dyn StateStore>,
        api: Arc<dyn SocialApi>,
        now: DateTime<Utc>,
    ) -> Result<Self, SchedulerError> {
        let (pool, metrics) = store.load(now)?.into_parts();
        tracing::info!(
            "Loaded state, last action at {}",
            pool.last_action_time().to_rfc3339()
        );

        Ok(Self {
            catalog,
            pool,
            metrics,
            store,
            api,
            advisor: None,
            history: ActionHistory::default(),
            cooldown: CooldownPolicy::default(),
            refresh_metrics: false,
            dirty: false,
        })
    }

    pub fn with_advisor(mut self, advisor: Arc<dyn Advisor>) -> Self {
        self.advisor = Some(advisor);
        self
    }

    pub fn with_cooldown(mut self, cooldown: CooldownPolicy) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history = ActionHistory::new(limit);
        self
    }

    /// Fetch the account profile after each successful action
    pub fn with_metrics_refresh(mut self, enabled: bool) -> Self {
        self.refresh_metrics = enabled;
        self
    }

    pub fn needs(&self) -> &NeedValues {
        self.pool.values()
    }

    pub fn pool(&self) -> &NeedPool {
        &self.pool
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn history(&self) -> &ActionHistory {
        &self.history
    }

    pub fn catalog(&self) -> &ActionCatalog {
        &self.catalog
    }

    /// True when the last save failed and has not been retried successfully
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot::capture(&self.pool, &self.metrics)
    }

    /// Decay to `now` and rank every catalog action
    pub fn rank_at(&mut self, now: DateTime<Utc>) -> Vec<RankedAction> {
        self.pool.decay(now);
        let ranking = UtilityScorer::rank(&self.catalog, self.pool.values());
        for ranked in &ranking {
            tracing::debug!("Utility for {}: {:.2}", ranked.action, ranked.score);
        }
        ranking
    }

    pub async fn run_cycle(&mut self) -> Result<CycleReport, SchedulerError> {
        self.run_cycle_at(Utc::now()).await
    }

    /// Run one full cycle as of `now`
    #[tracing::instrument(skip_all, fields(now = %now.to_rfc3339()))]
    pub async fn run_cycle_at(&mut self, now: DateTime<Utc>) -> Result<CycleReport, SchedulerError> {
        if self.dirty {
            self.retry_pending_save();
        }

        let ranking = self.rank_at(now);
        let top = *ranking.first().ok_or(SchedulerError::NoCandidates)?;
        tracing::info!("Top action by utility: {} ({:.2})", top.action, top.score);

        let suggestion = self.consult_advisor(&ranking).await;
        let (chosen, params) = match &suggestion {
            Some(s) => (self.ranked(&ranking, s.action), s.parameters.clone()),
            None => (top, ActionParams::default()),
        };

        let before_needs = *self.pool.values();
        let before_metrics = self.metrics.clone();
        let outcome = self.execute(chosen.action, &params).await;

        let persistence = match &outcome {
            Ok(_) => {
                let effects = self.catalog.effects(chosen.action).unwrap_or(&[]);
                self.pool.apply(effects, now);
                if self.refresh_metrics {
                    self.update_metrics(now).await;
                }
                self.persist()
            }
            Err(error) => {
                tracing::warn!("Action {} failed: {}", chosen.action, error);
                SaveStatus::Skipped
            }
        };

        let impact = Impact {
            needs: self.pool.values().diff(&before_needs),
            metrics: self.metrics.diff(&before_metrics),
        };
        self.history.record(HistoryEntry {
            timestamp: now,
            action: chosen.action,
            success: outcome.is_ok(),
            confidence: suggestion.as_ref().map(|s| s.confidence),
            reasoning: suggestion.as_ref().map(|s| s.reasoning.clone()),
            error: outcome.as_ref().err().map(ToString::to_string),
        });

        let next_wait = self.cooldown.after(&outcome);
        if outcome.is_ok() {
            tracing::info!("Action {} succeeded", chosen.action);
        }

        Ok(CycleReport {
            chosen,
            ranking,
            suggestion,
            outcome,
            impact,
            next_wait,
            persistence,
        })
    }

    /// Save the current snapshot unconditionally
    pub fn flush(&mut self) -> StoreResult<()> {
        self.store.save(&self.snapshot())?;
        self.dirty = false;
        Ok(())
    }

    async fn consult_advisor(&self, ranking: &[RankedAction]) -> Option<Suggestion> {
        let advisor = self.advisor.as_ref()?;
        let context = AdvisorContext {
            needs: *self.pool.values(),
            metrics: self.metrics.clone(),
            ranking: ranking.to_vec(),
            recent_actions: self.history.entries().to_vec(),
            available_actions: social::EXECUTABLE.to_vec(),
        };

        match advisor.advise(&context).await {
            Ok(suggestion) if social::is_executable(suggestion.action) => {
                tracing::info!(
                    "Advisor suggests {} (confidence {:.2}): {}",
                    suggestion.action,
                    suggestion.confidence,
                    suggestion.reasoning
                );
                Some(suggestion)
            }
            Ok(suggestion) => {
                tracing::warn!(
                    "Ignoring advisor suggestion {}: not executable",
                    suggestion.action
                );
                None
            }
            Err(e) => {
                tracing::warn!("Advisor failed, keeping utility choice: {}", e);
                None
            }
        }
    }

    fn ranked(&self, ranking: &[RankedAction], action: ActionKind) -> RankedAction {
        ranking
            .iter()
            .find(|r| r.action == action)
            .copied()
            .unwrap_or(RankedAction { action, score: 0.0 })
    }

    async fn execute(&self, action: ActionKind, params: &ActionParams) -> Result<Value, ActionError> {
        let request = ActionRequest::build(action, params)?;
        Ok(request.dispatch(self.api.as_ref()).await?)
    }

    async fn update_metrics(&mut self, now: DateTime<Utc>) {
        match self.api.profile().await {
            Ok(profile) => self.metrics.update_from_profile(&profile, now),
            Err(e) => tracing::warn!("Failed to refresh metrics: {}", e),
        }
    }

    fn persist(&mut self) -> SaveStatus {
        match self.store.save(&self.snapshot()) {
            Ok(()) => {
                self.dirty = false;
                SaveStatus::Saved
            }
            Err(e) => {
                tracing::warn!("Failed to save state, will retry: {}", e);
                self.dirty = true;
                SaveStatus::Failed(e)
            }
        }
    }

    fn retry_pending_save(&mut self) {
        match self.flush() {
            Ok(()) => tracing::info!("Saved pending state"),
            Err(e) => tracing::warn!("Pending state still unsaved: {}", e),
        }
    }
}
