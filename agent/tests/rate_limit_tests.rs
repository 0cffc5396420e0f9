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

//! Throttling behavior seen through a whole cycle

mod support;

use herald_agent::client::{ApiError, RawResponse};
use herald_agent::scheduler::{SaveStatus, Scheduler};
use herald_agent::social::{ActionError, ActionParams};
use herald_common::{ActionCatalog, ActionKind, JsonFileStore, StateStore};
use std::sync::Arc;
use std::time::Duration;
use support::{EPOCH_SECONDS, FixedAdvisor, ScriptedTransport, api, hours};
use tokio::time::Instant;

fn follow(user_id: &str) -> Arc<FixedAdvisor> {
    FixedAdvisor::with(
        ActionKind::Follow,
        ActionParams {
            user_id: Some(user_id.to_string()),
            ..ActionParams::default()
        },
    )
}

#[tokio::test(start_paused = true)]
async fn test_throttled_call_sleeps_until_reset_then_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonFileStore::new(dir.path().join("state.json")));
    let transport = ScriptedTransport::new([
        RawResponse::new(200, r#"{"data":{"id":"100"}}"#),
        RawResponse::throttled(Some(EPOCH_SECONDS + 45)),
        RawResponse::new(200, r#"{"data":{"following":true}}"#),
    ]);
    let mut scheduler = Scheduler::load(ActionCatalog::default(), store.clone(), api(&transport), hours(0))
        .unwrap()
        .with_advisor(follow("200"));

    let started = Instant::now();
    let report = scheduler.run_cycle_at(hours(1)).await.unwrap();

    assert_eq!(started.elapsed(), Duration::from_secs(45));
    assert!(report.succeeded());
    assert!(matches!(report.persistence, SaveStatus::Saved));
    assert_eq!(store.load(hours(1)).unwrap().last_action_time, hours(1));

    let paths: Vec<_> = transport.sent().into_iter().map(|r| r.path).collect();
    assert_eq!(paths, ["users/me", "users/100/following", "users/100/following"]);
}

#[tokio::test(start_paused = true)]
async fn test_persistent_throttling_gives_up_and_backs_off() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonFileStore::new(dir.path().join("state.json")));
    let responses = std::iter::once(RawResponse::new(200, r#"{"data":{"id":"100"}}"#))
        .chain((0..6).map(|_| RawResponse::throttled(Some(EPOCH_SECONDS + 10))));
    let transport = ScriptedTransport::new(responses);
    let mut scheduler = Scheduler::load(ActionCatalog::default(), store.clone(), api(&transport), hours(0))
        .unwrap()
        .with_advisor(follow("200"));
    let before = scheduler.snapshot();

    let report = scheduler.run_cycle_at(hours(1)).await.unwrap();

    assert_eq!(
        report.outcome,
        Err(ActionError::Api(ApiError::RateLimitExceeded {
            attempts: 6,
            waited: Duration::from_secs(50),
        }))
    );
    assert_eq!(report.next_wait, Duration::from_secs(900));
    assert_eq!(scheduler.snapshot(), before);
    assert_eq!(transport.sent().len(), 7);
    assert!(!store.path().exists());
}
