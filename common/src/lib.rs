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

//! Herald Common Types
//!
//! This crate holds the deterministic core of the Herald agent:
//! - Needs and their decay (`need`)
//! - The static action catalog (`action`)
//! - Utility ranking of candidate actions (`scoring`)
//! - Account metrics (`metrics`)
//! - The persisted state snapshot and its file store (`snapshot`, `store`)

pub mod action;
pub mod metrics;
pub mod need;
pub mod scoring;
pub mod snapshot;
pub mod store;

pub use action::{ActionCatalog, ActionKind, NeedEffect};
pub use metrics::Metrics;
pub use need::{Need, NeedPool, NeedValues, MAX_NEED, MIN_NEED};
pub use scoring::{RankedAction, UtilityScorer};
pub use snapshot::StateSnapshot;
pub use store::{JsonFileStore, StateStore, StoreError, StoreResult};
