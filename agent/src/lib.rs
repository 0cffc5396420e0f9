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

//! Herald Agent
//!
//! Runs the decision loop on top of `herald-common`:
//! - Rate-limit aware HTTP client (`client`)
//! - Social API actions (`social`)
//! - Optional LLM advisor (`llm`, `advisor`)
//! - The per-cycle scheduler (`scheduler`)

pub mod advisor;
pub mod client;
pub mod config;
pub mod cooldown;
pub mod history;
pub mod llm;
pub mod scheduler;
pub mod social;
