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

use anyhow::Context;
use clap::Parser;
use herald_agent::advisor::LlmAdvisor;
use herald_agent::client::{RateLimitedClient, ReqwestTransport};
use herald_agent::config::{Arguments, Configuration};
use herald_agent::llm::create_provider;
use herald_agent::scheduler::{SaveStatus, Scheduler};
use herald_agent::social::HttpSocialApi;
use herald_common::{ActionCatalog, JsonFileStore};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load arguments from the command line
    let arguments: Arguments = Parser::parse();

    // Initialize tracing/logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .with_ansi(true)
        .init();

    // Load environment variables from .env file if specified
    if let Some(ref env_file) = arguments.env_file {
        if std::path::Path::new(env_file).exists() {
            tracing::debug!("Loading environment variables from file: {}", env_file);
            dotenv::from_filename(env_file).ok();
        }
    } else {
        tracing::debug!("Loading environment variables from default file");
        dotenv::dotenv().ok();
    }

    // Load configuration from a file with environment variable substitution
    let config = Configuration::load(&arguments.config_file).map_err(anyhow::Error::msg)?;
    tracing::debug!("Configuration loaded: {:?}", config);
    tracing::info!("Starting Herald agent...");

    let transport = ReqwestTransport::new(
        config.api.base_url.as_str(),
        config.api.bearer_token(),
        config.api.user_agent.clone(),
        config.api.timeout(),
    )?;
    let client = RateLimitedClient::new(transport).with_max_retries(config.api.max_retries);
    let api = Arc::new(HttpSocialApi::new(client));

    let store = Arc::new(JsonFileStore::new(config.state.path.as_path()));
    tracing::info!("Using state file {}", store.path().display());

    let mut scheduler = Scheduler::load(ActionCatalog::default(), store, api, chrono::Utc::now())
        .context("Unable to load state")?
        .with_cooldown(config.schedule.cooldown)
        .with_history_limit(config.schedule.history_limit)
        .with_metrics_refresh(config.schedule.refresh_metrics);

    if config.advisor.enabled {
        let provider = create_provider(config.advisor.llm_config())?;
        if !provider.is_available().await {
            tracing::warn!("Advisor provider {} is not reachable yet", provider.name());
        }
        let advisor = LlmAdvisor::new(provider, config.advisor.model.as_str())
            .with_temperature(config.advisor.temperature)
            .with_max_tokens(config.advisor.max_tokens);
        tracing::info!("Advisor enabled via {}", advisor.provider_name());
        scheduler = scheduler.with_advisor(Arc::new(advisor));
    } else {
        tracing::warn!("No advisor configured; actions needing text or targets will fail");
    }

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupt received, finishing current cycle");
                shutdown.cancel();
            }
        }
    });

    let result = run(&mut scheduler, &shutdown, arguments.once).await;

    match scheduler.flush() {
        Ok(()) => tracing::info!("State saved"),
        Err(e) => tracing::error!("Failed to save state on shutdown: {}", e),
    }
    result
}

async fn run(scheduler: &mut Scheduler, shutdown: &CancellationToken, once: bool) -> anyhow::Result<()> {
    loop {
        let report = scheduler.run_cycle().await?;
        match &report.outcome {
            Ok(_) => tracing::info!(
                "Cycle complete: {} (utility {:.2}), impact {:?}",
                report.chosen.action,
                report.chosen.score,
                report.impact.needs
            ),
            Err(e) => tracing::warn!("Cycle failed: {}", e),
        }
        if let SaveStatus::Failed(e) = &report.persistence {
            tracing::warn!("State not persisted this cycle: {}", e);
        }

        if once || shutdown.is_cancelled() {
            return Ok(());
        }

        tracing::info!("Waiting {}s before next cycle", report.next_wait.as_secs());
        tokio::select! {
            _ = tokio::time::sleep(report.next_wait) => {}
            _ = shutdown.cancelled() => {
                tracing::info!("Shutdown requested");
                return Ok(());
            }
        }
    }
}
