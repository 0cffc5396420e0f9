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

use crate::client::DEFAULT_MAX_RETRIES;
use crate::cooldown::CooldownPolicy;
use crate::history::DEFAULT_HISTORY_LIMIT;
use crate::llm::LlmConfig;
use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_env_field::EnvField;
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Arguments {
    #[arg(
        short = 'c',
        long = "config",
        help = "Path to configuration file",
        default_value = "agent/config.yaml"
    )]
    pub config_file: String,

    #[arg(
        short = 'e',
        long = "env",
        help = "Path to environment file",
        default_value = "agent/.env"
    )]
    pub env_file: Option<String>,

    #[arg(long = "once", help = "Run a single decision cycle and exit")]
    pub once: bool,
}

impl Default for Arguments {
    fn default() -> Self {
        Self {
            config_file: "config.yaml".to_string(),
            env_file: Some(".env".to_string()),
            once: false,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub advisor: AdvisorConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

impl Configuration {
    pub fn load(path: &str) -> Result<Configuration, String> {
        let conf = serde_yaml::from_reader(
            std::fs::File::open(path).map_err(|e| format!("Failed to open config file: {}", e))?,
        )
        .map_err(|e| format!("Failed to parse config file: {}", e))?;

        Ok(conf)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Where the state snapshot lives
    pub path: EnvField<StatePath>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: EnvField<ApiBaseUrl>,
    /// Empty means unauthenticated
    pub bearer_token: EnvField<String>,
    pub user_agent: String,
    pub timeout_seconds: u64,
    /// Throttle retries per call
    pub max_retries: u32,
}

impl ApiConfig {
    pub fn bearer_token(&self) -> Option<String> {
        let token = self.bearer_token.trim();
        (!token.is_empty()).then(|| token.to_string())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: Default::default(),
            bearer_token: Default::default(),
            user_agent: format!("herald/{}", env!("CARGO_PKG_VERSION")),
            timeout_seconds: 30,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    pub enabled: bool,
    /// ollama, openai or lmstudio
    pub provider: String,
    pub endpoint: EnvField<AdvisorEndpoint>,
    pub model: EnvField<ModelName>,
    /// Empty means none
    pub api_key: EnvField<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
}

impl AdvisorConfig {
    pub fn llm_config(&self) -> LlmConfig {
        let key = self.api_key.trim();
        LlmConfig {
            provider: self.provider.clone(),
            endpoint: self.endpoint.to_string(),
            api_key: (!key.is_empty()).then(|| key.to_string()),
            model: self.model.to_string(),
            timeout_seconds: self.timeout_seconds,
        }
    }
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: "ollama".to_string(),
            endpoint: Default::default(),
            model: Default::default(),
            api_key: Default::default(),
            temperature: 0.7,
            max_tokens: 500,
            timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub cooldown: CooldownPolicy,
    pub history_limit: usize,
    /// Fetch profile metrics after each successful action
    pub refresh_metrics: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cooldown: CooldownPolicy::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            refresh_metrics: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatePath(PathBuf);

impl StatePath {
    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl FromStr for StatePath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl Default for StatePath {
    fn default() -> Self {
        Self(PathBuf::from("herald_state.json"))
    }
}

impl std::fmt::Display for StatePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Declares a string newtype usable inside [`EnvField`] with its own default
macro_rules! config_string {
    ($(#[$meta:meta])* $name:ident, $default:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl FromStr for $name {
            type Err = Infallible;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.to_string()))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self(String::from($default))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

config_string!(
    /// Root of the social platform's REST API
    ApiBaseUrl,
    "https://api.twitter.com/2"
);
config_string!(
    /// Full URL of the advisor's chat endpoint
    AdvisorEndpoint,
    "http://localhost:11434/api/chat"
);
config_string!(ModelName, "llama3.2:1b");

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_arguments_default() {
        let args = Arguments::default();
        assert_eq!(args.config_file, "config.yaml");
        assert_eq!(args.env_file, Some(".env".to_string()));
        assert!(!args.once);
    }

    #[test]
    fn test_arguments_parse_once() {
        let args = Arguments::parse_from(["herald-agent", "--once", "-c", "custom.yaml"]);
        assert!(args.once);
        assert_eq!(args.config_file, "custom.yaml");
    }

    #[test]
    fn test_configuration_default() {
        let config = Configuration::default();
        assert_eq!(config.state.path.as_path(), Path::new("herald_state.json"));
        assert_eq!(config.api.base_url.as_str(), "https://api.twitter.com/2");
        assert_eq!(config.api.bearer_token(), None);
        assert_eq!(config.api.max_retries, 5);
        assert!(!config.advisor.enabled);
        assert_eq!(config.advisor.llm_config().api_key, None);
        assert_eq!(config.schedule.history_limit, 5);
        assert_eq!(config.schedule.cooldown.throttled_seconds, 900);
    }

    #[test]
    fn test_configuration_load_missing_file() {
        assert!(Configuration::load("non_existent.yaml").is_err());
    }

    #[test]
    fn test_configuration_load_from_file() {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());

        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("config.yaml");
        std::fs::write(
            &file_path,
            "state:\n  path: \"/var/lib/herald/state.json\"\napi:\n  base_url: \"http://localhost:8080/2\"\n  max_retries: 2\nschedule:\n  cooldown:\n    success_seconds: 60\n",
        )
        .unwrap();

        let config = Configuration::load(file_path.to_str().unwrap()).unwrap();
        assert_eq!(
            config.state.path.as_path(),
            Path::new("/var/lib/herald/state.json")
        );
        assert_eq!(config.api.base_url.as_str(), "http://localhost:8080/2");
        assert_eq!(config.api.max_retries, 2);
        assert_eq!(config.api.timeout_seconds, 30);
        assert_eq!(config.schedule.cooldown.success_seconds, 60);
        assert_eq!(config.schedule.cooldown.failure_seconds, 300);
        assert_eq!(config.advisor.provider, "ollama");
    }

    #[test]
    fn test_configuration_env_substitution() {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        unsafe {
            std::env::set_var("HERALD_TEST_BEARER_TOKEN", "secret-token");
            std::env::set_var("HERALD_TEST_MODEL", "qwen2.5:3b");
        }

        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("config.yaml");
        std::fs::write(
            &file_path,
            "api:\n  bearer_token: \"${HERALD_TEST_BEARER_TOKEN}\"\nadvisor:\n  enabled: true\n  model: \"${HERALD_TEST_MODEL}\"\n",
        )
        .unwrap();

        let config = Configuration::load(file_path.to_str().unwrap()).unwrap();
        unsafe {
            std::env::remove_var("HERALD_TEST_BEARER_TOKEN");
            std::env::remove_var("HERALD_TEST_MODEL");
        }

        assert_eq!(config.api.bearer_token(), Some("secret-token".to_string()));
        assert!(config.advisor.enabled);
        assert_eq!(config.advisor.llm_config().model, "qwen2.5:3b");
    }
}
