//! Startup configuration read from the environment

use crate::llm::{AnthropicModel, AnthropicService, LlmError, LlmService, LoggingService};
use crate::tracker::JiraConfig;
use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;
use thiserror::Error;

/// Missing or malformed environment settings
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{var} has invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Settings for the decomposition model
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    /// Gateway base URL; when set, authentication is left to the gateway
    pub gateway: Option<String>,
    pub model: AnthropicModel,
}

impl LlmConfig {
    /// Build the model client, wrapped for request logging
    pub fn build_service(&self) -> Result<Arc<dyn LlmService>, LlmError> {
        let service = AnthropicService::new(
            self.api_key.clone(),
            self.model,
            self.gateway.as_deref(),
        )?;
        Ok(Arc::new(LoggingService::new(Arc::new(service))))
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub jira: JiraConfig,
    pub llm: LlmConfig,
}

impl AppConfig {
    /// Process environment, falling back to a `.env` file in the working
    /// directory or its parents
    pub fn from_env() -> Result<Self, ConfigError> {
        let file = match dotenvy::dotenv_iter() {
            Ok(iter) => {
                tracing::debug!("Reading settings from .env");
                read_dotenv(iter)
            }
            Err(_) => HashMap::new(),
        };
        Self::from_lookup(layered(|var| std::env::var(var).ok(), file))
    }

    /// Build from any variable source; blank values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let require = |var: &'static str| get(var).ok_or(ConfigError::Missing(var));

        let base_url = require("JIRA_BASE_URL")?;
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                var: "JIRA_BASE_URL",
                value: base_url,
                reason: "expected an http(s) URL".to_string(),
            });
        }

        let jira = JiraConfig {
            base_url,
            email: require("JIRA_EMAIL")?,
            api_token: require("JIRA_API_TOKEN")?,
        };

        let gateway = get("LLM_GATEWAY");
        let api_key = match (&gateway, get("ANTHROPIC_API_KEY")) {
            (_, Some(key)) => key,
            (Some(_), None) => "implicit".to_string(),
            (None, None) => return Err(ConfigError::Missing("ANTHROPIC_API_KEY")),
        };

        let model = match get("DEFAULT_MODEL") {
            None => AnthropicModel::DEFAULT,
            Some(id) => {
                AnthropicModel::from_model_id(id.trim()).ok_or_else(|| ConfigError::Invalid {
                    var: "DEFAULT_MODEL",
                    value: id.clone(),
                    reason: "expected claude-4-sonnet, claude-3.5-sonnet or claude-3.5-haiku"
                        .to_string(),
                })?
            }
        };

        Ok(Self {
            jira,
            llm: LlmConfig {
                api_key,
                gateway,
                model,
            },
        })
    }
}

/// Parsed `.env` entries; malformed lines are skipped
fn read_dotenv<R: Read>(iter: dotenvy::Iter<R>) -> HashMap<String, String> {
    iter.filter_map(Result::ok).collect()
}

/// Lookup that prefers `primary` and falls back to `.env` entries
fn layered(
    primary: impl Fn(&str) -> Option<String>,
    file: HashMap<String, String>,
) -> impl Fn(&str) -> Option<String> {
    move |var: &str| primary(var).or_else(|| file.get(var).cloned())
}
