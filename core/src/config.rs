use crate::credentials::{account_host, CredentialProvider, StaticCredentials, TokenFileCredentials};
use crate::errors::{ConfigError, ConfigResult};
use crate::semantic_model::SemanticModelRegistry;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Default per-call timeout for analyst requests, in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 50;

/// Default authorization scheme, sent as `<scheme> Token="<token>"`
pub const DEFAULT_AUTH_SCHEME: &str = "Snowflake";

/// Semantic model offered when none is configured
pub const DEFAULT_SEMANTIC_MODEL: &str =
    "CORTEX_ANALYST_DEMO.REVENUE_TIMESERIES.RAW_DATA/revenue_timeseries.yaml";

const APP_NAME: &str = "cortex-analyst";

/// Configuration for the Cortex Analyst client.
///
/// Every field is optional so that a file, the environment and the command
/// line can each supply part of it and be merged.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct AnalystConfig {
    /// Snowflake account locator, used to derive the host
    pub account: Option<String>,
    /// Overrides the host derived from `account`
    pub host: Option<String>,
    pub token: Option<String>,
    /// File holding the token; re-read for every request
    pub token_file: Option<PathBuf>,
    pub auth_scheme: Option<String>,
    pub timeout_secs: Option<u64>,
    pub semantic_models: Option<Vec<String>>,
    pub log_level: Option<String>,
}

impl AnalystConfig {
    /// The built-in defaults, as opposed to `Default`, which is empty
    pub fn defaults() -> Self {
        Self {
            auth_scheme: Some(DEFAULT_AUTH_SCHEME.to_string()),
            timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
            semantic_models: Some(vec![DEFAULT_SEMANTIC_MODEL.to_string()]),
            log_level: Some("info".to_string()),
            ..Self::default()
        }
    }

    /// Loads configuration from a file if it exists, otherwise returns an empty config
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            let content = fs::read_to_string(path).map_err(ConfigError::Read)?;
            let config: Self = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Saves configuration to a file
    pub fn save_to_file(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string(self)?;

        // Ensure the directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(ConfigError::Write)?;
        }

        fs::write(path, content).map_err(ConfigError::Write)?;

        Ok(())
    }

    /// Reads overrides from the process environment
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads overrides through `lookup`; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let timeout_secs = match get("CORTEX_ANALYST_TIMEOUT") {
            Some(raw) => Some(raw.trim().parse::<u64>().map_err(|_| {
                ConfigError::InvalidValue {
                    field: "CORTEX_ANALYST_TIMEOUT",
                    value: raw.clone(),
                }
            })?),
            None => None,
        };

        Ok(Self {
            account: get("SNOWFLAKE_ACCOUNT"),
            host: get("CORTEX_ANALYST_HOST"),
            token: get("SNOWFLAKE_TOKEN"),
            token_file: get("SNOWFLAKE_TOKEN_FILE").map(PathBuf::from),
            timeout_secs,
            ..Self::default()
        })
    }

    /// Merges this config with another config, preferring values from the other config if present.
    ///
    /// `token` and `token_file` are one setting: a layer that supplies either
    /// replaces both from the layer below.
    pub fn merge(&self, other: &Self) -> Self {
        let (token, token_file) = if other.token.is_some() || other.token_file.is_some() {
            (other.token.clone(), other.token_file.clone())
        } else {
            (self.token.clone(), self.token_file.clone())
        };
        Self {
            account: other.account.clone().or_else(|| self.account.clone()),
            host: other.host.clone().or_else(|| self.host.clone()),
            token,
            token_file,
            auth_scheme: other.auth_scheme.clone().or_else(|| self.auth_scheme.clone()),
            timeout_secs: other.timeout_secs.or(self.timeout_secs),
            semantic_models: other
                .semantic_models
                .clone()
                .or_else(|| self.semantic_models.clone()),
            log_level: other.log_level.clone().or_else(|| self.log_level.clone()),
        }
    }

    /// Defaults, then the file at `path`, then the environment
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let file = Self::load_from_file(path)?;
        let env = Self::from_env()?;
        Ok(Self::defaults().merge(&file).merge(&env))
    }

    /// Base URL of the API: the explicit host, else derived from the account
    pub fn resolved_host(&self) -> ConfigResult<String> {
        match (&self.host, &self.account) {
            (Some(host), _) => {
                let host = host.trim().trim_end_matches('/');
                if host.starts_with("http://") || host.starts_with("https://") {
                    Ok(host.to_string())
                } else {
                    Ok(format!("https://{}", host))
                }
            }
            (None, Some(account)) => Ok(account_host(account)),
            (None, None) => Err(ConfigError::MissingHost),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn auth_scheme(&self) -> &str {
        self.auth_scheme.as_deref().unwrap_or(DEFAULT_AUTH_SCHEME)
    }

    /// Builds the credential provider. Within one layer a token file wins over
    /// an inline token.
    pub fn credentials(&self) -> ConfigResult<Arc<dyn CredentialProvider>> {
        let host = self.resolved_host()?;
        if let Some(path) = &self.token_file {
            return Ok(Arc::new(TokenFileCredentials::new(host, path.clone())));
        }
        match &self.token {
            Some(token) => Ok(Arc::new(StaticCredentials::new(host, token.clone()))),
            None => Err(ConfigError::MissingToken),
        }
    }

    /// Builds the registry of selectable semantic models
    pub fn semantic_model_registry(&self) -> ConfigResult<SemanticModelRegistry> {
        match &self.semantic_models {
            Some(paths) => SemanticModelRegistry::from_paths(paths.as_slice()),
            None => SemanticModelRegistry::from_paths(&[DEFAULT_SEMANTIC_MODEL]),
        }
    }
}

/// Helper function to get default config directory
pub fn get_default_config_dir() -> ConfigResult<PathBuf> {
    let home_dir = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;

    let config_dir = home_dir.join(".config").join(APP_NAME);

    Ok(config_dir)
}

/// Helper function to get default config file path
pub fn get_default_config_file() -> ConfigResult<PathBuf> {
    let config_dir = get_default_config_dir()?;
    Ok(config_dir.join("config.toml"))
}
