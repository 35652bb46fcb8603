use crate::error::{Result, StreamError};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_COMPLETION_PATH: &str = "/api/rag/conversation/completion";

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Scheme, host and optional port of the chat backend
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path of the streaming completions endpoint
    #[serde(default = "default_completion_path")]
    pub completion_path: String,

    /// Sent as `authorization: Bearer <token>` when present
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Limits connection setup only. The stream itself never times out.
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,

    /// Extra request headers, overriding the defaults by (case-insensitive) name
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_completion_path() -> String {
    DEFAULT_COMPLETION_PATH.to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            completion_path: default_completion_path(),
            auth_token: None,
            connect_timeout_secs: None,
            headers: HashMap::new(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup (used by `from_env`)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("CHAT_STREAM_BASE_URL").unwrap_or_else(default_base_url);
        let completion_path =
            lookup("CHAT_STREAM_COMPLETION_PATH").unwrap_or_else(default_completion_path);
        let auth_token = lookup("CHAT_STREAM_AUTH_TOKEN").filter(|t| !t.is_empty());

        let connect_timeout_secs = lookup("CHAT_STREAM_CONNECT_TIMEOUT_SECS")
            .map(|v| {
                v.parse::<u64>().map_err(|e| {
                    StreamError::ConfigError(format!("Invalid connect timeout value: {}", e))
                })
            })
            .transpose()?;

        Ok(ClientConfig {
            base_url,
            completion_path,
            auth_token,
            connect_timeout_secs,
            headers: HashMap::new(),
        })
    }

    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| StreamError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let mut config = Self::from_toml(&contents)?;

        // Allow environment variables to override file config
        if let Ok(token) = env::var("CHAT_STREAM_AUTH_TOKEN")
            && !token.is_empty()
        {
            config.auth_token = Some(token);
        }

        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| StreamError::ConfigError(format!("Failed to parse config file: {}", e)))
    }

    /// Full URL of the completions endpoint
    pub fn completion_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.completion_path.trim_start_matches('/')
        )
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(StreamError::ConfigError("Base URL is empty".to_string()));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(StreamError::ConfigError(format!(
                "Base URL must start with http:// or https://: {}",
                self.base_url
            )));
        }

        if self.completion_path.is_empty() {
            return Err(StreamError::ConfigError(
                "Completion path is empty".to_string(),
            ));
        }

        if self.connect_timeout_secs == Some(0) {
            return Err(StreamError::ConfigError(
                "Connect timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
