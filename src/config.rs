use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ReelReplyError;
use reelreply_core::retry::RetryPolicy;

pub const GOOGLE_API_KEY_ENV: &str = "GOOGLE_API_KEY";
pub const APIFY_KEY_ENV: &str = "APIFY_KEY";
pub const INSTA_USERNAME_ENV: &str = "INSTA_USERNAME";
pub const INSTA_PASSWORD_ENV: &str = "INSTA_PASSWORD";

fn default_state_path() -> String {
    "store.json".into()
}
fn default_poll_interval_secs() -> u64 {
    100
}
fn default_recovery_delay_secs() -> u64 {
    10
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_retry_delay_secs() -> u64 {
    10
}
fn default_recency_window_hours() -> i64 {
    24
}
fn default_comment_results_limit() -> usize {
    10
}
fn default_comment_sample_size() -> usize {
    5
}
fn default_llm_model() -> String {
    "gemini-1.5-flash-latest".into()
}
fn default_apify_actor_id() -> String {
    "SbK00X0JYCPblD2wp".into()
}
fn default_apify_base_url() -> String {
    "https://api.apify.com/v2".into()
}
fn default_instagram_base_url() -> String {
    "https://i.instagram.com/api/v1".into()
}
fn default_http_timeout_secs() -> u64 {
    120
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub google_api_key: String,
    #[serde(default)]
    pub apify_key: String,
    #[serde(default)]
    pub insta_username: String,
    #[serde(default)]
    pub insta_password: String,
    #[serde(default = "default_state_path")]
    pub state_path: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_recovery_delay_secs")]
    pub recovery_delay_secs: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    #[serde(default = "default_recency_window_hours")]
    pub recency_window_hours: i64,
    #[serde(default = "default_comment_results_limit")]
    pub comment_results_limit: usize,
    #[serde(default = "default_comment_sample_size")]
    pub comment_sample_size: usize,
    #[serde(default = "default_llm_model")]
    pub llm_model: String,
    #[serde(default)]
    pub llm_base_url: Option<String>,
    #[serde(default = "default_apify_actor_id")]
    pub apify_actor_id: String,
    #[serde(default = "default_apify_base_url")]
    pub apify_base_url: String,
    #[serde(default = "default_instagram_base_url")]
    pub instagram_base_url: String,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            google_api_key: String::new(),
            apify_key: String::new(),
            insta_username: String::new(),
            insta_password: String::new(),
            state_path: default_state_path(),
            poll_interval_secs: default_poll_interval_secs(),
            recovery_delay_secs: default_recovery_delay_secs(),
            retry_attempts: default_retry_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
            recency_window_hours: default_recency_window_hours(),
            comment_results_limit: default_comment_results_limit(),
            comment_sample_size: default_comment_sample_size(),
            llm_model: default_llm_model(),
            llm_base_url: None,
            apify_actor_id: default_apify_actor_id(),
            apify_base_url: default_apify_base_url(),
            instagram_base_url: default_instagram_base_url(),
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

impl Config {
    pub fn resolve_config_path() -> Result<Option<PathBuf>, ReelReplyError> {
        if let Ok(custom) = std::env::var("REELREPLY_CONFIG") {
            if std::path::Path::new(&custom).exists() {
                return Ok(Some(PathBuf::from(custom)));
            }
            return Err(ReelReplyError::Config(format!(
                "REELREPLY_CONFIG points to non-existent file: {custom}"
            )));
        }

        if std::path::Path::new("./reelreply.config.yaml").exists() {
            return Ok(Some(PathBuf::from("./reelreply.config.yaml")));
        }
        if std::path::Path::new("./reelreply.config.yml").exists() {
            return Ok(Some(PathBuf::from("./reelreply.config.yml")));
        }
        Ok(None)
    }

    /// Load `.env`, the optional YAML file and the environment, in that
    /// order of increasing precedence.
    pub fn load() -> Result<Self, ReelReplyError> {
        dotenvy::dotenv().ok();
        Self::load_from_process_env()
    }

    /// Same as [`Config::load`] without reading `.env`.
    pub fn load_from_process_env() -> Result<Self, ReelReplyError> {
        let mut config = match Self::resolve_config_path()? {
            Some(path) => {
                let path_str = path.to_string_lossy().to_string();
                let content = std::fs::read_to_string(&path).map_err(|e| {
                    ReelReplyError::Config(format!("Failed to read {path_str}: {e}"))
                })?;
                serde_yaml::from_str::<Config>(&content).map_err(|e| {
                    ReelReplyError::Config(format!("Failed to parse {path_str}: {e}"))
                })?
            }
            None => Config::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.post_deserialize()?;
        Ok(config)
    }

    /// Overwrite secrets with non-blank values returned by `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let fields: [(&str, &mut String); 4] = [
            (GOOGLE_API_KEY_ENV, &mut self.google_api_key),
            (APIFY_KEY_ENV, &mut self.apify_key),
            (INSTA_USERNAME_ENV, &mut self.insta_username),
            (INSTA_PASSWORD_ENV, &mut self.insta_password),
        ];
        for (key, slot) in fields {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                *slot = value.trim().to_string();
            }
        }
    }

    /// Apply post-deserialization normalization and validation.
    pub fn post_deserialize(&mut self) -> Result<(), ReelReplyError> {
        if self.state_path.trim().is_empty() {
            self.state_path = default_state_path();
        }
        if self.llm_model.trim().is_empty() {
            self.llm_model = default_llm_model();
        }
        if let Some(ref url) = self.llm_base_url {
            if url.trim().is_empty() {
                self.llm_base_url = None;
            }
        }
        if self.apify_actor_id.trim().is_empty() {
            self.apify_actor_id = default_apify_actor_id();
        }
        if self.apify_base_url.trim().is_empty() {
            self.apify_base_url = default_apify_base_url();
        }
        if self.instagram_base_url.trim().is_empty() {
            self.instagram_base_url = default_instagram_base_url();
        }
        if self.poll_interval_secs == 0 {
            self.poll_interval_secs = default_poll_interval_secs();
        }
        if self.retry_attempts == 0 {
            self.retry_attempts = default_retry_attempts();
        }
        if self.recency_window_hours <= 0 {
            self.recency_window_hours = default_recency_window_hours();
        }
        if self.comment_results_limit == 0 {
            self.comment_results_limit = default_comment_results_limit();
        }
        if self.comment_sample_size == 0 {
            self.comment_sample_size = default_comment_sample_size();
        }
        if self.http_timeout_secs == 0 {
            self.http_timeout_secs = default_http_timeout_secs();
        }

        let missing = self.missing_secrets();
        if !missing.is_empty() {
            return Err(ReelReplyError::Config(format!(
                "Missing required environment variables: {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }

    pub fn missing_secrets(&self) -> Vec<&'static str> {
        [
            (GOOGLE_API_KEY_ENV, &self.google_api_key),
            (APIFY_KEY_ENV, &self.apify_key),
            (INSTA_USERNAME_ENV, &self.insta_username),
            (INSTA_PASSWORD_ENV, &self.insta_password),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(key, _)| key)
        .collect()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn recovery_delay(&self) -> Duration {
        Duration::from_secs(self.recovery_delay_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_attempts, Duration::from_secs(self.retry_delay_secs))
    }

    pub fn recency_window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.recency_window_hours)
    }
}
