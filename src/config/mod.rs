//! Configuration module for the generation service

use serde::Deserialize;
use config::{Config, ConfigError, Environment, File};
use std::path::PathBuf;
use std::time::Duration;

use crate::delivery::DeliveryPolicy;
use crate::jobs::JobPolicy;

/// Main application settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub openai: OpenAiSettings,
    pub video: VideoSettings,
    pub generation: GenerationConfig,
    pub jobs: JobSettings,
    pub delivery: DeliverySettings,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Image synthesis backend (OpenAI-compatible images API)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenAiSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub image_model: String,
    pub timeout_secs: u64,
    /// Requests per minute
    pub rate_limit: u32,
}

/// Video job backend (OpenAI-compatible videos API)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VideoSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub rate_limit: u32,
}

/// Variation fan-out configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Default number of variations generated concurrently
    pub max_concurrency: usize,
}

/// Asynchronous job lifecycle budgets
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JobSettings {
    pub submit_attempts: u32,
    pub submit_retry_delay_ms: u64,
    pub poll_interval_ms: u64,
    pub max_poll_attempts: u32,
    /// Seconds a finished job stays queryable
    pub retention_secs: u64,
}

/// Artifact delivery proxy retry budget
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeliverySettings {
    pub attempts: u32,
    pub backoff_base_ms: u64,
}

impl Settings {
    /// Load configuration from files and environment variables
    ///
    /// Configuration priority (highest to lowest):
    /// 1. Environment variables (prefixed with STUDIO_)
    /// 2. config/local.toml (gitignored)
    /// 3. config/default.toml
    pub fn load() -> Result<Self, ConfigError> {
        let config_dir = std::env::var("CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"));

        let builder = Config::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // STUDIO_OPENAI__API_KEY, STUDIO_JOBS__POLL_INTERVAL_MS, etc.
            .add_source(
                Environment::with_prefix("STUDIO")
                    .separator("__")
                    .try_parsing(true)
            );

        builder.build()?.try_deserialize()
    }
}

impl JobSettings {
    pub fn policy(&self) -> JobPolicy {
        JobPolicy {
            submit_attempts: self.submit_attempts.max(1),
            submit_retry_delay: Duration::from_millis(self.submit_retry_delay_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            max_poll_attempts: self.max_poll_attempts.max(1),
        }
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }
}

impl DeliverySettings {
    pub fn policy(&self) -> DeliveryPolicy {
        DeliveryPolicy {
            attempts: self.attempts.max(1),
            backoff_base: Duration::from_millis(self.backoff_base_ms),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            host: "0.0.0.0".to_string(),
            port: 8080,
            workers: None,
        }
    }
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        OpenAiSettings {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            image_model: "gpt-image-1".to_string(),
            timeout_secs: 180,
            rate_limit: 50,
        }
    }
}

impl Default for VideoSettings {
    fn default() -> Self {
        VideoSettings {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "sora-2".to_string(),
            timeout_secs: 60,
            rate_limit: 60,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        GenerationConfig { max_concurrency: 2 }
    }
}

impl Default for JobSettings {
    fn default() -> Self {
        JobSettings {
            submit_attempts: 3,
            submit_retry_delay_ms: 3000,
            poll_interval_ms: 5000,
            max_poll_attempts: 120,
            retention_secs: 3600,
        }
    }
}

impl Default for DeliverySettings {
    fn default() -> Self {
        DeliverySettings {
            attempts: 3,
            backoff_base_ms: 1000,
        }
    }
}
