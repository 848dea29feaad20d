//! Configuration management for the Build Service
//!
//! Loads configuration from environment variables with sensible defaults.
//! A `.env` file in the working directory is read first when present.

use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::storage::RetentionPolicy;
use crate::worker::WorkerConfig;

/// Placeholder GitHub token from the sample `.env` file
pub const GITHUB_TOKEN_PLACEHOLDER: &str = "your_github_token_here";

/// Placeholder OpenAI key from the sample `.env` file
pub const OPENAI_KEY_PLACEHOLDER: &str = "your_openai_key_here";

/// Application configuration
#[derive(Debug)]
pub struct Config {
    /// API server host
    pub host: String,

    /// API server port
    pub port: u16,

    /// Token for the GitHub account that owns generated repositories
    pub github_token: SecretString,

    /// GitHub account name, used for the Pages URL
    pub github_username: String,

    /// GitHub REST API base URL
    pub github_api_url: String,

    /// Email callers must present
    pub student_email: String,

    /// Secret callers must present
    pub student_secret: SecretString,

    /// Generative API key (only reported, never used)
    pub openai_api_key: SecretString,

    /// Generative model name (only recorded)
    pub llm_model: String,

    /// Advertised upper bound on a single build, in seconds (recorded, not enforced)
    pub max_build_time_secs: u64,

    /// Number of concurrent build workers
    pub build_workers: usize,

    /// Builds that may wait for a worker before requests are refused
    pub queue_capacity: usize,

    /// How long finished status records are kept, in seconds
    pub status_ttl_secs: u64,

    /// Maximum number of status records kept
    pub status_max_entries: usize,

    /// Whether the service runs on the production host
    pub production: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            github_token: SecretString::from(String::new()),
            github_username: String::new(),
            github_api_url: "https://api.github.com".to_string(),
            student_email: String::new(),
            student_secret: SecretString::from(String::new()),
            openai_api_key: SecretString::from(String::new()),
            llm_model: "gpt-3.5-turbo".to_string(),
            max_build_time_secs: 600,
            build_workers: 4,
            queue_capacity: 64,
            status_ttl_secs: 86_400,
            status_max_entries: 10_000,
            production: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (for local development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let string = |name: &str, default: String| lookup(name).unwrap_or(default);
        let secret = |name: &str| SecretString::from(lookup(name).unwrap_or_default());

        let config = Config {
            host: string("HOST", defaults.host),
            port: parse_var(&lookup, "PORT", defaults.port)?,
            github_token: secret("GITHUB_TOKEN"),
            github_username: string("GITHUB_USERNAME", defaults.github_username),
            github_api_url: string("GITHUB_API_URL", defaults.github_api_url)
                .trim_end_matches('/')
                .to_string(),
            student_email: string("STUDENT_EMAIL", defaults.student_email),
            student_secret: secret("STUDENT_SECRET"),
            openai_api_key: secret("OPENAI_API_KEY"),
            llm_model: string("LLM_MODEL", defaults.llm_model),
            max_build_time_secs: parse_var(
                &lookup,
                "MAX_BUILD_TIME",
                defaults.max_build_time_secs,
            )?,
            build_workers: parse_var(&lookup, "BUILD_WORKERS", defaults.build_workers)?,
            queue_capacity: parse_var(&lookup, "BUILD_QUEUE_CAPACITY", defaults.queue_capacity)?,
            status_ttl_secs: parse_var(&lookup, "STATUS_TTL_SECS", defaults.status_ttl_secs)?,
            status_max_entries: parse_var(
                &lookup,
                "STATUS_MAX_ENTRIES",
                defaults.status_max_entries,
            )?,
            production: lookup("RAILWAY_STATIC_URL").is_some(),
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("PORT must be greater than 0");
        }
        if self.max_build_time_secs == 0 {
            anyhow::bail!("MAX_BUILD_TIME must be greater than 0");
        }
        if self.build_workers == 0 {
            anyhow::bail!("BUILD_WORKERS must be greater than 0");
        }
        if self.queue_capacity == 0 {
            anyhow::bail!("BUILD_QUEUE_CAPACITY must be greater than 0");
        }
        if self.status_max_entries == 0 {
            anyhow::bail!("STATUS_MAX_ENTRIES must be greater than 0");
        }

        Ok(())
    }

    /// Get the API server address
    pub fn api_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn github_configured(&self) -> bool {
        is_configured(&self.github_token, GITHUB_TOKEN_PLACEHOLDER)
    }

    pub fn openai_configured(&self) -> bool {
        is_configured(&self.openai_api_key, OPENAI_KEY_PLACEHOLDER)
    }

    /// Deployment environment label
    pub fn environment(&self) -> &'static str {
        if self.production {
            "production"
        } else {
            "development"
        }
    }

    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy {
            ttl: Duration::from_secs(self.status_ttl_secs),
            max_entries: self.status_max_entries,
        }
    }

    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            num_workers: self.build_workers,
            queue_capacity: self.queue_capacity,
        }
    }
}

fn is_configured(value: &SecretString, placeholder: &str) -> bool {
    let value = value.expose_secret();
    !value.is_empty() && value != placeholder
}

fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}: {:?}", name, raw)),
        None => Ok(default),
    }
}
