//! Configuration types for eth-fetcher

use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

use crate::error::{Error, Result};

/// Remote JSON-RPC source settings
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SourceConfig {
    /// JSON-RPC endpoint URL (default: "http://127.0.0.1:8545")
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// Per-request timeout (default: 15 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub request_timeout: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Batch fetching and output settings
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct FetchConfig {
    /// Blocks fetched concurrently per batch (default: 500, minimum 1)
    ///
    /// Larger batches fan out further but hold more records in memory
    /// before the ordered write.
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,

    /// Directory where job CSV artifacts are written (default: "./jobs")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            output_dir: default_output_dir(),
        }
    }
}

/// Admission control for remote calls, shared by every job in the process
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RateLimitConfig {
    /// Remote requests per second (default: 25, 0 = unlimited)
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u64,

    /// Bucket capacity, i.e. how many requests may burst at once (default: 25)
    #[serde(default = "default_burst")]
    pub burst: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_requests_per_second(),
            burst: default_burst(),
        }
    }
}

/// Retry configuration for transient remote failures
///
/// There is no attempt limit: a block is retried until it succeeds or its
/// job is cancelled.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RetryConfig {
    /// Delay before the first retry (default: 2 seconds)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 60 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PersistenceConfig {
    /// Block cache database path (default: "./eth-fetcher.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// API and external server integration configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:8080)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
        }
    }
}

/// Main configuration for [`BlockFetcher`](crate::BlockFetcher)
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Remote source settings
    #[serde(default)]
    pub source: SourceConfig,

    /// Batch size and output location
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Shared admission control
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Backoff policy for transient failures
    #[serde(default)]
    pub retry: RetryConfig,

    /// Cache database location
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// API and external server integration
    #[serde(default)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Point the source at an Alchemy mainnet endpoint when `ALCHEMY_API_KEY` is set.
    ///
    /// Leaves the configured URL untouched otherwise.
    pub fn with_alchemy_key_from_env(mut self) -> Self {
        if let Ok(key) = std::env::var("ALCHEMY_API_KEY")
            && !key.trim().is_empty()
        {
            self.source.rpc_url = alchemy_url(key.trim());
        }
        self
    }

    /// Reject settings that would make the engine misbehave
    pub fn validate(&self) -> Result<()> {
        if self.fetch.batch_size == 0 {
            return Err(Error::config(
                "fetch.batch_size",
                "batch size must be at least 1",
            ));
        }
        if url::Url::parse(&self.source.rpc_url).is_err() {
            return Err(Error::config(
                "source.rpc_url",
                format!("invalid RPC URL: {:?}", self.source.rpc_url),
            ));
        }
        let multiplier = self.retry.backoff_multiplier;
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(Error::config(
                "retry.backoff_multiplier",
                "backoff multiplier must be a finite number >= 1.0",
            ));
        }
        if self.retry.initial_delay > self.retry.max_delay {
            return Err(Error::config(
                "retry.initial_delay",
                "initial delay must not exceed max delay",
            ));
        }
        if self.rate_limit.requests_per_second > 0 && self.rate_limit.burst == 0 {
            return Err(Error::config(
                "rate_limit.burst",
                "burst must be at least 1 when rate limiting is enabled",
            ));
        }
        Ok(())
    }
}

/// Alchemy Ethereum mainnet endpoint for an API key
pub fn alchemy_url(api_key: &str) -> String {
    format!("https://eth-mainnet.g.alchemy.com/v2/{api_key}")
}

fn default_rpc_url() -> String {
    "http://127.0.0.1:8545".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_batch_size() -> u64 {
    500
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./jobs")
}

fn default_requests_per_second() -> u64 {
    25
}

fn default_burst() -> u64 {
    25
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./eth-fetcher.db")
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
