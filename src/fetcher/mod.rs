//! Top-level fetcher handle split into focused submodules.
//!
//! The `BlockFetcher` struct and its methods are organized by domain:
//! - [`tasks`] - Job submission and worker spawning
//! - [`control`] - Job cancellation and status queries
//! - [`lifecycle`] - Shutdown coordination
//! - [`fetch_task`] - Core fetch execution (batch engine)

mod control;
pub mod fetch_task;
mod lifecycle;
mod tasks;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use crate::config::Config;
use crate::db::{Database, RecordCache};
use crate::error::Result;
use crate::rate_limiter::RateLimiter;
use crate::registry::JobRegistry;
use crate::source::{JsonRpcSource, RateLimitedSource, RecordSource};

/// Main fetcher instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct BlockFetcher {
    /// Block cache database, when the fetcher owns one
    pub(crate) db: Option<Arc<Database>>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Cache-first, rate-limited access to the remote source
    pub(crate) source: RateLimitedSource,
    /// Every submitted job
    pub(crate) registry: JobRegistry,
    /// Flag to indicate whether new jobs are accepted (set to false during shutdown)
    pub(crate) accepting_new: Arc<AtomicBool>,
}

impl BlockFetcher {
    /// Create a fetcher against the configured JSON-RPC endpoint.
    ///
    /// Opens (and migrates) the SQLite block cache at
    /// `config.persistence.database_path`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use eth_fetcher::{BlockFetcher, Config};
    ///
    /// # async fn example() -> eth_fetcher::Result<()> {
    /// let config = Config::default().with_alchemy_key_from_env();
    /// let fetcher = BlockFetcher::new(config).await?;
    /// let id = fetcher.submit(19_000_000, 19_000_999).await?;
    /// println!("submitted {id}");
    /// # Ok(())
    /// # }
    /// ```
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let source: Arc<dyn RecordSource> = Arc::new(JsonRpcSource::new(&config.source)?);
        let db = Arc::new(Database::new(&config.persistence.database_path).await?);
        let cache: Arc<dyn RecordCache> = db.clone();

        tracing::info!(
            rpc_url = %redact_url(&config.source.rpc_url),
            database = %config.persistence.database_path.display(),
            batch_size = config.fetch.batch_size,
            requests_per_second = config.rate_limit.requests_per_second,
            "Block fetcher initialized"
        );

        Ok(Self::assemble(config, source, cache, Some(db)))
    }

    /// Create a fetcher over a caller-supplied source and cache.
    ///
    /// Used for alternative transports and for tests.
    pub fn with_source(
        config: Config,
        source: Arc<dyn RecordSource>,
        cache: Arc<dyn RecordCache>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(config, source, cache, None))
    }

    fn assemble(
        config: Config,
        source: Arc<dyn RecordSource>,
        cache: Arc<dyn RecordCache>,
        db: Option<Arc<Database>>,
    ) -> Self {
        let limiter = RateLimiter::new(&config.rate_limit);
        let source = RateLimitedSource::new(source, cache, limiter, config.retry.clone());

        Self {
            db,
            config: Arc::new(config),
            source,
            registry: JobRegistry::new(),
            accepting_new: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Strip the path (which carries API keys for hosted providers) from a URL for logging
fn redact_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(url) => format!(
            "{}://{}",
            url.scheme(),
            url.host_str().unwrap_or("unknown-host")
        ),
        Err(_) => "<invalid url>".to_string(),
    }
}
