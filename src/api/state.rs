//! Application state for the API server

use crate::{BlockFetcher, Config};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request; everything inside is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The fetcher owning the job registry and workers
    pub fetcher: Arc<BlockFetcher>,

    /// Configuration the router was built with
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(fetcher: Arc<BlockFetcher>, config: Arc<Config>) -> Self {
        Self { fetcher, config }
    }
}
