//! REST API server demo
//!
//! Runs eth-fetcher with the REST API enabled.
//!
//! Set `ALCHEMY_API_KEY` to fetch from Alchemy's mainnet endpoint, then:
//! - Submit a job via POST http://localhost:8080/request?start=19000000&end=19000099
//! - Poll it via GET http://localhost:8080/status/<job_id>
//! - Stop it via POST http://localhost:8080/stop/<job_id>
//! - Fetch the CSV via GET http://localhost:8080/download/<job_id>
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::sync::Arc;

use eth_fetcher::api::start_api_server;
use eth_fetcher::{BlockFetcher, Config};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::default().with_alchemy_key_from_env();
    let config_arc = Arc::new(config.clone());
    let fetcher = Arc::new(BlockFetcher::new(config).await?);

    let address = config_arc.server.api.bind_address;
    println!("eth-fetcher REST API on http://{address}");
    println!();
    println!("Example commands:");
    println!("  curl -X POST 'http://{address}/request?start=19000000&end=19000099'");
    println!("  curl http://{address}/status/<job_id>");
    println!("  curl -OJ http://{address}/download/<job_id>");

    let server = tokio::spawn(start_api_server(fetcher.clone(), config_arc));

    // Returns after SIGINT/SIGTERM once running jobs have stopped
    eth_fetcher::run_with_shutdown((*fetcher).clone()).await?;
    server.abort();

    Ok(())
}
