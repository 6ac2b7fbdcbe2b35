//! OpenAPI documentation and schema generation
//!
//! Defines the OpenAPI specification for the eth-fetcher REST API using
//! utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the eth-fetcher REST API
///
/// Served as JSON at `/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "eth-fetcher REST API",
        version = "0.1.0",
        description = "Submit block range jobs, poll their progress, stop them, and download the gapless CSV artifacts",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    paths(
        // Jobs
        crate::api::routes::request_job,
        crate::api::routes::job_status,
        crate::api::routes::stop_job,
        crate::api::routes::download_job,
        crate::api::routes::list_jobs,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::BlockRange,
        crate::types::JobState,
        crate::types::JobSnapshot,
        crate::types::CancelOutcome,

        // Config types from config.rs
        crate::config::Config,
        crate::config::SourceConfig,
        crate::config::FetchConfig,
        crate::config::RateLimitConfig,
        crate::config::RetryConfig,
        crate::config::PersistenceConfig,
        crate::config::ServerIntegrationConfig,
        crate::config::ApiConfig,

        // API request/response types from routes
        crate::api::routes::RangeQuery,
        crate::api::routes::SubmitResponse,
        crate::api::routes::StopResponse,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "jobs", description = "Range jobs - Submit, monitor, stop, and download block ranges"),
        (name = "system", description = "System endpoints - Health check and OpenAPI spec"),
    )
)]
pub struct ApiDoc;
