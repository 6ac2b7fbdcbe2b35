//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`jobs`] - Range job submission, status, cancellation and artifact download
//! - [`system`] - Health and OpenAPI

use serde::{Deserialize, Serialize};

mod jobs;
mod system;

pub use jobs::*;
pub use system::*;

// ============================================================================
// Query/Request Types (shared across handlers)
// ============================================================================

/// Query parameters for POST /request
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RangeQuery {
    /// First block of the range (inclusive)
    pub start: u64,
    /// Last block of the range (inclusive)
    pub end: u64,
}

/// Response body for POST /request
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SubmitResponse {
    /// Identifier of the newly registered job
    #[schema(value_type = String)]
    pub job_id: crate::types::JobId,
}

/// Response body for /stop/:id
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct StopResponse {
    /// Whether cancellation was signalled or the job had already finished
    pub status: crate::types::CancelOutcome,
}
