//! Range job handlers.

use super::{RangeQuery, StopResponse, SubmitResponse};
use crate::api::AppState;
use crate::error::{Error, Result};
use crate::types::{JobId, JobSnapshot};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

/// POST /request - Submit a range job
#[utoipa::path(
    post,
    path = "/request",
    tag = "jobs",
    params(RangeQuery),
    responses(
        (status = 200, description = "Job registered and started", body = SubmitResponse),
        (status = 400, description = "Invalid block range", body = crate::error::ApiError),
        (status = 503, description = "Shutting down", body = crate::error::ApiError)
    )
)]
pub async fn request_job(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<SubmitResponse>> {
    let job_id = state.fetcher.submit(query.start, query.end).await?;
    Ok(Json(SubmitResponse { job_id }))
}

/// GET /status/:id - Snapshot of one job
#[utoipa::path(
    get,
    path = "/status/{id}",
    tag = "jobs",
    params(
        ("id" = String, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Current job state", body = JobSnapshot),
        (status = 404, description = "Unknown job", body = crate::error::ApiError)
    )
)]
pub async fn job_status(
    State(state): State<AppState>,
    Path(id): Path<JobId>,
) -> Result<Json<JobSnapshot>> {
    state
        .fetcher
        .status(id)
        .await
        .map(Json)
        .ok_or_else(|| Error::NotFound(format!("job {}", id)))
}

/// POST|GET /stop/:id - Request cancellation of a job
#[utoipa::path(
    post,
    path = "/stop/{id}",
    tag = "jobs",
    params(
        ("id" = String, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Cancellation signalled, or job already finished", body = StopResponse),
        (status = 404, description = "Unknown job", body = crate::error::ApiError)
    )
)]
pub async fn stop_job(
    State(state): State<AppState>,
    Path(id): Path<JobId>,
) -> Result<Json<StopResponse>> {
    let status = state.fetcher.cancel(id).await?;
    tracing::info!(job_id = %id, ?status, "Stop requested via API");
    Ok(Json(StopResponse { status }))
}

/// GET /download/:id - The job's CSV artifact
///
/// Serves whatever prefix has been flushed so far; a running job's
/// artifact grows between calls.
#[utoipa::path(
    get,
    path = "/download/{id}",
    tag = "jobs",
    params(
        ("id" = String, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "CSV artifact", content_type = "text/csv"),
        (status = 404, description = "Unknown job or no artifact yet", body = crate::error::ApiError)
    )
)]
pub async fn download_job(State(state): State<AppState>, Path(id): Path<JobId>) -> Result<Response> {
    let snapshot = state
        .fetcher
        .status(id)
        .await
        .ok_or_else(|| Error::NotFound(format!("job {}", id)))?;

    let path = snapshot
        .file_path
        .ok_or_else(|| Error::NotFound(format!("output for job {}", id)))?;

    let contents = match tokio::fs::read(&path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::NotFound(format!("output file {}", path.display())));
        }
        Err(e) => return Err(Error::Io(e)),
    };

    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("{}.csv", id));

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        contents,
    )
        .into_response())
}

/// GET /jobs - Every job id in submission order
#[utoipa::path(
    get,
    path = "/jobs",
    tag = "jobs",
    responses(
        (status = 200, description = "Job ids, oldest first", body = Vec<String>)
    )
)]
pub async fn list_jobs(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.fetcher.list().await)
}
