//! Asynchronous job endpoints

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{AsyncGenerationRequest, GenerationSettings, ProductProfile};
use crate::error::GenerationError;
use crate::jobs::GenerationJob;
use crate::AppState;

/// Request body for job creation
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateJobRequest {
    pub profile: ProductProfile,
    pub settings: GenerationSettings,
    #[serde(default)]
    pub custom_prompt: Option<String>,
    /// Requested clip length; rounded up to 4, 8 or 12 seconds
    #[serde(default)]
    pub duration_secs: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct JobResponse {
    pub success: bool,
    pub job: GenerationJob,
}

#[derive(Serialize, ToSchema)]
pub struct JobListResponse {
    pub success: bool,
    pub jobs: Vec<GenerationJob>,
    pub count: usize,
}

/// POST /api/v1/jobs - Start an asynchronous generation job
#[utoipa::path(
    post,
    path = "/api/v1/jobs",
    tag = "jobs",
    request_body = CreateJobRequest,
    responses(
        (status = 202, description = "Job accepted", body = JobResponse),
        (status = 503, description = "Video backend not configured", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_job(
    state: web::Data<AppState>,
    body: web::Json<CreateJobRequest>,
) -> Result<HttpResponse, GenerationError> {
    let body = body.into_inner();
    let job = state.orchestrator.generate_async(AsyncGenerationRequest {
        profile: body.profile,
        settings: body.settings,
        custom_prompt: body.custom_prompt,
        duration_hint: body.duration_secs,
    })?;

    info!(job_id = %job.id, preset = %job.context_preset, "Job accepted");
    Ok(HttpResponse::Accepted().json(JobResponse { success: true, job }))
}

/// GET /api/v1/jobs - List jobs, newest first
#[utoipa::path(
    get,
    path = "/api/v1/jobs",
    tag = "jobs",
    responses(
        (status = 200, description = "All tracked jobs", body = JobListResponse)
    )
)]
pub async fn list_jobs(state: web::Data<AppState>) -> HttpResponse {
    let jobs = state.orchestrator.list_jobs();
    HttpResponse::Ok().json(JobListResponse {
        success: true,
        count: jobs.len(),
        jobs,
    })
}

/// GET /api/v1/jobs/{id} - Current job snapshot
#[utoipa::path(
    get,
    path = "/api/v1/jobs/{id}",
    tag = "jobs",
    params(("id" = Uuid, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Job snapshot", body = JobResponse),
        (status = 404, description = "Job not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_job(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, GenerationError> {
    let job = state.orchestrator.job(path.into_inner())?;
    Ok(HttpResponse::Ok().json(JobResponse { success: true, job }))
}

/// DELETE /api/v1/jobs/{id} - Stop tracking progress of a job
///
/// The job ends `cancelled` at its next wait. The backend job itself is not
/// cancelled.
#[utoipa::path(
    delete,
    path = "/api/v1/jobs/{id}",
    tag = "jobs",
    params(("id" = Uuid, Path, description = "Job ID")),
    responses(
        (status = 202, description = "Cancellation requested", body = JobResponse),
        (status = 404, description = "Job not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn cancel_job(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, GenerationError> {
    let job = state.orchestrator.cancel_job(path.into_inner())?;
    Ok(HttpResponse::Accepted().json(JobResponse { success: true, job }))
}

/// GET /api/v1/jobs/{id}/content - Download a completed job's artifact
#[utoipa::path(
    get,
    path = "/api/v1/jobs/{id}/content",
    tag = "jobs",
    params(("id" = Uuid, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Artifact bytes", content_type = "video/mp4"),
        (status = 400, description = "Job has not completed", body = crate::error::ErrorResponse),
        (status = 404, description = "Job not found", body = crate::error::ErrorResponse),
        (status = 502, description = "Backend delivery failed", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_job_content(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, GenerationError> {
    let artifact = state.orchestrator.job_content(path.into_inner()).await?;
    Ok(HttpResponse::Ok()
        .content_type(artifact.content_type)
        .body(artifact.bytes))
}
