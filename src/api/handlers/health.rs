//! Health check endpoint

use actix_web::{web, HttpResponse};
use serde::Serialize;
use utoipa::ToSchema;

use crate::AppState;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub image_backend_configured: bool,
    pub video_backend_configured: bool,
    pub jobs_tracked: usize,
}

/// GET /health - Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let orchestrator = &state.orchestrator;
    let image_ready = orchestrator.image_backend_configured();
    let video_ready = orchestrator.job_backend_configured();

    HttpResponse::Ok().json(HealthResponse {
        // Degraded means requests will fail with a configuration error
        status: if image_ready && video_ready { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        image_backend_configured: image_ready,
        video_backend_configured: video_ready,
        jobs_tracked: orchestrator.tracked_jobs(),
    })
}
