//! Usage summary endpoint

use actix_web::{web, HttpResponse};
use serde::Serialize;
use utoipa::ToSchema;

use crate::billing::UsageSummary;
use crate::AppState;

#[derive(Serialize, ToSchema)]
pub struct UsageResponse {
    pub success: bool,
    pub usage: UsageSummary,
}

/// GET /api/v1/usage - Credits charged so far
#[utoipa::path(
    get,
    path = "/api/v1/usage",
    tag = "usage",
    responses(
        (status = 200, description = "Usage summary", body = UsageResponse)
    )
)]
pub async fn get_usage(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(UsageResponse {
        success: true,
        usage: state.ledger.summary(),
    })
}
