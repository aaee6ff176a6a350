//! Profile normalization endpoint

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::domain::ProductProfile;
use crate::engine::ProfileNormalizer;
use crate::error::GenerationError;

/// Request body for profile normalization
#[derive(Debug, Deserialize, ToSchema)]
pub struct NormalizeProfileRequest {
    /// Raw vision-analysis output
    #[schema(value_type = Object)]
    pub analysis: serde_json::Value,
    /// Profile being re-analysed; the result keeps its id with a bumped version
    #[serde(default)]
    pub previous: Option<ProductProfile>,
}

#[derive(Serialize, ToSchema)]
pub struct ProfileResponse {
    pub success: bool,
    pub profile: ProductProfile,
}

/// POST /api/v1/profiles/normalize - Canonicalize vision-analysis output
#[utoipa::path(
    post,
    path = "/api/v1/profiles/normalize",
    tag = "profiles",
    request_body = NormalizeProfileRequest,
    responses(
        (status = 200, description = "Normalized profile", body = ProfileResponse),
        (status = 400, description = "Analysis payload is not an object", body = crate::error::ErrorResponse)
    )
)]
pub async fn normalize_profile(
    body: web::Json<NormalizeProfileRequest>,
) -> Result<HttpResponse, GenerationError> {
    let body = body.into_inner();
    let profile = ProfileNormalizer::normalize(&body.analysis, body.previous.as_ref())?;

    info!(
        profile_id = %profile.id,
        version = profile.version,
        product_type = %profile.product_type,
        "Profile normalized"
    );

    Ok(HttpResponse::Ok().json(ProfileResponse { success: true, profile }))
}
