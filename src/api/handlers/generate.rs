//! Image generation endpoints

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;
use utoipa::ToSchema;

use crate::domain::{
    AssetBatchItem, AssetBatchRequest, ContextPreset, GenerationRequest, GenerationSettings,
    ImagePayload, ProductProfile,
};
use crate::engine::{AssetBatchOutcome, BatchOutcome};
use crate::error::GenerationError;
use crate::AppState;

/// Request body for a single-context batch
#[derive(Debug, Deserialize, ToSchema)]
pub struct GenerateImagesRequest {
    pub profile: ProductProfile,
    pub settings: GenerationSettings,
    /// Source photo as base64 or a `data:` URL
    #[serde(default)]
    pub reference_image: Option<String>,
    #[serde(default)]
    pub custom_prompt: Option<String>,
    /// Maximum variations generated at once
    #[serde(default)]
    pub concurrency: Option<usize>,
}

/// One asset type of a multi-asset batch
#[derive(Debug, Deserialize, ToSchema)]
pub struct AssetItem {
    /// Context preset name, e.g. "lifestyle"
    pub asset_type: String,
    #[serde(default = "default_variations")]
    pub variations: i64,
    #[serde(default)]
    pub custom_prompt: Option<String>,
}

fn default_variations() -> i64 { 1 }

/// Request body for a multi-asset batch
#[derive(Debug, Deserialize, ToSchema)]
pub struct GenerateAssetsRequest {
    pub profile: ProductProfile,
    /// Shared settings; preset and variation count come from each asset
    #[serde(default)]
    pub settings: Option<GenerationSettings>,
    #[serde(default)]
    pub reference_image: Option<String>,
    pub assets: Vec<AssetItem>,
    #[serde(default)]
    pub concurrency: Option<usize>,
}

#[derive(Serialize, ToSchema)]
pub struct GenerateImagesResponse {
    pub success: bool,
    pub generation_time_ms: u64,
    #[serde(flatten)]
    pub outcome: BatchOutcome,
}

#[derive(Serialize, ToSchema)]
pub struct GenerateAssetsResponse {
    pub success: bool,
    pub generation_time_ms: u64,
    #[serde(flatten)]
    pub outcome: AssetBatchOutcome,
}

fn decode_reference(reference: Option<&str>) -> Result<Option<ImagePayload>, GenerationError> {
    reference
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(ImagePayload::from_base64)
        .transpose()
}

/// POST /api/v1/generations - Generate variations for one context
#[utoipa::path(
    post,
    path = "/api/v1/generations",
    tag = "generations",
    request_body = GenerateImagesRequest,
    responses(
        (status = 200, description = "At least one variation succeeded", body = GenerateImagesResponse),
        (status = 400, description = "Invalid request or reference image", body = crate::error::ErrorResponse),
        (status = 502, description = "Every variation failed", body = crate::error::ErrorResponse),
        (status = 503, description = "Image backend not configured", body = crate::error::ErrorResponse)
    )
)]
pub async fn generate_images(
    state: web::Data<AppState>,
    body: web::Json<GenerateImagesRequest>,
) -> Result<HttpResponse, GenerationError> {
    let start = Instant::now();
    let body = body.into_inner();

    info!(
        preset = %body.settings.context_preset,
        variations = body.settings.effective_variations(),
        has_reference = body.reference_image.is_some(),
        "Processing generation request"
    );

    let mut request = GenerationRequest::new(body.profile, body.settings);
    request.reference_image = decode_reference(body.reference_image.as_deref())?;
    request.custom_prompt = body.custom_prompt;
    request.concurrency = body.concurrency;

    let outcome = state.orchestrator.generate_batch(request).await?;

    Ok(HttpResponse::Ok().json(GenerateImagesResponse {
        success: true,
        generation_time_ms: start.elapsed().as_millis() as u64,
        outcome,
    }))
}

/// POST /api/v1/generations/assets - Generate several asset types from one photo
#[utoipa::path(
    post,
    path = "/api/v1/generations/assets",
    tag = "generations",
    request_body = GenerateAssetsRequest,
    responses(
        (status = 200, description = "At least one asset group succeeded", body = GenerateAssetsResponse),
        (status = 400, description = "Unknown asset type or invalid reference image", body = crate::error::ErrorResponse),
        (status = 502, description = "Every asset group failed", body = crate::error::ErrorResponse),
        (status = 503, description = "Image backend not configured", body = crate::error::ErrorResponse)
    )
)]
pub async fn generate_assets(
    state: web::Data<AppState>,
    body: web::Json<GenerateAssetsRequest>,
) -> Result<HttpResponse, GenerationError> {
    let start = Instant::now();
    let body = body.into_inner();

    info!(assets = body.assets.len(), "Processing asset batch request");

    let request = AssetBatchRequest {
        profile: body.profile,
        base_settings: body
            .settings
            .unwrap_or_else(|| GenerationSettings::new(ContextPreset::Packshot)),
        reference_image: decode_reference(body.reference_image.as_deref())?,
        items: body
            .assets
            .into_iter()
            .map(|a| AssetBatchItem {
                asset_type: a.asset_type,
                variations: a.variations,
                custom_prompt: a.custom_prompt,
            })
            .collect(),
        concurrency: body.concurrency,
    };

    let outcome = state.orchestrator.generate_asset_batch(request).await?;

    Ok(HttpResponse::Ok().json(GenerateAssetsResponse {
        success: true,
        generation_time_ms: start.elapsed().as_millis() as u64,
        outcome,
    }))
}
