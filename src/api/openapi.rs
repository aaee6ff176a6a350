//! OpenAPI 3.0 specification definition

use utoipa::OpenApi;

use crate::api::handlers::{
    generate::{AssetItem, GenerateAssetsRequest, GenerateAssetsResponse, GenerateImagesRequest, GenerateImagesResponse},
    health::HealthResponse,
    jobs::{CreateJobRequest, JobListResponse, JobResponse},
    profiles::{NormalizeProfileRequest, ProfileResponse},
    usage::UsageResponse,
};
use crate::billing::{MonthlyUsage, UsageSummary};
use crate::domain::{
    ConfidenceLevel, ContextPreset, ContextPrompts, Dimensions, GenerationMethod, GenerationResult,
    GenerationSettings, PhotographySpecs, ProductProfile, Provenance, Quality, ResolvedMethod,
    ResultMetadata, TextZone, VariationError, VisualDetails,
};
use crate::engine::{AssetBatchOutcome, BatchOutcome, VariationBatch};
use crate::error::{ApiError, ErrorKind, ErrorResponse};
use crate::jobs::{ArtifactHandle, GenerationJob, JobState};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Furniture Studio API",
        version = "1.0.0",
        description = "Generation orchestration service turning furniture photos into marketing imagery",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "/", description = "Current server")
    ),
    tags(
        (name = "system", description = "System health and status endpoints"),
        (name = "profiles", description = "Product profile normalization"),
        (name = "generations", description = "Synchronous image generation"),
        (name = "jobs", description = "Asynchronous video generation jobs"),
        (name = "usage", description = "Billable usage")
    ),
    paths(
        crate::api::handlers::health::health_check,
        crate::api::handlers::profiles::normalize_profile,
        crate::api::handlers::generate::generate_images,
        crate::api::handlers::generate::generate_assets,
        crate::api::handlers::jobs::create_job,
        crate::api::handlers::jobs::list_jobs,
        crate::api::handlers::jobs::get_job,
        crate::api::handlers::jobs::cancel_job,
        crate::api::handlers::jobs::get_job_content,
        crate::api::handlers::usage::get_usage,
    ),
    components(
        schemas(
            // System
            HealthResponse,
            ErrorResponse,
            ApiError,
            ErrorKind,
            // Profiles
            NormalizeProfileRequest,
            ProfileResponse,
            ProductProfile,
            ConfidenceLevel,
            Dimensions,
            ContextPrompts,
            PhotographySpecs,
            VisualDetails,
            // Generations
            GenerateImagesRequest,
            GenerateImagesResponse,
            GenerateAssetsRequest,
            GenerateAssetsResponse,
            AssetItem,
            GenerationSettings,
            ContextPreset,
            Quality,
            TextZone,
            GenerationMethod,
            ResolvedMethod,
            GenerationResult,
            Provenance,
            ResultMetadata,
            VariationError,
            VariationBatch,
            BatchOutcome,
            AssetBatchOutcome,
            // Jobs
            CreateJobRequest,
            JobResponse,
            JobListResponse,
            GenerationJob,
            JobState,
            ArtifactHandle,
            // Usage
            UsageResponse,
            UsageSummary,
            MonthlyUsage,
        )
    )
)]
pub struct ApiDoc;
