//! API module - HTTP routes and handlers

pub mod handlers;
pub mod openapi;

use actix_web::web;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::openapi::ApiDoc;
use crate::error::GenerationError;

/// Largest accepted JSON body; reference images arrive inline as base64
const MAX_JSON_BYTES: usize = 25 * 1024 * 1024;

/// Malformed bodies get the same error envelope as every other failure
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(MAX_JSON_BYTES)
        .error_handler(|err, _req| GenerationError::Validation(err.to_string()).into())
}

/// Configure all API routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .service(
            web::scope("/api/v1")
                .service(
                    web::scope("/profiles")
                        .route("/normalize", web::post().to(handlers::profiles::normalize_profile))
                )
                .service(
                    web::scope("/generations")
                        .route("", web::post().to(handlers::generate::generate_images))
                        .route("/assets", web::post().to(handlers::generate::generate_assets))
                )
                .service(
                    web::scope("/jobs")
                        .route("", web::post().to(handlers::jobs::create_job))
                        .route("", web::get().to(handlers::jobs::list_jobs))
                        .route("/{id}/content", web::get().to(handlers::jobs::get_job_content))
                        .route("/{id}", web::get().to(handlers::jobs::get_job))
                        .route("/{id}", web::delete().to(handlers::jobs::cancel_job))
                )
                .route("/usage", web::get().to(handlers::usage::get_usage))
        )
        .route("/health", web::get().to(handlers::health::health_check))
        // Swagger UI and OpenAPI spec
        .service(
            SwaggerUi::new("/swagger-ui/{_:.*}")
                .url("/api-docs/openapi.json", ApiDoc::openapi())
        );
}
