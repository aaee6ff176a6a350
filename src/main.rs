//! Furniture Studio
//!
//! Generation orchestration service that turns furniture photographs into
//! marketing imagery. Image synthesis is delegated to external AI backends;
//! this service decides how to generate, composes instructions, fans out
//! variations and drives long-running video jobs.

use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;

mod api;
mod billing;
mod config;
mod delivery;
mod domain;
mod engine;
mod error;
mod jobs;
mod providers;
#[cfg(test)]
mod testing;

use crate::billing::UsageLedger;
use crate::config::Settings;
use crate::engine::{GenerationOrchestrator, MethodPreferences, OrchestratorOptions};
use crate::providers::{OpenAiImageProvider, VideoJobProvider};

/// Application state shared across all handlers
pub struct AppState {
    pub orchestrator: GenerationOrchestrator,
    pub ledger: Arc<UsageLedger>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(orchestrator: GenerationOrchestrator, ledger: Arc<UsageLedger>) -> Self {
        AppState {
            orchestrator,
            ledger,
            started_at: Instant::now(),
        }
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing subscriber for structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("furniture_studio=info,actix_web=info")),
        )
        .json()
        .init();

    let settings = Settings::load().context("Failed to load configuration")?;
    let bind_addr = format!("{}:{}", settings.server.host, settings.server.port);

    info!(
        "Starting Furniture Studio v{} on {}",
        env!("CARGO_PKG_VERSION"),
        bind_addr
    );

    // The video backend shares the image backend's key unless given its own
    let mut video_settings = settings.video.clone();
    if video_settings.api_key.is_none() {
        video_settings.api_key = settings.openai.api_key.clone();
    }

    let image_backend = Arc::new(
        OpenAiImageProvider::new(&settings.openai).context("Failed to build image backend client")?,
    );
    let video_backend = Arc::new(
        VideoJobProvider::new(&video_settings).context("Failed to build video backend client")?,
    );
    if settings.openai.api_key.is_none() {
        warn!("No image backend API key configured; generation requests will be rejected");
    }

    let ledger = Arc::new(UsageLedger::new());
    let orchestrator = GenerationOrchestrator::new(
        image_backend,
        video_backend,
        ledger.clone(),
        OrchestratorOptions {
            preferences: MethodPreferences::default(),
            max_concurrency: settings.generation.max_concurrency,
            job_policy: settings.jobs.policy(),
            delivery_policy: settings.delivery.policy(),
            job_retention: settings.jobs.retention(),
        },
    );

    let app_state = web::Data::new(AppState::new(orchestrator, ledger));
    let workers = settings.server.workers.unwrap_or_else(num_cpus::get);

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(TracingLogger::default())
            .wrap(
                middleware::DefaultHeaders::new()
                    .add(("X-Service", "furniture-studio"))
                    .add(("X-Version", env!("CARGO_PKG_VERSION")))
            )
            .configure(api::configure_routes)
    })
    .workers(workers)
    .bind(&bind_addr)?
    .run()
    .await?;

    Ok(())
}
