//! Generation orchestrator
//!
//! Entry point for callers. Composes instructions, selects methods, fans out
//! variations or starts asynchronous jobs, and reports billable outcomes.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::billing::{UsageEvent, UsageKind, UsageReporter, CREDITS_PER_JOB, CREDITS_PER_VARIATION};
use crate::delivery::{ArtifactDelivery, DeliveryError, DeliveryPolicy};
use crate::domain::{AssetBatchRequest, AsyncGenerationRequest, GenerationRequest, VariationError};
use crate::error::GenerationError;
use crate::jobs::{
    GenerationJob, JobLifecycleManager, JobObserver, JobPolicy, JobRegistry, JobState, DEFAULT_RETENTION,
};
use crate::providers::{ArtifactPayload, ImageBackend, JobBackend};

use super::batch::{VariationBatch, VariationBatchManager, VariationPlan};
use super::dispatcher::GenerationDispatcher;
use super::prompt::PromptComposer;
use super::selector::{MethodPreferences, MethodSelector};

/// Tunables injected at construction
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    pub preferences: MethodPreferences,
    pub max_concurrency: usize,
    pub job_policy: JobPolicy,
    pub delivery_policy: DeliveryPolicy,
    /// How long finished jobs remain queryable
    pub job_retention: Duration,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        OrchestratorOptions {
            preferences: MethodPreferences::default(),
            max_concurrency: 1,
            job_policy: JobPolicy::default(),
            delivery_policy: DeliveryPolicy::default(),
            job_retention: DEFAULT_RETENTION,
        }
    }
}

/// Result of a single-context batch
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BatchOutcome {
    pub request_id: Uuid,
    #[serde(flatten)]
    pub batch: VariationBatch,
}

/// Result of a multi-asset batch, one group per requested asset type
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AssetBatchOutcome {
    pub request_id: Uuid,
    pub groups: Vec<VariationBatch>,
    /// Groups in which no variation succeeded
    pub failed_groups: u32,
}

#[derive(Clone)]
pub struct GenerationOrchestrator {
    selector: MethodSelector,
    batches: VariationBatchManager,
    lifecycle: JobLifecycleManager,
    registry: JobRegistry,
    delivery: ArtifactDelivery,
    usage: Arc<dyn UsageReporter>,
}

impl GenerationOrchestrator {
    pub fn new(
        image_backend: Arc<dyn ImageBackend>,
        job_backend: Arc<dyn JobBackend>,
        usage: Arc<dyn UsageReporter>,
        options: OrchestratorOptions,
    ) -> Self {
        GenerationOrchestrator {
            selector: MethodSelector::new(options.preferences),
            batches: VariationBatchManager::new(
                GenerationDispatcher::new(image_backend),
                options.max_concurrency,
            ),
            lifecycle: JobLifecycleManager::new(job_backend.clone(), options.job_policy),
            registry: JobRegistry::new(options.job_retention),
            delivery: ArtifactDelivery::new(job_backend, options.delivery_policy),
            usage,
        }
    }

    pub fn image_backend_configured(&self) -> bool {
        self.batches.dispatcher().ensure_configured().is_ok()
    }

    pub fn job_backend_configured(&self) -> bool {
        self.lifecycle.backend().is_configured()
    }

    pub fn tracked_jobs(&self) -> usize {
        self.registry.len()
    }

    // ========================================================================
    // Synchronous image batches
    // ========================================================================

    /// Generate N variations of one context
    ///
    /// Fails only when no variation succeeds.
    #[instrument(skip(self, request), fields(preset = %request.settings.context_preset))]
    pub async fn generate_batch(&self, request: GenerationRequest) -> Result<BatchOutcome, GenerationError> {
        self.batches.dispatcher().ensure_configured()?;

        let request_id = Uuid::new_v4();
        let selection = self
            .selector
            .select(request.settings.context_preset, request.reference_image.is_some());
        debug!(
            method = %selection.method(),
            preferred = %selection.preferred,
            "Selected generation method"
        );
        let plan = VariationPlan {
            instruction: PromptComposer::compose(
                &request.profile,
                &request.settings,
                request.custom_prompt.as_deref(),
            ),
            selection,
            settings: request.settings,
        };

        let batch = self
            .batches
            .run(
                std::slice::from_ref(&plan),
                request.reference_image.as_ref(),
                request.profile.confidence,
                request.concurrency,
            )
            .await
            .into_iter()
            .next()
            .ok_or_else(|| GenerationError::terminal("variation batch produced no outcome"))?;

        self.bill(UsageEvent::new(
            request_id,
            UsageKind::ImageBatch,
            batch.succeeded() * CREDITS_PER_VARIATION,
            batch.requested,
            vec![batch.context_preset],
        ))
        .await;

        let batch = batch.into_result()?;
        info!(
            request_id = %request_id,
            succeeded = batch.succeeded(),
            failed = batch.errors.len(),
            "Batch generation finished"
        );
        Ok(BatchOutcome { request_id, batch })
    }

    /// Generate several asset types from one source image
    ///
    /// Every item is validated before any backend call. Groups succeed or
    /// fail independently; the call fails only when every group fails.
    #[instrument(skip(self, request), fields(items = request.items.len()))]
    pub async fn generate_asset_batch(
        &self,
        request: AssetBatchRequest,
    ) -> Result<AssetBatchOutcome, GenerationError> {
        let items = request.resolve_items()?;
        self.batches.dispatcher().ensure_configured()?;

        let request_id = Uuid::new_v4();
        let has_reference = request.reference_image.is_some();
        let plans: Vec<VariationPlan> = items
            .into_iter()
            .map(|item| VariationPlan {
                instruction: PromptComposer::compose(
                    &request.profile,
                    &item.settings,
                    item.custom_prompt.as_deref(),
                ),
                selection: self.selector.select(item.preset, has_reference),
                settings: item.settings,
            })
            .collect();

        let groups = self
            .batches
            .run(
                &plans,
                request.reference_image.as_ref(),
                request.profile.confidence,
                request.concurrency,
            )
            .await;

        for group in &groups {
            self.bill(UsageEvent::new(
                request_id,
                UsageKind::AssetBatch,
                group.succeeded() * CREDITS_PER_VARIATION,
                group.requested,
                vec![group.context_preset],
            ))
            .await;
        }

        let failed_groups = groups.iter().filter(|g| g.results.is_empty()).count() as u32;
        if failed_groups as usize == groups.len() {
            let requested = groups.iter().map(|g| g.requested).sum();
            let causes: Vec<VariationError> = groups.into_iter().flat_map(|g| g.errors).collect();
            return Err(GenerationError::AllVariationsFailed { requested, causes });
        }
        if failed_groups > 0 {
            warn!(request_id = %request_id, failed_groups, "Some asset groups produced no images");
        }

        Ok(AssetBatchOutcome {
            request_id,
            groups,
            failed_groups,
        })
    }

    // ========================================================================
    // Asynchronous jobs
    // ========================================================================

    /// Create a job and drive it in the background
    ///
    /// Returns the job snapshot as created; poll [`Self::job`] for progress.
    #[instrument(skip(self, request), fields(preset = %request.settings.context_preset))]
    pub fn generate_async(&self, request: AsyncGenerationRequest) -> Result<GenerationJob, GenerationError> {
        let backend = self.lifecycle.backend();
        if !backend.is_configured() {
            return Err(GenerationError::Configuration(format!(
                "job backend '{}' has no API key configured",
                backend.code()
            )));
        }

        let preset = request.settings.context_preset;
        let prompt = PromptComposer::compose(&request.profile, &request.settings, request.custom_prompt.as_deref());
        let size = request.settings.size.unwrap_or_else(|| preset.default_video_size());
        let job = GenerationJob::new(
            backend.code(),
            backend.model(),
            preset,
            prompt,
            size,
            request.effective_duration(),
        );
        let cancel = self.registry.insert(job.clone());
        info!(job_id = %job.id, duration_secs = job.duration_secs, size = %size, "Job created");

        let lifecycle = self.lifecycle.clone();
        let registry = self.registry.clone();
        let usage = self.usage.clone();
        let initial = job.clone();
        tokio::spawn(async move {
            let sink = registry.clone();
            let observer: JobObserver = Box::new(move |job: &GenerationJob| sink.update(job));
            let finished = lifecycle.run(initial, cancel, observer).await;
            registry.update(&finished);

            let credits = match finished.state {
                JobState::Completed { .. } => CREDITS_PER_JOB,
                _ => 0,
            };
            let event = UsageEvent::new(finished.id, UsageKind::VideoJob, credits, 1, vec![finished.context_preset]);
            report(usage.as_ref(), event).await;
        });

        Ok(job)
    }

    pub fn job(&self, id: Uuid) -> Result<GenerationJob, GenerationError> {
        self.registry.get(id).ok_or(GenerationError::JobNotFound(id))
    }

    pub fn list_jobs(&self) -> Vec<GenerationJob> {
        self.registry.list()
    }

    pub fn cancel_job(&self, id: Uuid) -> Result<GenerationJob, GenerationError> {
        let job = self.registry.cancel(id)?;
        info!(job_id = %id, state = job.state.name(), "Job cancellation requested");
        Ok(job)
    }

    /// Fetch a completed job's artifact through the delivery proxy
    pub async fn job_content(&self, id: Uuid) -> Result<ArtifactPayload, GenerationError> {
        let job = self.job(id)?;
        match &job.state {
            JobState::Completed { artifact, .. } => Ok(self.delivery.fetch(artifact).await?),
            other => Err(DeliveryError::NotReady(other.name()).into()),
        }
    }

    async fn bill(&self, event: UsageEvent) {
        report(self.usage.as_ref(), event).await;
    }
}

/// Report usage; a reporter failure is logged and swallowed
///
/// Zero-credit outcomes are reported too so undelivered work stays visible.
async fn report(usage: &dyn UsageReporter, event: UsageEvent) {
    let request_id = event.request_id;
    if let Err(e) = usage.report(event).await {
        warn!(request_id = %request_id, error = %e, "Usage reporting failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::billing::UsageLedger;
    use crate::domain::{
        AssetBatchItem, ContextPreset, GenerationSettings, ProductProfile, ResolvedMethod,
    };
    use crate::error::ErrorKind;
    use crate::providers::JobPoll;
    use crate::testing::{png_payload, ScriptedImageBackend, ScriptedJobBackend, Step};

    struct FailingReporter;

    #[async_trait::async_trait]
    impl UsageReporter for FailingReporter {
        async fn report(&self, _event: UsageEvent) -> anyhow::Result<()> {
            anyhow::bail!("billing service unavailable")
        }
    }

    fn orchestrator(
        image: ScriptedImageBackend,
        jobs: ScriptedJobBackend,
        usage: Arc<dyn UsageReporter>,
    ) -> GenerationOrchestrator {
        let options = OrchestratorOptions { max_concurrency: 2, ..OrchestratorOptions::default() };
        GenerationOrchestrator::new(Arc::new(image), Arc::new(jobs), usage, options)
    }

    fn request(preset: ContextPreset, variations: i64) -> GenerationRequest {
        let mut settings = GenerationSettings::new(preset);
        settings.variations = variations;
        GenerationRequest::new(ProductProfile::new("armchair"), settings)
    }

    async fn wait_for_terminal(orchestrator: &GenerationOrchestrator, id: Uuid) -> GenerationJob {
        loop {
            let job = orchestrator.job(id).unwrap();
            if job.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(1000)).await;
        }
    }

    #[tokio::test]
    async fn test_partial_batch_bills_only_successes() {
        let ledger = Arc::new(UsageLedger::new());
        let orchestrator = orchestrator(
            ScriptedImageBackend::succeeding().fail_text_calls(&[1]),
            ScriptedJobBackend::new(),
            ledger.clone(),
        );

        let outcome = orchestrator.generate_batch(request(ContextPreset::Story, 3)).await.unwrap();

        assert_eq!(outcome.batch.results.len(), 2);
        assert_eq!(outcome.batch.errors.len(), 1);
        assert_eq!(ledger.summary().total_credits, 2);
    }

    #[tokio::test]
    async fn test_batch_with_no_successes_fails_and_bills_nothing() {
        let ledger = Arc::new(UsageLedger::new());
        let orchestrator = orchestrator(
            ScriptedImageBackend::succeeding().fail_text_with_status(500),
            ScriptedJobBackend::new(),
            ledger.clone(),
        );

        let err = orchestrator.generate_batch(request(ContextPreset::Hero, 2)).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::AllVariationsFailed);
        let summary = ledger.summary();
        assert_eq!(summary.total_events, 1);
        assert_eq!(summary.total_credits, 0);
        assert_eq!(summary.unbilled, 2);
    }

    #[tokio::test]
    async fn test_reference_image_drives_hybrid_method() {
        let orchestrator = orchestrator(
            ScriptedImageBackend::succeeding(),
            ScriptedJobBackend::new(),
            Arc::new(UsageLedger::new()),
        );
        let request = request(ContextPreset::Lifestyle, 1).with_reference(png_payload());

        let outcome = orchestrator.generate_batch(request).await.unwrap();
        let source = &outcome.batch.results[0].source;
        assert_eq!(source.method, ResolvedMethod::ReferenceBased);
        assert!(source.reference_image_used);
        assert!(source.fallback_reason.is_none());
    }

    #[tokio::test]
    async fn test_reporter_failure_does_not_fail_generation() {
        let orchestrator = orchestrator(
            ScriptedImageBackend::succeeding(),
            ScriptedJobBackend::new(),
            Arc::new(FailingReporter),
        );
        assert!(orchestrator.generate_batch(request(ContextPreset::Packshot, 1)).await.is_ok());
    }

    #[tokio::test]
    async fn test_unconfigured_backend_is_configuration_error() {
        let orchestrator = orchestrator(
            ScriptedImageBackend::unconfigured(),
            ScriptedJobBackend::unconfigured(),
            Arc::new(UsageLedger::new()),
        );
        let err = orchestrator.generate_batch(request(ContextPreset::Detail, 2)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let err = orchestrator
            .generate_async(AsyncGenerationRequest {
                profile: ProductProfile::new("lamp"),
                settings: GenerationSettings::new(ContextPreset::Hero),
                custom_prompt: None,
                duration_hint: None,
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    fn asset_request(items: Vec<(&str, i64)>) -> AssetBatchRequest {
        AssetBatchRequest {
            profile: ProductProfile::new("sideboard"),
            base_settings: GenerationSettings::new(ContextPreset::Packshot),
            reference_image: None,
            items: items
                .into_iter()
                .map(|(asset_type, variations)| AssetBatchItem {
                    asset_type: asset_type.to_string(),
                    variations,
                    custom_prompt: None,
                })
                .collect(),
            concurrency: Some(1),
        }
    }

    #[tokio::test]
    async fn test_unknown_asset_type_rejected_before_backend_calls() {
        let backend = Arc::new(ScriptedImageBackend::succeeding());
        let orchestrator = GenerationOrchestrator::new(
            backend.clone(),
            Arc::new(ScriptedJobBackend::new()),
            Arc::new(UsageLedger::new()),
            OrchestratorOptions::default(),
        );

        let err = orchestrator
            .generate_asset_batch(asset_request(vec![("packshot", 1), ("banner", 1)]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(backend.text_calls(), 0);
    }

    #[tokio::test]
    async fn test_asset_groups_each_get_their_own_results() {
        let ledger = Arc::new(UsageLedger::new());
        let orchestrator = orchestrator(
            ScriptedImageBackend::succeeding(),
            ScriptedJobBackend::new(),
            ledger.clone(),
        );

        let outcome = orchestrator
            .generate_asset_batch(asset_request(vec![("story", 2), ("instagram", 1)]))
            .await
            .unwrap();

        assert_eq!(outcome.groups.len(), 2);
        assert_eq!(outcome.groups[0].context_preset, ContextPreset::Story);
        assert_eq!(outcome.groups[0].results.len(), 2);
        assert_eq!(outcome.groups[1].results.len(), 1);
        assert_eq!(outcome.failed_groups, 0);
        assert_eq!(ledger.summary().total_credits, 3);
    }

    #[tokio::test]
    async fn test_asset_batch_fails_only_when_every_group_fails() {
        let orchestrator = orchestrator(
            ScriptedImageBackend::succeeding().fail_text_with_status(400),
            ScriptedJobBackend::new(),
            Arc::new(UsageLedger::new()),
        );
        let err = orchestrator
            .generate_asset_batch(asset_request(vec![("story", 2), ("hero", 1)]))
            .await
            .unwrap_err();
        match err {
            GenerationError::AllVariationsFailed { requested, causes } => {
                assert_eq!(requested, 3);
                assert_eq!(causes.len(), 3);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_async_job_completes_and_is_billed() {
        let ledger = Arc::new(UsageLedger::new());
        let orchestrator = orchestrator(
            ScriptedImageBackend::succeeding(),
            ScriptedJobBackend::new().with_polls(vec![
                Step::Ok(JobPoll::pending(Some(50))),
                Step::Ok(JobPoll::completed("video_done")),
            ]),
            ledger.clone(),
        );

        let created = orchestrator
            .generate_async(AsyncGenerationRequest {
                profile: ProductProfile::new("floor lamp"),
                settings: GenerationSettings::new(ContextPreset::Story),
                custom_prompt: Some("slow pan".into()),
                duration_hint: Some(6),
            })
            .unwrap();
        assert_eq!(created.state, JobState::Created);
        assert_eq!(created.duration_secs, 8);
        assert_eq!(created.size.to_string(), "720x1280");

        let finished = wait_for_terminal(&orchestrator, created.id).await;
        assert!(matches!(finished.state, JobState::Completed { .. }));
        assert_eq!(finished.poll_attempts, 2);

        let content = orchestrator.job_content(created.id).await.unwrap();
        assert_eq!(content.content_type, "video/mp4");

        // billing runs after the final registry update
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(ledger.summary().total_credits, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_job_ends_cancelled() {
        let ledger = Arc::new(UsageLedger::new());
        let orchestrator = orchestrator(
            ScriptedImageBackend::succeeding(),
            ScriptedJobBackend::new(),
            ledger.clone(),
        );
        let created = orchestrator
            .generate_async(AsyncGenerationRequest {
                profile: ProductProfile::new("bench"),
                settings: GenerationSettings::new(ContextPreset::Hero),
                custom_prompt: None,
                duration_hint: None,
            })
            .unwrap();

        tokio::time::sleep(Duration::from_millis(7000)).await;
        orchestrator.cancel_job(created.id).unwrap();
        let finished = wait_for_terminal(&orchestrator, created.id).await;

        assert_eq!(finished.state, JobState::Cancelled);
        assert_eq!(finished.poll_attempts, 1);
        let err = orchestrator.job_content(created.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        tokio::time::sleep(Duration::from_millis(10)).await;
        let summary = ledger.summary();
        assert_eq!(summary.total_credits, 0);
        assert_eq!(summary.unbilled, 1);
    }

    #[test]
    fn test_unknown_job_is_not_found() {
        let orchestrator = orchestrator(
            ScriptedImageBackend::succeeding(),
            ScriptedJobBackend::new(),
            Arc::new(UsageLedger::new()),
        );
        assert_eq!(orchestrator.job(Uuid::new_v4()).unwrap_err().kind(), ErrorKind::NotFound);
    }
}
