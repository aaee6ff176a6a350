//! Variation fan-out with partial-failure tolerance
//!
//! Every variation is an independent attempt returning its own `Result`.
//! Attempts across all groups of a call share one semaphore, so the
//! concurrency limit bounds the whole call rather than each group.

use std::time::Instant;

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::domain::{
    ConfidenceLevel, ContextPreset, GenerationResult, GenerationSettings, ImagePayload,
    VariationError,
};
use crate::error::GenerationError;

use super::dispatcher::{DispatchInput, GenerationDispatcher};
use super::provenance::ProvenanceRecorder;
use super::selector::MethodSelection;

/// Everything needed to run the variations of one context
#[derive(Debug, Clone)]
pub struct VariationPlan {
    pub settings: GenerationSettings,
    pub instruction: String,
    pub selection: MethodSelection,
}

impl VariationPlan {
    pub fn requested(&self) -> u32 {
        self.settings.effective_variations()
    }
}

/// Outcome of one context's variations
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VariationBatch {
    pub context_preset: ContextPreset,
    pub requested: u32,
    pub results: Vec<GenerationResult>,
    pub errors: Vec<VariationError>,
}

impl VariationBatch {
    pub fn succeeded(&self) -> u32 {
        self.results.len() as u32
    }

    /// Fail only when no variation succeeded
    pub fn into_result(self) -> Result<VariationBatch, GenerationError> {
        if self.results.is_empty() {
            Err(GenerationError::AllVariationsFailed {
                requested: self.requested,
                causes: self.errors,
            })
        } else {
            Ok(self)
        }
    }
}

#[derive(Clone)]
pub struct VariationBatchManager {
    dispatcher: GenerationDispatcher,
    default_concurrency: usize,
}

impl VariationBatchManager {
    pub fn new(dispatcher: GenerationDispatcher, default_concurrency: usize) -> Self {
        Self {
            dispatcher,
            default_concurrency: default_concurrency.max(1),
        }
    }

    pub fn dispatcher(&self) -> &GenerationDispatcher {
        &self.dispatcher
    }

    /// Run every variation of every plan
    ///
    /// Returns one batch per plan, in plan order, each with its results
    /// sorted by variation index.
    #[instrument(skip(self, plans, reference), fields(groups = plans.len()))]
    pub async fn run(
        &self,
        plans: &[VariationPlan],
        reference: Option<&ImagePayload>,
        profile_confidence: ConfidenceLevel,
        concurrency: Option<usize>,
    ) -> Vec<VariationBatch> {
        let start = Instant::now();
        let limit = concurrency.unwrap_or(self.default_concurrency).max(1);
        let semaphore = Semaphore::new(limit);

        let attempts = plans.iter().enumerate().flat_map(|(group, plan)| {
            let semaphore = &semaphore;
            (1..=plan.requested()).map(move |index| async move {
                let outcome = self
                    .attempt(plan, reference, index, profile_confidence, semaphore)
                    .await;
                (group, outcome)
            })
        });
        let outcomes = join_all(attempts).await;

        let mut batches: Vec<VariationBatch> = plans
            .iter()
            .map(|plan| VariationBatch {
                context_preset: plan.settings.context_preset,
                requested: plan.requested(),
                results: Vec::new(),
                errors: Vec::new(),
            })
            .collect();

        for (group, outcome) in outcomes {
            match outcome {
                Ok(result) => batches[group].results.push(result),
                Err(error) => batches[group].errors.push(error),
            }
        }
        for batch in &mut batches {
            batch.results.sort_by_key(|r| r.metadata.variation_index);
            batch.errors.sort_by_key(|e| e.variation_index);
        }

        info!(
            concurrency = limit,
            succeeded = batches.iter().map(|b| b.succeeded()).sum::<u32>(),
            failed = batches.iter().map(|b| b.errors.len()).sum::<usize>(),
            total_time_ms = start.elapsed().as_millis() as u64,
            "Variation batch complete"
        );
        batches
    }

    async fn attempt(
        &self,
        plan: &VariationPlan,
        reference: Option<&ImagePayload>,
        variation_index: u32,
        profile_confidence: ConfidenceLevel,
        semaphore: &Semaphore,
    ) -> Result<GenerationResult, VariationError> {
        let _permit = semaphore
            .acquire()
            .await
            .map_err(|_| VariationError::new(variation_index, &GenerationError::Cancelled, Vec::new()))?;

        let input = DispatchInput {
            instruction: &plan.instruction,
            size: plan.settings.target_size(),
            quality: plan.settings.quality,
            reference,
        };

        match self.dispatcher.dispatch_selection(&plan.selection, input).await {
            Ok(dispatched) => Ok(ProvenanceRecorder::record(
                dispatched.image,
                &plan.instruction,
                dispatched.record,
                profile_confidence,
                &plan.settings,
                variation_index,
            )),
            Err(failure) => {
                warn!(
                    preset = %plan.settings.context_preset,
                    variation_index,
                    error = %failure.error,
                    "Variation failed"
                );
                Err(VariationError::new(variation_index, &failure.error, failure.attempted))
            }
        }
    }
}
