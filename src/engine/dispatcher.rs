//! Single-variation dispatch to a synchronous image backend
//!
//! One call to [`GenerationDispatcher::dispatch`] is exactly one backend
//! call. There are no internal retries; the only repetition is walking a
//! selection's attempt list in [`GenerationDispatcher::dispatch_selection`].

use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::domain::{ImagePayload, Quality, ResolvedMethod, Size};
use crate::error::GenerationError;
use crate::providers::ImageBackend;

use super::provenance::DispatchRecord;
use super::selector::MethodSelection;

/// Inputs shared by every attempt of one variation
#[derive(Debug, Clone, Copy)]
pub struct DispatchInput<'a> {
    pub instruction: &'a str,
    pub size: Size,
    pub quality: Quality,
    pub reference: Option<&'a ImagePayload>,
}

/// A successful backend call
#[derive(Debug, Clone)]
pub struct Dispatched {
    pub image: ImagePayload,
    pub record: DispatchRecord,
}

/// Every attempt of a selection failed
#[derive(Debug, Clone)]
pub struct DispatchFailure {
    /// Error of the final attempt
    pub error: GenerationError,
    pub attempted: Vec<ResolvedMethod>,
}

#[derive(Clone)]
pub struct GenerationDispatcher {
    backend: Arc<dyn ImageBackend>,
}

impl GenerationDispatcher {
    pub fn new(backend: Arc<dyn ImageBackend>) -> Self {
        Self { backend }
    }

    /// Fail before any backend call when credentials are missing
    pub fn ensure_configured(&self) -> Result<(), GenerationError> {
        if self.backend.is_configured() {
            Ok(())
        } else {
            Err(GenerationError::Configuration(format!(
                "image backend '{}' has no API key configured",
                self.backend.code()
            )))
        }
    }

    /// Invoke exactly one backend capability
    pub async fn dispatch(
        &self,
        method: ResolvedMethod,
        input: DispatchInput<'_>,
    ) -> Result<Dispatched, GenerationError> {
        self.ensure_configured()?;

        let started = Instant::now();
        let image = match method {
            ResolvedMethod::TextToImage => {
                self.backend
                    .synthesize_from_text(input.instruction, input.size, input.quality)
                    .await?
            }
            ResolvedMethod::ReferenceBased => {
                let reference = input.reference.ok_or_else(|| {
                    GenerationError::Validation(
                        "reference-based generation requires a reference image".to_string(),
                    )
                })?;
                self.backend
                    .edit_from_reference(reference, input.instruction, input.size, input.quality)
                    .await?
            }
        };
        let elapsed = started.elapsed();

        debug!(
            method = %method,
            provider = self.backend.code(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Backend call succeeded"
        );

        Ok(Dispatched {
            image,
            record: DispatchRecord {
                method,
                provider: self.backend.code().to_string(),
                model: self.backend.model().to_string(),
                elapsed,
                fallback_reason: None,
            },
        })
    }

    /// Try each method of the selection in order until one succeeds
    pub async fn dispatch_selection(
        &self,
        selection: &MethodSelection,
        input: DispatchInput<'_>,
    ) -> Result<Dispatched, DispatchFailure> {
        let started = Instant::now();
        let mut attempted = Vec::with_capacity(selection.attempts.len());
        let mut fallback_reason = selection.fallback_reason.clone();

        if let Err(error) = self.ensure_configured() {
            return Err(DispatchFailure { error, attempted });
        }

        let last = selection.attempts.len().saturating_sub(1);
        for (position, method) in selection.attempts.iter().copied().enumerate() {
            attempted.push(method);
            match self.dispatch(method, input).await {
                Ok(mut dispatched) => {
                    // Provenance covers every attempt of the variation
                    dispatched.record.elapsed = started.elapsed();
                    dispatched.record.fallback_reason = fallback_reason;
                    return Ok(dispatched);
                }
                Err(error) if position < last => {
                    let next = selection.attempts[position + 1];
                    warn!(
                        preset = %selection.preset,
                        failed_method = %method,
                        next_method = %next,
                        error = %error,
                        "Generation attempt failed, falling back"
                    );
                    fallback_reason = Some(format!("{} failed ({}); fell back to {}", method, error, next));
                }
                Err(error) => return Err(DispatchFailure { error, attempted }),
            }
        }

        Err(DispatchFailure {
            error: GenerationError::Validation("method selection has no attempts".to_string()),
            attempted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ContextPreset;
    use crate::error::ErrorKind;
    use crate::engine::selector::MethodSelector;
    use crate::testing::{png_payload, GaugeImageBackend, ScriptedImageBackend};
    use std::time::Duration;

    fn input<'a>(reference: Option<&'a ImagePayload>) -> DispatchInput<'a> {
        DispatchInput {
            instruction: "a sofa",
            size: Size::new(1024, 1024),
            quality: Quality::Medium,
            reference,
        }
    }

    #[tokio::test]
    async fn test_dispatch_text_calls_synthesize_once() {
        let backend = Arc::new(ScriptedImageBackend::succeeding());
        let dispatcher = GenerationDispatcher::new(backend.clone());

        let dispatched = dispatcher.dispatch(ResolvedMethod::TextToImage, input(None)).await.unwrap();
        assert_eq!(dispatched.record.method, ResolvedMethod::TextToImage);
        assert_eq!(dispatched.record.provider, "scripted");
        assert_eq!(backend.text_calls(), 1);
        assert_eq!(backend.edit_calls(), 0);
    }

    #[tokio::test]
    async fn test_reference_method_without_reference_is_validation_error() {
        let backend = Arc::new(ScriptedImageBackend::succeeding());
        let dispatcher = GenerationDispatcher::new(backend.clone());

        let err = dispatcher
            .dispatch(ResolvedMethod::ReferenceBased, input(None))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(backend.edit_calls(), 0);
    }

    #[tokio::test]
    async fn test_unconfigured_backend_fails_before_calling() {
        let backend = Arc::new(ScriptedImageBackend::unconfigured());
        let dispatcher = GenerationDispatcher::new(backend.clone());

        let err = dispatcher.dispatch(ResolvedMethod::TextToImage, input(None)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(backend.text_calls(), 0);
    }

    #[tokio::test]
    async fn test_hybrid_falls_back_to_text_on_edit_failure() {
        let backend = Arc::new(ScriptedImageBackend::succeeding().fail_edits_with_status(500));
        let dispatcher = GenerationDispatcher::new(backend.clone());
        let reference = png_payload();
        let selection = MethodSelector::default().select(ContextPreset::Lifestyle, true);

        let dispatched = dispatcher
            .dispatch_selection(&selection, input(Some(&reference)))
            .await
            .unwrap();
        assert_eq!(dispatched.record.method, ResolvedMethod::TextToImage);
        let reason = dispatched.record.fallback_reason.unwrap();
        assert!(reason.starts_with("reference-based failed"));
        assert_eq!(backend.edit_calls(), 1);
        assert_eq!(backend.text_calls(), 1);
    }

    #[tokio::test]
    async fn test_final_attempt_error_is_returned_with_attempt_list() {
        let backend = Arc::new(
            ScriptedImageBackend::succeeding()
                .fail_edits_with_status(500)
                .fail_text_with_status(400),
        );
        let dispatcher = GenerationDispatcher::new(backend);
        let reference = png_payload();
        let selection = MethodSelector::default().select(ContextPreset::Hero, true);

        let failure = dispatcher
            .dispatch_selection(&selection, input(Some(&reference)))
            .await
            .unwrap_err();
        assert_eq!(failure.error.kind(), ErrorKind::TerminalBackend);
        assert_eq!(
            failure.attempted,
            vec![ResolvedMethod::ReferenceBased, ResolvedMethod::TextToImage]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_duration_includes_failed_attempt() {
        let backend = Arc::new(GaugeImageBackend::new(Duration::from_millis(400)).fail_edits());
        let dispatcher = GenerationDispatcher::new(backend);
        let reference = png_payload();
        let selection = MethodSelector::default().select(ContextPreset::Hero, true);

        let dispatched = dispatcher
            .dispatch_selection(&selection, input(Some(&reference)))
            .await
            .unwrap();
        assert_eq!(dispatched.record.method, ResolvedMethod::TextToImage);
        assert_eq!(dispatched.record.elapsed, Duration::from_millis(800));
    }
}
