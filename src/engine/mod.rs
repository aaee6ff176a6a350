//! Generation orchestration engine
//!
//! This module contains the core generation logic including:
//! - Profile normalization and prompt composition
//! - Method selection with hybrid fallback
//! - Single-variation dispatch and provenance
//! - Variation fan-out and the orchestrator facade

mod batch;
mod dispatcher;
mod normalizer;
mod orchestrator;
mod prompt;
mod provenance;
mod selector;

pub use batch::VariationBatch;
pub use normalizer::ProfileNormalizer;
pub use orchestrator::{AssetBatchOutcome, BatchOutcome, GenerationOrchestrator, OrchestratorOptions};
pub use selector::MethodPreferences;
