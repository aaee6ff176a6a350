//! Domain types and models

mod profile;
mod request;
mod result;
mod settings;

pub use profile::{
    ConfidenceLevel, ContextPrompts, Dimensions, PhotographySpecs, ProductProfile, VisualDetails,
};
pub use request::{
    AssetBatchItem, AssetBatchRequest, AsyncGenerationRequest, GenerationRequest,
};
pub use result::{
    GenerationMethod, GenerationResult, ImagePayload, Provenance, ResolvedMethod, ResultMetadata,
    VariationError,
};
pub use settings::{ContextPreset, GenerationSettings, Quality, Size, TextZone};
