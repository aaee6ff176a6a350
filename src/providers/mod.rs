//! Synthesis backend integration
//!
//! The orchestration core depends only on the traits in [`traits`]. Concrete
//! clients talk to OpenAI-compatible HTTP APIs through a shared
//! rate-limited client.
//!
//! ```text
//!        ┌──────────────────┐      ┌──────────────────┐
//!        │ ImageBackend     │      │ JobBackend       │
//!        └────────┬─────────┘      └────────┬─────────┘
//!                 │                         │
//!     ┌───────────┴─────────┐    ┌──────────┴─────────┐
//!     │ OpenAiImageProvider │    │ VideoJobProvider   │
//!     └───────────┬─────────┘    └──────────┬─────────┘
//!                 └──────► RateLimitedClient ◄┘
//! ```

pub mod http_client;
pub mod openai;
pub mod traits;
pub mod video;

pub use openai::OpenAiImageProvider;
pub use traits::{
    ArtifactPayload, ImageBackend, JobBackend, JobPoll, ProviderError, ProviderResult,
    RemoteJobStatus,
};
pub use video::VideoJobProvider;
