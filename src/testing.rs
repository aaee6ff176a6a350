//! Scripted backend doubles for unit tests

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::domain::{ImagePayload, Quality, Size};
use crate::providers::{
    ArtifactPayload, ImageBackend, JobBackend, JobPoll, ProviderError, ProviderResult,
};

pub const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

pub fn png_payload() -> ImagePayload {
    ImagePayload::new(Bytes::from_static(PNG_MAGIC), "image/png")
}

fn api_error(status: u16) -> ProviderError {
    ProviderError::ApiError {
        status,
        message: format!("scripted failure {}", status),
    }
}

// ============================================================================
// Image backend
// ============================================================================

pub struct ScriptedImageBackend {
    configured: bool,
    text_failure: Option<u16>,
    edit_failure: Option<u16>,
    /// 1-based text call numbers that fail with a 400
    failing_text_calls: HashSet<u32>,
    text_calls: AtomicU32,
    edit_calls: AtomicU32,
}

impl ScriptedImageBackend {
    pub fn succeeding() -> Self {
        ScriptedImageBackend {
            configured: true,
            text_failure: None,
            edit_failure: None,
            failing_text_calls: HashSet::new(),
            text_calls: AtomicU32::new(0),
            edit_calls: AtomicU32::new(0),
        }
    }

    pub fn unconfigured() -> Self {
        ScriptedImageBackend { configured: false, ..Self::succeeding() }
    }

    pub fn fail_text_with_status(mut self, status: u16) -> Self {
        self.text_failure = Some(status);
        self
    }

    pub fn fail_edits_with_status(mut self, status: u16) -> Self {
        self.edit_failure = Some(status);
        self
    }

    pub fn fail_text_calls(mut self, calls: &[u32]) -> Self {
        self.failing_text_calls = calls.iter().copied().collect();
        self
    }

    pub fn text_calls(&self) -> u32 {
        self.text_calls.load(Ordering::SeqCst)
    }

    pub fn edit_calls(&self) -> u32 {
        self.edit_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageBackend for ScriptedImageBackend {
    fn code(&self) -> &'static str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-image-1"
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn synthesize_from_text(
        &self,
        _instruction: &str,
        _size: Size,
        _quality: Quality,
    ) -> ProviderResult<ImagePayload> {
        let call = self.text_calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::task::yield_now().await;
        if let Some(status) = self.text_failure {
            return Err(api_error(status));
        }
        if self.failing_text_calls.contains(&call) {
            return Err(api_error(400));
        }
        Ok(png_payload())
    }

    async fn edit_from_reference(
        &self,
        _reference: &ImagePayload,
        _instruction: &str,
        _size: Size,
        _quality: Quality,
    ) -> ProviderResult<ImagePayload> {
        self.edit_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        match self.edit_failure {
            Some(status) => Err(api_error(status)),
            None => Ok(png_payload()),
        }
    }
}

// ============================================================================
// Job backend
// ============================================================================

/// One scripted backend response
pub enum Step<T> {
    Ok(T),
    Status(u16),
}

/// Image backend that holds every call for a fixed latency and records
/// the peak number of calls in flight
pub struct GaugeImageBackend {
    latency: Duration,
    fail_edits: bool,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl GaugeImageBackend {
    pub fn new(latency: Duration) -> Self {
        GaugeImageBackend {
            latency,
            fail_edits: false,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Edits still hold for the latency, then fail with a 503
    pub fn fail_edits(mut self) -> Self {
        self.fail_edits = true;
        self
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    async fn hold(&self) -> ProviderResult<ImagePayload> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(png_payload())
    }
}

#[async_trait]
impl ImageBackend for GaugeImageBackend {
    fn code(&self) -> &'static str {
        "gauge"
    }

    fn model(&self) -> &str {
        "gauge-image-1"
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn synthesize_from_text(
        &self,
        _instruction: &str,
        _size: Size,
        _quality: Quality,
    ) -> ProviderResult<ImagePayload> {
        self.hold().await
    }

    async fn edit_from_reference(
        &self,
        _reference: &ImagePayload,
        _instruction: &str,
        _size: Size,
        _quality: Quality,
    ) -> ProviderResult<ImagePayload> {
        let image = self.hold().await?;
        if self.fail_edits {
            return Err(api_error(503));
        }
        Ok(image)
    }
}

pub struct ScriptedJobBackend {
    configured: bool,
    submits: Mutex<VecDeque<Step<String>>>,
    polls: Mutex<VecDeque<Step<JobPoll>>>,
    fetches: Mutex<VecDeque<Step<()>>>,
    submit_times: Mutex<Vec<Instant>>,
    poll_times: Mutex<Vec<Instant>>,
    fetch_calls: AtomicU32,
}

impl ScriptedJobBackend {
    /// Submits succeed and polls stay pending unless scripted
    pub fn new() -> Self {
        ScriptedJobBackend {
            configured: true,
            submits: Mutex::new(VecDeque::new()),
            polls: Mutex::new(VecDeque::new()),
            fetches: Mutex::new(VecDeque::new()),
            submit_times: Mutex::new(Vec::new()),
            poll_times: Mutex::new(Vec::new()),
            fetch_calls: AtomicU32::new(0),
        }
    }

    pub fn unconfigured() -> Self {
        ScriptedJobBackend { configured: false, ..Self::new() }
    }

    pub fn with_submits(self, steps: Vec<Step<String>>) -> Self {
        *self.submits.lock() = steps.into();
        self
    }

    pub fn with_polls(self, steps: Vec<Step<JobPoll>>) -> Self {
        *self.polls.lock() = steps.into();
        self
    }

    pub fn with_fetches(self, steps: Vec<Step<()>>) -> Self {
        *self.fetches.lock() = steps.into();
        self
    }

    pub fn submit_times(&self) -> Vec<Instant> {
        self.submit_times.lock().clone()
    }

    pub fn poll_times(&self) -> Vec<Instant> {
        self.poll_times.lock().clone()
    }

    pub fn fetch_calls(&self) -> u32 {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobBackend for ScriptedJobBackend {
    fn code(&self) -> &'static str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-video-1"
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn submit_job(&self, _instruction: &str, _size: Size, _duration_hint: u32) -> ProviderResult<String> {
        self.submit_times.lock().push(Instant::now());
        match self.submits.lock().pop_front() {
            Some(Step::Ok(id)) => Ok(id),
            Some(Step::Status(status)) => Err(api_error(status)),
            None => Ok("video_scripted".to_string()),
        }
    }

    async fn poll_job(&self, _job_id: &str) -> ProviderResult<JobPoll> {
        self.poll_times.lock().push(Instant::now());
        match self.polls.lock().pop_front() {
            Some(Step::Ok(poll)) => Ok(poll),
            Some(Step::Status(status)) => Err(api_error(status)),
            None => Ok(JobPoll::pending(None)),
        }
    }

    async fn fetch_artifact(&self, _job_id: &str) -> ProviderResult<ArtifactPayload> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        match self.fetches.lock().pop_front() {
            Some(Step::Status(status)) => Err(api_error(status)),
            Some(Step::Ok(())) | None => Ok(ArtifactPayload {
                bytes: Bytes::from_static(b"\0\0\0\x18ftypmp42"),
                content_type: "video/mp4".to_string(),
            }),
        }
    }
}
