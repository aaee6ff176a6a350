//! Usage reporting for billing
//!
//! The orchestration core reports one credit per successful variation and per
//! completed job. Failed work is reported with zero credits. The reporter is a
//! collaborator: its failures are logged and never fail a generation.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::ContextPreset;

pub const CREDITS_PER_VARIATION: u32 = 1;
pub const CREDITS_PER_JOB: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UsageKind {
    ImageBatch,
    AssetBatch,
    VideoJob,
}

/// One billable outcome
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UsageEvent {
    pub request_id: Uuid,
    pub kind: UsageKind,
    /// Credits charged; equals the number of successes
    pub credits: u32,
    /// Variations or jobs requested
    pub requested: u32,
    pub context_presets: Vec<ContextPreset>,
    pub recorded_at: DateTime<Utc>,
}

impl UsageEvent {
    pub fn new(request_id: Uuid, kind: UsageKind, credits: u32, requested: u32, context_presets: Vec<ContextPreset>) -> Self {
        UsageEvent {
            request_id,
            kind,
            credits,
            requested,
            context_presets,
            recorded_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait UsageReporter: Send + Sync {
    async fn report(&self, event: UsageEvent) -> anyhow::Result<()>;
}

/// Monthly usage summary
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct MonthlyUsage {
    pub year_month: String,
    pub events: u32,
    pub credits: u64,
    pub requested: u64,
}

/// Aggregate served by the usage endpoint
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct UsageSummary {
    pub total_events: u32,
    pub total_credits: u64,
    /// Requested but not delivered (failed variations and jobs)
    pub unbilled: u64,
    pub credits_by_preset: BTreeMap<String, u64>,
    pub months: Vec<MonthlyUsage>,
}

/// In-memory ledger implementing [`UsageReporter`]
#[derive(Default)]
pub struct UsageLedger {
    events: RwLock<Vec<UsageEvent>>,
}

impl UsageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<UsageEvent> {
        self.events.read().clone()
    }

    pub fn summary(&self) -> UsageSummary {
        let events = self.events.read();
        let mut summary = UsageSummary::default();
        let mut months: BTreeMap<String, MonthlyUsage> = BTreeMap::new();

        for event in events.iter() {
            summary.total_events += 1;
            summary.total_credits += event.credits as u64;
            summary.unbilled += event.requested.saturating_sub(event.credits) as u64;

            // Credits are attributed to the first preset of multi-preset events
            if let Some(preset) = event.context_presets.first() {
                *summary.credits_by_preset.entry(preset.to_string()).or_default() += event.credits as u64;
            }

            let year_month = format!("{}-{:02}", event.recorded_at.year(), event.recorded_at.month());
            let month = months.entry(year_month.clone()).or_insert_with(|| MonthlyUsage {
                year_month,
                ..MonthlyUsage::default()
            });
            month.events += 1;
            month.credits += event.credits as u64;
            month.requested += event.requested as u64;
        }

        summary.months = months.into_values().collect();
        summary
    }
}

#[async_trait]
impl UsageReporter for UsageLedger {
    async fn report(&self, event: UsageEvent) -> anyhow::Result<()> {
        info!(
            request_id = %event.request_id,
            kind = ?event.kind,
            credits = event.credits,
            requested = event.requested,
            "Usage recorded"
        );
        self.events.write().push(event);
        Ok(())
    }
}
