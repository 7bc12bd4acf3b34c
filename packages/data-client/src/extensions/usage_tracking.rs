//! Usage tracking: count successful creates on billable models.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;
use tracing::debug;

use super::{Extension, Next};
use crate::config::log_level::LogCategory;
use crate::error::ClientError;
use crate::operation::{Action, Operation};

/// Models whose creation counts towards usage.
pub const TRACKED_MODELS: &[&str] = &["Booking"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageEvent {
    pub model: String,
    pub action: Action,
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
}

#[derive(Debug, Default)]
struct UsageState {
    counts: HashMap<String, u64>,
    last: Option<UsageEvent>,
}

/// In-process usage counters, keyed by model.
#[derive(Debug, Default)]
pub struct UsageRecorder {
    state: Mutex<UsageState>,
}

impl UsageRecorder {
    pub fn record(&self, event: UsageEvent) {
        let mut state = self.state.lock();
        *state.counts.entry(event.model.clone()).or_default() += 1;
        state.last = Some(event);
    }

    pub fn count(&self, model: &str) -> u64 {
        self.state.lock().counts.get(model).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.state.lock().counts.values().sum()
    }

    pub fn last(&self) -> Option<UsageEvent> {
        self.state.lock().last.clone()
    }
}

pub struct UsageTrackingExtension {
    recorder: UsageRecorder,
}

pub fn usage_tracking_extension() -> UsageTrackingExtension {
    UsageTrackingExtension {
        recorder: UsageRecorder::default(),
    }
}

impl UsageTrackingExtension {
    pub fn recorder(&self) -> &UsageRecorder {
        &self.recorder
    }

    fn tracks(op: &Operation) -> bool {
        op.action == Action::Create && TRACKED_MODELS.iter().any(|m| op.is_model(m))
    }
}

#[async_trait]
impl Extension for UsageTrackingExtension {
    fn name(&self) -> &'static str {
        "usage-tracking"
    }

    async fn call(&self, op: Operation, next: Next<'_>) -> Result<Value, ClientError> {
        if !Self::tracks(&op) {
            return next.run(op).await;
        }

        let model = op.model.clone();
        let action = op.action;
        let log = next.log();
        let out = next.run(op).await?;

        self.recorder.record(UsageEvent {
            model: model.clone(),
            action,
            at: OffsetDateTime::now_utc(),
        });
        if log.enabled(LogCategory::Query) {
            debug!(usage = "recorded", model = %model, action = %action);
        }
        Ok(out)
    }
}
