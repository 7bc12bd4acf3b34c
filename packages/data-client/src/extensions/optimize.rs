//! Query insights: per-operation timing, enabled by an API key.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::{Extension, Next};
use crate::config::db::InsightsKey;
use crate::config::log_level::LogCategory;
use crate::error::ClientError;
use crate::operation::{Action, Operation};

/// Number of recent operations kept in memory.
pub const INSIGHTS_CAPACITY: usize = 512;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryInsight {
    pub model: String,
    pub action: Action,
    pub elapsed: Duration,
    pub ok: bool,
}

/// Bounded ring of recent operations.
#[derive(Debug)]
pub struct QueryInsights {
    key: InsightsKey,
    capacity: usize,
    recent: Mutex<VecDeque<QueryInsight>>,
}

impl QueryInsights {
    pub fn new(key: InsightsKey, capacity: usize) -> Self {
        Self {
            key,
            capacity: capacity.max(1),
            recent: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
        }
    }

    pub fn key_fingerprint(&self) -> String {
        self.key.fingerprint()
    }

    fn push(&self, insight: QueryInsight) {
        let mut recent = self.recent.lock();
        if recent.len() == self.capacity {
            recent.pop_front();
        }
        recent.push_back(insight);
    }

    /// Oldest first.
    pub fn recent(&self) -> Vec<QueryInsight> {
        self.recent.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.recent.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.recent.lock().is_empty()
    }

    pub fn slowest(&self) -> Option<QueryInsight> {
        self.recent.lock().iter().max_by_key(|i| i.elapsed).cloned()
    }
}

pub struct OptimizeExtension {
    insights: Arc<QueryInsights>,
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn elapsed_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

pub fn with_optimize(key: InsightsKey) -> OptimizeExtension {
    OptimizeExtension {
        insights: Arc::new(QueryInsights::new(key, INSIGHTS_CAPACITY)),
    }
}

impl OptimizeExtension {
    pub fn insights(&self) -> Arc<QueryInsights> {
        self.insights.clone()
    }
}

#[async_trait]
impl Extension for OptimizeExtension {
    fn name(&self) -> &'static str {
        "optimize"
    }

    async fn call(&self, op: Operation, next: Next<'_>) -> Result<Value, ClientError> {
        let model = op.model.clone();
        let action = op.action;
        let next_log = next.log();
        let start = Instant::now();

        let result = next.run(op).await;

        let elapsed = start.elapsed();
        if next_log.enabled(LogCategory::Query) {
            debug!(
                insights_key = %self.insights.key_fingerprint(),
                model = %model,
                action = %action,
                elapsed_ms = elapsed_ms(elapsed),
                ok = result.is_ok(),
                "query_insight"
            );
        }
        self.insights.push(QueryInsight {
            model,
            action,
            elapsed,
            ok: result.is_ok(),
        });
        result
    }
}
