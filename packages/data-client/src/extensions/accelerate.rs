//! Acceleration: a read cache in front of the whole chain.
//!
//! Reads opt in with `cacheStrategy: { "ttl": <seconds> }`. Entries are keyed
//! by an xxh3 hash of model, action, the model's write generation and the
//! remaining args. Each entry expires after its own TTL. A successful write
//! bumps the model's generation, which orphans every cached read of that
//! model until it expires.
//! `cacheStrategy` is stripped from every operation before it goes further.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::trace;
use xxhash_rust::xxh3::xxh3_64;

use super::{Extension, Next};
use crate::config::log_level::LogCategory;
use crate::error::ClientError;
use crate::operation::Operation;

pub const CACHE_STRATEGY_ARG: &str = "cacheStrategy";
pub const DEFAULT_CACHE_CAPACITY: u64 = 10_000;

#[derive(Debug, Clone)]
struct CachedRead {
    value: Value,
    ttl: Duration,
}

/// Expires each read after the TTL it was cached with.
struct ReadExpiry;

impl Expiry<u64, CachedRead> for ReadExpiry {
    fn expire_after_create(
        &self,
        _key: &u64,
        value: &CachedRead,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub invalidations: u64,
}

pub struct AccelerateExtension {
    cache: Cache<u64, CachedRead>,
    generations: Mutex<HashMap<String, u64>>,
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
}

pub fn with_accelerate() -> AccelerateExtension {
    AccelerateExtension::with_capacity(DEFAULT_CACHE_CAPACITY)
}

/// TTL requested by the caller, if any.
fn requested_ttl(strategy: Option<&Value>) -> Option<Duration> {
    strategy
        .and_then(|s| s.get("ttl"))
        .and_then(Value::as_u64)
        .filter(|ttl| *ttl > 0)
        .map(Duration::from_secs)
}

impl AccelerateExtension {
    pub fn with_capacity(capacity: u64) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(capacity)
                .expire_after(ReadExpiry)
                .build(),
            generations: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }

    fn model_key(model: &str) -> String {
        model.to_ascii_lowercase()
    }

    fn generation(&self, model: &str) -> u64 {
        self.generations
            .lock()
            .get(&Self::model_key(model))
            .copied()
            .unwrap_or(0)
    }

    fn invalidate_model(&self, model: &str) {
        *self
            .generations
            .lock()
            .entry(Self::model_key(model))
            .or_default() += 1;
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    fn cache_key(&self, op: &Operation) -> u64 {
        let material = format!(
            "{}|{}|{}|{}",
            Self::model_key(&op.model),
            op.action,
            self.generation(&op.model),
            op.args
        );
        xxh3_64(material.as_bytes())
    }
}

#[async_trait]
impl Extension for AccelerateExtension {
    fn name(&self) -> &'static str {
        "accelerate"
    }

    async fn call(&self, mut op: Operation, next: Next<'_>) -> Result<Value, ClientError> {
        let ttl = requested_ttl(op.take_arg(CACHE_STRATEGY_ARG).as_ref());

        if op.action.is_write() {
            let model = op.model.clone();
            let out = next.run(op).await?;
            self.invalidate_model(&model);
            return Ok(out);
        }

        let Some(ttl) = ttl else {
            return next.run(op).await;
        };

        let traced = next.logs(LogCategory::Query);
        let key = self.cache_key(&op);
        if let Some(entry) = self.cache.get(&key).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            if traced {
                trace!(accelerate = "hit", model = %op.model, action = %op.action);
            }
            return Ok(entry.value);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        if traced {
            trace!(accelerate = "miss", model = %op.model, action = %op.action);
        }
        let value = next.run(op).await?;
        self.cache
            .insert(
                key,
                CachedRead {
                    value: value.clone(),
                    ttl,
                },
            )
            .await;
        Ok(value)
    }
}
