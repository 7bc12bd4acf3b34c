//! Extension chain.
//!
//! Extensions wrap the base client in a fixed order. Registration order is
//! usage tracking, pending-payment exclusion, booking idempotency key,
//! mutation guard, then optionally query insights, then acceleration. The
//! last registered extension is the outermost layer: acceleration sees every
//! call first and can answer from cache without touching the rest of the
//! chain.
//!
//! The order is enforced by [`ChainBuilder`]: the only way to get an
//! [`ExtensionChain`] is `builder(log) → observability() → accelerate()`.

pub mod accelerate;
pub mod booking_idempotency_key;
pub mod disallow_undefined_delete_update_many;
pub mod exclude_pending_payments;
pub mod optimize;
pub mod usage_tracking;

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use self::accelerate::AccelerateExtension;
use self::booking_idempotency_key::booking_idempotency_key_extension;
use self::disallow_undefined_delete_update_many::disallow_undefined_delete_update_many_extension;
use self::exclude_pending_payments::exclude_pending_payments_extension;
use self::optimize::{with_optimize, QueryInsights};
use self::usage_tracking::{usage_tracking_extension, UsageRecorder, UsageTrackingExtension};
use crate::config::db::Features;
use crate::config::log_level::{LogCategory, LogConfig};
use crate::error::ClientError;
use crate::operation::Operation;

/// Whatever ultimately executes an operation (the base client, or a stub in tests).
#[async_trait]
pub trait OperationHandler: Send + Sync {
    async fn handle(&self, op: Operation) -> Result<Value, ClientError>;
}

/// A composable layer around the base client.
#[async_trait]
pub trait Extension: Send + Sync {
    fn name(&self) -> &'static str;

    /// Handle `op`, usually by rewriting it and calling `next.run(op)`.
    async fn call(&self, op: Operation, next: Next<'_>) -> Result<Value, ClientError>;
}

/// The remainder of the chain below the current extension.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    inner: &'a [Arc<dyn Extension>],
    terminal: &'a dyn OperationHandler,
    log: &'a LogConfig,
}

impl<'a> Next<'a> {
    pub fn new(
        inner: &'a [Arc<dyn Extension>],
        terminal: &'a dyn OperationHandler,
        log: &'a LogConfig,
    ) -> Self {
        Self {
            inner,
            terminal,
            log,
        }
    }

    /// Log categories of the client this chain belongs to.
    pub fn log(&self) -> &'a LogConfig {
        self.log
    }

    pub fn logs(&self, category: LogCategory) -> bool {
        self.log.enabled(category)
    }

    pub async fn run(self, op: Operation) -> Result<Value, ClientError> {
        match self.inner.split_last() {
            Some((outer, rest)) => {
                outer
                    .call(
                        op,
                        Next {
                            inner: rest,
                            terminal: self.terminal,
                            log: self.log,
                        },
                    )
                    .await
            }
            None => self.terminal.handle(op).await,
        }
    }
}

/// Builder stage holding the four required extensions.
pub struct RequiredStage;
/// Builder stage after the observability slot has been decided.
pub struct ObservedStage;

pub struct ChainBuilder<S> {
    log: LogConfig,
    layers: Vec<Arc<dyn Extension>>,
    usage: Arc<UsageTrackingExtension>,
    insights: Option<Arc<QueryInsights>>,
    _stage: PhantomData<S>,
}

impl ChainBuilder<RequiredStage> {
    /// Add query insights when the feature is enabled.
    pub fn observability(mut self, features: &Features) -> ChainBuilder<ObservedStage> {
        if let Some(key) = &features.insights {
            let optimize = with_optimize(key.clone());
            self.insights = Some(optimize.insights());
            self.layers.push(Arc::new(optimize));
        }
        ChainBuilder {
            log: self.log,
            layers: self.layers,
            usage: self.usage,
            insights: self.insights,
            _stage: PhantomData,
        }
    }
}

impl ChainBuilder<ObservedStage> {
    /// Add acceleration and seal the chain.
    pub fn accelerate(mut self, accelerate: AccelerateExtension) -> ExtensionChain {
        let accelerate = Arc::new(accelerate);
        self.layers.push(accelerate.clone());
        ExtensionChain {
            log: self.log,
            layers: self.layers,
            usage: self.usage,
            insights: self.insights,
            accelerate,
        }
    }
}

/// Sealed, ordered set of extensions.
pub struct ExtensionChain {
    log: LogConfig,
    layers: Vec<Arc<dyn Extension>>,
    usage: Arc<UsageTrackingExtension>,
    insights: Option<Arc<QueryInsights>>,
    accelerate: Arc<AccelerateExtension>,
}

impl ExtensionChain {
    /// Start a chain with the required extensions already registered.
    ///
    /// `log` gates the events extensions emit, as it does for the base client.
    pub fn builder(log: LogConfig) -> ChainBuilder<RequiredStage> {
        let usage = Arc::new(usage_tracking_extension());
        let layers: Vec<Arc<dyn Extension>> = vec![
            usage.clone(),
            Arc::new(exclude_pending_payments_extension()),
            Arc::new(booking_idempotency_key_extension()),
            Arc::new(disallow_undefined_delete_update_many_extension()),
        ];
        ChainBuilder {
            log,
            layers,
            usage,
            insights: None,
            _stage: PhantomData,
        }
    }

    /// Registration order, innermost first.
    pub fn names(&self) -> Vec<&'static str> {
        self.layers.iter().map(|ext| ext.name()).collect()
    }

    pub async fn run(
        &self,
        op: Operation,
        terminal: &dyn OperationHandler,
    ) -> Result<Value, ClientError> {
        Next::new(&self.layers, terminal, &self.log).run(op).await
    }

    pub fn usage(&self) -> &UsageRecorder {
        self.usage.recorder()
    }

    pub fn insights(&self) -> Option<&QueryInsights> {
        self.insights.as_deref()
    }

    pub fn accelerate(&self) -> &AccelerateExtension {
        &self.accelerate
    }

    pub fn log(&self) -> &LogConfig {
        &self.log
    }
}
