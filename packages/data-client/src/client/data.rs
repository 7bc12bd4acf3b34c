//! The extended read/write client.

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use serde_json::{json, Value};

use super::base::BaseClient;
use crate::error::ClientError;
use crate::extensions::accelerate::AccelerateExtension;
use crate::extensions::optimize::QueryInsights;
use crate::extensions::usage_tracking::UsageRecorder;
use crate::extensions::ExtensionChain;
use crate::operation::{Action, Operation};

/// A base client wrapped in the full extension chain.
pub struct DataClient {
    base: Arc<BaseClient>,
    chain: ExtensionChain,
}

impl DataClient {
    pub fn new(base: Arc<BaseClient>, chain: ExtensionChain) -> Self {
        Self { base, chain }
    }

    pub async fn execute(&self, op: Operation) -> Result<Value, ClientError> {
        self.chain.run(op, self.base.as_ref()).await
    }

    pub fn model(&self, model: impl Into<String>) -> ModelHandle<'_> {
        ModelHandle {
            client: self,
            model: model.into(),
        }
    }

    pub fn base(&self) -> &Arc<BaseClient> {
        &self.base
    }

    pub fn connection(&self) -> &DatabaseConnection {
        self.base.connection()
    }

    /// Extension names, innermost first.
    pub fn extension_names(&self) -> Vec<&'static str> {
        self.chain.names()
    }

    /// Recent query timings; `None` unless query insights are enabled.
    pub fn insights(&self) -> Option<&QueryInsights> {
        self.chain.insights()
    }

    pub fn accelerate(&self) -> &AccelerateExtension {
        self.chain.accelerate()
    }

    pub fn usage(&self) -> &UsageRecorder {
        self.chain.usage()
    }
}

/// Model-scoped view over a [`DataClient`].
pub struct ModelHandle<'a> {
    client: &'a DataClient,
    model: String,
}

impl ModelHandle<'_> {
    async fn run(&self, action: Action, args: Value) -> Result<Value, ClientError> {
        self.client
            .execute(Operation::new(self.model.clone(), action, args))
            .await
    }

    pub async fn find_unique(&self, args: Value) -> Result<Value, ClientError> {
        self.run(Action::FindUnique, args).await
    }

    pub async fn find_first(&self, args: Value) -> Result<Value, ClientError> {
        self.run(Action::FindFirst, args).await
    }

    pub async fn find_many(&self, args: Value) -> Result<Value, ClientError> {
        self.run(Action::FindMany, args).await
    }

    pub async fn count(&self, args: Value) -> Result<u64, ClientError> {
        let out = self.run(Action::Count, args).await?;
        count_of(&self.model, Action::Count, &out)
    }

    pub async fn create(&self, data: Value) -> Result<Value, ClientError> {
        self.run(Action::Create, json!({ "data": data })).await
    }

    pub async fn update(&self, filter: Value, data: Value) -> Result<Value, ClientError> {
        self.run(Action::Update, json!({ "where": filter, "data": data }))
            .await
    }

    pub async fn update_many(&self, filter: Value, data: Value) -> Result<u64, ClientError> {
        let out = self
            .run(Action::UpdateMany, json!({ "where": filter, "data": data }))
            .await?;
        count_of(&self.model, Action::UpdateMany, &out)
    }

    pub async fn delete(&self, filter: Value) -> Result<Value, ClientError> {
        self.run(Action::Delete, json!({ "where": filter })).await
    }

    pub async fn delete_many(&self, filter: Value) -> Result<u64, ClientError> {
        let out = self
            .run(Action::DeleteMany, json!({ "where": filter }))
            .await?;
        count_of(&self.model, Action::DeleteMany, &out)
    }
}

/// Read `{ "count": n }`.
pub(crate) fn count_of(model: &str, action: Action, out: &Value) -> Result<u64, ClientError> {
    out.get("count").and_then(Value::as_u64).ok_or_else(|| {
        ClientError::invalid(model, action, format!("expected a count result, got {out}"))
    })
}
