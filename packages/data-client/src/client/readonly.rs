//! Read-only access, either through the primary client or a dedicated one.
//!
//! Read-only is enforced here, not by the database: [`ReadModelHandle`] has
//! no write methods and [`ReadOnlyClient::execute`] refuses mutating actions.

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use serde_json::Value;
use tracing::warn;

use super::data::{count_of, DataClient};
use crate::config::log_level::LogCategory;
use crate::error::ClientError;
use crate::operation::{Action, Operation};

/// The wrapped [`DataClient`] is not reachable from outside the crate:
///
/// ```compile_fail
/// async fn wipe(readonly: &data_client::ReadOnlyClient) {
///     let _ = readonly.client().model("Team").delete_many(serde_json::json!({})).await;
/// }
/// ```
///
/// and the read handle has no write methods:
///
/// ```compile_fail
/// async fn wipe(readonly: &data_client::ReadOnlyClient) {
///     let _ = readonly.model("Team").delete_many(serde_json::json!({})).await;
/// }
/// ```
pub struct ReadOnlyClient {
    client: Arc<DataClient>,
    shared: bool,
}

impl ReadOnlyClient {
    /// Reads go through the primary client itself.
    pub fn shared(primary: Arc<DataClient>) -> Self {
        Self {
            client: primary,
            shared: true,
        }
    }

    /// Reads go through a client of their own (a replica, usually).
    pub fn dedicated(client: DataClient) -> Self {
        Self {
            client: Arc::new(client),
            shared: false,
        }
    }

    pub fn is_shared(&self) -> bool {
        self.shared
    }

    /// True when reads are served by exactly `primary`.
    pub fn shares_client_with(&self, primary: &Arc<DataClient>) -> bool {
        Arc::ptr_eq(&self.client, primary)
    }

    pub(crate) fn client(&self) -> &DataClient {
        &self.client
    }

    pub fn connection(&self) -> &DatabaseConnection {
        self.client.connection()
    }

    pub async fn execute(&self, op: Operation) -> Result<Value, ClientError> {
        if op.action.is_write() {
            if self.client.base().log().enabled(LogCategory::Warn) {
                warn!(model = %op.model, action = %op.action, "readonly=rejected");
            }
            return Err(ClientError::ReadOnly {
                model: op.model,
                action: op.action,
            });
        }
        self.client.execute(op).await
    }

    pub fn model(&self, model: impl Into<String>) -> ReadModelHandle<'_> {
        ReadModelHandle {
            client: self,
            model: model.into(),
        }
    }
}

pub struct ReadModelHandle<'a> {
    client: &'a ReadOnlyClient,
    model: String,
}

impl ReadModelHandle<'_> {
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
}
