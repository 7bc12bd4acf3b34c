//! Refuse bulk mutations without a filter.
//!
//! An `updateMany`/`deleteMany` whose `where` is missing or empty would touch
//! every row of the table; that is almost always a bug at the call site (a
//! filter built from a value that turned out to be absent).

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use super::{Extension, Next};
use crate::config::log_level::LogCategory;
use crate::error::ClientError;
use crate::operation::{Action, Operation};

pub struct DisallowUndefinedDeleteUpdateManyExtension;

pub fn disallow_undefined_delete_update_many_extension() -> DisallowUndefinedDeleteUpdateManyExtension
{
    DisallowUndefinedDeleteUpdateManyExtension
}

fn has_usable_filter(op: &Operation) -> bool {
    matches!(op.arg("where"), Some(Value::Object(filter)) if !filter.is_empty())
}

#[async_trait]
impl Extension for DisallowUndefinedDeleteUpdateManyExtension {
    fn name(&self) -> &'static str {
        "disallow-undefined-delete-update-many"
    }

    async fn call(&self, op: Operation, next: Next<'_>) -> Result<Value, ClientError> {
        if matches!(op.action, Action::UpdateMany | Action::DeleteMany) && !has_usable_filter(&op)
        {
            if next.logs(LogCategory::Warn) {
                warn!(model = %op.model, action = %op.action, "mutation_guard=rejected");
            }
            return Err(ClientError::UnsafeMutation {
                model: op.model,
                action: op.action,
            });
        }
        next.run(op).await
    }
}
