//! Hide teams whose payment has not gone through yet.

use async_trait::async_trait;
use serde_json::Value;

use super::{Extension, Next};
use crate::error::ClientError;
use crate::operation::Operation;

pub const TEAM_MODEL: &str = "Team";
pub const PENDING_PAYMENT_FIELD: &str = "pendingPayment";

pub struct ExcludePendingPaymentsExtension;

pub fn exclude_pending_payments_extension() -> ExcludePendingPaymentsExtension {
    ExcludePendingPaymentsExtension
}

#[async_trait]
impl Extension for ExcludePendingPaymentsExtension {
    fn name(&self) -> &'static str {
        "exclude-pending-payments"
    }

    async fn call(&self, mut op: Operation, next: Next<'_>) -> Result<Value, ClientError> {
        // A malformed `where` is left for the engine to reject.
        let filterable = op.arg("where").map_or(true, Value::is_object);
        if op.is_model(TEAM_MODEL) && op.action.is_read() && filterable {
            op.filter_mut()
                .entry(PENDING_PAYMENT_FIELD)
                .or_insert(Value::Bool(false));
        }
        next.run(op).await
    }
}
