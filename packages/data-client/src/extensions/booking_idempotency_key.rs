//! Idempotency keys for accepted bookings.
//!
//! An accepted booking is identified by its slot and host, so retrying the
//! same acceptance produces the same key and the unique index on
//! `idempotencyKey` rejects the duplicate. Any other status clears the key.

use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{Extension, Next};
use crate::error::ClientError;
use crate::operation::{Action, Operation};

pub const BOOKING_MODEL: &str = "Booking";
pub const IDEMPOTENCY_KEY_FIELD: &str = "idempotencyKey";
pub const ACCEPTED_STATUS: &str = "ACCEPTED";

pub struct BookingIdempotencyKeyExtension;

pub fn booking_idempotency_key_extension() -> BookingIdempotencyKeyExtension {
    BookingIdempotencyKeyExtension
}

fn scalar_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// UUIDv5 over `"{startTime}.{endTime}.{userId}"`.
pub fn idempotency_key(data: &Map<String, Value>) -> Uuid {
    let seed = format!(
        "{}.{}.{}",
        scalar_text(data.get("startTime")),
        scalar_text(data.get("endTime")),
        scalar_text(data.get("userId")),
    );
    Uuid::new_v5(&Uuid::NAMESPACE_URL, seed.as_bytes())
}

fn stamp(data: &mut Map<String, Value>) {
    let key = match data.get("status").and_then(Value::as_str) {
        Some(ACCEPTED_STATUS) => Value::String(idempotency_key(data).to_string()),
        Some(_) => Value::Null,
        None => return,
    };
    data.insert(IDEMPOTENCY_KEY_FIELD.to_string(), key);
}

#[async_trait]
impl Extension for BookingIdempotencyKeyExtension {
    fn name(&self) -> &'static str {
        "booking-idempotency-key"
    }

    async fn call(&self, mut op: Operation, next: Next<'_>) -> Result<Value, ClientError> {
        let writes_booking = op.is_model(BOOKING_MODEL)
            && matches!(
                op.action,
                Action::Create | Action::Update | Action::UpdateMany
            );
        if writes_booking {
            if let Some(data) = op.data_mut() {
                stamp(data);
            }
        }
        next.run(op).await
    }
}
