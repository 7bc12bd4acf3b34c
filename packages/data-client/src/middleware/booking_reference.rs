//! Soft-delete and reference generation for `BookingReference` rows.
//!
//! Deletes become updates that set `deleted = true`, reads hide deleted rows
//! unless the caller asked about `deleted` explicitly, and creates get a
//! `uid` when none was supplied.

// TODO: port to an `Extension` once every caller goes through the extended
// client; the base client is the only place this still runs.

use serde_json::{Map, Value};
use ulid::Ulid;

use super::Middleware;
use crate::operation::{Action, Operation};

pub const BOOKING_REFERENCE_MODEL: &str = "BookingReference";
pub const DELETED_FIELD: &str = "deleted";
pub const UID_FIELD: &str = "uid";

#[derive(Debug, Default)]
pub struct BookingReferenceMiddleware;

impl BookingReferenceMiddleware {
    pub fn new() -> Self {
        Self
    }
}

fn soft_delete(op: &mut Operation, action: Action) {
    op.action = action;
    let mut data = Map::new();
    data.insert(DELETED_FIELD.to_string(), Value::Bool(true));
    op.args_mut()
        .insert("data".to_string(), Value::Object(data));
}

impl Middleware for BookingReferenceMiddleware {
    fn name(&self) -> &'static str {
        "booking-reference"
    }

    fn before(&self, op: &mut Operation) {
        if !op.is_model(BOOKING_REFERENCE_MODEL) {
            return;
        }
        match op.action {
            Action::Create => {
                op.data_entry()
                    .entry(UID_FIELD)
                    .or_insert_with(|| Value::String(Ulid::new().to_string().to_lowercase()));
            }
            Action::Delete => soft_delete(op, Action::Update),
            Action::DeleteMany => soft_delete(op, Action::UpdateMany),
            Action::FindUnique | Action::FindFirst | Action::FindMany | Action::Count => {
                if op.arg("where").map_or(true, Value::is_object) {
                    op.filter_mut()
                        .entry(DELETED_FIELD)
                        .or_insert(Value::Null);
                }
            }
            Action::Update | Action::UpdateMany => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn apply(op: Operation) -> Operation {
        let mut op = op;
        BookingReferenceMiddleware::new().before(&mut op);
        op
    }

    #[test]
    fn delete_becomes_soft_delete() {
        let op = apply(Operation::new(
            "BookingReference",
            Action::Delete,
            json!({ "where": { "id": 3 } }),
        ));
        assert_eq!(op.action, Action::Update);
        assert_eq!(op.args, json!({ "where": { "id": 3 }, "data": { "deleted": true } }));

        let op = apply(Operation::new(
            "BookingReference",
            Action::DeleteMany,
            json!({ "where": { "bookingId": 9 } }),
        ));
        assert_eq!(op.action, Action::UpdateMany);
        assert_eq!(op.args["data"], json!({ "deleted": true }));
    }

    #[test]
    fn reads_hide_deleted_rows() {
        let op = apply(Operation::new("BookingReference", Action::FindMany, json!({})));
        assert_eq!(op.args, json!({ "where": { "deleted": null } }));

        let op = apply(Operation::new(
            "BookingReference",
            Action::Count,
            json!({ "where": { "deleted": true } }),
        ));
        assert_eq!(op.args["where"], json!({ "deleted": true }));
    }

    #[test]
    fn create_generates_uid_once() {
        let op = apply(Operation::new(
            "BookingReference",
            Action::Create,
            json!({ "data": { "type": "zoom" } }),
        ));
        let uid = op.args["data"][UID_FIELD].as_str().unwrap();
        assert_eq!(uid.len(), 26);

        let op = apply(Operation::new(
            "BookingReference",
            Action::Create,
            json!({ "data": { "uid": "given" } }),
        ));
        assert_eq!(op.args["data"][UID_FIELD], json!("given"));
    }

    #[test]
    fn other_models_untouched() {
        let original = Operation::new("Booking", Action::Delete, json!({ "where": { "id": 1 } }));
        assert_eq!(apply(original.clone()), original);
    }
}
