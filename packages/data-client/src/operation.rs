//! The unit of work that flows through the extension chain.
//!
//! An [`Operation`] is a model-level request (`Booking.create`,
//! `Team.findMany`, ...) whose arguments are a JSON object. Extensions and
//! middleware rewrite operations before the base client turns them into SQL.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    FindUnique,
    FindFirst,
    FindMany,
    Count,
    Create,
    Update,
    UpdateMany,
    Delete,
    DeleteMany,
}

impl Action {
    pub const ALL: [Action; 9] = [
        Action::FindUnique,
        Action::FindFirst,
        Action::FindMany,
        Action::Count,
        Action::Create,
        Action::Update,
        Action::UpdateMany,
        Action::Delete,
        Action::DeleteMany,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::FindUnique => "findUnique",
            Action::FindFirst => "findFirst",
            Action::FindMany => "findMany",
            Action::Count => "count",
            Action::Create => "create",
            Action::Update => "update",
            Action::UpdateMany => "updateMany",
            Action::Delete => "delete",
            Action::DeleteMany => "deleteMany",
        }
    }

    /// True for actions that never modify rows.
    pub fn is_read(&self) -> bool {
        matches!(
            self,
            Action::FindUnique | Action::FindFirst | Action::FindMany | Action::Count
        )
    }

    pub fn is_write(&self) -> bool {
        !self.is_read()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub model: String,
    pub action: Action,
    pub args: Value,
}

impl Operation {
    /// Build an operation. `null` args are normalized to an empty object.
    pub fn new(model: impl Into<String>, action: Action, args: Value) -> Self {
        let args = if args.is_null() {
            Value::Object(Map::new())
        } else {
            args
        };
        Self {
            model: model.into(),
            action,
            args,
        }
    }

    /// Model names compare case-insensitively (`Booking` == `booking`).
    pub fn is_model(&self, name: &str) -> bool {
        self.model.eq_ignore_ascii_case(name)
    }

    pub fn arg(&self, key: &str) -> Option<&Value> {
        self.args.as_object().and_then(|args| args.get(key))
    }

    /// Remove a top-level argument, returning it.
    pub fn take_arg(&mut self, key: &str) -> Option<Value> {
        self.args.as_object_mut().and_then(|args| args.remove(key))
    }

    /// The `where` object, if present and an object.
    pub fn filter(&self) -> Option<&Map<String, Value>> {
        self.arg("where").and_then(Value::as_object)
    }

    /// The `data` object, if present and an object.
    pub fn data(&self) -> Option<&Map<String, Value>> {
        self.arg("data").and_then(Value::as_object)
    }

    pub fn data_mut(&mut self) -> Option<&mut Map<String, Value>> {
        self.args
            .as_object_mut()
            .and_then(|args| args.get_mut("data"))
            .and_then(Value::as_object_mut)
    }

    /// Mutable access to the args object; non-object args are replaced by `{}`.
    pub fn args_mut(&mut self) -> &mut Map<String, Value> {
        if !self.args.is_object() {
            self.args = Value::Object(Map::new());
        }
        match &mut self.args {
            Value::Object(map) => map,
            _ => unreachable!("args normalized to an object above"),
        }
    }

    /// Mutable access to `where`, creating an empty object when missing.
    pub fn filter_mut(&mut self) -> &mut Map<String, Value> {
        object_entry(self.args_mut(), "where")
    }

    /// Mutable access to `data`, creating an empty object when missing.
    pub fn data_entry(&mut self) -> &mut Map<String, Value> {
        object_entry(self.args_mut(), "data")
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.model, self.action)
    }
}

fn object_entry<'a>(map: &'a mut Map<String, Value>, key: &str) -> &'a mut Map<String, Value> {
    let entry = map
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !entry.is_object() {
        *entry = Value::Object(Map::new());
    }
    match entry {
        Value::Object(inner) => inner,
        _ => unreachable!("entry normalized to an object above"),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn null_args_become_empty_object() {
        let op = Operation::new("Team", Action::FindMany, Value::Null);
        assert_eq!(op.args, json!({}));
        assert!(op.filter().is_none());
    }

    #[test]
    fn filter_mut_creates_where() {
        let mut op = Operation::new("Team", Action::FindMany, json!({}));
        op.filter_mut().insert("id".into(), json!(1));
        assert_eq!(op.args, json!({ "where": { "id": 1 } }));
    }

    #[test]
    fn filter_mut_replaces_non_object_where() {
        let mut op = Operation::new("Team", Action::FindMany, json!({ "where": 5 }));
        assert!(op.filter_mut().is_empty());
    }

    #[test]
    fn model_match_ignores_case() {
        let op = Operation::new("booking", Action::Create, json!({}));
        assert!(op.is_model("Booking"));
        assert!(!op.is_model("Team"));
    }

    #[test]
    fn read_and_write_actions_partition() {
        let reads: Vec<_> = Action::ALL.iter().filter(|a| a.is_read()).collect();
        assert_eq!(reads.len(), 4);
        assert!(Action::DeleteMany.is_write());
        assert_eq!(Action::UpdateMany.to_string(), "updateMany");
    }
}
