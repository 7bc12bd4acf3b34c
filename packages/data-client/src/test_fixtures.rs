//! Stubs shared by unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use sea_orm::DbErr;
use serde_json::Value;

use crate::config::log_level::LogConfig;
use crate::error::ClientError;
use crate::extensions::{Extension, Next, OperationHandler};
use crate::operation::Operation;

/// Terminal handler that records every operation it receives.
pub struct RecordingHandler {
    response: Option<Value>,
    seen: Mutex<Vec<Operation>>,
}

impl RecordingHandler {
    pub fn returning(response: Value) -> Self {
        Self {
            response: Some(response),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails with a database error.
    pub fn failing() -> Self {
        Self {
            response: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn operations(&self) -> Vec<Operation> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl OperationHandler for RecordingHandler {
    async fn handle(&self, op: Operation) -> Result<Value, ClientError> {
        self.seen.lock().push(op);
        match &self.response {
            Some(value) => Ok(value.clone()),
            None => Err(ClientError::Db(DbErr::Custom("stub failure".into()))),
        }
    }
}

/// Run `op` through a single extension in front of `terminal`, all log
/// categories on.
pub async fn run_one(
    ext: &dyn Extension,
    terminal: &dyn OperationHandler,
    op: Operation,
) -> Result<Value, ClientError> {
    run_one_logged(ext, terminal, op, &LogConfig::unset()).await
}

pub async fn run_one_logged(
    ext: &dyn Extension,
    terminal: &dyn OperationHandler,
    op: Operation,
    log: &LogConfig,
) -> Result<Value, ClientError> {
    ext.call(op, Next::new(&[], terminal, log)).await
}
