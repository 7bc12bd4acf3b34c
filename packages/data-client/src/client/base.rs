//! The un-extended client: a pooled connection plus legacy middleware.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use sea_orm::DatabaseConnection;
use serde_json::Value;
use tracing::{debug, error};

use crate::config::db::ConnectionOptions;
use crate::config::log_level::{LogCategory, LogConfig};
use crate::error::ClientError;
use crate::extensions::OperationHandler;
use crate::infra::db::{connect, execute};
use crate::middleware::Middleware;
use crate::operation::Operation;

pub struct BaseClient {
    conn: DatabaseConnection,
    log: LogConfig,
    middleware: RwLock<Vec<Arc<dyn Middleware>>>,
}

impl BaseClient {
    pub async fn connect(options: &ConnectionOptions) -> Result<Self, ClientError> {
        let conn = connect(options).await?;
        Ok(Self::from_connection(conn, options.log.clone()))
    }

    pub fn from_connection(conn: DatabaseConnection, log: LogConfig) -> Self {
        Self {
            conn,
            log,
            middleware: RwLock::new(Vec::new()),
        }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    pub fn log(&self) -> &LogConfig {
        &self.log
    }

    /// Register a middleware; later registrations run after earlier ones.
    pub fn use_middleware(&self, middleware: impl Middleware + 'static) {
        self.middleware.write().push(Arc::new(middleware));
    }

    pub fn middleware_names(&self) -> Vec<&'static str> {
        self.middleware.read().iter().map(|m| m.name()).collect()
    }

    fn apply_middleware(&self, op: &mut Operation) {
        for middleware in self.middleware.read().iter() {
            middleware.before(op);
        }
    }
}

#[async_trait]
impl OperationHandler for BaseClient {
    async fn handle(&self, mut op: Operation) -> Result<Value, ClientError> {
        self.apply_middleware(&mut op);

        if self.log.enabled(LogCategory::Query) {
            debug!(model = %op.model, action = %op.action, args = %op.args, "operation");
        }

        let result = execute(&self.conn, &op).await;
        if let Err(err) = &result {
            if self.log.enabled(LogCategory::Error) {
                error!(model = %op.model, action = %op.action, error = %err, "operation_failed");
            }
        }
        result
    }
}
