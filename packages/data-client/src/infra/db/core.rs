use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tracing::info;

use crate::config::db::{ConnectionOptions, DbKind};
use crate::config::log_level::LogCategory;
use crate::error::ClientError;
use crate::logging::Redacted;

/// Translate client options into sea-orm pool options.
pub fn build_connect_options(options: &ConnectionOptions) -> Result<ConnectOptions, ClientError> {
    let db_kind = DbKind::from_url(&options.url)?;

    let mut opt = ConnectOptions::new(options.url.clone());
    opt.sqlx_logging(options.log.enabled(LogCategory::Query));

    if let Some(max) = options.max_connections {
        opt.max_connections(max);
    }
    if let Some(timeout) = options.acquire_timeout {
        opt.acquire_timeout(timeout);
    }

    // Every connection to an in-memory SQLite URL is a separate database,
    // so the pool has to stay at exactly one.
    if db_kind == DbKind::Sqlite && options.url.contains(":memory:") {
        opt.min_connections(1).max_connections(1);
    }

    Ok(opt)
}

/// Open a pooled connection for the given options.
pub async fn connect(options: &ConnectionOptions) -> Result<DatabaseConnection, ClientError> {
    let db_kind = DbKind::from_url(&options.url)?;
    let opt = build_connect_options(options)?;

    if options.log.enabled(LogCategory::Info) {
        info!(
            engine = db_kind.engine_name(),
            url = %Redacted(&options.url),
            max_connections = ?options.max_connections,
            "pool=connect"
        );
    }

    let conn = Database::connect(opt).await?;
    Ok(conn)
}
