//! Process-wide client registry.
//!
//! Outside production the base client and the extended client are built once
//! and handed out again on every [`load`]. In production every load builds
//! fresh clients; the host process is expected to load once at startup.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use xxhash_rust::xxh3::xxh3_64;

use crate::client::base::BaseClient;
use crate::client::data::DataClient;
use crate::client::factory::{custom_client, extend};
use crate::client::readonly::ReadOnlyClient;
use crate::config::db::{ClientOverrides, ClientSettings, RuntimeEnv};
use crate::config::log_level::LogCategory;
use crate::error::ClientError;
use crate::logging::Redacted;
use crate::middleware::BookingReferenceMiddleware;

/// Identity of the settings a cached base client was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ClientKey {
    env: RuntimeEnv,
    db_url_hash: u64,
}

impl ClientKey {
    fn new(settings: &ClientSettings) -> Self {
        Self {
            env: settings.env,
            db_url_hash: xxh3_64(settings.connection.url.as_bytes()),
        }
    }

    fn sanitized_log_key(&self) -> String {
        format!("{:?}:{:x}", self.env, self.db_url_hash)
    }
}

/// The clients handed to the application.
pub struct Clients {
    pub primary: Arc<DataClient>,
    pub readonly: ReadOnlyClient,
    /// The un-extended client under `primary`; carries the booking-reference hook.
    pub base: Arc<BaseClient>,
}

pub struct ClientRegistry {
    base: OnceCell<(ClientKey, Arc<BaseClient>)>,
    extended: OnceCell<Arc<DataClient>>,
}

impl ClientRegistry {
    pub const fn new() -> Self {
        Self {
            base: OnceCell::const_new(),
            extended: OnceCell::const_new(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.base.initialized()
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static REGISTRY: ClientRegistry = ClientRegistry::new();

async fn build_base(settings: &ClientSettings) -> Result<BaseClient, ClientError> {
    let base = BaseClient::connect(&settings.connection).await?;
    base.use_middleware(BookingReferenceMiddleware::new());
    Ok(base)
}

/// Load the shared clients using the process-wide registry.
pub async fn load(settings: &ClientSettings) -> Result<Clients, ClientError> {
    load_with(&REGISTRY, settings).await
}

/// Load the shared clients using `registry`.
pub async fn load_with(
    registry: &ClientRegistry,
    settings: &ClientSettings,
) -> Result<Clients, ClientError> {
    let log = &settings.connection.log;
    let (base, primary) = if settings.env.caches_clients() {
        let key = ClientKey::new(settings);
        let (cached_key, base) = registry
            .base
            .get_or_try_init(|| async {
                if log.enabled(LogCategory::Info) {
                    info!(key = %Redacted(&key.sanitized_log_key()), "client_registry=build");
                }
                Ok::<_, ClientError>((key.clone(), Arc::new(build_base(settings).await?)))
            })
            .await?;
        if *cached_key != key {
            if log.enabled(LogCategory::Warn) {
                warn!(
                    cached = %Redacted(&cached_key.sanitized_log_key()),
                    requested = %Redacted(&key.sanitized_log_key()),
                    "client_registry=settings_changed keeping cached client"
                );
            }
        } else if log.enabled(LogCategory::Info) {
            debug!(key = %Redacted(&key.sanitized_log_key()), "client_registry=reuse");
        }

        let primary = registry
            .extended
            .get_or_init(|| async { Arc::new(extend(base.clone(), &settings.features)) })
            .await;
        (base.clone(), primary.clone())
    } else {
        let base = Arc::new(build_base(settings).await?);
        let primary = Arc::new(extend(base.clone(), &settings.features));
        (base, primary)
    };

    let readonly = match &settings.readonly_url {
        Some(url) => {
            if log.enabled(LogCategory::Info) {
                info!(url = %Redacted(url), "client_registry=readonly_dedicated");
            }
            ReadOnlyClient::dedicated(
                custom_client(settings, &ClientOverrides::with_url(url.clone())).await?,
            )
        }
        None => ReadOnlyClient::shared(primary.clone()),
    };

    Ok(Clients {
        primary,
        readonly,
        base,
    })
}

#[cfg(test)]
mod tests {
    use sea_orm::{ConnectionTrait, DatabaseConnection};
    use serde_json::json;
    use serial_test::serial;

    use super::*;
    use crate::config::db::ConnectionOptions;

    fn settings(env: RuntimeEnv) -> ClientSettings {
        ClientSettings::new(env, ConnectionOptions::new("sqlite::memory:"))
    }

    #[test]
    fn test_client_key_tracks_env_and_url() {
        let dev = ClientKey::new(&settings(RuntimeEnv::Dev));
        assert_eq!(dev, ClientKey::new(&settings(RuntimeEnv::Dev)));
        assert_ne!(dev, ClientKey::new(&settings(RuntimeEnv::Prod)));

        let other = ClientSettings::new(
            RuntimeEnv::Dev,
            ConnectionOptions::new("sqlite://other.db"),
        );
        assert_ne!(dev, ClientKey::new(&other));
    }

    #[tokio::test]
    async fn test_dev_reuses_clients() {
        let registry = ClientRegistry::new();
        let first = load_with(&registry, &settings(RuntimeEnv::Dev)).await.unwrap();
        let second = load_with(&registry, &settings(RuntimeEnv::Dev)).await.unwrap();

        assert!(registry.is_initialized());
        assert!(Arc::ptr_eq(&first.primary, &second.primary));
        assert!(Arc::ptr_eq(&first.base, &second.base));
    }

    #[tokio::test]
    async fn test_prod_builds_fresh_clients() {
        let registry = ClientRegistry::new();
        let first = load_with(&registry, &settings(RuntimeEnv::Prod)).await.unwrap();
        let second = load_with(&registry, &settings(RuntimeEnv::Prod)).await.unwrap();

        assert!(!registry.is_initialized());
        assert!(!Arc::ptr_eq(&first.primary, &second.primary));
    }

    #[tokio::test]
    async fn test_readonly_without_url_is_primary() {
        let registry = ClientRegistry::new();
        let clients = load_with(&registry, &settings(RuntimeEnv::Test)).await.unwrap();
        assert!(clients.readonly.shares_client_with(&clients.primary));
    }

    async fn seed_team(conn: &DatabaseConnection, slug: &str) {
        let ddl = r#"CREATE TABLE "Team" (
            "id" INTEGER PRIMARY KEY AUTOINCREMENT,
            "slug" TEXT NOT NULL,
            "pendingPayment" BOOLEAN NOT NULL DEFAULT 0
        )"#;
        for sql in [
            ddl.to_string(),
            format!(r#"INSERT INTO "Team" ("slug") VALUES ('{slug}')"#),
        ] {
            conn.execute_unprepared(&sql).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_readonly_with_url_is_dedicated() {
        let dir = tempfile::tempdir().unwrap();
        let url = |name: &str| format!("sqlite://{}?mode=rwc", dir.path().join(name).display());

        let registry = ClientRegistry::new();
        let clients = load_with(
            &registry,
            &ClientSettings::new(RuntimeEnv::Test, ConnectionOptions::new(url("primary.db")))
                .with_readonly_url(url("replica.db")),
        )
        .await
        .unwrap();
        seed_team(clients.base.connection(), "primary-team").await;
        seed_team(clients.readonly.connection(), "replica-team").await;

        assert!(!clients.readonly.is_shared());
        assert!(!clients.readonly.shares_client_with(&clients.primary));
        assert!(clients.readonly.client().base().middleware_names().is_empty());

        let replica = clients.readonly.model("Team").find_many(json!({})).await.unwrap();
        let primary = clients.primary.model("Team").find_many(json!({})).await.unwrap();
        assert_eq!(replica[0]["slug"], json!("replica-team"));
        assert_eq!(primary[0]["slug"], json!("primary-team"));
        assert_eq!(replica.as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_only_base_carries_booking_reference_hook() {
        let registry = ClientRegistry::new();
        let clients = load_with(&registry, &settings(RuntimeEnv::Test)).await.unwrap();
        assert_eq!(clients.base.middleware_names(), vec!["booking-reference"]);
        assert_eq!(clients.primary.extension_names().last(), Some(&"accelerate"));

        let count = clients
            .readonly
            .model("sqlite_master")
            .count(json!({}))
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    #[serial]
    async fn test_global_registry_caches_in_test_env() {
        let first = load(&settings(RuntimeEnv::Test)).await.unwrap();
        let second = load(&settings(RuntimeEnv::Test)).await.unwrap();
        assert!(Arc::ptr_eq(&first.primary, &second.primary));
    }
}
