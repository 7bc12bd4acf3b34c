use std::env;
use std::fmt;
use std::time::Duration;

use xxhash_rust::xxh3::xxh3_64;

use crate::config::log_level::{LogConfig, LOGGER_LEVEL_VAR};
use crate::error::ClientError;
use crate::logging::sanitize_db_url;

pub const DATABASE_URL_VAR: &str = "DATABASE_URL";
pub const READONLY_DATABASE_URL_VAR: &str = "INSIGHTS_DATABASE_URL";
pub const QUERY_INSIGHTS_API_KEY_VAR: &str = "QUERY_INSIGHTS_API_KEY";
pub const APP_ENV_VAR: &str = "APP_ENV";
pub const MAX_CONNECTIONS_VAR: &str = "DB_MAX_CONNECTIONS";
pub const ACQUIRE_TIMEOUT_MS_VAR: &str = "DB_ACQUIRE_TIMEOUT_MS";

/// Process mode. Anything other than production keeps clients in the
/// process-wide registry so repeated loads reuse one connection pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeEnv {
    Prod,
    Dev,
    Test,
}

impl RuntimeEnv {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("production") | Some("prod") => RuntimeEnv::Prod,
            Some("test") => RuntimeEnv::Test,
            _ => RuntimeEnv::Dev,
        }
    }

    pub fn caches_clients(self) -> bool {
        !matches!(self, RuntimeEnv::Prod)
    }
}

/// Database engine, inferred from the connection URL scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DbKind {
    Postgres,
    Sqlite,
}

impl DbKind {
    pub fn from_url(url: &str) -> Result<Self, ClientError> {
        let scheme = url.split(':').next().unwrap_or_default();
        match scheme {
            "postgres" | "postgresql" => Ok(DbKind::Postgres),
            "sqlite" => Ok(DbKind::Sqlite),
            _ => Err(ClientError::config(format!(
                "unsupported database url scheme in '{}'",
                sanitize_db_url(url)
            ))),
        }
    }

    pub fn engine_name(self) -> &'static str {
        match self {
            DbKind::Postgres => "postgresql",
            DbKind::Sqlite => "sqlite",
        }
    }
}

/// API key for the query-insights extension. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct InsightsKey(String);

impl InsightsKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Short stable identifier safe for logs.
    pub fn fingerprint(&self) -> String {
        format!("{:016x}", xxh3_64(self.0.as_bytes()))[..8].to_string()
    }
}

impl fmt::Debug for InsightsKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InsightsKey({})", self.fingerprint())
    }
}

/// Optional add-ons, resolved once when settings are built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Features {
    pub insights: Option<InsightsKey>,
}

impl Features {
    pub fn resolve(insights_api_key: Option<String>) -> Self {
        Self {
            insights: insights_api_key
                .filter(|key| !key.trim().is_empty())
                .map(InsightsKey::new),
        }
    }

    pub fn insights_enabled(&self) -> bool {
        self.insights.is_some()
    }
}

/// Options used to open a base client.
#[derive(Clone, PartialEq)]
pub struct ConnectionOptions {
    pub url: String,
    pub log: LogConfig,
    pub max_connections: Option<u32>,
    pub acquire_timeout: Option<Duration>,
}

impl ConnectionOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            log: LogConfig::unset(),
            max_connections: None,
            acquire_timeout: None,
        }
    }

    /// Defaults merged with per-call overrides; a set override always wins.
    pub fn merged(&self, overrides: &ClientOverrides) -> Self {
        Self {
            url: overrides.url.clone().unwrap_or_else(|| self.url.clone()),
            log: overrides.log.clone().unwrap_or_else(|| self.log.clone()),
            max_connections: overrides.max_connections.or(self.max_connections),
            acquire_timeout: overrides.acquire_timeout.or(self.acquire_timeout),
        }
    }
}

impl fmt::Debug for ConnectionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionOptions")
            .field("url", &sanitize_db_url(&self.url))
            .field("log", &self.log)
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout", &self.acquire_timeout)
            .finish()
    }
}

/// Per-call overrides accepted by the client factory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientOverrides {
    pub url: Option<String>,
    pub log: Option<LogConfig>,
    pub max_connections: Option<u32>,
    pub acquire_timeout: Option<Duration>,
}

impl ClientOverrides {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }
}

/// Everything needed to build the shared clients.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub env: RuntimeEnv,
    pub connection: ConnectionOptions,
    pub readonly_url: Option<String>,
    pub features: Features,
}

impl ClientSettings {
    pub fn new(env: RuntimeEnv, connection: ConnectionOptions) -> Self {
        Self {
            env,
            connection,
            readonly_url: None,
            features: Features::default(),
        }
    }

    pub fn with_readonly_url(mut self, url: impl Into<String>) -> Self {
        self.readonly_url = Some(url.into());
        self
    }

    pub fn with_features(mut self, features: Features) -> Self {
        self.features = features;
        self
    }

    /// Build settings from the process environment.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build settings from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = must_var(&lookup, DATABASE_URL_VAR)?;
        DbKind::from_url(&url)?;

        let readonly_url = optional_var(&lookup, READONLY_DATABASE_URL_VAR);
        if let Some(readonly) = &readonly_url {
            DbKind::from_url(readonly)?;
        }

        let connection = ConnectionOptions {
            url,
            log: LogConfig::from_level(lookup(LOGGER_LEVEL_VAR).as_deref()),
            max_connections: parsed_var(&lookup, MAX_CONNECTIONS_VAR)?,
            acquire_timeout: parsed_var::<u64, _>(&lookup, ACQUIRE_TIMEOUT_MS_VAR)?
                .map(Duration::from_millis),
        };

        Ok(Self {
            env: RuntimeEnv::parse(lookup(APP_ENV_VAR).as_deref()),
            connection,
            readonly_url,
            features: Features::resolve(lookup(QUERY_INSIGHTS_API_KEY_VAR)),
        })
    }
}

/// Get required variable or return error
fn must_var<F>(lookup: &F, name: &str) -> Result<String, ClientError>
where
    F: Fn(&str) -> Option<String>,
{
    optional_var(lookup, name).ok_or_else(|| {
        ClientError::config(format!("Required environment variable '{name}' is not set"))
    })
}

/// Get a variable, treating empty values as unset
fn optional_var<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name).filter(|value| !value.trim().is_empty())
}

fn parsed_var<T, F>(lookup: &F, name: &str) -> Result<Option<T>, ClientError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match optional_var(lookup, name) {
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            ClientError::config(format!(
                "Environment variable '{name}' must be a number, got '{raw}'"
            ))
        }),
        None => Ok(None),
    }
}
