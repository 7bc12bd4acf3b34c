#![deny(clippy::wildcard_imports)]
#![cfg_attr(test, allow(clippy::wildcard_imports))]

//! Shared data-access client.
//!
//! Wraps a sea-orm connection in an ordered chain of extensions (usage
//! tracking, payment filtering, idempotency keys, mutation guard, optional
//! query insights, read acceleration) and hands out preconfigured clients:
//! a read/write client, a read-only client and a factory for custom ones.

pub mod client;
pub mod config;
pub mod error;
pub mod extensions;
pub mod infra;
pub mod logging;
pub mod middleware;
pub mod operation;
pub mod registry;

#[cfg(test)]
pub mod test_fixtures;

pub use client::base::BaseClient;
pub use client::data::{DataClient, ModelHandle};
pub use client::factory::custom_client;
pub use client::readonly::{ReadModelHandle, ReadOnlyClient};
pub use config::db::{ClientOverrides, ClientSettings, ConnectionOptions, Features, RuntimeEnv};
pub use config::log_level::{LogCategory, LogConfig};
pub use error::ClientError;
pub use extensions::{Extension, ExtensionChain, Next, OperationHandler};
pub use operation::{Action, Operation};
pub use registry::{load, Clients};

// Auto-initialize logging for unit tests
#[cfg(test)]
#[ctor::ctor]
fn init_test_logging() {
    test_support::logging::init();
}
