//! Building extended clients.

use std::sync::Arc;

use tracing::debug;

use super::base::BaseClient;
use super::data::DataClient;
use crate::config::db::{ClientOverrides, ClientSettings, Features};
use crate::config::log_level::LogCategory;
use crate::error::ClientError;
use crate::extensions::accelerate::with_accelerate;
use crate::extensions::ExtensionChain;

/// Wrap an existing base client in the fixed extension chain.
pub fn extend(base: Arc<BaseClient>, features: &Features) -> DataClient {
    let chain = ExtensionChain::builder(base.log().clone())
        .observability(features)
        .accelerate(with_accelerate());
    DataClient::new(base, chain)
}

/// Build a fresh base client from the settings' defaults merged with
/// `overrides`, then extend it.
///
/// The result does not carry the booking-reference middleware.
pub async fn custom_client(
    settings: &ClientSettings,
    overrides: &ClientOverrides,
) -> Result<DataClient, ClientError> {
    let options = settings.connection.merged(overrides);
    let base = BaseClient::connect(&options).await?;
    let client = extend(Arc::new(base), &settings.features);
    if options.log.enabled(LogCategory::Info) {
        debug!(extensions = ?client.extension_names(), "client=custom");
    }
    Ok(client)
}
