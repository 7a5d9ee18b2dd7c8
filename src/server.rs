use std::sync::Arc;

use anyhow::Result;
use log::info;

use crate::core_network::network;
use crate::helpers;
use crate::Config;

/// Runs the server with the provided configuration until the process
/// receives a shutdown signal.
///
/// # Arguments
///
/// * `config` - The server configuration.
///
/// # Returns
///
/// Result<(), anyhow::Error> indicating the success or failure of the operation.
pub async fn run(config: Config) -> Result<()> {
    info!("Starting server with config: {:?}", config);
    helpers::log_config(&config);

    let config = Arc::new(config);
    tokio::select! {
        result = network::start_server(Arc::clone(&config)) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, stopping server.");
        }
    }
    Ok(())
}
