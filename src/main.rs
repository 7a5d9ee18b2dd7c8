use anyhow::Result;
use clap::Parser;
use env_logger::{Builder, Env};
use std::io::Write;
use std::path::Path;

use ferroftp::core_cli::Cli;
use ferroftp::{helpers, server};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Cli::parse();

    // Initialize the logger with a custom format
    let default_level = if args.verbose { "debug" } else { "info" };
    Builder::from_env(Env::default().default_filter_or(default_level))
        .format(|buf, record| {
            let timestamp = buf.timestamp();
            writeln!(
                buf,
                "[{}] [{}] {}",
                timestamp,
                record.level(),
                record.args()
            )
        })
        .init();

    // Determine the default config path based on the OS
    let default_config_path = if cfg!(target_os = "windows") {
        "C:\\ferroftp\\etc\\ferroftp.conf"
    } else {
        "/etc/ferroftp.conf"
    };

    // Load configuration from the TOML file; a missing default path means
    // built-in defaults.
    let config_path = if args.config.is_empty() {
        if Path::new(default_config_path).exists() {
            default_config_path
        } else {
            ""
        }
    } else {
        args.config.as_str()
    };
    let mut config = helpers::load_config(config_path)?;

    // CLI overrides
    if let Some(port) = args.port {
        config.server.listen_port = port;
    }
    if let Some(shared_root) = args.shared_root {
        config.server.shared_root = shared_root;
    }

    // Run the server
    server::run(config).await?;

    Ok(())
}
