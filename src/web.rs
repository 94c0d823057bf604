#![cfg(not(tarpaulin_include))]

use claims_portal::app;
use claims_portal::config::PortalConfig;
use std::env;

/// Main entry point for the portal web server
///
/// # Arguments
/// * Optional path to a JSON config file; defaults to `portal.json`, and to
///   built-in defaults when that file does not exist
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Success or error object
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let path = args.get(1).map(String::as_str).unwrap_or("portal.json");

    let config = if args.len() > 1 || std::path::Path::new(path).exists() {
        PortalConfig::load(path)?
    } else {
        log::warn!("No config at {}; using defaults", path);
        PortalConfig::default()
    };

    app::run(config).await
}
