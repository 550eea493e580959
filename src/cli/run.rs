use super::config::ClaimdeskConfig;
use super::{logging, open_ledger};
use claimdesk::chat::{ClaimBot, ConsoleClient, Dispatcher};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Run the bot service
///
/// ## Configuration Loading
///
/// 1. `--config` flag if provided (must exist)
/// 2. Default config at `<data dir>/claimdesk/config.toml`, generated on
///    first run
///
/// `--data-dir` overrides `[storage] data_dir` from the file.
///
/// The service reads inbound events as JSON lines on stdin and writes
/// replies as JSON lines on stdout; logs go to stderr or the log file.
pub async fn execute(
    config_path: Option<String>,
    data_dir: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (mut config, config_path) = ClaimdeskConfig::resolve(config_path, true)?;
    if let Some(dir) = data_dir {
        config.storage.data_dir = PathBuf::from(dir);
    }
    logging::init(&config.logging)?;

    let dispatcher_config = config.dispatcher_config();
    info!(
        config = %config_path.display(),
        ledger = %config.storage.ledger_path().display(),
        admin_configured = dispatcher_config.admin.is_some(),
        "starting claim desk"
    );

    let ledger = Arc::new(open_ledger(&config).await?);
    let dispatcher = Dispatcher::new(ledger, dispatcher_config);
    let bot = ClaimBot::new(ConsoleClient::stdio(), dispatcher);

    bot.run().await?;
    info!("claim desk stopped");
    Ok(())
}
