use clap::{Parser, Subcommand};
use claimdesk::ledger::request::RequestStatus;
use claimdesk::ledger::Ledger;
use claimdesk::persistence::{JsonFileStore, StoreError};
use std::sync::Arc;

pub mod admin;
pub mod config;
pub mod logging;
pub mod run;
pub mod status;
pub mod version;

#[derive(Parser)]
#[command(name = "claimdesk")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Token request desk for community testing programs", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot service (JSON-lines events on stdin, replies on stdout)
    Run {
        /// Path to config file (default: <data dir>/claimdesk/config.toml)
        #[arg(long)]
        config: Option<String>,

        /// Directory for the ledger and distribution list (overrides config)
        #[arg(long)]
        data_dir: Option<String>,
    },

    /// List pending token requests
    Pending {
        #[arg(long)]
        config: Option<String>,
    },

    /// List approved token requests
    Approved {
        #[arg(long)]
        config: Option<String>,
    },

    /// Approve a pending request
    Approve {
        /// Request ID (req_...)
        request_id: String,

        #[arg(long)]
        config: Option<String>,
    },

    /// Reject a pending request
    Reject {
        /// Request ID (req_...)
        request_id: String,

        #[arg(long)]
        config: Option<String>,
    },

    /// Write approved wallet addresses as a JSON array
    Distribution {
        /// Output path (default: [storage] distribution_file)
        #[arg(long)]
        output: Option<String>,

        #[arg(long)]
        config: Option<String>,
    },

    /// Show ledger statistics
    Status {
        #[arg(long)]
        config: Option<String>,
    },

    /// Display version information
    Version,
}

/// Open the ledger named by the config for reading and writing.
///
/// A corrupt ledger file is moved aside and the ledger starts empty; any
/// other read failure is an error.
pub async fn open_ledger(config: &config::ClaimdeskConfig) -> Result<Ledger, StoreError> {
    let store = JsonFileStore::new(config.storage.ledger_path());
    Ledger::open(Arc::new(store), config.storage.retry_policy()).await
}

/// Open the ledger for listing only. Nothing on disk is created, moved or
/// rewritten.
pub async fn open_ledger_readonly(
    config: &config::ClaimdeskConfig,
) -> Result<(Ledger, JsonFileStore), StoreError> {
    let store = JsonFileStore::new(config.storage.ledger_path());
    let state = store.load_readonly().await?;
    let ledger = Ledger::with_state(Arc::new(store.clone()), state, config.storage.retry_policy());
    Ok((ledger, store))
}

pub async fn execute(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Run { config, data_dir } => run::execute(config, data_dir).await,
        Commands::Pending { config } => admin::pending(config).await,
        Commands::Approved { config } => admin::approved(config).await,
        Commands::Approve { request_id, config } => {
            admin::decide(config, request_id, RequestStatus::Approved).await
        }
        Commands::Reject { request_id, config } => {
            admin::decide(config, request_id, RequestStatus::Rejected).await
        }
        Commands::Distribution { output, config } => admin::distribution(config, output).await,
        Commands::Status { config } => status::execute(config).await,
        Commands::Version => {
            version::execute();
            Ok(())
        }
    }
}
