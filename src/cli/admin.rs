//! Operator commands against the ledger file
//!
//! These act on the same document the service uses. Listings and the
//! distribution export only read it. Stop the service before approving or
//! rejecting: the running bot keeps its own in-memory copy and would
//! overwrite changes made here on its next write.

use super::config::ClaimdeskConfig;
use super::{logging, open_ledger, open_ledger_readonly};
use claimdesk::ledger::request::{format_timestamp, RequestId, RequestStatus};
use claimdesk::ledger::Ledger;
use std::path::PathBuf;

fn init(config_path: Option<String>) -> Result<ClaimdeskConfig, Box<dyn std::error::Error>> {
    let (config, _) = ClaimdeskConfig::resolve(config_path, false)?;
    logging::init(&config.logging)?;
    Ok(config)
}

/// Ledger for a listing; the file is left exactly as found.
async fn load_readonly(config_path: Option<String>) -> Result<Ledger, Box<dyn std::error::Error>> {
    let config = init(config_path)?;
    let (ledger, _) = open_ledger_readonly(&config).await?;
    Ok(ledger)
}

async fn load(config_path: Option<String>) -> Result<Ledger, Box<dyn std::error::Error>> {
    let config = init(config_path)?;
    Ok(open_ledger(&config).await?)
}

/// List pending requests in submission order
pub async fn pending(config_path: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let ledger = load_readonly(config_path).await?;
    let pending = ledger.list_pending().await;

    if pending.is_empty() {
        println!("📋 No pending requests.");
        return Ok(());
    }

    println!("📋 Pending requests ({}):", pending.len());
    println!();
    for (i, request) in pending.iter().enumerate() {
        println!("{}. {} ({})", i + 1, request.display_name, request.handle());
        println!("   Wallet: {}", request.wallet_address);
        println!("   ID: {}", request.request_id);
        println!("   Time: {}", request.submitted_at_display());
    }
    Ok(())
}

/// List approved requests in approval order
pub async fn approved(config_path: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let ledger = load_readonly(config_path).await?;
    let approved = ledger.list_approved_decided().await;

    if approved.is_empty() {
        println!("✅ No approved requests.");
        return Ok(());
    }

    println!("✅ Approved requests ({}):", approved.len());
    println!();
    for (i, decided) in approved.iter().enumerate() {
        let request = &decided.request;
        println!("{}. {} ({})", i + 1, request.display_name, request.handle());
        println!("   Wallet: {}", request.wallet_address);
        println!("   Approved: {}", format_timestamp(decided.decided_at));
    }
    Ok(())
}

/// Approve or reject one pending request
pub async fn decide(
    config_path: Option<String>,
    request_id: String,
    status: RequestStatus,
) -> Result<(), Box<dyn std::error::Error>> {
    let ledger = load(config_path).await?;
    let request = ledger.transition(&RequestId(request_id), status).await?;
    ledger.flush().await?;

    println!(
        "✅ Request {} from {} ({}) is now {}",
        request.request_id,
        request.display_name,
        request.handle(),
        request.status
    );
    Ok(())
}

/// Write the approved wallet list
pub async fn distribution(
    config_path: Option<String>,
    output: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = init(config_path)?;
    let (ledger, _) = open_ledger_readonly(&config).await?;
    let path = output
        .map(PathBuf::from)
        .unwrap_or_else(|| config.storage.distribution_path());

    let count = ledger.export_distribution(&path).await?;
    if count == 0 {
        println!("❌ No approved requests to distribute (wrote empty list).");
    } else {
        println!("✅ Distribution list written");
        println!("   File: {}", path.display());
        println!("   Addresses: {}", count);
    }
    Ok(())
}
