use super::config::ClaimdeskConfig;
use super::{logging, open_ledger_readonly};

/// Show ledger statistics and storage paths without modifying anything
pub async fn execute(config_path: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let (config, config_path) = ClaimdeskConfig::resolve(config_path, false)?;
    logging::init(&config.logging)?;

    let (ledger, store) = open_ledger_readonly(&config).await?;
    let stats = ledger.stats().await;

    println!("📊 Claim Desk Status");
    println!();
    println!("Config: {}", config_path.display());
    println!("Ledger: {}", config.storage.ledger_path().display());
    println!("Distribution: {}", config.storage.distribution_path().display());
    match config.resolved_admin() {
        Some(admin) => println!("Admin: {}", admin),
        None => println!("Admin: not configured (admin commands disabled)"),
    }
    println!();
    println!("Requests: {}", stats.total);
    println!("  Pending:  {}", stats.pending);
    println!("  Approved: {}", stats.approved);
    println!("  Rejected: {}", stats.rejected);

    if let Err(e) = store.check_writable().await {
        println!();
        println!("⚠️  Ledger directory is not writable: {}", e);
    }

    Ok(())
}
