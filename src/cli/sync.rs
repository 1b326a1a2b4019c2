//! Sync command implementation

use crate::cli::{load_config, SyncArgs};
use crate::sync::run_sync;

/// Handle `care-shim sync`: one feed poll, exits non-zero on a fatal error.
pub async fn run(args: SyncArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(&args.config)?;
    if let Some(url) = args.feed_url {
        config.provider_feed.url = url;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    crate::logging::init_tracing(&config.logging)?;

    let summary = run_sync(&config).await?;
    println!(
        "Synced {} feed rows: {} updated, {} skipped, {} rejected",
        summary.feed_rows, summary.updated, summary.skipped, summary.rejected_rows
    );
    Ok(())
}
