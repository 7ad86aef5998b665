use anyhow::Result;
use clap::Parser;
use kindred::{
    db::{get_db_pool, DatabaseConfig},
    utils::{config::Config, init_logging},
    Engine,
};
use std::time::Duration;
use tracing::info;

/// Standalone sweep for maintenance runs and cron jobs. The server already
/// sweeps in-process; expiry events raised here reach no feed subscribers,
/// only the stored state changes.
#[derive(Debug, Parser)]
#[command(name = "echo_sweeper")]
struct Args {
    /// Seconds between sweeps (defaults to SWEEP_INTERVAL_SECS)
    #[arg(long)]
    interval_secs: Option<u64>,

    /// Run a single sweep and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    info!("🧭 Starting Echo Sweeper...");

    let config = Config::from_env()?;
    let db_config = DatabaseConfig::from_url(config.database_url.clone());
    let pool = get_db_pool(&db_config).await?;
    let engine = Engine::with_postgres(pool, config.engine.clone());

    if args.once {
        let report = engine.sweep_once().await;
        info!("✅ Single sweep done: {} offers, {} interests", report.offers, report.interests);
        return Ok(());
    }

    let interval_secs = args.interval_secs.unwrap_or(config.sweep_interval_secs).max(1);
    engine.run_sweeps(Duration::from_secs(interval_secs)).await;
    Ok(())
}
