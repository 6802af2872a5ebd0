//! SHIFTYCOIN — chat casino economy service.
//!
//! Entry point. Loads configuration, initialises structured logging, opens
//! the JSON stores, serves the admin API and charges loan interest on a
//! timer until Ctrl+C.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use shiftycoin::config::AppConfig;
use shiftycoin::dashboard;
use shiftycoin::engine::Casino;

const BANNER: &str = r#"
  ____  _     _  __ _                      _
 / ___|| |__ (_)/ _| |_ _   _  ___ ___   (_)_ __
 \___ \| '_ \| | |_| __| | | |/ __/ _ \  | | '_ \
  ___) | | | | |  _| |_| |_| | (_| (_) | | | | | |
 |____/|_| |_|_|_|  \__|\__, |\___\___/  |_|_| |_|
                        |___/
  Blackjack, balances and loans
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = AppConfig::load_default()?;
    init_logging();

    println!("{BANNER}");
    info!(
        casino = %cfg.casino.name,
        currency = %cfg.casino.currency,
        data_dir = %cfg.storage.data_dir.display(),
        base_rate = cfg.loans.base_rate,
        rate_step = cfg.loans.rate_step,
        "SHIFTYCOIN starting up"
    );

    let casino = Arc::new(Casino::from_config(&cfg).context("Failed to open casino stores")?);
    let users = casino.balances().map(|b| b.len()).unwrap_or_default();
    info!(users, "Stores opened");

    if cfg.dashboard.enabled {
        dashboard::spawn_dashboard(Arc::clone(&casino), cfg.dashboard.port).await?;
    } else {
        info!("Admin API disabled");
    }

    // -- Main loop -------------------------------------------------------

    let mut interval = tokio::time::interval(Duration::from_secs(cfg.loans.accrual_interval_secs));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        interval_secs = cfg.loans.accrual_interval_secs,
        "Entering accrual loop. Press Ctrl+C to stop."
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                run_accrual(Arc::clone(&casino)).await;
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    info!(active_sessions = casino.active_sessions(), "SHIFTYCOIN shut down cleanly.");
    Ok(())
}

/// One batch accrual pass plus request pruning. File IO runs off the async
/// workers.
async fn run_accrual(casino: Arc<Casino>) {
    let task = tokio::task::spawn_blocking(move || {
        casino.prune_requests();
        casino.accrue_all()
    });
    match task.await {
        Ok(Ok(batch)) => {
            for (user, reason) in &batch.failed {
                warn!(user = %user, reason = %reason, "Loan left unaccrued this pass");
            }
        }
        Ok(Err(e)) => error!(error = %e, "Batch accrual failed, retrying next tick"),
        Err(e) => error!(error = %e, "Accrual task panicked"),
    }
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("shiftycoin=info"));

    if std::env::var("SHIFTYCOIN_LOG_JSON").is_ok() {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
