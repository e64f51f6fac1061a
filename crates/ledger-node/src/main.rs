use clap::Parser;
use ledger_core::{PowConfig, SharedLedger};
use std::net::SocketAddr;
use tracing::{info, Level};

mod constants;
mod routes;

use constants::DEFAULT_LISTEN;
use routes::{router, AppState};

#[derive(Parser, Debug)]
struct Args {
    /// Address to listen on, e.g. 0.0.0.0:5001
    #[arg(long, default_value = DEFAULT_LISTEN)]
    listen: String,

    /// Leading zero hex characters required of a proof digest
    #[arg(long, default_value_t = ledger_core::constants::POW_TARGET_DIFFICULTY)]
    difficulty: usize,

    /// Give up on a proof search after this many candidates
    #[arg(long)]
    max_attempts: Option<u64>,

    /// Search for proofs on all cores
    #[arg(long)]
    parallel: bool,
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let ledger = SharedLedger::with_config(PowConfig {
        difficulty: args.difficulty,
        max_attempts: args.max_attempts,
        parallel: args.parallel,
    })?;
    info!(
        difficulty = args.difficulty,
        parallel = args.parallel,
        genesis = %ledger.previous_block().hash(),
        "ledger ready"
    );

    let app = router(AppState { ledger });

    let addr: SocketAddr = args.listen.parse()?;
    info!("ledger-node listening on http://{addr}");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
