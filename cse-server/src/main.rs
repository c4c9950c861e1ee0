//! CSE process binary: loads configuration, wires every crate in the
//! workspace into one running instance via [`runtime::Runtime`], starts
//! the background monitors, and waits for a shutdown signal (§2, §A of
//! SPEC_FULL.md). There is no transport server here (spec.md §1 keeps
//! HTTP/MQTT/WebSocket out of scope) — this binary exists to prove the
//! engine boots and runs its background workers against a real clock.

mod action_eval;
mod expiry;
mod http_sender;
mod runtime;
mod ts_monitor;
mod tsb;
mod ut;

use clap::Parser;
use cse_core::config::CseConfig;

/// CLI flags, following the teacher's `#[derive(Parser)]` convention for
/// its own binaries: a `--profile` override on top of `CSE_PROFILE`/the
/// layered config file resolution in `cse_core::config`.
#[derive(Parser, Debug)]
#[command(name = "cse-server", about = "oneM2M CSE engine")]
struct Cli {
    /// Configuration profile to load (`cse-{profile}.yaml`). Overridden
    /// by the `CSE_PROFILE` environment variable if set.
    #[arg(long, default_value = "dev")]
    profile: String,
}

#[tokio::main]
async fn main() {
    cse_core::telemetry::init_tracing();

    let cli = Cli::parse();
    let config = match CseConfig::load(&cli.profile) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "failed to load configuration");
            std::process::exit(1);
        }
    };

    tracing::info!(cse_id = %config.cse_id, cse_rn = %config.cse_rn, "starting CSE");

    let runtime = runtime::Runtime::bootstrap(config).await;
    runtime.start_monitors();

    tracing::info!("CSE ready");

    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to install ctrl-c handler, running forever");
        std::future::pending::<()>().await;
    }

    tracing::info!("shutdown signal received");
    runtime.scheduler.shutdown();
}
