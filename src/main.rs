//! Lifecycle coordinator demo binary.
//!
//! Drives the coordinator with simulated startup/teardown work so the exit
//! contract can be exercised from a shell:
//!
//! ```text
//! lifecycle-coordinator --startup-delay-ms 50          # Ctrl+C → exit 1
//! lifecycle-coordinator --fail-startup                 # exit 1
//! lifecycle-coordinator --exit-after-ms 500            # exit 0
//! lifecycle-coordinator --teardown-delay-ms 60000 \
//!     --exit-after-ms 10                               # exit 2 after teardown timeout
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use lifecycle_coordinator::config::{load_config, CoordinatorConfig};
use lifecycle_coordinator::observability::{logging, metrics};
use lifecycle_coordinator::{BoxError, Coordinator};

#[derive(Parser)]
#[command(name = "lifecycle-coordinator")]
#[command(about = "Run a simulated service under the lifecycle coordinator", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured process name.
    #[arg(short, long)]
    name: Option<String>,

    /// Simulated startup duration.
    #[arg(long, default_value_t = 50)]
    startup_delay_ms: u64,

    /// Make the simulated startup fail.
    #[arg(long)]
    fail_startup: bool,

    /// Simulated teardown duration.
    #[arg(long, default_value_t = 10)]
    teardown_delay_ms: u64,

    /// Request a normal exit after this long instead of waiting for a signal.
    #[arg(long)]
    exit_after_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => CoordinatorConfig::default(),
    };
    if let Some(name) = cli.name.clone() {
        config.lifecycle.name = name;
    }

    logging::init_logging(&config.observability)?;

    tracing::info!(
        name = %config.lifecycle.name,
        startup_timeout_secs = config.lifecycle.startup_timeout_secs,
        teardown_timeout_secs = config.lifecycle.teardown_timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse::<SocketAddr>() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let startup_delay = Duration::from_millis(cli.startup_delay_ms);
    let teardown_delay = Duration::from_millis(cli.teardown_delay_ms);
    let fail_startup = cli.fail_startup;

    let handle = Coordinator::from_config(&config.lifecycle)
        .startup(move || async move {
            tokio::time::sleep(startup_delay).await;
            if fail_startup {
                return Err::<(), BoxError>("simulated startup failure".into());
            }
            Ok(())
        })
        .teardown(move |reason| async move {
            tracing::info!(reason = ?reason, "Releasing resources");
            tokio::time::sleep(teardown_delay).await;
            Ok::<(), BoxError>(())
        })
        .start()?;

    if let Some(ms) = cli.exit_after_ms {
        handle.startup_settled().await;
        tokio::time::sleep(Duration::from_millis(ms)).await;
        handle.teardown(None);
    }

    // The default terminator ends the process; this only returns if it is replaced.
    let status = handle.terminated().await;
    std::process::exit(status.code());
}
