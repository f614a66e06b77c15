//! RNet monitor: entry point.
//!
//! ```text
//! rnet-monitor                               Connect using rnet-monitor.toml
//! rnet-monitor --host 10.0.0.5 --port 7777   Override the bridge address
//! rnet-monitor --zone 1,2 --send volume=40   Send one action once connected
//! rnet-monitor --gen-config                  Write default config to stdout
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rnet_core::{ZoneAction, ZoneId};
use rnet_monitor::config::MonitorConfig;
use rnet_monitor::service::MonitorService;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "rnet-monitor", about = "Russound RNet bus monitor")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "rnet-monitor.toml")]
    config: PathBuf,

    /// Bridge host, overrides the config file.
    #[arg(long)]
    host: Option<String>,

    /// Bridge port, overrides the config file.
    #[arg(long)]
    port: Option<u16>,

    /// Target zone for --send, as "controller,zone".
    #[arg(long, default_value = "1,1")]
    zone: ZoneId,

    /// Action to send once connected: volume=N, power=on|off, source=N,
    /// bass=N, treble=N, balance=N, loudness=on|off, turn-on-volume=N,
    /// all=on|off or info.
    #[arg(long)]
    send: Option<ZoneAction>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        println!("{}", MonitorConfig::default_toml()?);
        return Ok(());
    }

    // Load config.
    let mut config = MonitorConfig::load(&cli.config);
    if let Some(host) = cli.host {
        config.session.host = host;
    }
    if let Some(port) = cli.port {
        config.session.port = port;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("rnet-monitor v{}", env!("CARGO_PKG_VERSION"));
    info!("bridge: {}", config.session.address());
    info!("retry interval: {}s", config.session.retry_interval_secs);
    info!("zones: {}", config.session.zones().len());

    let mut service = MonitorService::new(config);
    if let Some(action) = cli.send {
        service = service.with_action(cli.zone, action);
    }
    let stop = service.stop_handle();

    // Ctrl-C handler.
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received, shutting down");
        stop.store(false, std::sync::atomic::Ordering::SeqCst);
    });

    service.run().await?;

    Ok(())
}
