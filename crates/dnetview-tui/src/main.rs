//! `dnetview` — live terminal view of a peer-to-peer network's topology.
//!
//! Polls every configured node's JSON-RPC endpoint on a fixed interval and
//! shows the result as a navigable tree: node → session → connection, with
//! the focused entity's details alongside. Unreachable nodes keep their
//! last-known data, dimmed and annotated with the error.
//!
//! Logs are written to a file (default `/tmp/dnetview.log`) to avoid
//! corrupting the terminal UI.

mod action;
mod app;
mod data_bridge;
mod event;
mod keymap;
mod theme;
mod tui;
mod view;
mod widgets;

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use dnetview_api::{RpcClient, TransportConfig};
use dnetview_config::Config;
use dnetview_core::Monitor;

use crate::app::App;

/// Terminal view of live P2P network topology.
#[derive(Parser, Debug)]
#[command(name = "dnetview", version, about)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(short, long, env = "DNETVIEW_CONFIG")]
    config: Option<PathBuf>,

    /// Write a starter config file to the config path and exit
    #[arg(long)]
    init: bool,

    /// Log file path
    #[arg(long, default_value = "/tmp/dnetview.log")]
    log_file: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(dnetview_config::config_path)
    }
}

/// Set up file-based tracing. We MUST NOT log to stdout/stderr — that would
/// corrupt the TUI output. The returned guard flushes logs on drop.
fn setup_tracing(cli: &Cli) -> WorkerGuard {
    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "dnetview={level},dnetview_core={level},dnetview_api={level}"
        ))
    });

    let log_dir = cli
        .log_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(std::path::Path::new("."));
    let log_filename = cli
        .log_file
        .file_name()
        .unwrap_or(std::ffi::OsStr::new("dnetview.log"));

    let file_appender = tracing_appender::rolling::never(log_dir, log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    guard
}

fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => dnetview_config::load_config_from(path)
            .wrap_err_with(|| format!("loading {}", path.display())),
        None => dnetview_config::load_config().wrap_err("loading default config"),
    }
}

/// Build the monitor. Every error here is a startup misconfiguration and
/// is reported once before the terminal is touched.
fn build_monitor(cli: &Cli) -> Result<Monitor> {
    let monitor_config = load_config(cli)?
        .into_monitor_config()
        .wrap_err_with(|| format!("invalid configuration (see {})", cli.config_path().display()))?;

    let transport = TransportConfig::default().with_timeout(monitor_config.fetch_timeout);
    let client = RpcClient::new(&transport).wrap_err("building RPC client")?;

    Ok(Monitor::new(monitor_config, client)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tui::install_hooks()?;

    if cli.init {
        let path = cli.config_path();
        if path.exists() {
            color_eyre::eyre::bail!("{} already exists, not overwriting", path.display());
        }
        dnetview_config::save_config_to(&path, &Config::example())?;
        println!("wrote starter config to {}", path.display());
        return Ok(());
    }

    let _log_guard = setup_tracing(&cli);

    let monitor = build_monitor(&cli)?;
    info!(
        nodes = monitor.config().nodes.len(),
        poll_interval = %humantime::format_duration(monitor.config().poll_interval),
        "starting dnetview"
    );

    let mut app = App::new(monitor)?;
    app.run().await?;

    Ok(())
}
