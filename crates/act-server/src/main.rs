//! Process entry (spec.md §4.7): reads configuration, wires the Bridge
//! Core, Test Session, Baseline Store, and Tool Surface, and runs either an
//! interactive terminal mode or a piped agent-channel mode.
use std::{io::IsTerminal, net::SocketAddr, path::PathBuf, process::ExitCode, sync::Arc};

use act_bridge::{Bridge, BridgeConfig};
use act_testkit::{BaselineStore, TestSession};
use act_tools::ToolSurface;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*};

mod config;
mod logging;

use config::Config;
use logging::LogArgs;

#[derive(Parser, Debug)]
#[command(
    name = "act-server",
    about = "Local control-plane bridge for driving a browser extension from an AI agent",
    version
)]
struct Cli {
    #[command(flatten)]
    log: LogArgs,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log);

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(%err, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    let state_dir = config.state_dir.clone();

    let bridge = match Bridge::new(BridgeConfig {
        port: config.port,
        allowed_origins: config.allowed_origins,
        state_dir: state_dir.clone(),
    }) {
        Ok(bridge) => Arc::new(bridge),
        Err(err) => {
            error!(%err, "failed to open audit log");
            return ExitCode::FAILURE;
        }
    };

    let interactive = std::io::stdin().is_terminal();
    wire_hooks(&bridge, interactive);

    let addr = match bridge.start().await {
        Ok(addr) => addr,
        Err(err) => {
            error!(%err, "failed to bind bridge listener");
            return ExitCode::FAILURE;
        }
    };

    if interactive {
        run_interactive(bridge, addr).await
    } else {
        run_piped(bridge, state_dir).await
    }
}

fn init_tracing(log: &LogArgs) {
    let spec = logging::compute_spec(
        log.trace,
        log.debug,
        log.log_level.as_deref(),
        log.log_filter.as_deref(),
    );
    let env_filter = logging::env_filter_from_spec(&spec);
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().without_time())
        .try_init();
}

/// Wire connect/disconnect hooks: human-readable lines on stdout in
/// interactive mode, structured log events only in piped mode (spec.md §4.7).
fn wire_hooks(bridge: &Bridge, interactive: bool) {
    if interactive {
        bridge.on_connect(|| println!("extension connected"));
        bridge.on_disconnect(|| println!("extension disconnected"));
    } else {
        bridge.on_connect(|| info!("extension connected"));
        bridge.on_disconnect(|| info!("extension disconnected"));
    }
}

async fn run_interactive(bridge: Arc<Bridge>, addr: SocketAddr) -> ExitCode {
    println!("listening on ws://{addr}");
    println!("token: {}", bridge.token());
    println!("audit log: {}", bridge.audit_log_path().display());

    shutdown_signal().await;
    info!("shutting down");
    bridge.stop().await;
    ExitCode::SUCCESS
}

async fn run_piped(bridge: Arc<Bridge>, state_dir: PathBuf) -> ExitCode {
    let session = Arc::new(TestSession::new());
    let baselines = match BaselineStore::open(state_dir.join("baselines")) {
        Ok(store) => Arc::new(store),
        Err(err) => {
            eprintln!("act-server: failed to open baseline store: {err}");
            return ExitCode::FAILURE;
        }
    };
    let surface = ToolSurface::new(bridge.clone(), session, baselines);

    eprintln!("act-server: ready");
    act_tools::serve(&surface, tokio::io::stdin(), tokio::io::stdout()).await;
    bridge.stop().await;
    ExitCode::SUCCESS
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};
    let mut sigterm = signal(SignalKind::terminate()).expect("install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
