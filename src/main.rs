//! canboot-sim - Simulated CAN bootloader devices
//!
//! Emulates one or more bootloader devices on a CAN bus so firmware-update
//! tools can be exercised without hardware.

mod bus;
mod config;
mod device;
mod engine;
mod protocol;
mod runner;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use config::Config;
use device::Attribute;
use engine::{Session, SimEvent};
use runner::RunStats;

/// canboot-sim - Simulated CAN bootloader devices
#[derive(Parser)]
#[command(name = "canboot-sim")]
#[command(author = "canboot-sim Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Simulate one or more CAN bootloader devices", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the simulated devices
    Run {
        /// CAN interface name (e.g. vcan0, can0)
        #[arg(short, long)]
        interface: Option<String>,

        /// Device node ids, 0-255 (e.g. --node-ids 1 3 5 8)
        #[arg(short, long, num_args = 1..)]
        node_ids: Vec<u32>,

        /// Single device node id (deprecated: use --node-ids)
        #[arg(long)]
        node_id: Option<u32>,

        /// Receive timeout in milliseconds
        #[arg(long)]
        rx_timeout_ms: Option<u64>,
    },

    /// Show current configuration
    Config {
        /// Generate sample configuration
        #[arg(long)]
        generate: bool,

        /// Output path for generated config
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    // Load configuration
    let config = if let Some(config_path) = &cli.config {
        Config::load(config_path)?
    } else {
        Config::load_default().unwrap_or_default()
    };

    match cli.command {
        Commands::Run {
            interface,
            node_ids,
            node_id,
            rx_timeout_ms,
        } => {
            let node_ids = resolve_node_ids(node_ids, node_id, &config);
            let interface = interface.unwrap_or_else(|| config.bus.interface.clone());
            let rx_timeout = rx_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or_else(|| config.bus.rx_timeout());

            run_simulator(&config, interface, node_ids, rx_timeout).await?;
        }
        Commands::Config { generate, output } => {
            if generate {
                let sample = config::generate_sample_config()?;
                if let Some(path) = output {
                    std::fs::write(&path, &sample)?;
                    println!("Configuration written to: {}", path.display());
                } else {
                    println!("{}", sample);
                }
            } else {
                println!("{}", toml::to_string_pretty(&config)?);
            }
        }
    }

    Ok(())
}

/// `--node-ids` wins over `--node-id`; without either the config decides
fn resolve_node_ids(node_ids: Vec<u32>, node_id: Option<u32>, config: &Config) -> Vec<u32> {
    if !node_ids.is_empty() {
        node_ids
    } else if let Some(node_id) = node_id {
        vec![node_id]
    } else {
        config.simulation.node_ids.clone()
    }
}

/// Run the simulated devices until interrupted
async fn run_simulator(
    config: &Config,
    interface: String,
    node_ids: Vec<u32>,
    rx_timeout: Duration,
) -> anyhow::Result<()> {
    let mut session = Session::new(&node_ids, &config.device).context("Invalid node ids")?;

    tracing::info!(
        "Starting simulator on {} with {} device(s), RX CAN ID {:#05x}",
        interface,
        session.device_count(),
        session.broadcast_id()
    );
    log_devices(&session);

    let event_rx = session
        .take_event_receiver()
        .context("Event receiver already taken")?;
    let reporter = tokio::spawn(report_events(event_rx));

    let stop = Arc::new(AtomicBool::new(false));
    let loop_stop = stop.clone();
    let mut simulation = tokio::task::spawn_blocking(move || -> anyhow::Result<RunStats> {
        run_on_bus(&interface, rx_timeout, &session, &loop_stop)
    });

    println!("Press Ctrl+C to stop.\n");

    let stats = tokio::select! {
        result = &mut simulation => result??,
        _ = shutdown_signal() => {
            println!("\nShutting down...");
            stop.store(true, Ordering::SeqCst);
            simulation.await??
        }
    };

    // The session is gone with the loop, which closes the event channel
    let _ = reporter.await;

    tracing::info!(
        "Simulator stopped after {} request(s), {} response(s) sent",
        stats.frames_handled,
        stats.responses_sent
    );
    if stats.events_dropped > 0 {
        tracing::warn!("{} event record(s) were dropped", stats.events_dropped);
    }

    Ok(())
}

#[cfg(target_os = "linux")]
fn run_on_bus(
    interface: &str,
    rx_timeout: Duration,
    session: &Session,
    stop: &AtomicBool,
) -> anyhow::Result<RunStats> {
    use bus::Bus;

    let mut bus = bus::SocketCanBus::open(interface, rx_timeout)?;
    let stats = runner::run(&mut bus, session, stop);
    bus.close();

    Ok(stats)
}

#[cfg(not(target_os = "linux"))]
fn run_on_bus(
    interface: &str,
    _rx_timeout: Duration,
    _session: &Session,
    _stop: &AtomicBool,
) -> anyhow::Result<RunStats> {
    anyhow::bail!("Cannot open '{}': SocketCAN is only available on Linux", interface)
}

/// Resolves on Ctrl+C, or SIGTERM on Unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Log identity and flash layout of every device
fn log_devices(session: &Session) {
    for device in session.devices() {
        let flash_kb = device.flash_size() / 1024;
        let bootloader_kb = device.bootloader_size() / 1024;

        tracing::info!(
            "Device node {}: TX CAN ID {:#05x}, VID {:#010x}, PID {:#010x}, PRD {:#010x}, UID {:#034x}",
            device.node_id(),
            device.response_address(),
            device.attribute(Attribute::VendorId),
            device.attribute(Attribute::ProductId),
            device.attribute(Attribute::ProductionDate),
            device.uid(),
        );
        tracing::info!(
            "Device node {}: flash {} KB ({} pages x {} bytes), bootloader {} KB, application {} KB",
            device.node_id(),
            flash_kb,
            device.attribute(Attribute::FlashNumPages),
            device.attribute(Attribute::FlashPageSize),
            bootloader_kb,
            flash_kb.saturating_sub(bootloader_kb),
        );
    }
}

/// Render session events until the session is dropped
async fn report_events(mut event_rx: mpsc::Receiver<SimEvent>) {
    while let Some(event) = event_rx.recv().await {
        match event {
            SimEvent::Responded {
                node_id,
                request,
                packet_id,
                status,
                payload,
            } => {
                tracing::info!(
                    "[RX] Node {}: {}, Packet ID: {}",
                    node_id,
                    SimEvent::request_name(request),
                    packet_id
                );
                tracing::info!(
                    "[TX] Node {}: Result={}, Data={:#010x}",
                    node_id,
                    SimEvent::status_name(status),
                    payload
                );
            }
            SimEvent::DecodeFailed { len, reason } => {
                tracing::debug!("[!!] Dropped {} byte frame: {}", len, reason);
            }
        }
    }
}
