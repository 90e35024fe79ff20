//! VPlug - prises connectées virtuelles
//!
//! Démarre une prise émulée par entrée de la configuration : chacune sert son
//! endpoint HTTP de contrôle et répond aux recherches SSDP Belkin.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use vplugconfig::{Config, DEFAULT_BASE_PORT};
use vplugserver::{LoggingOptions, init_logging};
use vplugupnp::{
    DeviceIdentity, DeviceRegistry, DiscoveryOptions, EventBus, EventSink, Orchestrator,
    TracingSink,
};
use vplugutils::{is_local_address, list_ipv4_addresses};

#[derive(Parser)]
#[command(name = "vplug")]
#[command(author, version, about = "Virtual smart plugs for home-automation controllers", long_about = None)]
struct Cli {
    /// Configuration directory (default: $VPLUG_CONFIG, ./.vplug or ~/.vplug)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Address the control endpoints bind to (overrides host.server_ip)
    #[arg(long, global = true)]
    server_ip: Option<String>,

    /// Log level (ERROR, WARN, INFO, DEBUG, TRACE), overrides host.logger.min_level
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every configured plug until Ctrl+C (default)
    Run,

    /// Replace the device list with fresh plugs
    CreateConfig {
        /// Display names, one plug per name
        #[arg(required = true)]
        names: Vec<String>,

        /// Control port of the first plug
        #[arg(short, long, default_value_t = DEFAULT_BASE_PORT)]
        base_port: u16,
    },

    /// Append one plug on the next free port
    AddDevice {
        name: String,
    },

    /// Print the configured plugs
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load_config(cli.config.as_deref().unwrap_or(""))
        .context("Cannot load configuration")?;

    init_logging(logging_options(&cli, &config)?).context("Cannot initialise logging")?;
    info!(config_file = %config.file_path(), "Configuration loaded");

    match &cli.command {
        None | Some(Commands::Run) => run(&cli, &config).await,
        Some(Commands::CreateConfig { names, base_port }) => {
            let devices = config.create_devices(names.as_slice(), *base_port)?;
            for d in &devices {
                println!("{}\t{}\t{}", d.port, d.uuid, d.name);
            }
            Ok(())
        }
        Some(Commands::AddDevice { name }) => {
            let d = config.add_device(name)?;
            println!("{}\t{}\t{}", d.port, d.uuid, d.name);
            Ok(())
        }
        Some(Commands::List) => {
            for d in config.get_devices()? {
                println!("{}\t{}\t{}", d.port, d.uuid, d.name);
            }
            Ok(())
        }
    }
}

fn logging_options(cli: &Cli, config: &Config) -> Result<LoggingOptions> {
    let min_level = match &cli.log_level {
        Some(level) => level.clone(),
        None => config.get_log_min_level()?,
    };

    Ok(LoggingOptions {
        min_level,
        enable_console: config.get_log_enable_console()?,
        json: config.get_log_json()?,
    })
}

/// Message d'avertissement si `server_ip` n'est porté par aucune interface
///
/// Les noms d'hôte ne sont pas vérifiés.
fn server_ip_warning(server_ip: &str) -> Option<String> {
    let ip: IpAddr = server_ip.parse().ok()?;
    if is_local_address(&ip) {
        return None;
    }

    let mut known: Vec<String> = list_ipv4_addresses()
        .into_iter()
        .flat_map(|(name, addresses)| {
            addresses
                .into_iter()
                .map(move |address| format!("{} ({})", address, name))
        })
        .collect();
    known.sort();

    Some(format!(
        "{} is not carried by any local interface, available: [{}]",
        server_ip,
        known.join(", ")
    ))
}

fn discovery_options(config: &Config) -> Result<DiscoveryOptions> {
    let interface = config.get_multicast_interface();
    let multicast_interface: Ipv4Addr = interface
        .parse()
        .with_context(|| format!("Invalid multicast interface {}", interface))?;

    Ok(DiscoveryOptions {
        multicast_interface,
        error_backoff: Duration::from_millis(config.get_ssdp_error_backoff_ms()? as u64),
    })
}

async fn run(cli: &Cli, config: &Config) -> Result<()> {
    let records = config.get_devices()?;
    if records.is_empty() {
        bail!("No device configured, run `vplug create-config <names>` first");
    }

    let server_ip = cli
        .server_ip
        .clone()
        .unwrap_or_else(|| config.get_server_ip());
    if let Some(message) = server_ip_warning(&server_ip) {
        warn!("⚠️ {}", message);
    }

    // Un tampon nul journalise les événements sans passer par le bus
    let forwarder_token = CancellationToken::new();
    let (sink, forwarder) = match config.get_event_buffer()? {
        0 => (Arc::new(TracingSink) as Arc<dyn EventSink>, None),
        capacity => {
            let bus = EventBus::new(capacity);
            let forwarder = bus.spawn_forwarder(forwarder_token.clone());
            (Arc::new(bus) as Arc<dyn EventSink>, Some(forwarder))
        }
    };

    let identities: Vec<DeviceIdentity> = records.into_iter().map(DeviceIdentity::from).collect();
    let registry = DeviceRegistry::new(identities, &server_ip, Arc::clone(&sink))?;

    for device in registry.devices() {
        let identity = device.identity();
        info!(
            "🔌 {} on http://{}:{} ({})",
            identity.name, server_ip, identity.port, identity.uuid
        );
    }

    let orchestrator =
        Orchestrator::new(registry, sink).with_discovery_options(discovery_options(config)?);

    let shutdown = orchestrator.shutdown_token();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl+C received, stopping...");
                shutdown.cancel();
            }
            Err(e) => warn!("⚠️ Cannot listen for Ctrl+C: {}", e),
        }
    });

    info!("✅ VPlug is ready!");
    info!("Press Ctrl+C to stop...");
    let result = orchestrator.run().await;

    forwarder_token.cancel();
    if let Some(forwarder) = forwarder {
        let _ = forwarder.await;
    }

    result.context("Discovery listener failed")
}
