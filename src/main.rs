use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use telnet_uart_bridge::client::{BridgeClient, DEFAULT_TIMEOUT};
use telnet_uart_bridge::config::{Config, ConfigLoader};
use telnet_uart_bridge::{logging, port, BridgeService, DeviceRegistry};
use tokio::signal;
use tracing::{error, info, warn};

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    version,
    about = "Bridge TCP (Telnet port) clients to a serial device.",
    long_about = "Listens on a TCP port, forwards every received byte to a serial device and answers each chunk with \"Received your command: \" followed by the bytes. Raw TCP only: no Telnet option negotiation."
)]
struct Cli {
    /// Configuration file. Defaults to the standard search locations.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the bridge (default).
    Serve(ServeArgs),
    /// List serial ports known to the operating system.
    Ports {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Send commands to a running bridge and print the acknowledgments.
    Send(SendArgs),
    /// Print the effective configuration as TOML.
    Config {
        /// Write it to this file instead of stdout.
        #[arg(long)]
        write: Option<PathBuf>,
    },
}

#[derive(clap::Args, Debug, Default)]
struct ServeArgs {
    /// Logical serial device name to bind.
    #[arg(short, long)]
    device: Option<String>,

    /// Host address to listen on.
    #[arg(long)]
    host: Option<String>,

    /// TCP port to listen on.
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(clap::Args, Debug)]
struct SendArgs {
    /// Bridge address.
    #[arg(short, long, default_value = "127.0.0.1:23")]
    addr: String,

    /// Connect and acknowledgment timeout in milliseconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_millis() as u64)]
    timeout_ms: u64,

    /// Line ending appended to every command.
    #[arg(long, value_enum, default_value_t = LineEnding::Cr)]
    line_ending: LineEnding,

    /// Commands to send, in order.
    #[arg(required = true)]
    commands: Vec<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LineEnding {
    None,
    Cr,
    Lf,
    Crlf,
}

impl LineEnding {
    fn as_str(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Cr => "\r",
            Self::Lf => "\n",
            Self::Crlf => "\r\n",
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<ConfigLoader, Box<dyn std::error::Error>> {
    let loader = match path {
        Some(path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    };
    Ok(loader)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let loader = load_config(cli.config.as_ref())?;

    match cli.command.unwrap_or(Command::Serve(ServeArgs::default())) {
        Command::Serve(args) => {
            let mut config = loader.into_config();
            if let Some(device) = args.device {
                config.bridge.serial_device = device;
            }
            if let Some(host) = args.host {
                config.bridge.host = host;
            }
            if let Some(port) = args.port {
                config.bridge.port = port;
            }
            logging::init(&config.logging)?;
            serve(config).await?;
        }
        Command::Ports { json } => {
            let ports = port::available_ports()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&ports)?);
            } else if ports.is_empty() {
                println!("No serial ports found.");
            } else {
                for p in ports {
                    println!("{:<24} {}", p.name, p.kind);
                }
            }
        }
        Command::Send(args) => {
            logging::init(&loader.config().logging)?;
            let suffix = args.line_ending.as_str();
            let commands: Vec<String> = args
                .commands
                .iter()
                .map(|c| format!("{c}{suffix}"))
                .collect();
            let wait = Duration::from_millis(args.timeout_ms);

            let mut client = BridgeClient::connect(args.addr.as_str(), wait).await?;
            for ack in client.send_commands(&commands).await? {
                println!("{}", String::from_utf8_lossy(&ack).trim_end());
            }
            client.close().await?;
        }
        Command::Config { write } => {
            match write {
                Some(path) => {
                    loader.save_to(&path)?;
                    println!("Wrote {}", path.display());
                }
                None => print!("{}", toml::to_string_pretty(loader.config())?),
            }
        }
    }

    Ok(())
}

async fn serve(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut registry = DeviceRegistry::from_config(&config.serial);
    let bridge = match BridgeService::start(&config, &mut registry).await {
        Ok(bridge) => bridge,
        Err(e) => {
            error!(error = %e, "bridge failed to start");
            return Err(e.into());
        }
    };

    info!(
        addr = %bridge.local_addr(),
        device = bridge.device_name(),
        "press Ctrl+C to stop"
    );
    bridge.run_until(shutdown_signal()).await?;
    Ok(())
}

// --- Graceful Shutdown Handler ---
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("signal received, starting graceful shutdown");
}
