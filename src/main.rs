use chrono::Local;
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use usb_serial_link::config::{Config, ConfigLoader};
use usb_serial_link::logging::init_logging;
use usb_serial_link::{
    ConnectionLifecycle, ConnectionObserver, DeviceDescriptor, DeviceManager, DisconnectReason,
    SerialConnection, SystemDeviceManager,
};

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    name = "usb-serial",
    version,
    about = "List USB serial devices and bridge one to stdin/stdout."
)]
struct Cli {
    /// Configuration file (defaults to the standard search path).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List attachable USB serial devices.
    List {
        /// Print the list as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Open a device, print what it sends and forward stdin lines to it.
    Monitor {
        /// Port name, configured alias, or index from `list`.
        device: String,

        /// Override the configured baud rate.
        #[arg(short, long)]
        baud: Option<u32>,

        /// Print received bytes as hex.
        #[arg(long)]
        hex: bool,

        /// Prefix each received chunk with the local time.
        #[arg(short, long)]
        timestamps: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from(path)?.into_config(),
        None => match ConfigLoader::load() {
            Ok(loader) => loader.into_config(),
            Err(e) => {
                eprintln!("Warning: Failed to load config, using defaults: {}", e);
                ConfigLoader::with_defaults().into_config()
            }
        },
    };

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("Warning: logging already initialized: {}", e);
    }

    let manager = Arc::new(SystemDeviceManager::new());
    match cli.command {
        Command::List { json } => list(manager.as_ref(), json),
        Command::Monitor {
            device,
            baud,
            hex,
            timestamps,
        } => {
            let output = OutputFormat { hex, timestamps };
            monitor(manager, &config, &device, baud, output).await
        }
    }
}

fn list(manager: &dyn DeviceManager, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let devices = manager.list_devices()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&devices)?);
        return Ok(());
    }

    if devices.is_empty() {
        println!("No USB serial devices detected");
        return Ok(());
    }

    for (idx, device) in devices.iter().enumerate() {
        println!(
            "{:>2}. {:<20} {}  {} {}",
            idx,
            device.port_name,
            device.usb_id(),
            device.manufacturer.as_deref().unwrap_or("-"),
            device.product.as_deref().unwrap_or(""),
        );
        if let Some(serial) = &device.serial_number {
            println!("    serial: {}", serial);
        }
    }
    Ok(())
}

/// Pick a device by port name or by its index in the enumeration.
fn select_device(devices: &[DeviceDescriptor], wanted: &str) -> Option<DeviceDescriptor> {
    devices
        .iter()
        .find(|d| d.port_name == wanted)
        .or_else(|| wanted.parse::<usize>().ok().and_then(|idx| devices.get(idx)))
        .cloned()
}

async fn monitor(
    manager: Arc<SystemDeviceManager>,
    config: &Config,
    device: &str,
    baud: Option<u32>,
    output: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let wanted = config.serial.resolve_device(device);
    let devices = manager.list_devices()?;
    let descriptor = select_device(&devices, &wanted)
        .ok_or_else(|| format!("no USB serial device matches '{}'", wanted))?;

    let mut settings = config.serial.connection_settings()?;
    if let Some(baud) = baud {
        settings.line.baud_rate = baud;
    }

    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    let observer = StdoutObserver { output, done_tx };
    let connection = Arc::new(
        SerialConnection::new(manager, descriptor, settings)?.with_observer(Arc::new(observer)),
    );
    info!(connection = %connection.display_name(), line = %connection.settings().line, "starting monitor");

    let lifecycle = ConnectionLifecycle::spawn(Arc::clone(&connection))?;
    let mut stdin = spawn_line_reader(BufReader::new(io::stdin()))?;
    let mut stdin_open = true;

    let reason = loop {
        tokio::select! {
            reason = done_rx.recv() => break reason,
            _ = tokio::signal::ctrl_c() => {
                info!("Signal received, disconnecting...");
                connection.disconnect();
            }
            line = stdin.recv(), if stdin_open => match line {
                Some(Ok(line)) => {
                    let mut bytes = line.into_bytes();
                    bytes.push(b'\n');
                    let conn = Arc::clone(&connection);
                    if let Err(e) = tokio::task::block_in_place(move || conn.send(&bytes)) {
                        warn!(error = %e, "send failed");
                    }
                }
                None => stdin_open = false,
                Some(Err(e)) => {
                    warn!(error = %e, "stdin closed");
                    stdin_open = false;
                }
            },
        }
    };

    let joined = tokio::task::spawn_blocking(move || lifecycle.join()).await?;
    let reason = match (reason, joined) {
        (Some(reason), _) => reason,
        (None, result) => result?,
    };

    info!(%reason, received = connection.bytes_received(), sent = connection.bytes_sent(), "monitor finished");
    if reason.is_failure() {
        return Err(reason.to_string().into());
    }
    Ok(())
}

/// Read lines from `input` on a detached thread.
///
/// A blocked read on this thread never holds up runtime shutdown, so the
/// tool exits as soon as the device goes away. The channel closes at EOF.
fn spawn_line_reader<R>(input: R) -> io::Result<mpsc::UnboundedReceiver<io::Result<String>>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::Builder::new()
        .name("usb-serial:stdin".to_string())
        .spawn(move || {
            for line in input.lines() {
                if tx.send(line).is_err() {
                    break;
                }
            }
        })?;
    Ok(rx)
}

#[derive(Debug, Clone, Copy)]
struct OutputFormat {
    hex: bool,
    timestamps: bool,
}

impl OutputFormat {
    fn render(&self, bytes: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(bytes.len() * 3 + 16);
        if self.timestamps {
            out.extend_from_slice(Local::now().format("[%H:%M:%S%.3f] ").to_string().as_bytes());
        }
        if self.hex {
            let hex: Vec<String> = bytes.iter().map(|b| format!("{:02X}", b)).collect();
            out.extend_from_slice(hex.join(" ").as_bytes());
            out.push(b'\n');
        } else {
            out.extend_from_slice(bytes);
            if self.timestamps && !bytes.ends_with(b"\n") {
                out.push(b'\n');
            }
        }
        out
    }
}

/// Writes received bytes to stdout and reports the disconnect to `monitor`.
struct StdoutObserver {
    output: OutputFormat,
    done_tx: mpsc::UnboundedSender<DisconnectReason>,
}

impl ConnectionObserver for StdoutObserver {
    fn on_bytes_received(&self, _connection: &SerialConnection, bytes: &[u8]) {
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = stdout
            .write_all(&self.output.render(bytes))
            .and_then(|()| stdout.flush())
        {
            warn!(error = %e, "failed to write to stdout");
        }
    }

    fn on_disconnected(&self, _connection: &SerialConnection, reason: &DisconnectReason) {
        // The receiver is gone only if monitor already returned.
        let _ = self.done_tx.send(reason.clone());
    }
}
