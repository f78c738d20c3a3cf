use clap::Parser;
use linux_serial::config::{ConfigLoader, LogFormat, LoggingConfig};
use linux_serial::{AppError, BaudRate, BlockingTransfer, Config, Direction, PortHandle};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    version,
    about = "Loopback self-test for a serial port.",
    long_about = "Writes a test string to a serial port and reads the same number of bytes back. \
                  Short the TX and RX pins of the port before running it. Exits 0 when the text \
                  comes back unchanged, 2 when it differs, and 1 when the port cannot be used."
)]
struct Args {
    /// Serial device path, e.g. /dev/ttyUSB0 (falls back to the config file)
    port: Option<String>,

    /// Line speed in bits per second for both directions.
    #[arg(short, long, value_parser = parse_baud)]
    baud: Option<BaudRate>,

    /// Text to send instead of the configured message.
    #[arg(short, long)]
    message: Option<String>,

    /// Give up reading after this many milliseconds (0 waits forever).
    #[arg(short, long)]
    timeout_ms: Option<u64>,

    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn parse_baud(value: &str) -> Result<BaudRate, String> {
    let bps: u32 = value
        .parse()
        .map_err(|_| format!("'{value}' is not a number"))?;
    BaudRate::from_bits_per_second(bps).ok_or_else(|| format!("unsupported baud rate {bps}"))
}

fn main() -> ExitCode {
    let args = Args::parse();

    let loaded = match &args.config {
        Some(path) => ConfigLoader::load_from(path),
        None => ConfigLoader::load(),
    };
    let config = match loaded {
        Ok(loader) => loader.into_config(),
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(1);
        }
    };
    init_tracing(&config.logging);

    match run(&args, config) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            error!("{e}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match logging.format {
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Compact => builder.compact().init(),
    }
}

/// Run the self-test. `Ok(false)` means the port worked but the text came back different.
fn run(args: &Args, mut config: Config) -> Result<bool, AppError> {
    if let Some(baud) = args.baud {
        config.line.receive_baud = baud;
        config.line.transmit_baud = baud;
    }
    if let Some(message) = &args.message {
        config.selftest.message = message.clone();
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.selftest.timeout_ms = timeout_ms;
    }

    let path = args
        .port
        .clone()
        .or_else(|| config.port.path.clone())
        .map(|name| config.port.resolve_port(&name))
        .ok_or(AppError::MissingPort)?;

    info!("Short the TX and RX pins of {path} before running this test");
    let timeout = config.selftest.timeout();
    if timeout.is_some() && config.line.min_wait_tenths == 0 {
        // With VTIME 0 the first read blocks and the deadline is never checked.
        config.line.min_chars = 0;
        config.line.min_wait_tenths = 1;
    }

    let direction = config.port.direction().unwrap_or(Direction::Both);
    let mut port = PortHandle::open_with(&path, direction, &config.line)?;
    info!(
        "Serial port {path} opened at {} baud",
        config.line.transmit_baud
    );

    let message = config.selftest.message.as_str();
    info!("Writing test string <{message}> ({} bytes)", message.len());
    let written = port.write_text(message)?;
    info!("Wrote {written} bytes, waiting to receive them");

    let received = match timeout {
        Some(timeout) => port.read_text_within(written, timeout),
        None => port.read_text(written),
    };
    port.close();
    let received = received?;

    if received == message {
        info!("Received text matches what was sent, loopback test passed");
        Ok(true)
    } else {
        warn!("Received text differs from what was sent: <{received}>");
        Ok(false)
    }
}
