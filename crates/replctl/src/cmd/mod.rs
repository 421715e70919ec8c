use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use replctl_session::{SessionConfig, RESET_SEQUENCE};
use replctl_transport::{FdPair, Transport, TransportError, TtyPort};
use tracing::debug;

use crate::exit::{transport_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod call;
pub mod eval;
pub mod exec;
pub mod reset;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evaluate an expression on the device and print its value.
    Eval(EvalArgs),
    /// Execute statements on the device without capturing a value.
    Exec(ExecArgs),
    /// Bind an object on the device, invoke one method, and clean up.
    Call(CallArgs),
    /// Send the soft-reset sequence and exit.
    Reset(ResetArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Eval(args) => eval::run(args, format),
        Command::Exec(args) => exec::run(args, format),
        Command::Call(args) => call::run(args, format),
        Command::Reset(args) => reset::run(args),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct DeviceArgs {
    /// Serial device path.
    #[arg(long, short = 'p', default_value = "/dev/ttyUSB0", value_name = "PATH")]
    pub port: PathBuf,

    /// Serial baud rate.
    #[arg(long, short = 'b', default_value = "115200")]
    pub baud: u32,

    /// Drive the protocol over stdin/stdout instead of a serial port.
    #[arg(long, conflicts_with_all = ["port", "baud"])]
    pub stdio: bool,

    /// Settle delay after each command, in milliseconds.
    #[arg(long, default_value = "0", value_name = "MS")]
    pub delay: u64,

    /// Give up on the raw-mode handshake after this long (e.g. 10s, 500ms).
    /// Retries forever by default.
    #[arg(long, value_name = "DURATION")]
    pub handshake_timeout: Option<String>,

    /// Leave the device in raw mode on exit instead of soft-resetting it.
    #[arg(long)]
    pub no_reset: bool,
}

#[derive(Args, Debug)]
pub struct EvalArgs {
    #[command(flatten)]
    pub device: DeviceArgs,

    /// Expression to evaluate.
    pub expr: String,
}

#[derive(Args, Debug)]
pub struct ExecArgs {
    #[command(flatten)]
    pub device: DeviceArgs,

    /// Statements to execute.
    pub code: String,
}

#[derive(Args, Debug)]
pub struct CallArgs {
    #[command(flatten)]
    pub device: DeviceArgs,

    /// Constructor or factory to bind, e.g. `machine.Pin`.
    pub func: String,

    /// Method to invoke on the bound object.
    #[arg(long, short = 'm')]
    pub method: String,

    /// Constructor argument as a literal (repeatable).
    #[arg(long = "arg", value_name = "LITERAL")]
    pub arg: Vec<String>,

    /// Method argument as a literal (repeatable).
    #[arg(long = "method-arg", value_name = "LITERAL")]
    pub method_arg: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ResetArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Concrete transport behind a device subcommand.
pub enum DevicePort {
    Tty(TtyPort),
    Stdio(FdPair),
}

impl DevicePort {
    pub fn open(args: &DeviceArgs) -> CliResult<Self> {
        if args.stdio {
            let pair =
                FdPair::stdio().map_err(|err| transport_error("failed to take stdio", err))?;
            return Ok(DevicePort::Stdio(pair));
        }
        let port = TtyPort::open(&args.port, args.baud)
            .map_err(|err| transport_error("failed to open device", err))?;
        debug!(port = %args.port.display(), baud = args.baud, "serial port open");
        Ok(DevicePort::Tty(port))
    }
}

impl Transport for DevicePort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<(), TransportError> {
        match self {
            DevicePort::Tty(port) => port.write_bytes(data),
            DevicePort::Stdio(pair) => pair.write_bytes(data),
        }
    }

    fn read_avail(&mut self) -> Result<Vec<u8>, TransportError> {
        match self {
            DevicePort::Tty(port) => port.read_avail(),
            DevicePort::Stdio(pair) => pair.read_avail(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            DevicePort::Tty(_) => "tty",
            DevicePort::Stdio(_) => "stdio",
        }
    }
}

pub fn session_config(args: &DeviceArgs) -> CliResult<SessionConfig> {
    let handshake_deadline = match &args.handshake_timeout {
        Some(text) => Some(parse_duration(text)?),
        None => None,
    };
    Ok(SessionConfig {
        poll_delay: Duration::from_millis(args.delay),
        handshake_deadline,
        reset_on_drop: !args.no_reset,
        ..SessionConfig::default()
    })
}

/// Soft-reset the device on Ctrl-C so an interrupted run does not leave
/// it wedged at the raw prompt.
///
/// The handler opens the port independently of the session's handle: the
/// main thread may be mid-write when the signal lands.
pub fn install_interrupt_reset(args: &DeviceArgs) {
    if args.stdio || args.no_reset {
        return;
    }
    let path = args.port.clone();
    let baud = args.baud;
    let result = ctrlc::set_handler(move || {
        if let Ok(mut port) = TtyPort::open(&path, baud) {
            let _ = port.write_bytes(&RESET_SEQUENCE);
        }
        std::process::exit(130);
    });
    if let Err(err) = result {
        debug!(error = %err, "interrupt handler not installed");
    }
}

/// Parse a duration like `10s` or `500ms` (a bare number means seconds).
fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    let (number, from_unit): (&str, fn(u64) -> Duration) =
        if let Some(num) = input.strip_suffix("ms") {
            (num, Duration::from_millis)
        } else if let Some(num) = input.strip_suffix('s') {
            (num, Duration::from_secs)
        } else {
            (input, Duration::from_secs)
        };

    match number.parse::<u64>() {
        Ok(0) => Err(CliError::new(USAGE, "duration must be greater than zero")),
        Ok(value) => Ok(from_unit(value)),
        Err(_) => Err(CliError::new(
            USAGE,
            format!("invalid duration value: {input:?}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn session_config_maps_device_args() {
        let args = DeviceArgs {
            port: PathBuf::from("/dev/ttyUSB0"),
            baud: 115_200,
            stdio: false,
            delay: 40,
            handshake_timeout: Some("5s".into()),
            no_reset: true,
        };
        let config = session_config(&args).expect("valid args should map");
        assert_eq!(config.poll_delay, Duration::from_millis(40));
        assert_eq!(config.handshake_deadline, Some(Duration::from_secs(5)));
        assert!(!config.reset_on_drop);
    }
}
