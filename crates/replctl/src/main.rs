mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "replctl", version, about = "Raw-REPL device control CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_eval_subcommand() {
        let cli = Cli::try_parse_from([
            "replctl",
            "eval",
            "--port",
            "/dev/ttyACM0",
            "--baud",
            "115200",
            "1 + 1",
        ])
        .expect("eval args should parse");

        assert!(matches!(cli.command, Command::Eval(_)));
    }

    #[test]
    fn rejects_unknown_baud_type() {
        let err = Cli::try_parse_from(["replctl", "eval", "--baud", "fast", "1"])
            .expect_err("non-numeric baud should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn reset_needs_no_expression() {
        let cli = Cli::try_parse_from(["replctl", "reset", "--port", "/dev/ttyUSB1"])
            .expect("reset args should parse");
        assert!(matches!(cli.command, Command::Reset(_)));
    }
}
