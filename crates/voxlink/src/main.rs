mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "voxlink",
    version,
    about = "Talk to a speech-recognition companion over local IPC"
)]
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
    use voxlink_transport::Endpoint;
    use voxlink_wire::ConfigToggle;

    use super::*;

    #[test]
    fn parses_connect_with_repeated_config() {
        let cli = Cli::try_parse_from([
            "voxlink",
            "connect",
            "/tmp/test.sock",
            "--config",
            "shouts=1",
            "--config",
            "open=0",
            "--options",
            "Yes,No",
            "--format",
            "json",
        ])
        .expect("connect args should parse");

        assert_eq!(cli.format, Some(OutputFormat::Json));
        match cli.command {
            Command::Connect(args) => {
                assert_eq!(args.endpoint, Some(Endpoint::socket("/tmp/test.sock")));
                assert_eq!(
                    args.config,
                    vec![(ConfigToggle::Shouts, true), (ConfigToggle::Open, false)]
                );
                assert_eq!(
                    args.options,
                    Some(vec!["Yes".to_string(), "No".to_string()])
                );
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_config_name() {
        let err = Cli::try_parse_from(["voxlink", "connect", "--config", "volume=1"])
            .expect_err("unknown toggle should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn parses_companion_replies() {
        let cli = Cli::try_parse_from([
            "voxlink",
            "companion",
            "/tmp/test.sock",
            "--reply",
            "RES|0|0.9",
            "--reply",
            "DBG|hi",
            "--count",
            "2",
        ])
        .expect("companion args should parse");
        match cli.command {
            Command::Companion(args) => {
                assert_eq!(args.reply, vec!["RES|0|0.9", "DBG|hi"]);
                assert_eq!(args.count, Some(2));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_version_subcommand() {
        let cli = Cli::try_parse_from(["voxlink", "version", "--extended"])
            .expect("version args should parse");
        assert!(matches!(cli.command, Command::Version(args) if args.extended));
    }
}
