use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Subcommand};
use voxlink_transport::Endpoint;
use voxlink_wire::ConfigToggle;

use crate::exit::{CliError, CliResult, INTERNAL, USAGE};
use crate::output::OutputFormat;

pub mod companion;
pub mod connect;
pub mod version;

/// Environment variable consulted when no endpoint is given.
pub const ENDPOINT_ENV: &str = "VOXLINK_ENDPOINT";

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect to a companion and print what it sends.
    Connect(ConnectArgs),
    /// Run a mock companion that prints the commands it receives.
    Companion(CompanionArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Connect(args) => connect::run(args, format),
        Command::Companion(args) => companion::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ConnectArgs {
    /// Companion endpoint (socket path or named pipe). Defaults to the
    /// platform's standard channel.
    #[arg(env = ENDPOINT_ENV)]
    pub endpoint: Option<Endpoint>,
    /// Game language code to announce.
    #[arg(long, value_name = "CODE")]
    pub lang: Option<String>,
    /// Config toggle to mirror, e.g. `shouts=1` (repeatable).
    #[arg(long = "config", value_name = "NAME=0|1", value_parser = parse_setting)]
    pub config: Vec<(ConfigToggle, bool)>,
    /// Turn general listening on or off.
    #[arg(long, value_name = "0|1", value_parser = parse_switch)]
    pub listen: Option<bool>,
    /// Turn shout listening on or off.
    #[arg(long, value_name = "0|1", value_parser = parse_switch)]
    pub listen_shouts: Option<bool>,
    /// Dialogue options to offer (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub options: Option<Vec<String>>,
    /// Signal that the dialogue closed.
    #[arg(long)]
    pub close: bool,
    /// Exit after printing N messages.
    #[arg(long)]
    pub count: Option<usize>,
    /// Give up after this long (e.g. 5s, 500ms).
    #[arg(long)]
    pub timeout: Option<String>,
    /// Pause between connect attempts (e.g. 1s, 200ms).
    #[arg(long, default_value = "1s")]
    pub backoff: String,
}

#[derive(Args, Debug)]
pub struct CompanionArgs {
    /// Socket path to listen on. Defaults to the platform's standard channel.
    #[arg(env = ENDPOINT_ENV)]
    pub endpoint: Option<Endpoint>,
    /// Line to send each client right after it connects (repeatable).
    #[arg(long, value_name = "LINE")]
    pub reply: Vec<String>,
    /// Exit after receiving N lines.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

fn parse_switch(value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "on" | "true" => Ok(true),
        "0" | "off" | "false" => Ok(false),
        other => Err(format!("expected 0 or 1, got {other:?}")),
    }
}

fn parse_setting(value: &str) -> Result<(ConfigToggle, bool), String> {
    let (name, switch) = value
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=0|1, got {value:?}"))?;
    let toggle = name.parse::<ConfigToggle>().map_err(|err| err.to_string())?;
    Ok((toggle, parse_switch(switch)?))
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

/// Clear `running` on Ctrl-C.
pub(crate) fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
