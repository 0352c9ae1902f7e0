use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use voxlink_client::{ClientConfig, VoiceClient};
use voxlink_transport::Endpoint;

use crate::cmd::{install_ctrlc_handler, parse_duration, ConnectArgs};
use crate::exit::{client_error, CliError, CliResult, SUCCESS, TIMEOUT};
use crate::output::{print_event, print_message, OutputFormat};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub fn run(args: ConnectArgs, format: OutputFormat) -> CliResult<i32> {
    let endpoint = args.endpoint.clone().unwrap_or_default();
    let config = ClientConfig {
        reconnect_backoff: parse_duration(&args.backoff)?,
        ..ClientConfig::with_endpoint(endpoint.clone())
    };
    let deadline = args
        .timeout
        .as_deref()
        .map(parse_duration)
        .transpose()?
        .map(|timeout| Instant::now() + timeout);

    let client = VoiceClient::new(config);
    apply_settings(&client, &args)?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    client
        .start()
        .map_err(|err| client_error("engine start failed", err))?;
    tracing::info!(endpoint = %endpoint, "waiting for companion");

    let code = pump(&client, &endpoint, &args, format, &running, deadline);
    client.stop();
    code
}

fn apply_settings(client: &VoiceClient, args: &ConnectArgs) -> CliResult<()> {
    if let Some(code) = &args.lang {
        if !client.set_language(code) {
            return Err(CliError::new(
                crate::exit::USAGE,
                "language code must not be empty",
            ));
        }
    }
    for &(toggle, enabled) in &args.config {
        client.set_config(toggle, enabled);
    }
    if let Some(options) = &args.options {
        client.set_dialogue_options(options.iter().cloned());
    }
    if args.close {
        client.request_close();
    }
    if let Some(enabled) = args.listen {
        client.set_listen(enabled);
    }
    if let Some(enabled) = args.listen_shouts {
        client.set_listen_shouts(enabled);
    }
    Ok(())
}

fn pump(
    client: &VoiceClient,
    endpoint: &Endpoint,
    args: &ConnectArgs,
    format: OutputFormat,
    running: &AtomicBool,
    deadline: Option<Instant>,
) -> CliResult<i32> {
    let endpoint = endpoint.to_string();
    let mut printed = 0usize;

    while running.load(Ordering::SeqCst) {
        if let Some(event) = client.take_connection_event() {
            print_event(event, &endpoint, format);
        }

        while let Some(message) = client.next_response() {
            print_message(&message, format);
            printed = printed.saturating_add(1);
            if args.count.is_some_and(|count| printed >= count) {
                return Ok(SUCCESS);
            }
        }

        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(CliError::new(
                TIMEOUT,
                format!("timed out after {printed} message(s) from {endpoint}"),
            ));
        }
        std::thread::sleep(POLL_INTERVAL);
    }

    Ok(SUCCESS)
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cmd::Command;

    #[derive(Parser)]
    struct Harness {
        #[command(subcommand)]
        command: Command,
    }

    fn connect_args(argv: &[&str]) -> ConnectArgs {
        let mut full = vec!["voxlink", "connect", "/tmp/voxlink-test.sock"];
        full.extend_from_slice(argv);
        match Harness::try_parse_from(full).expect("args should parse").command {
            Command::Connect(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn settings_reach_the_client() {
        let args = connect_args(&[
            "--lang",
            "en",
            "--config",
            "shouts=1",
            "--config",
            "debug=0",
            "--listen-shouts",
            "1",
        ]);
        let client = VoiceClient::new(ClientConfig::default());
        apply_settings(&client, &args).unwrap();

        assert_eq!(
            client.config_value(voxlink_wire::ConfigToggle::Shouts),
            Some(true)
        );
        assert_eq!(
            client.config_value(voxlink_wire::ConfigToggle::Debug),
            Some(false)
        );
        assert_eq!(client.config_value(voxlink_wire::ConfigToggle::Open), None);
    }

    #[test]
    fn blank_language_is_a_usage_error() {
        let args = connect_args(&["--lang", " "]);
        let client = VoiceClient::new(ClientConfig::default());
        let err = apply_settings(&client, &args).unwrap_err();
        assert_eq!(err.code, crate::exit::USAGE);
    }
}
