use crate::cmd::CompanionArgs;
use crate::exit::CliResult;
use crate::output::OutputFormat;

#[cfg(unix)]
pub fn run(args: CompanionArgs, format: OutputFormat) -> CliResult<i32> {
    unix::run(args, format)
}

#[cfg(not(unix))]
pub fn run(_args: CompanionArgs, _format: OutputFormat) -> CliResult<i32> {
    Err(crate::exit::CliError::new(
        crate::exit::USAGE,
        "the mock companion needs Unix domain sockets",
    ))
}

#[cfg(unix)]
mod unix {
    use std::io;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use voxlink_transport::{CompanionListener, Endpoint, IpcStream, TransportError};
    use voxlink_wire::{parse_favorite_line, LineReader, LineWriter, WireError};

    use crate::cmd::{install_ctrlc_handler, CompanionArgs};
    use crate::exit::{transport_error, wire_error, CliError, CliResult, SUCCESS, USAGE};
    use crate::output::{print_line, OutputFormat};

    const ACCEPT_INTERVAL: Duration = Duration::from_millis(20);
    const READ_INTERVAL: Duration = Duration::from_millis(10);

    pub fn run(args: CompanionArgs, format: OutputFormat) -> CliResult<i32> {
        let path = match args.endpoint.clone().unwrap_or_default() {
            Endpoint::Socket(path) => path,
            Endpoint::Pipe(name) => {
                return Err(CliError::new(
                    USAGE,
                    format!("named pipe {name} cannot be served here; pass a socket path"),
                ))
            }
        };

        let listener =
            CompanionListener::bind(&path).map_err(|err| transport_error("bind failed", err))?;
        listener
            .set_nonblocking(true)
            .map_err(|err| transport_error("bind failed", err))?;

        let running = Arc::new(AtomicBool::new(true));
        install_ctrlc_handler(running.clone())?;

        let mut received = 0usize;
        while running.load(Ordering::SeqCst) {
            let stream = match listener.accept() {
                Ok(stream) => stream,
                Err(TransportError::Accept(err)) if err.kind() == io::ErrorKind::WouldBlock => {
                    std::thread::sleep(ACCEPT_INTERVAL);
                    continue;
                }
                Err(err) => return Err(transport_error("accept failed", err)),
            };

            if serve(stream, &args, format, &running, &mut received)? {
                return Ok(SUCCESS);
            }
            tracing::info!(received, "client disconnected; waiting for the next one");
        }

        Ok(SUCCESS)
    }

    /// Talk to one client. Returns `true` once `--count` lines have arrived.
    fn serve(
        mut stream: IpcStream,
        args: &CompanionArgs,
        format: OutputFormat,
        running: &AtomicBool,
        received: &mut usize,
    ) -> CliResult<bool> {
        stream
            .set_nonblocking(true)
            .map_err(|err| transport_error("client setup failed", err))?;
        let write_half = stream
            .try_clone()
            .map_err(|err| transport_error("client setup failed", err))?;

        let mut writer = LineWriter::new(write_half);
        for line in &args.reply {
            match writer.send_line(line) {
                Ok(()) => tracing::debug!(line = %line, "replied"),
                Err(WireError::ConnectionClosed) => return Ok(false),
                Err(err) => return Err(wire_error("reply failed", err)),
            }
        }

        let mut reader = LineReader::new(stream);
        let mut lines = Vec::new();
        while running.load(Ordering::SeqCst) {
            lines.clear();
            let outcome = reader.poll_lines(&mut lines);

            for line in &lines {
                print_line(line, parse_favorite_line(line).as_ref(), format);
                *received = received.saturating_add(1);
                if args.count.is_some_and(|count| *received >= count) {
                    return Ok(true);
                }
            }

            match outcome {
                Ok(0) => std::thread::sleep(READ_INTERVAL),
                Ok(_) => {}
                Err(WireError::ConnectionClosed) => return Ok(false),
                Err(WireError::LineTooLong { size, max }) => {
                    tracing::warn!(size, max, "dropped overlong line");
                }
                Err(err) => return Err(wire_error("receive failed", err)),
            }
        }

        Ok(false)
    }
}
