//! The connection engine: one thread that owns the channel, reconnects on
//! failure, and moves commands out and messages in.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use voxlink_wire::{
    decode_line, Command, InboundLine, InboundMessage, LineReader, LineWriter, TriggerTarget,
    WireError,
};

use crate::config::ClientConfig;
use crate::connector::{Channel, CloseChannel, Connector};
use crate::error::{ClientError, Result};
use crate::inbox::{ConnectionEvent, EventCell, ResponseQueue};
use crate::mailbox::Outbox;

/// State shared between the engine thread, producers, and the consumer.
pub(crate) struct Shared {
    pub(crate) outbox: Outbox,
    pub(crate) responses: ResponseQueue,
    pub(crate) events: EventCell,
    pub(crate) connected: AtomicBool,
    pub(crate) running: Arc<AtomicBool>,
    closer: Mutex<Option<Box<dyn CloseChannel>>>,
}

impl Shared {
    pub(crate) fn new(response_capacity: usize) -> Self {
        Self {
            outbox: Outbox::new(),
            responses: ResponseQueue::new(response_capacity),
            events: EventCell::new(),
            connected: AtomicBool::new(false),
            running: Arc::new(AtomicBool::new(false)),
            closer: Mutex::new(None),
        }
    }

    /// Close the live channel, if any, so a stalled engine notices stop.
    pub(crate) fn close_channel(&self) {
        let closer = self
            .closer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(closer) = closer {
            closer.close();
        }
    }

    fn set_closer(&self, closer: Option<Box<dyn CloseChannel>>) {
        *self.closer.lock().unwrap_or_else(PoisonError::into_inner) = closer;
    }
}

/// What the engine should do after one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tick {
    /// Not connected; wait the reconnect backoff.
    Backoff,
    /// Connected, but nothing moved; wait the idle interval.
    Idle,
    /// Work was done; go again immediately.
    Busy,
}

struct Link<C: Connector> {
    reader: LineReader<C::Reader>,
    writer: LineWriter<C::Writer>,
}

pub(crate) struct Engine<C: Connector> {
    connector: C,
    shared: Arc<Shared>,
    config: ClientConfig,
    link: Option<Link<C>>,
    inbound: Vec<String>,
}

impl<C: Connector> Engine<C> {
    pub(crate) fn new(connector: C, shared: Arc<Shared>, config: ClientConfig) -> Self {
        Self {
            connector,
            shared,
            config,
            link: None,
            inbound: Vec::new(),
        }
    }

    /// Run until the shared running flag drops, then hand the connector back.
    pub(crate) fn run(mut self) -> C {
        let target = self.connector.describe();
        info!(companion = %target, "voice engine started");

        while self.shared.running.load(Ordering::Acquire) {
            match self.tick() {
                Tick::Busy => {}
                Tick::Idle => self.pause(self.config.idle_interval),
                Tick::Backoff => self.pause(self.config.reconnect_backoff),
            }
        }

        self.shared.set_closer(None);
        if self.link.take().is_some() {
            self.shared.connected.store(false, Ordering::Release);
            self.shared.outbox.reset_acknowledgement();
            info!(companion = %target, "closed companion channel");
        }
        info!(companion = %target, "voice engine stopped");
        self.connector
    }

    /// Sleep up to `duration`, returning early once stop is requested.
    fn pause(&self, duration: Duration) {
        let deadline = Instant::now() + duration;
        while self.shared.running.load(Ordering::Acquire) {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::park_timeout(deadline - now);
        }
    }

    /// One step: a connect attempt while disconnected, one service cycle
    /// while connected.
    pub(crate) fn tick(&mut self) -> Tick {
        if self.link.is_none() {
            return self.try_connect();
        }
        match self.service_cycle() {
            Ok(true) => Tick::Busy,
            Ok(false) => Tick::Idle,
            Err(err) => {
                self.teardown(&err);
                Tick::Backoff
            }
        }
    }

    fn try_connect(&mut self) -> Tick {
        let Channel {
            reader,
            writer,
            closer,
        } = match self.connector.connect() {
            Ok(channel) => channel,
            Err(ClientError::Transport(err)) if err.is_not_listening() => {
                debug!(error = %err, "companion not listening; retrying");
                return Tick::Backoff;
            }
            Err(err) => {
                warn!(error = %err, "connect to companion failed");
                return Tick::Backoff;
            }
        };

        let wire = self.config.wire_config();
        self.link = Some(Link {
            reader: LineReader::with_config(reader, wire),
            writer: LineWriter::with_config(writer, wire)
                .with_running_flag(Arc::clone(&self.shared.running)),
        });
        self.shared.set_closer(closer);
        if !self.shared.running.load(Ordering::Acquire) {
            // Stop raced the connect and found no channel to close.
            self.shared.close_channel();
            self.link = None;
            return Tick::Backoff;
        }
        self.shared.connected.store(true, Ordering::Release);
        self.shared.events.set(ConnectionEvent::Connected);
        info!(companion = %self.connector.describe(), "connected to companion");

        if let Err(err) = self.resync() {
            self.teardown(&err);
            return Tick::Backoff;
        }
        Tick::Busy
    }

    /// Send every due sticky value before anything else on a fresh channel.
    fn resync(&mut self) -> Result<()> {
        let commands = self.shared.outbox.plan_resync();
        if !commands.is_empty() {
            debug!(count = commands.len(), "resending sticky configuration");
        }
        for command in &commands {
            self.transmit(command)?;
        }
        Ok(())
    }

    /// Returns whether any bytes moved in either direction.
    fn service_cycle(&mut self) -> Result<bool> {
        let commands = self.shared.outbox.plan_cycle();
        for command in &commands {
            self.transmit(command)?;
        }
        let received = self.receive()?;
        Ok(!commands.is_empty() || received)
    }

    fn transmit(&mut self, command: &Command) -> Result<()> {
        let link = self.link.as_mut().ok_or(WireError::ConnectionClosed)?;
        link.writer.send(command)?;
        for line in command.lines() {
            debug!(line = %line, "sent");
        }
        self.shared.outbox.mark_sent(command);
        Ok(())
    }

    /// Lines that arrived before a peer close are still delivered; the
    /// close itself fails the cycle at once.
    fn receive(&mut self) -> Result<bool> {
        let link = self.link.as_mut().ok_or(WireError::ConnectionClosed)?;
        self.inbound.clear();
        let polled = link.reader.poll_lines(&mut self.inbound);
        let closed = link.reader.is_closed();

        let lines = std::mem::take(&mut self.inbound);
        for line in &lines {
            self.dispatch(line);
        }
        let received = !lines.is_empty();
        self.inbound = lines;

        match polled {
            Ok(_) => {}
            Err(WireError::LineTooLong { size, max }) => {
                warn!(size, max, "dropped overlong line from companion");
            }
            Err(err) => return Err(err.into()),
        }
        if closed {
            return Err(WireError::ConnectionClosed.into());
        }
        Ok(received)
    }

    fn dispatch(&self, line: &str) {
        if line.is_empty() {
            return;
        }
        match decode_line(line) {
            InboundLine::Message(message) => {
                log_receipt(&message);
                if let Some(evicted) = self.shared.responses.push(message) {
                    debug!(?evicted, "response queue full; dropped oldest");
                }
            }
            InboundLine::Status(status) => info!(status = %status, "listen status"),
            InboundLine::Unrecognized(raw) => info!(line = %raw, "recv"),
        }
    }

    fn teardown(&mut self, cause: &ClientError) {
        self.link = None;
        self.inbound.clear();
        self.shared.set_closer(None);
        self.shared.connected.store(false, Ordering::Release);
        self.shared.outbox.reset_acknowledgement();
        if !self.shared.running.load(Ordering::Acquire) {
            info!(error = %cause, "companion channel closed for stop");
            return;
        }
        self.shared.events.set(ConnectionEvent::Disconnected);
        info!(error = %cause, "disconnected from companion");
    }
}

fn log_receipt(message: &InboundMessage) {
    match message {
        InboundMessage::Result { index, score } => info!(index, score, "recv RES"),
        InboundMessage::Trigger(trigger) => match &trigger.target {
            TriggerTarget::Shout {
                plugin,
                form_id,
                power,
            } => info!(
                kind = %trigger.kind,
                plugin = %plugin,
                form_id = %form_id,
                power,
                score = trigger.score,
                text = %trigger.text,
                "recv TRIG"
            ),
            TriggerTarget::Form { form_id } => info!(
                kind = %trigger.kind,
                form_id = %form_id,
                score = trigger.score,
                text = %trigger.text,
                "recv TRIG"
            ),
            TriggerTarget::None => info!(
                kind = %trigger.kind,
                score = trigger.score,
                text = %trigger.text,
                "recv TRIG"
            ),
        },
        InboundMessage::Debug { text } => info!(text = %text, "recv DBG"),
    }
}
