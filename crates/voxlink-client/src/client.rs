use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};
use voxlink_wire::{ConfigToggle, FavoritesBatch, InboundMessage};

use crate::config::ClientConfig;
use crate::connector::{Connector, EndpointConnector};
use crate::engine::{Engine, Shared};
use crate::error::{ClientError, Result};
use crate::inbox::ConnectionEvent;

/// Handle to a self-healing connection with the speech companion.
///
/// Producers call the setters from any thread; they only record intent and
/// never block on I/O. A single consumer drains [`VoiceClient::next_response`]
/// and [`VoiceClient::take_connection_event`]. The channel itself lives on a
/// dedicated engine thread between [`VoiceClient::start`] and
/// [`VoiceClient::stop`].
///
/// ```no_run
/// use voxlink_client::{ClientConfig, VoiceClient};
/// use voxlink_wire::ConfigToggle;
///
/// let client = VoiceClient::new(ClientConfig::default());
/// client.set_language("en");
/// client.set_config(ConfigToggle::Shouts, true);
/// client.start()?;
/// while let Some(message) = client.next_response() {
///     println!("{message:?}");
/// }
/// client.stop();
/// # Ok::<(), voxlink_client::ClientError>(())
/// ```
pub struct VoiceClient<C: Connector = EndpointConnector> {
    shared: Arc<Shared>,
    config: ClientConfig,
    connector: Mutex<Option<C>>,
    engine: Mutex<Option<JoinHandle<C>>>,
}

impl VoiceClient<EndpointConnector> {
    /// A client for the companion at `config.endpoint`.
    pub fn new(config: ClientConfig) -> Self {
        let connector = EndpointConnector::new(config.endpoint.clone())
            .with_write_timeout(config.write_timeout);
        Self::with_connector(config, connector)
    }
}

impl<C: Connector> VoiceClient<C> {
    /// A client that opens its channel through `connector`.
    pub fn with_connector(config: ClientConfig, connector: C) -> Self {
        Self {
            shared: Arc::new(Shared::new(config.response_capacity)),
            config,
            connector: Mutex::new(Some(connector)),
            engine: Mutex::new(None),
        }
    }

    /// Start the engine thread. Calling it while running does nothing.
    pub fn start(&self) -> Result<()> {
        let mut engine = lock(&self.engine);
        if engine.is_some() {
            return Ok(());
        }
        let connector = lock(&self.connector)
            .take()
            .ok_or(ClientError::EngineUnavailable)?;

        self.shared.running.store(true, Ordering::Release);
        let worker = Engine::new(connector, Arc::clone(&self.shared), self.config.clone());
        let handle = thread::Builder::new()
            .name(self.config.thread_name.clone())
            .spawn(move || worker.run())
            .map_err(|err| {
                self.shared.running.store(false, Ordering::Release);
                ClientError::Spawn(err)
            })?;
        *engine = Some(handle);
        Ok(())
    }

    /// Stop the engine and close the channel.
    ///
    /// The channel is closed from this thread, so an engine waiting on a
    /// companion that stopped reading gives up at once. Returns once the
    /// engine thread has exited; no connection events are produced after
    /// that.
    pub fn stop(&self) {
        let Some(handle) = lock(&self.engine).take() else {
            return;
        };
        self.shared.running.store(false, Ordering::Release);
        self.shared.close_channel();
        handle.thread().unpark();
        match handle.join() {
            Ok(connector) => *lock(&self.connector) = Some(connector),
            Err(_) => warn!("voice engine thread panicked"),
        }
        self.shared.connected.store(false, Ordering::Release);
        debug!("voice client stopped");
    }

    /// Stop, then start again with the same connector.
    pub fn restart(&self) -> Result<()> {
        self.stop();
        self.start()
    }

    pub fn is_running(&self) -> bool {
        lock(&self.engine).is_some()
    }

    /// Whether the engine currently holds an open channel.
    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::Acquire)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Desired game language. Empty codes are ignored; returns whether the
    /// value was accepted.
    pub fn set_language(&self, code: &str) -> bool {
        self.shared.outbox.set_language(code)
    }

    pub fn set_config(&self, toggle: ConfigToggle, enabled: bool) {
        self.shared.outbox.set_config(toggle, enabled);
    }

    /// Current desired value of a config toggle.
    pub fn config_value(&self, toggle: ConfigToggle) -> Option<bool> {
        self.shared.outbox.config(toggle)
    }

    /// Offer dialogue options to the recognizer, replacing any not yet sent.
    pub fn set_dialogue_options<I, S>(&self, options: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.shared
            .outbox
            .set_dialogue_options(options.into_iter().map(Into::into).collect());
    }

    /// Tell the companion the dialogue closed.
    pub fn request_close(&self) {
        self.shared.outbox.request_close();
    }

    /// Send pre-rendered favorites lines, replacing any not yet sent.
    pub fn set_favorites_lines(&self, lines: Vec<String>) {
        self.shared.outbox.set_favorites(lines);
    }

    pub fn set_favorites(&self, batch: &FavoritesBatch) {
        self.set_favorites_lines(batch.render());
    }

    pub fn set_listen(&self, enabled: bool) {
        self.shared.outbox.set_listen(enabled);
    }

    pub fn set_listen_shouts(&self, enabled: bool) {
        self.shared.outbox.set_listen_shouts(enabled);
    }

    /// Oldest unread message from the companion.
    pub fn next_response(&self) -> Option<InboundMessage> {
        self.shared.responses.pop()
    }

    /// Every unread message, oldest first.
    pub fn drain_responses(&self) -> Vec<InboundMessage> {
        self.shared.responses.drain()
    }

    /// Number of unread messages.
    pub fn pending_responses(&self) -> usize {
        self.shared.responses.len()
    }

    /// Latest connectivity change since the last call.
    pub fn take_connection_event(&self) -> Option<ConnectionEvent> {
        self.shared.events.take()
    }
}

impl<C: Connector> Drop for VoiceClient<C> {
    fn drop(&mut self) {
        self.stop();
    }
}

impl<C: Connector> std::fmt::Debug for VoiceClient<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceClient")
            .field("endpoint", &self.config.endpoint)
            .field("running", &self.is_running())
            .field("connected", &self.is_connected())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
