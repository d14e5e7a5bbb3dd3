//! Bridge engine
//!
//! `Bridge` is the application-facing handle. It owns:
//! - the connection state machine (`ConnectionState`), the only authority on
//!   whether a frame may be sent
//! - the registry of subscriptions and advertisements
//! - a supervisor task that dials, drives the connection through the
//!   transport, and dials again when the connection drops while connectivity
//!   is still wanted
//!
//! Concurrency and usage notes:
//! - State and registry live behind one mutex. It is never held across an
//!   await point or while a subscriber callback runs.
//! - Every public operation is synchronous and non-blocking, so it can be
//!   called from any thread, inside or outside the runtime. Frames are handed
//!   to the transport's outbound channel and written by the supervisor task.
//! - Outbound calls made while not Connected still update the registry and
//!   return `NotConnected`. Each time a connection opens, every registered
//!   subscription and advertisement is re-declared to the broker.
//! - All events go to the `Dispatch` the bridge was built with, never to
//!   whatever global subscriber happens to be installed later.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::{Notify, watch};
use tracing::instrument::WithSubscriber;
use tracing::{Dispatch, debug, error, info, warn};

use crate::bridge::message::{ClientMessage, PublishBody, ServerMessage};
use crate::bridge::state::{ConnectionState, Event};
use crate::config::{BridgeSettings, Settings};
use crate::registry::Registry;
use crate::transport::{TransportHandler, WsTransport};
use crate::utils::error::{BridgeError, Result};
use crate::utils::logging;

struct Inner {
    state: ConnectionState,
    /// Whether connectivity is wanted. Cleared by `disconnect`.
    running: bool,
    supervisor_alive: bool,
    registry: Registry,
}

struct BridgeCore {
    url: String,
    reconnect_delay: Duration,
    transport: WsTransport,
    inner: Mutex<Inner>,
    wake: Notify,
    state_tx: watch::Sender<ConnectionState>,
    dispatch: Dispatch,
    runtime: Handle,
}

/// Client handle for a rosbridge broker. Cloning yields another handle to
/// the same connection.
///
/// Dropping the last handle disconnects, as if `disconnect` had been called.
#[derive(Clone)]
pub struct Bridge {
    core: Arc<BridgeCore>,
    _owner: Arc<Owner>,
}

/// Shared by every `Bridge` handle but never by the supervisor task, so its
/// drop marks the point where no caller can reach the connection any more.
struct Owner(Arc<BridgeCore>);

impl Drop for Owner {
    fn drop(&mut self) {
        let core = &self.0;
        tracing::dispatcher::with_default(&core.dispatch, || {
            debug!(url = %core.url, "Last bridge handle dropped");
            core.disconnect();
        });
    }
}

impl Bridge {
    /// Build a bridge that logs to the dispatcher current at construction.
    ///
    /// Must be called from within a tokio runtime; the runtime is captured and
    /// used to drive the connection.
    pub fn new(settings: &BridgeSettings) -> Result<Self> {
        let dispatch = tracing::dispatcher::get_default(|current| current.clone());
        Self::with_dispatch(settings, dispatch)
    }

    /// Build a bridge from full settings, with a logging sink built from
    /// `settings.logging`.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::with_dispatch(&settings.bridge, logging::dispatch(&settings.logging))
    }

    pub fn with_dispatch(settings: &BridgeSettings, dispatch: Dispatch) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| BridgeError::NoRuntime)?;
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);

        let core = Arc::new(BridgeCore {
            url: settings.url(),
            reconnect_delay: settings.reconnect_delay(),
            transport: WsTransport::new(settings.connect_timeout(), settings.close_timeout()),
            inner: Mutex::new(Inner {
                state: ConnectionState::Disconnected,
                running: false,
                supervisor_alive: false,
                registry: Registry::new(),
            }),
            wake: Notify::new(),
            state_tx,
            dispatch,
            runtime,
        });
        Ok(Self {
            _owner: Arc::new(Owner(core.clone())),
            core,
        })
    }

    pub fn url(&self) -> &str {
        &self.core.url
    }

    pub fn state(&self) -> ConnectionState {
        self.core.lock().state
    }

    /// Receiver that observes every state transition.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.core.state_tx.subscribe()
    }

    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.core.lock().registry.find_subscription(topic).is_some()
    }

    pub fn is_advertised(&self, topic: &str) -> bool {
        self.core.lock().registry.find_advertisement(topic).is_some()
    }

    pub fn subscribed_topics(&self) -> Vec<String> {
        self.core.lock().registry.topics()
    }

    fn in_scope<R>(&self, f: impl FnOnce() -> R) -> R {
        tracing::dispatcher::with_default(&self.core.dispatch, f)
    }

    /// Ask for connectivity. Idempotent while a connection is requested,
    /// being dialed or open.
    pub fn connect(&self) -> Result<()> {
        self.in_scope(|| {
            let core = &self.core;
            let mut inner = core.lock();
            let rearmed = !inner.running;
            inner.running = true;

            let before = inner.state;
            let after = core.apply(&mut inner, Event::ConnectRequested);
            if before == after && !rearmed {
                debug!(state = %before, "Connect request ignored");
                return Ok(());
            }
            info!(url = %core.url, "Connect request received");

            if inner.supervisor_alive {
                core.wake.notify_one();
            } else {
                inner.supervisor_alive = true;
                let dispatch = core.dispatch.clone();
                core.runtime
                    .spawn(BridgeCore::supervise(core.clone()).with_subscriber(dispatch));
            }
            Ok(())
        })
    }

    /// Close the connection and stop reconnecting. No-op when already
    /// disconnected. A dial still in progress is abandoned.
    pub fn disconnect(&self) {
        self.in_scope(|| self.core.disconnect())
    }

    /// Register `callback` for `topic` and ask the broker to forward it.
    ///
    /// Subscribing again to the same topic replaces the previous callback.
    pub fn subscribe<F>(&self, topic: &str, message_type: &str, callback: F) -> Result<()>
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        self.in_scope(|| {
            let mut inner = self.core.lock();
            if inner
                .registry
                .add_subscription(topic, message_type, Arc::new(callback))
            {
                debug!(topic, "Replaced existing subscription");
            }
            self.core.send_message(
                &inner,
                &ClientMessage::Subscribe {
                    topic: topic.to_string(),
                    message_type: message_type.to_string(),
                },
            )
        })
    }

    pub fn unsubscribe(&self, topic: &str) -> Result<()> {
        self.in_scope(|| {
            let mut inner = self.core.lock();
            if inner.registry.remove_subscription(topic).is_none() {
                debug!(topic, "Unsubscribing from a topic that was not subscribed");
            }
            self.core.send_message(
                &inner,
                &ClientMessage::Unsubscribe {
                    topic: topic.to_string(),
                },
            )
        })
    }

    /// Declare this client a publisher on `topic`.
    pub fn advertise(&self, topic: &str, message_type: &str) -> Result<()> {
        self.in_scope(|| {
            let mut inner = self.core.lock();
            inner.registry.add_advertisement(topic, message_type);
            self.core.send_message(
                &inner,
                &ClientMessage::Advertise {
                    topic: topic.to_string(),
                    message_type: message_type.to_string(),
                },
            )
        })
    }

    pub fn unadvertise(&self, topic: &str) -> Result<()> {
        self.in_scope(|| {
            let mut inner = self.core.lock();
            inner.registry.remove_advertisement(topic);
            self.core.send_message(
                &inner,
                &ClientMessage::Unadvertise {
                    topic: topic.to_string(),
                },
            )
        })
    }

    /// Publish `data` as `{"data": data}` on `topic`. The topic does not have
    /// to be advertised first.
    pub fn publish<T: Serialize>(&self, topic: &str, data: T) -> Result<()> {
        self.in_scope(|| {
            let data = serde_json::to_value(data)?;
            let inner = self.core.lock();
            self.core.send_message(
                &inner,
                &ClientMessage::Publish {
                    topic: topic.to_string(),
                    msg: PublishBody { data },
                },
            )
        })
    }

    #[cfg(test)]
    pub(crate) fn handler(&self) -> &dyn TransportHandler {
        self.core.as_ref()
    }
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("url", &self.core.url)
            .field("state", &self.state())
            .finish()
    }
}

impl BridgeCore {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply(&self, inner: &mut Inner, event: Event) -> ConnectionState {
        let next = inner.state.on(event);
        if next != inner.state {
            debug!(from = %inner.state, to = %next, ?event, "State transition");
            inner.state = next;
            self.state_tx.send_replace(next);
        }
        next
    }

    fn disconnect(&self) {
        let mut inner = self.lock();
        inner.running = false;

        let before = inner.state;
        if before == ConnectionState::Disconnected {
            debug!("Disconnect request ignored, already disconnected");
            self.wake.notify_one();
            return;
        }
        info!(url = %self.url, "Disconnect request received");

        if self.apply(&mut inner, Event::DisconnectRequested) == ConnectionState::Closing {
            self.transport.close();
        }
        self.wake.notify_one();
    }

    fn send_message(&self, inner: &Inner, msg: &ClientMessage) -> Result<()> {
        if !inner.state.is_connected() {
            warn!(op = msg.op(), topic = msg.topic(), state = %inner.state, "Not connected, frame dropped");
            return Err(BridgeError::NotConnected);
        }
        let text = serde_json::to_string(msg)?;
        debug!(op = msg.op(), topic = msg.topic(), "Sending frame");
        self.transport.send(text)
    }

    /// Dial whenever a connection is requested, until connectivity is no
    /// longer wanted.
    async fn supervise(core: Arc<BridgeCore>) {
        info!("Supervisor started, waiting for connect request");

        loop {
            loop {
                let notified = core.wake.notified();
                {
                    let mut inner = core.lock();
                    if !inner.running {
                        inner.supervisor_alive = false;
                        info!("Supervisor stopped");
                        return;
                    }
                    if inner.state == ConnectionState::ConnectRequested {
                        core.apply(&mut inner, Event::DialStarted);
                        core.transport.arm();
                        break;
                    }
                }
                notified.await;
            }

            info!(url = %core.url, "Attempting to (re)connect");
            core.transport.run(&core.url, core.as_ref()).await;

            if !core.reconnect_delay.is_zero() {
                let notified = core.wake.notified();
                let rearmed = {
                    let inner = core.lock();
                    inner.running && inner.state == ConnectionState::ConnectRequested
                };
                if rearmed {
                    debug!(delay = ?core.reconnect_delay, "Waiting before reconnect");
                    tokio::select! {
                        _ = tokio::time::sleep(core.reconnect_delay) => {}
                        _ = notified => {}
                    }
                }
            }
        }
    }

    fn replay(&self, inner: &Inner) {
        let mut frames: Vec<ClientMessage> = inner
            .registry
            .subscriptions()
            .map(|s| ClientMessage::Subscribe {
                topic: s.topic.clone(),
                message_type: s.message_type.clone(),
            })
            .collect();
        frames.sort_by(|a, b| a.topic().cmp(b.topic()));

        let mut advertisements: Vec<ClientMessage> = inner
            .registry
            .advertisements()
            .map(|a| ClientMessage::Advertise {
                topic: a.topic.clone(),
                message_type: a.message_type.clone(),
            })
            .collect();
        advertisements.sort_by(|a, b| a.topic().cmp(b.topic()));
        frames.extend(advertisements);

        if !frames.is_empty() {
            info!(count = frames.len(), "Re-declaring subscriptions and advertisements");
        }
        for frame in &frames {
            if let Err(e) = self.send_message(inner, frame) {
                warn!(op = frame.op(), topic = frame.topic(), "Replay failed: {e}");
            }
        }
    }
}

impl TransportHandler for BridgeCore {
    fn on_open(&self) {
        let mut inner = self.lock();
        if self.apply(&mut inner, Event::Opened) != ConnectionState::Connected {
            // disconnect() arrived while dialing
            info!(state = %inner.state, "Connection opened while not wanted, closing");
            self.transport.close();
            return;
        }
        info!(url = %self.url, "Client connection to the server is open");
        self.replay(&inner);
    }

    fn on_message(&self, frame: &[u8]) {
        match ServerMessage::decode(frame) {
            Ok(ServerMessage::Publish { topic, msg }) => {
                let callback = self.lock().registry.find_subscription(&topic);
                match callback {
                    Some(callback) => {
                        if catch_unwind(AssertUnwindSafe(|| callback(msg))).is_err() {
                            error!(topic = %topic, "Subscriber callback panicked");
                        }
                    }
                    None => debug!(topic = %topic, "Discarding message for unsubscribed topic"),
                }
            }
            Err(e) => {
                let preview = String::from_utf8_lossy(&frame[..frame.len().min(100)]);
                warn!("Discarding inbound frame: {e} | {preview}");
            }
        }
    }

    fn on_error(&self, error: &BridgeError) {
        error!(url = %self.url, "Transport error: {error}");
    }

    fn on_close(&self) {
        let mut inner = self.lock();
        let reconnect = inner.running;
        let state = self.apply(&mut inner, Event::Closed { reconnect });
        info!(state = %state, "Client connection to the server is closed");
    }
}
