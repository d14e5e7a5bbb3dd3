//! WebSocket transport
//!
//! `WsTransport` owns at most one websocket connection at a time. It knows
//! nothing about the JSON protocol: it dials, pumps frames in both directions
//! and reports lifecycle events through a `TransportHandler`.
//!
//! `run` drives a single connection from dial to close and only returns once
//! that connection is gone. Each attempt reports exactly one `on_close`,
//! whether the dial failed, the peer hung up or `close` was called locally.
//! `close` during the dial abandons it; `run` then returns without opening.
//!
//! Outbound frames go through an unbounded channel, so `send` and `close`
//! never block the caller. The channel has no capacity limit: a broker that
//! stops reading while the application keeps publishing makes it grow until
//! the connection drops or is closed.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{Notify, mpsc};
use tokio_tungstenite::connect_async;
use tracing::{debug, info};
use tungstenite::protocol::Message as WsMessage;

use crate::utils::error::{BridgeError, Result};

/// Hooks invoked by the transport as the connection progresses.
pub trait TransportHandler: Send + Sync {
    /// The websocket handshake completed; `send` is now accepted.
    fn on_open(&self);
    /// One inbound text or binary frame.
    fn on_message(&self, frame: &[u8]);
    /// A dial or I/O failure. Always followed by `on_close`.
    fn on_error(&self, error: &BridgeError);
    /// The connection attempt is over.
    fn on_close(&self);
}

#[derive(Debug)]
enum Link {
    Idle,
    Dialing,
    /// `close` arrived before the dial finished.
    Abandoned,
    Open(mpsc::UnboundedSender<WsMessage>),
}

#[derive(Debug)]
pub struct WsTransport {
    link: Mutex<Link>,
    /// Wakes a `run` that is still dialing.
    cancel_dial: Notify,
    connect_timeout: Duration,
    close_timeout: Duration,
}

impl WsTransport {
    pub fn new(connect_timeout: Duration, close_timeout: Duration) -> Self {
        Self {
            link: Mutex::new(Link::Idle),
            cancel_dial: Notify::new(),
            connect_timeout,
            close_timeout,
        }
    }

    fn link(&self) -> MutexGuard<'_, Link> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a text frame on the active connection.
    pub fn send(&self, text: String) -> Result<()> {
        match &*self.link() {
            Link::Open(tx) => tx
                .send(WsMessage::text(text))
                .map_err(|_| BridgeError::NotConnected),
            _ => Err(BridgeError::NotConnected),
        }
    }

    /// Mark a dial as pending ahead of `run`, so that a `close` issued before
    /// `run` gets going still abandons it.
    pub fn arm(&self) {
        *self.link() = Link::Dialing;
    }

    /// Start a graceful close of the active connection, or abandon a dial in
    /// progress. Returns `false` when there is nothing to close.
    pub fn close(&self) -> bool {
        let mut link = self.link();
        match &*link {
            Link::Open(tx) => return tx.send(WsMessage::Close(None)).is_ok(),
            Link::Idle => return false,
            Link::Dialing | Link::Abandoned => {}
        }
        *link = Link::Abandoned;
        self.cancel_dial.notify_waiters();
        true
    }

    pub fn is_open(&self) -> bool {
        matches!(*self.link(), Link::Open(_))
    }

    /// Dial `url` and drive the connection until it terminates.
    pub async fn run(&self, url: &str, handler: &dyn TransportHandler) {
        debug!("Dialing {url}");

        // Enabled before the link is checked: a `close` either left Abandoned
        // behind already or its notification reaches this waiter.
        let cancelled = self.cancel_dial.notified();
        tokio::pin!(cancelled);
        cancelled.as_mut().enable();
        let abandoned = {
            let mut link = self.link();
            let abandoned = matches!(*link, Link::Abandoned);
            if !abandoned {
                *link = Link::Dialing;
            }
            abandoned
        };
        if abandoned {
            self.abandon(url, handler);
            return;
        }

        let dial = tokio::time::timeout(self.connect_timeout, connect_async(url));
        let ws_stream = tokio::select! {
            result = dial => match result {
                Ok(Ok((ws, _response))) => ws,
                Ok(Err(e)) => {
                    *self.link() = Link::Idle;
                    handler.on_error(&BridgeError::Transport(e));
                    handler.on_close();
                    return;
                }
                Err(_) => {
                    *self.link() = Link::Idle;
                    handler.on_error(&BridgeError::ConnectTimeout(self.connect_timeout));
                    handler.on_close();
                    return;
                }
            },
            _ = &mut cancelled => {
                self.abandon(url, handler);
                return;
            }
        };

        let (mut ws_sender, mut ws_receiver) = ws_stream.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();

        // Register the sender before announcing the open so frames sent from
        // inside `on_open` are accepted.
        *self.link() = Link::Open(tx);
        handler.on_open();

        let mut closing = false;
        loop {
            tokio::select! {
                outgoing = rx.recv() => {
                    let Some(msg) = outgoing else { break };
                    closing = msg.is_close();
                    if let Err(e) = ws_sender.send(msg).await {
                        handler.on_error(&BridgeError::Transport(e));
                        break;
                    }
                    if closing {
                        break;
                    }
                }
                incoming = ws_receiver.next() => match incoming {
                    Some(Ok(WsMessage::Text(text))) => handler.on_message(text.as_bytes()),
                    Some(Ok(WsMessage::Binary(data))) => handler.on_message(&data),
                    Some(Ok(WsMessage::Close(frame))) => {
                        debug!("Peer sent close frame: {frame:?}");
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        handler.on_error(&BridgeError::Transport(e));
                        break;
                    }
                    None => break,
                }
            }
        }

        *self.link() = Link::Idle;

        if closing {
            // Wait for the peer to answer the close handshake, but not forever.
            let drain = async { while let Some(Ok(_)) = ws_receiver.next().await {} };
            if tokio::time::timeout(self.close_timeout, drain).await.is_err() {
                debug!("Peer did not complete close handshake within {:?}", self.close_timeout);
            }
        }

        info!("Connection to {url} closed");
        handler.on_close();
    }

    fn abandon(&self, url: &str, handler: &dyn TransportHandler) {
        *self.link() = Link::Idle;
        info!("Dial to {url} abandoned");
        handler.on_close();
    }
}
