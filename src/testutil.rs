//! In-process rosbridge stand-in for lifecycle tests.
//!
//! `MockBroker` accepts websocket connections on an ephemeral port, reports
//! every connection and text frame as a `ServerEvent`, and lets a test push
//! frames to a connection or drop it without a close handshake.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tungstenite::protocol::Message as WsMessage;

pub const WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    Connected(usize),
    Frame(usize, String),
    Disconnected(usize),
}

enum ServerCommand {
    Send(String),
    Drop,
}

pub struct MockBroker {
    pub addr: SocketAddr,
    events: mpsc::UnboundedReceiver<ServerEvent>,
    conns: Arc<Mutex<Vec<mpsc::UnboundedSender<ServerCommand>>>>,
}

impl MockBroker {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let (event_tx, events) = mpsc::unbounded_channel();
        let conns = Arc::new(Mutex::new(Vec::new()));

        let accept_conns = conns.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let Ok(ws) = accept_async(stream).await else {
                    continue;
                };
                let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel();
                let id = {
                    let mut conns = accept_conns.lock().unwrap();
                    conns.push(cmd_tx);
                    conns.len() - 1
                };
                let events = event_tx.clone();
                let _ = events.send(ServerEvent::Connected(id));

                tokio::spawn(async move {
                    let (mut sink, mut stream) = ws.split();
                    loop {
                        tokio::select! {
                            cmd = cmd_rx.recv() => match cmd {
                                Some(ServerCommand::Send(text)) => {
                                    if sink.send(WsMessage::text(text)).await.is_err() {
                                        break;
                                    }
                                }
                                Some(ServerCommand::Drop) | None => break,
                            },
                            msg = stream.next() => match msg {
                                Some(Ok(WsMessage::Text(text))) => {
                                    let _ = events.send(ServerEvent::Frame(id, text.to_string()));
                                }
                                Some(Ok(_)) => {}
                                Some(Err(_)) | None => break,
                            }
                        }
                    }
                    let _ = events.send(ServerEvent::Disconnected(id));
                });
            }
        });

        Self {
            addr,
            events,
            conns,
        }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub async fn next_event(&mut self) -> ServerEvent {
        tokio::time::timeout(WAIT, self.events.recv())
            .await
            .expect("timed out waiting for server event")
            .expect("server event channel closed")
    }

    /// Next inbound frame on any connection, parsed as JSON.
    pub async fn next_frame(&mut self) -> Value {
        loop {
            if let ServerEvent::Frame(_, text) = self.next_event().await {
                return serde_json::from_str(&text).expect("client sent invalid JSON");
            }
        }
    }

    pub async fn expect_connected(&mut self) -> usize {
        loop {
            if let ServerEvent::Connected(id) = self.next_event().await {
                return id;
            }
        }
    }

    pub async fn expect_disconnected(&mut self) -> usize {
        loop {
            if let ServerEvent::Disconnected(id) = self.next_event().await {
                return id;
            }
        }
    }

    /// Assert that nothing at all happens on the server for `quiet`.
    pub async fn expect_silence(&mut self, quiet: Duration) {
        if let Ok(Some(event)) = tokio::time::timeout(quiet, self.events.recv()).await {
            panic!("expected no server activity, got {event:?}");
        }
    }

    /// Every server event until nothing happens for `quiet`.
    pub async fn drain_events(&mut self, quiet: Duration) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(Some(event)) = tokio::time::timeout(quiet, self.events.recv()).await {
            events.push(event);
        }
        events
    }

    pub fn send_to(&self, id: usize, text: impl Into<String>) {
        let conns = self.conns.lock().unwrap();
        conns[id]
            .send(ServerCommand::Send(text.into()))
            .expect("connection task gone");
    }

    /// Drop the connection without a close handshake, like a remote reset.
    pub fn drop_connection(&self, id: usize) {
        let conns = self.conns.lock().unwrap();
        let _ = conns[id].send(ServerCommand::Drop);
    }

    pub fn connection_count(&self) -> usize {
        self.conns.lock().unwrap().len()
    }
}

/// A loopback port with nothing listening on it.
pub async fn refused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    listener.local_addr().expect("local addr").port()
}
