//! Connection lifecycle
//!
//! `ConnectionState` is the single source of truth for whether frames may be
//! sent. Every change goes through `ConnectionState::on`, which maps the
//! current state and an `Event` to the next state; pairs that have no entry
//! in the lifecycle leave the state unchanged.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    ConnectRequested,
    Connecting,
    Connected,
    Closing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// The application asked for connectivity.
    ConnectRequested,
    /// The supervisor started dialing.
    DialStarted,
    /// The websocket handshake completed.
    Opened,
    /// The connection attempt ended; `reconnect` is whether connectivity is still wanted.
    Closed { reconnect: bool },
    /// The application asked to disconnect.
    DisconnectRequested,
}

impl ConnectionState {
    pub fn on(self, event: Event) -> ConnectionState {
        use ConnectionState::*;

        match (self, event) {
            (Disconnected, Event::ConnectRequested) => ConnectRequested,
            (ConnectRequested, Event::DialStarted) => Connecting,
            (Connecting, Event::Opened) => Connected,
            (Connecting | Connected | Closing, Event::Closed { reconnect: true }) => {
                ConnectRequested
            }
            (Connecting | Connected | Closing, Event::Closed { reconnect: false }) => {
                Disconnected
            }
            (Connecting | Connected, Event::DisconnectRequested) => Closing,
            // Nothing has been dialed yet, so there is nothing to close.
            (ConnectRequested, Event::DisconnectRequested) => Disconnected,
            (state, _) => state,
        }
    }

    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::ConnectRequested => "connect-requested",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Closing => "closing",
        };
        f.write_str(name)
    }
}
