//! Realtime presence: a tiny keyed value database with anonymous sign-in, disconnect-triggered
//! removal and whole-collection subscriptions, plus the connector the game runs on top of it.

mod backend;
mod client;
mod connector;
mod hub;
mod path;
mod server;
mod tree;
mod wire;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use backend::{BackendError, LocalBackend, RealtimeBackend};
pub use client::TcpBackend;
pub use connector::{
    spawn_presence, PresenceConfig, PresenceEvent, PresenceFeed, RemotePlayers, PLAYERS_PATH,
};
pub use hub::{HubError, HubSession, RealtimeHub, ValueSnapshot};
pub use path::{DbPath, PathError};
pub use server::{serve, DEFAULT_BIND_ADDR};
pub use wire::{decode_line, encode_line, ClientFrame, ServerFrame, WireError};

/// Opaque identity handed out by anonymous sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
