use std::io;
use std::sync::mpsc::{self, Receiver};

use serde_json::Value;
use thiserror::Error;

use crate::hub::{HubError, HubSession, RealtimeHub, ValueSnapshot};
use crate::path::{DbPath, PathError};
use crate::wire::WireError;
use crate::PlayerId;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error(transparent)]
    Hub(#[from] HubError),
    #[error(transparent)]
    Path(#[from] PathError),
    #[error(transparent)]
    Wire(#[from] WireError),
    #[error("backend i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("backend rejected request: {message}")]
    Rejected { message: String },
    #[error("unexpected reply to {request}: {reply}")]
    UnexpectedReply {
        request: &'static str,
        reply: String,
    },
    #[error("backend connection closed")]
    Closed,
}

/// Calls a realtime database client must support for presence.
pub trait RealtimeBackend: Send {
    fn sign_in_anonymously(&mut self) -> Result<PlayerId, BackendError>;
    fn set(&mut self, path: &DbPath, value: Value) -> Result<(), BackendError>;
    fn on_disconnect_remove(&mut self, path: &DbPath) -> Result<(), BackendError>;
    fn subscribe(&mut self, path: &DbPath) -> Result<Receiver<ValueSnapshot>, BackendError>;
}

/// Backend living in the same process as the hub.
pub struct LocalBackend {
    session: HubSession,
}

impl LocalBackend {
    pub fn new(hub: &RealtimeHub) -> Self {
        Self {
            session: hub.open_session(),
        }
    }
}

impl RealtimeBackend for LocalBackend {
    fn sign_in_anonymously(&mut self) -> Result<PlayerId, BackendError> {
        Ok(self.session.sign_in_anonymously()?)
    }

    fn set(&mut self, path: &DbPath, value: Value) -> Result<(), BackendError> {
        Ok(self.session.set(path, value)?)
    }

    fn on_disconnect_remove(&mut self, path: &DbPath) -> Result<(), BackendError> {
        Ok(self.session.on_disconnect_remove(path)?)
    }

    fn subscribe(&mut self, path: &DbPath) -> Result<Receiver<ValueSnapshot>, BackendError> {
        let (tx, rx) = mpsc::channel();
        self.session.subscribe(path, tx)?;
        Ok(rx)
    }
}

impl<B: RealtimeBackend + ?Sized> RealtimeBackend for Box<B> {
    fn sign_in_anonymously(&mut self) -> Result<PlayerId, BackendError> {
        (**self).sign_in_anonymously()
    }

    fn set(&mut self, path: &DbPath, value: Value) -> Result<(), BackendError> {
        (**self).set(path, value)
    }

    fn on_disconnect_remove(&mut self, path: &DbPath) -> Result<(), BackendError> {
        (**self).on_disconnect_remove(path)
    }

    fn subscribe(&mut self, path: &DbPath) -> Result<Receiver<ValueSnapshot>, BackendError> {
        (**self).subscribe(path)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn local_backend_round_trips_through_hub() {
        let hub = RealtimeHub::new();
        let mut backend = LocalBackend::new(&hub);
        let uid = backend.sign_in_anonymously().expect("uid");
        let entry = DbPath::parse("players")
            .and_then(|players| players.child(uid.as_str()))
            .expect("path");

        let updates = backend
            .subscribe(&DbPath::parse("players").expect("path"))
            .expect("subscribe");
        backend.set(&entry, json!({"online": true})).expect("set");

        assert_eq!(updates.recv().expect("initial").value, Value::Null);
        assert_eq!(
            updates.recv().expect("update").value,
            json!({ uid.as_str(): {"online": true} })
        );
    }

    #[test]
    fn dropping_local_backend_disconnects() {
        let hub = RealtimeHub::new();
        let mut backend = LocalBackend::new(&hub);
        let uid = backend.sign_in_anonymously().expect("uid");
        let entry = DbPath::root()
            .child("players")
            .and_then(|players| players.child(uid.as_str()))
            .expect("path");
        backend.on_disconnect_remove(&entry).expect("on disconnect");
        backend.set(&entry, json!(true)).expect("set");

        drop(backend);
        assert_eq!(hub.value(&entry), Value::Null);
    }
}
