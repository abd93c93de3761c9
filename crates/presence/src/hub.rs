use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard};

use rand::distr::Alphanumeric;
use rand::Rng;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::path::DbPath;
use crate::tree::{remove_at, value_at, write_at};
use crate::PlayerId;

const ANONYMOUS_UID_LEN: usize = 28;

static HUB_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_hub_lock_poison_once() {
    if HUB_LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!("hub lock poisoned; recovered inner state");
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HubError {
    #[error("session must sign in before writing")]
    NotSignedIn,
    #[error("session {0} is closed")]
    SessionClosed(u64),
}

/// Full value at a subscribed path, pushed after every write touching it.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueSnapshot {
    pub path: DbPath,
    pub value: Value,
}

struct Subscription {
    path: DbPath,
    sink: Sender<ValueSnapshot>,
}

#[derive(Default)]
struct SessionState {
    uid: Option<PlayerId>,
    on_disconnect: Vec<DbPath>,
    subscriptions: Vec<Subscription>,
}

#[derive(Default)]
struct HubState {
    root: Value,
    sessions: HashMap<u64, SessionState>,
    next_session_id: u64,
}

impl HubState {
    fn session_mut(&mut self, id: u64) -> Result<&mut SessionState, HubError> {
        self.sessions.get_mut(&id).ok_or(HubError::SessionClosed(id))
    }

    fn signed_in_session_mut(&mut self, id: u64) -> Result<&mut SessionState, HubError> {
        let session = self.session_mut(id)?;
        if session.uid.is_none() {
            return Err(HubError::NotSignedIn);
        }
        Ok(session)
    }

    fn notify(&mut self, written: &DbPath) {
        let root = &self.root;
        for session in self.sessions.values_mut() {
            session.subscriptions.retain(|subscription| {
                if !written.overlaps(&subscription.path) {
                    return true;
                }
                let snapshot = ValueSnapshot {
                    path: subscription.path.clone(),
                    value: value_at(root, &subscription.path),
                };
                subscription.sink.send(snapshot).is_ok()
            });
        }
    }
}

/// In-memory realtime database shared by every session.
#[derive(Clone, Default)]
pub struct RealtimeHub {
    state: Arc<Mutex<HubState>>,
}

impl RealtimeHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_session(&self) -> HubSession {
        let mut state = self.lock_state();
        let id = state.next_session_id;
        state.next_session_id = state.next_session_id.wrapping_add(1);
        state.sessions.insert(id, SessionState::default());
        debug!(session = id, "hub_session_opened");
        HubSession {
            hub: self.clone(),
            id,
            closed: false,
        }
    }

    pub fn value(&self, path: &DbPath) -> Value {
        value_at(&self.lock_state().root, path)
    }

    pub fn session_count(&self) -> usize {
        self.lock_state().sessions.len()
    }

    fn lock_state(&self) -> MutexGuard<'_, HubState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn_hub_lock_poison_once();
                poisoned.into_inner()
            }
        }
    }

    fn close_session(&self, id: u64) {
        let mut state = self.lock_state();
        let Some(session) = state.sessions.remove(&id) else {
            return;
        };
        for path in &session.on_disconnect {
            remove_at(&mut state.root, path);
        }
        for path in &session.on_disconnect {
            state.notify(path);
        }
        info!(
            session = id,
            uid = session.uid.as_ref().map(PlayerId::as_str).unwrap_or("-"),
            removed_paths = session.on_disconnect.len(),
            "hub_session_closed"
        );
    }
}

/// One client's connection to the hub. Dropping it behaves like a disconnect.
pub struct HubSession {
    hub: RealtimeHub,
    id: u64,
    closed: bool,
}

impl HubSession {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn sign_in_anonymously(&self) -> Result<PlayerId, HubError> {
        let mut state = self.hub.lock_state();
        let session = state.session_mut(self.id)?;
        if let Some(uid) = &session.uid {
            return Ok(uid.clone());
        }
        let uid = PlayerId::new(generate_anonymous_uid());
        session.uid = Some(uid.clone());
        info!(session = self.id, uid = uid.as_str(), "hub_signed_in");
        Ok(uid)
    }

    pub fn set(&self, path: &DbPath, value: Value) -> Result<(), HubError> {
        let mut state = self.hub.lock_state();
        state.signed_in_session_mut(self.id)?;
        write_at(&mut state.root, path, value);
        state.notify(path);
        Ok(())
    }

    pub fn remove(&self, path: &DbPath) -> Result<(), HubError> {
        self.set(path, Value::Null)
    }

    pub fn on_disconnect_remove(&self, path: &DbPath) -> Result<(), HubError> {
        let mut state = self.hub.lock_state();
        let session = state.signed_in_session_mut(self.id)?;
        if !session.on_disconnect.contains(path) {
            session.on_disconnect.push(path.clone());
        }
        Ok(())
    }

    /// Delivers the current value immediately, then again after every overlapping write.
    pub fn subscribe(&self, path: &DbPath, sink: Sender<ValueSnapshot>) -> Result<(), HubError> {
        let mut state = self.hub.lock_state();
        let current = ValueSnapshot {
            path: path.clone(),
            value: value_at(&state.root, path),
        };
        let session = state.session_mut(self.id)?;
        if sink.send(current).is_err() {
            return Ok(());
        }
        session.subscriptions.push(Subscription {
            path: path.clone(),
            sink,
        });
        Ok(())
    }

    pub fn close(mut self) {
        self.close_inner();
    }

    fn close_inner(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.hub.close_session(self.id);
    }
}

impl Drop for HubSession {
    fn drop(&mut self) {
        self.close_inner();
    }
}

fn generate_anonymous_uid() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(ANONYMOUS_UID_LEN)
        .map(char::from)
        .collect()
}
