use std::collections::BTreeMap;
use std::io;
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::backend::{BackendError, RealtimeBackend};
use crate::hub::ValueSnapshot;
use crate::path::DbPath;
use crate::PlayerId;

pub const PLAYERS_PATH: &str = "players";

#[derive(Debug, Clone)]
pub struct PresenceConfig {
    pub players_path: String,
    pub queue_capacity: usize,
    pub entry_value: Value,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            players_path: PLAYERS_PATH.to_string(),
            queue_capacity: 16,
            entry_value: json!({ "online": true }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PresenceEvent {
    SignedIn(PlayerId),
    Players(RemotePlayers),
    /// Sign-in or registration failed; presence will never start.
    Unavailable(String),
    ConnectionLost,
}

/// Latest full view of the players collection. Values are kept but never interpreted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemotePlayers {
    entries: BTreeMap<PlayerId, Value>,
}

impl RemotePlayers {
    pub fn from_value(value: Value) -> Self {
        let Value::Object(map) = value else {
            return Self::default();
        };
        Self {
            entries: map
                .into_iter()
                .map(|(uid, entry)| (PlayerId::new(uid), entry))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &PlayerId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn others_than<'a>(&'a self, me: &'a PlayerId) -> impl Iterator<Item = &'a PlayerId> {
        self.entries.keys().filter(move |id| *id != me)
    }
}

/// Receiving end of the presence worker. Drained by the frame loop.
pub struct PresenceFeed {
    events: Receiver<PresenceEvent>,
}

impl PresenceFeed {
    pub fn drain(&self) -> impl Iterator<Item = PresenceEvent> + '_ {
        self.events.try_iter()
    }
}

pub fn spawn_presence<B>(backend: B, config: PresenceConfig) -> io::Result<PresenceFeed>
where
    B: RealtimeBackend + 'static,
{
    let (tx, rx) = mpsc::sync_channel(config.queue_capacity.max(1));
    thread::Builder::new()
        .name("presence".to_string())
        .spawn(move || run_presence(backend, &config, &tx))?;
    Ok(PresenceFeed { events: rx })
}

fn run_presence<B: RealtimeBackend>(
    mut backend: B,
    config: &PresenceConfig,
    events: &SyncSender<PresenceEvent>,
) {
    let uid = match backend.sign_in_anonymously() {
        Ok(uid) => uid,
        Err(error) => {
            warn!(error = %error, "presence_sign_in_failed");
            let _ = events.send(PresenceEvent::Unavailable(error.to_string()));
            return;
        }
    };
    info!(uid = uid.as_str(), "presence_signed_in");
    if events.send(PresenceEvent::SignedIn(uid.clone())).is_err() {
        return;
    }

    let updates = match register_presence(&mut backend, &uid, config) {
        Ok(updates) => updates,
        Err(error) => {
            warn!(uid = uid.as_str(), error = %error, "presence_register_failed");
            let _ = events.send(PresenceEvent::Unavailable(error.to_string()));
            return;
        }
    };

    for snapshot in updates {
        let players = RemotePlayers::from_value(snapshot.value);
        debug!(player_count = players.len(), "presence_snapshot");
        if events.send(PresenceEvent::Players(players)).is_err() {
            return;
        }
    }

    warn!(uid = uid.as_str(), "presence_connection_lost");
    let _ = events.send(PresenceEvent::ConnectionLost);
}

fn register_presence<B: RealtimeBackend>(
    backend: &mut B,
    uid: &PlayerId,
    config: &PresenceConfig,
) -> Result<Receiver<ValueSnapshot>, BackendError> {
    let players = DbPath::parse(&config.players_path)?;
    let entry = players.child(uid.as_str())?;
    backend.on_disconnect_remove(&entry)?;
    backend.set(&entry, config.entry_value.clone())?;
    backend.subscribe(&players)
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::backend::LocalBackend;
    use crate::hub::RealtimeHub;

    const WAIT: Duration = Duration::from_secs(5);

    fn next_event(feed: &PresenceFeed) -> PresenceEvent {
        feed.events.recv_timeout(WAIT).expect("presence event")
    }

    fn wait_for_players(feed: &PresenceFeed, count: usize) -> RemotePlayers {
        let deadline = Instant::now() + WAIT;
        while Instant::now() < deadline {
            if let PresenceEvent::Players(players) = next_event(feed) {
                if players.len() == count {
                    return players;
                }
            }
        }
        panic!("never saw {count} players");
    }

    struct FailingBackend;

    impl RealtimeBackend for FailingBackend {
        fn sign_in_anonymously(&mut self) -> Result<PlayerId, BackendError> {
            Err(BackendError::Closed)
        }

        fn set(&mut self, _path: &DbPath, _value: Value) -> Result<(), BackendError> {
            Err(BackendError::Closed)
        }

        fn on_disconnect_remove(&mut self, _path: &DbPath) -> Result<(), BackendError> {
            Err(BackendError::Closed)
        }

        fn subscribe(&mut self, _path: &DbPath) -> Result<Receiver<ValueSnapshot>, BackendError> {
            Err(BackendError::Closed)
        }
    }

    #[test]
    fn registers_own_entry_and_mirrors_collection() {
        let hub = RealtimeHub::new();
        let feed =
            spawn_presence(LocalBackend::new(&hub), PresenceConfig::default()).expect("spawn");

        let PresenceEvent::SignedIn(me) = next_event(&feed) else {
            panic!("expected sign-in first");
        };
        let players = wait_for_players(&feed, 1);
        assert!(players.contains(&me));
        assert_eq!(players.others_than(&me).count(), 0);
    }

    #[test]
    fn second_player_joining_and_leaving_replaces_snapshot() {
        let hub = RealtimeHub::new();
        let feed =
            spawn_presence(LocalBackend::new(&hub), PresenceConfig::default()).expect("spawn");
        let PresenceEvent::SignedIn(me) = next_event(&feed) else {
            panic!("expected sign-in first");
        };
        wait_for_players(&feed, 1);

        let mut other = LocalBackend::new(&hub);
        let other_id = other.sign_in_anonymously().expect("uid");
        let entry = DbPath::parse(PLAYERS_PATH)
            .and_then(|players| players.child(other_id.as_str()))
            .expect("path");
        other.on_disconnect_remove(&entry).expect("on disconnect");
        other.set(&entry, json!({"online": true})).expect("set");

        let both = wait_for_players(&feed, 2);
        assert_eq!(both.others_than(&me).collect::<Vec<_>>(), vec![&other_id]);

        drop(other);
        let alone = wait_for_players(&feed, 1);
        assert!(!alone.contains(&other_id));
    }

    #[test]
    fn sign_in_failure_reports_unavailable_and_stops() {
        let feed = spawn_presence(FailingBackend, PresenceConfig::default()).expect("spawn");
        assert!(matches!(next_event(&feed), PresenceEvent::Unavailable(_)));
        assert!(feed.events.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn non_object_values_become_empty_snapshot() {
        assert!(RemotePlayers::from_value(Value::Null).is_empty());
        assert!(RemotePlayers::from_value(json!([1, 2])).is_empty());
        let players = RemotePlayers::from_value(json!({"a": 1, "b": {"x": 2}}));
        assert_eq!(players.len(), 2);
        assert!(players.contains(&PlayerId::new("a")));
    }
}
