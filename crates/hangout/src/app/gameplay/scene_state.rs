type MapResult = Result<MapLayer, MapLoadError>;

#[derive(Debug)]
enum MapState {
    NotRequested,
    Loading(Receiver<MapResult>),
    Ready { shape: LayerShape, tiles: usize },
    Unavailable,
}

impl MapState {
    fn label(&self) -> String {
        match self {
            MapState::NotRequested => "idle".to_string(),
            MapState::Loading(_) => "loading".to_string(),
            MapState::Ready { shape, tiles } => format!("{tiles} tiles ({shape:?})"),
            MapState::Unavailable => "unavailable".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum PresenceState {
    Disabled,
    Connecting,
    Online {
        me: PlayerId,
        players: RemotePlayers,
    },
    Unavailable,
    Lost {
        me: PlayerId,
    },
}

impl PresenceState {
    fn label(&self) -> &'static str {
        match self {
            PresenceState::Disabled => "off",
            PresenceState::Connecting => "connecting",
            PresenceState::Online { .. } => "online",
            PresenceState::Unavailable => "unavailable",
            PresenceState::Lost { .. } => "lost",
        }
    }
}

struct HangoutScene {
    /// Relative to the asset directory unless absolute.
    map_path: PathBuf,
    map: MapState,
    presence_feed: Option<PresenceFeed>,
    presence: PresenceState,
}

impl HangoutScene {
    fn new(map_path: PathBuf, presence_feed: Option<PresenceFeed>) -> Self {
        let presence = if presence_feed.is_some() {
            PresenceState::Connecting
        } else {
            PresenceState::Disabled
        };
        Self {
            map_path,
            map: MapState::NotRequested,
            presence_feed,
            presence,
        }
    }

    fn resolved_map_path(&self) -> Option<PathBuf> {
        if self.map_path.is_absolute() {
            return Some(self.map_path.clone());
        }
        match resolve_app_paths() {
            Ok(paths) => Some(paths.asset_dir.join(&self.map_path)),
            Err(error) => {
                warn!(error = %error, "map_path_unresolved");
                None
            }
        }
    }

    fn request_map(&mut self) {
        let Some(path) = self.resolved_map_path() else {
            self.map = MapState::Unavailable;
            return;
        };
        info!(path = %path.display(), "map_load_requested");
        self.map = match spawn_map_loader(path, DEFAULT_TILE_SIZE_PX) {
            Ok(rx) => MapState::Loading(rx),
            Err(error) => {
                error!(error = %error, "map_loader_spawn_failed");
                MapState::Unavailable
            }
        };
    }

    fn poll_map(&mut self, world: &mut SceneWorld) {
        let MapState::Loading(rx) = &self.map else {
            return;
        };
        let outcome = match rx.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => {
                error!("map_loader_vanished");
                self.map = MapState::Unavailable;
                return;
            }
        };
        self.map = match outcome {
            Ok(map) => {
                let tiles = map.layer.len();
                info!(shape = ?map.shape, tiles, "map_layer_resolved");
                world.set_tile_layer(map.layer, TILESET_KEY);
                MapState::Ready {
                    shape: map.shape,
                    tiles,
                }
            }
            Err(error) => {
                error!(error = %error, "map_layer_unresolved");
                MapState::Unavailable
            }
        };
    }

    fn poll_presence(&mut self) {
        let Some(feed) = &self.presence_feed else {
            return;
        };
        let events: Vec<PresenceEvent> = feed.drain().collect();
        for event in events {
            self.apply_presence_event(event);
        }
    }

    fn apply_presence_event(&mut self, event: PresenceEvent) {
        match event {
            PresenceEvent::SignedIn(me) => {
                self.presence = PresenceState::Online {
                    me,
                    players: RemotePlayers::default(),
                };
            }
            PresenceEvent::Players(snapshot) => {
                if let PresenceState::Online { me, players } = &mut self.presence {
                    let others = snapshot.others_than(me).count();
                    if others != players.others_than(me).count() {
                        info!(others, "remote_players_changed");
                    }
                    *players = snapshot;
                }
            }
            PresenceEvent::Unavailable(reason) => {
                warn!(reason = reason.as_str(), "presence_unavailable");
                self.presence = PresenceState::Unavailable;
                self.presence_feed = None;
            }
            PresenceEvent::ConnectionLost => {
                let previous = std::mem::replace(&mut self.presence, PresenceState::Unavailable);
                self.presence = match previous {
                    PresenceState::Online { me, .. } | PresenceState::Lost { me } => {
                        PresenceState::Lost { me }
                    }
                    _ => PresenceState::Unavailable,
                };
                self.presence_feed = None;
            }
        }
    }

    /// Everyone in the collection except this client.
    fn remote_player_count(&self) -> usize {
        match &self.presence {
            PresenceState::Online { me, players } => players.others_than(me).count(),
            _ => 0,
        }
    }

    fn players_online(&self) -> Option<usize> {
        match &self.presence {
            PresenceState::Online { players, .. } => Some(players.len()),
            _ => None,
        }
    }
}
