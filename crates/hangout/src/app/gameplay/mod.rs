use std::path::PathBuf;
use std::sync::mpsc::{Receiver, TryRecvError};

use engine::{
    resolve_app_paths, AnimationSet, Character, InputSnapshot, Scene, SceneWorld, Vec2,
    DEFAULT_TILE_SIZE_PX,
};
use presence::{PlayerId, PresenceEvent, PresenceFeed, RemotePlayers};
use tracing::{error, info, warn};

use super::map_document::{spawn_map_loader, LayerShape, MapLayer, MapLoadError};

pub(crate) const DEFAULT_MAP_PATH: &str = "maps/map2_project.json";
const TILESET_KEY: &str = "tiles/map2";
const PLAYER_SPAWN: Vec2 = Vec2 { x: 400.0, y: 225.0 };
const WINDOW_TITLE: &str = "Hangout";

include!("scene_state.rs");
include!("scene_impl.rs");

pub(crate) fn build_scene(map_path: PathBuf, presence: Option<PresenceFeed>) -> Box<dyn Scene> {
    Box::new(HangoutScene::new(map_path, presence))
}
