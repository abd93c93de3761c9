use std::fs;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use engine::{Facing, GridCoord, InputAction, TileLayer, TileSource};
use presence::{spawn_presence, LocalBackend, PresenceConfig, RealtimeHub};
use serde_json::json;

use super::*;

const WAIT: Duration = Duration::from_secs(5);

fn offline_scene() -> HangoutScene {
    HangoutScene::new(PathBuf::from("/nonexistent/map.json"), None)
}

fn loaded(scene: &mut HangoutScene) -> SceneWorld {
    let mut world = SceneWorld::default();
    scene.load(&mut world);
    world
}

fn pump_until(scene: &mut HangoutScene, world: &mut SceneWorld, done: impl Fn(&HangoutScene) -> bool) {
    let deadline = Instant::now() + WAIT;
    while !done(scene) {
        assert!(Instant::now() < deadline, "condition never reached");
        scene.update(1.0, &InputSnapshot::empty(), world);
        thread::sleep(Duration::from_millis(5));
    }
}

fn ready_map() -> MapLayer {
    MapLayer {
        shape: LayerShape::MapLayer,
        layer: TileLayer::new(
            16,
            [(GridCoord::new(0, 0), TileSource { column: 0, row: 0 })],
        )
        .expect("layer"),
        skipped_keys: Vec::new(),
    }
}

#[test]
fn holding_up_for_200ms_advances_one_frame() {
    let mut scene = offline_scene();
    let mut world = loaded(&mut scene);
    let input = InputSnapshot::empty().with_action_down(InputAction::MoveUp, true);

    scene.update(200.0, &input, &mut world);

    let character = world.character().expect("character");
    assert_eq!(character.facing(), Facing::Up);
    assert_eq!(character.frame(), 1);
    assert_eq!(character.position, Vec2::new(400.0, 223.0));
    assert_eq!(world.camera().position, character.position);
}

#[test]
fn camera_trails_character_after_first_frame() {
    let mut scene = offline_scene();
    let mut world = loaded(&mut scene);
    let right = InputSnapshot::empty().with_action_down(InputAction::MoveRight, true);

    scene.update(16.0, &right, &mut world);
    scene.update(16.0, &right, &mut world);

    let character_x = world.character().expect("character").position.x;
    let camera_x = world.camera().position.x;
    assert_eq!(character_x, 404.0);
    assert!((camera_x - (402.0 + 2.0 * 0.15)).abs() < 1e-4);
}

#[test]
fn resolved_map_lands_in_world() {
    let mut scene = offline_scene();
    let mut world = SceneWorld::default();
    let (tx, rx) = mpsc::channel();
    scene.map = MapState::Loading(rx);
    tx.send(Ok(ready_map())).expect("send");

    scene.update(16.0, &InputSnapshot::empty(), &mut world);

    assert!(matches!(scene.map, MapState::Ready { tiles: 1, .. }));
    assert_eq!(world.tile_layer().map(TileLayer::len), Some(1));
    assert_eq!(world.tileset_key(), Some(TILESET_KEY));
}

#[test]
fn unresolved_map_disables_map_rendering() {
    let mut scene = offline_scene();
    let mut world = SceneWorld::default();
    let (tx, rx) = mpsc::channel();
    scene.map = MapState::Loading(rx);
    tx.send(Err(MapLoadError::NoRecognizedLayer)).expect("send");

    scene.update(16.0, &InputSnapshot::empty(), &mut world);
    assert!(matches!(scene.map, MapState::Unavailable));
    assert!(world.tile_layer().is_none());
}

#[test]
fn missing_map_file_becomes_unavailable() {
    let mut scene = offline_scene();
    let mut world = loaded(&mut scene);
    pump_until(&mut scene, &mut world, |scene| {
        !matches!(scene.map, MapState::Loading(_))
    });
    assert!(matches!(scene.map, MapState::Unavailable));
}

#[test]
fn absolute_map_path_is_loaded_from_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("map.json");
    let document = json!({"tilesetEditing": [{"layers": [{"tiles": {"1-2": {"x": 3, "y": 4}}}]}]});
    fs::write(&path, document.to_string()).expect("write map");

    let mut scene = HangoutScene::new(path, None);
    let mut world = loaded(&mut scene);
    pump_until(&mut scene, &mut world, |scene| {
        matches!(scene.map, MapState::Ready { .. })
    });
    assert_eq!(
        world.tile_layer().and_then(|layer| layer.get(GridCoord::new(1, 2))),
        Some(TileSource { column: 3, row: 4 })
    );
}

#[test]
fn presence_events_drive_state() {
    let mut scene = offline_scene();
    let me = PlayerId::new("me");
    scene.apply_presence_event(PresenceEvent::SignedIn(me.clone()));
    scene.apply_presence_event(PresenceEvent::Players(RemotePlayers::from_value(
        json!({"me": {"online": true}, "other": {"online": true}}),
    )));
    assert_eq!(scene.remote_player_count(), 1);
    assert_eq!(scene.players_online(), Some(2));

    scene.apply_presence_event(PresenceEvent::ConnectionLost);
    assert_eq!(scene.presence, PresenceState::Lost { me });
    assert_eq!(scene.remote_player_count(), 0);
}

#[test]
fn presence_failure_leaves_single_player() {
    let mut scene = offline_scene();
    scene.apply_presence_event(PresenceEvent::Unavailable("refused".to_string()));
    assert_eq!(scene.presence, PresenceState::Unavailable);
    assert!(scene.debug_title(&SceneWorld::default()).is_none());
}

#[test]
fn local_hub_presence_shows_in_title_and_status() {
    let hub = RealtimeHub::new();
    let feed = spawn_presence(LocalBackend::new(&hub), PresenceConfig::default()).expect("spawn");
    let mut scene = HangoutScene::new(PathBuf::from("/nonexistent/map.json"), Some(feed));
    let mut world = loaded(&mut scene);
    pump_until(&mut scene, &mut world, |scene| scene.players_online() == Some(1));

    assert_eq!(
        scene.debug_title(&world).as_deref(),
        Some("Hangout - 1 online")
    );
    let status = scene.status_lines(&world);
    assert_eq!(status[0], "PLAYERS: 1 (0 REMOTE)");
    assert!(status.iter().any(|line| line.starts_with("MAP: ")));
}

#[test]
fn unload_clears_world() {
    let mut scene = offline_scene();
    let mut world = loaded(&mut scene);
    scene.unload(&mut world);
    assert!(world.character().is_none());
}
