use crate::app::camera::FollowCamera;
use crate::app::character::Character;
use crate::app::input::{ActionStates, DirectionFlags, InputAction};
use crate::app::tile_layer::TileLayer;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }

    pub fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }

    pub fn scaled(self, factor: f32) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }

    pub fn normalized_or_zero(self) -> Self {
        let length = self.length();
        if length == 0.0 || !length.is_finite() {
            return Self::ZERO;
        }
        self.scaled(length.recip())
    }
}

/// Immutable view of the input gathered for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    actions: ActionStates,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(actions: ActionStates) -> Self {
        Self { actions }
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn directions(&self) -> DirectionFlags {
        self.actions.directions()
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self
    }
}

/// Everything the renderer reads. Written only from the frame loop.
#[derive(Debug, Default)]
pub struct SceneWorld {
    camera: FollowCamera,
    character: Option<Character>,
    tile_layer: Option<TileLayer>,
    tileset_key: Option<String>,
}

impl SceneWorld {
    pub fn spawn_character(&mut self, character: Character) {
        self.character = Some(character);
        self.camera = FollowCamera::default();
    }

    pub fn character(&self) -> Option<&Character> {
        self.character.as_ref()
    }

    pub fn camera(&self) -> &FollowCamera {
        &self.camera
    }

    pub fn set_tile_layer(&mut self, layer: TileLayer, tileset_key: impl Into<String>) {
        self.tile_layer = Some(layer);
        self.tileset_key = Some(tileset_key.into());
    }

    pub fn tile_layer(&self) -> Option<&TileLayer> {
        self.tile_layer.as_ref()
    }

    pub fn tileset_key(&self) -> Option<&str> {
        self.tileset_key.as_deref()
    }

    /// Character first, then the camera eases toward where it ended up.
    pub fn advance(&mut self, dt_ms: f32, input: &InputSnapshot) -> bool {
        let Some(character) = self.character.as_mut() else {
            return false;
        };
        let moved = character.update(dt_ms, input.directions());
        self.camera.follow(character.position);
        moved
    }

    pub fn clear(&mut self) {
        self.camera = FollowCamera::default();
        self.character = None;
        self.tile_layer = None;
        self.tileset_key = None;
    }
}

pub trait Scene {
    fn load(&mut self, world: &mut SceneWorld);
    fn update(&mut self, dt_ms: f32, input: &InputSnapshot, world: &mut SceneWorld);
    fn unload(&mut self, world: &mut SceneWorld);
    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        None
    }
    /// Extra lines for the debug status panel.
    fn status_lines(&self, _world: &SceneWorld) -> Vec<String> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::character::{AnimationSet, Facing};

    #[test]
    fn normalized_zero_stays_zero() {
        assert_eq!(Vec2::ZERO.normalized_or_zero(), Vec2::ZERO);
        let unit = Vec2::new(3.0, 4.0).normalized_or_zero();
        assert!((unit.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn advance_snaps_camera_to_character_on_first_frame() {
        let mut world = SceneWorld::default();
        world.spawn_character(Character::new(
            Vec2::new(40.0, 80.0),
            AnimationSet::player(),
        ));
        let input = InputSnapshot::empty().with_action_down(InputAction::MoveRight, true);

        assert!(world.advance(16.0, &input));
        let character = world.character().expect("character");
        assert_eq!(character.position, Vec2::new(42.0, 80.0));
        assert_eq!(character.facing(), Facing::Right);
        assert_eq!(world.camera().position, character.position);
    }

    #[test]
    fn advance_without_character_is_a_no_op() {
        let mut world = SceneWorld::default();
        assert!(!world.advance(16.0, &InputSnapshot::empty()));
        assert!(!world.camera().has_snapped());
    }
}
