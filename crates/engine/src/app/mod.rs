mod camera;
mod character;
mod input;
mod joystick;
mod loop_runner;
mod metrics;
mod rendering;
mod scene;
mod tile_layer;

pub use camera::{FollowCamera, CAMERA_FOLLOW_FRACTION};
pub use character::{
    facing_for, movement_vector, AnimationSet, Character, Facing, CHARACTER_SIZE_PX,
    CHARACTER_SPEED, FRAME_INTERVAL_MS,
};
pub use input::{ActionStates, DirectionFlags, InputAction};
pub use joystick::{
    clamp_displacement, flags_from_displacement, JoystickLayout, VirtualJoystick,
    JOYSTICK_DEAD_ZONE_PX, JOYSTICK_MAX_OFFSET_PX,
};
pub use loop_runner::{run_app, AppError, LoopConfig};
pub use metrics::LoopMetricsSnapshot;
pub use rendering::{
    character_screen_rect, map_offset, start_button_rect, tile_screen_rect, RenderStats, Renderer,
    ScreenRect, Viewport, CANVAS_HEIGHT, CANVAS_WIDTH,
};
pub use scene::{InputSnapshot, Scene, SceneWorld, Vec2};
pub use tile_layer::{GridCoord, TileLayer, TileLayerError, TileSource, DEFAULT_TILE_SIZE_PX};
