mod canvas;
mod font;
mod hud;
mod renderer;
mod transform;

pub(crate) use hud::HudData;
pub use hud::start_button_rect;
pub use renderer::{RenderStats, Renderer};
pub use transform::{
    character_screen_rect, map_offset, tile_screen_rect, ScreenRect, Viewport, CANVAS_HEIGHT,
    CANVAS_WIDTH,
};
