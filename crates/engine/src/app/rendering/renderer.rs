use std::path::PathBuf;
use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture, TextureError};
use winit::window::Window;

use crate::app::character::{Character, CHARACTER_SIZE_PX};
use crate::app::rendering::canvas::Canvas;
use crate::app::rendering::hud::{draw_hud, HudData};
use crate::app::rendering::transform::{
    character_screen_rect, map_offset, tile_screen_rect, ScreenRect, Viewport,
};
use crate::app::scene::{SceneWorld, Vec2};
use crate::app::tile_layer::{TileLayer, TileSource};
use crate::assets::{ImageStore, LoadedImage};

const CLEAR_COLOR: [u8; 4] = [20, 24, 32, 255];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub tiles_drawn: usize,
    pub character_drawn: bool,
}

pub struct Renderer {
    pixels: Pixels<'static>,
    canvas: Viewport,
    images: ImageStore,
    last_stats: RenderStats,
}

impl Renderer {
    /// The logical canvas keeps its size; the window surface scales it.
    pub fn new(window: Arc<Window>, canvas: Viewport, asset_root: PathBuf) -> Result<Self, Error> {
        let size = window.inner_size();
        let surface = SurfaceTexture::new(size.width.max(1), size.height.max(1), window);
        let pixels = Pixels::new(canvas.width, canvas.height, surface)?;
        Ok(Self {
            pixels,
            canvas,
            images: ImageStore::new(asset_root),
            last_stats: RenderStats::default(),
        })
    }

    pub fn last_stats(&self) -> RenderStats {
        self.last_stats
    }

    pub fn resize_surface(&mut self, width: u32, height: u32) -> Result<(), TextureError> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels.resize_surface(width, height)
    }

    /// Physical window position to canvas pixels, clamped to the canvas edge.
    pub fn window_to_canvas(&self, x: f64, y: f64) -> Vec2 {
        let (px, py) = match self.pixels.window_pos_to_pixel((x as f32, y as f32)) {
            Ok(inside) => inside,
            Err(outside) => self.pixels.clamp_pixel_pos(outside),
        };
        Vec2::new(px as f32, py as f32)
    }

    pub(crate) fn render_frame(&mut self, world: &SceneWorld, hud: &HudData<'_>) -> Result<RenderStats, Error> {
        self.images.pump();
        if let Some(key) = world.tileset_key() {
            self.images.request(key);
        }
        if let Some(character) = world.character() {
            for key in character.animations().all_keys() {
                self.images.request(key);
            }
        }

        let viewport = self.canvas;
        let images = &self.images;
        let mut canvas = Canvas::new(self.pixels.frame_mut(), viewport.width, viewport.height);
        canvas.clear(CLEAR_COLOR);

        let offset = map_offset(world.camera().position, viewport, CHARACTER_SIZE_PX);
        let tileset = world.tileset_key().and_then(|key| images.ready(key));
        let tiles_drawn = draw_tile_layer(&mut canvas, viewport, world.tile_layer(), tileset, offset);
        let character_drawn = draw_character(&mut canvas, viewport, world.character(), images);
        draw_hud(&mut canvas, hud);

        self.pixels.render()?;
        self.last_stats = RenderStats {
            tiles_drawn,
            character_drawn,
        };
        Ok(self.last_stats)
    }
}

/// Draws every on-screen tile from the tileset. Without a layer or a loaded tileset nothing is
/// drawn and 0 is returned.
pub(crate) fn draw_tile_layer(
    canvas: &mut Canvas<'_>,
    viewport: Viewport,
    layer: Option<&TileLayer>,
    tileset: Option<&LoadedImage>,
    offset: Vec2,
) -> usize {
    let (Some(layer), Some(tileset)) = (layer, tileset) else {
        return 0;
    };
    let size = layer.tile_size();
    let mut drawn = 0;
    for (coord, source) in layer.iter() {
        let dst = tile_screen_rect(coord, size, offset);
        if !dst.intersects_viewport(viewport) {
            continue;
        }
        let Some(src) = tileset_source_rect(tileset, source, size) else {
            continue;
        };
        if canvas.blit_region(tileset, src, dst.x, dst.y) {
            drawn += 1;
        }
    }
    drawn
}

/// Source rect of a tileset cell, or `None` when the cell lies outside the image.
fn tileset_source_rect(tileset: &LoadedImage, source: TileSource, size: u32) -> Option<ScreenRect> {
    if source.column >= tileset.width / size || source.row >= tileset.height / size {
        return None;
    }
    Some(ScreenRect {
        x: i32::try_from(source.column * size).ok()?,
        y: i32::try_from(source.row * size).ok()?,
        width: size,
        height: size,
    })
}

fn draw_character(
    canvas: &mut Canvas<'_>,
    viewport: Viewport,
    character: Option<&Character>,
    images: &ImageStore,
) -> bool {
    let Some(sprite) = character
        .and_then(Character::current_sprite_key)
        .and_then(|key| images.ready(key))
    else {
        return false;
    };
    canvas.blit_scaled(sprite, character_screen_rect(viewport, CHARACTER_SIZE_PX));
    true
}
