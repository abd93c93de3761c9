use crate::app::scene::Vec2;
use crate::app::tile_layer::GridCoord;

pub const CANVAS_WIDTH: u32 = 800;
pub const CANVAS_HEIGHT: u32 = 450;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const CANVAS: Viewport = Viewport {
        width: CANVAS_WIDTH,
        height: CANVAS_HEIGHT,
    };

    pub fn center(self) -> Vec2 {
        Vec2::new(self.width as f32 * 0.5, self.height as f32 * 0.5)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl ScreenRect {
    pub fn right(&self) -> i32 {
        self.x.saturating_add_unsigned(self.width)
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add_unsigned(self.height)
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.x as f32
            && point.y >= self.y as f32
            && point.x < self.right() as f32
            && point.y < self.bottom() as f32
    }

    pub fn intersects_viewport(&self, viewport: Viewport) -> bool {
        self.right() > 0
            && self.bottom() > 0
            && self.x < viewport.width as i32
            && self.y < viewport.height as i32
    }
}

/// Screen offset applied to every map tile: the camera position lands on the character's
/// top-left corner, which sits centered on the canvas.
pub fn map_offset(camera: Vec2, viewport: Viewport, character_size: u32) -> Vec2 {
    let half = character_size as f32 * 0.5;
    Vec2::new(
        viewport.width as f32 * 0.5 - half - camera.x,
        viewport.height as f32 * 0.5 - half - camera.y,
    )
}

/// The character never moves on screen.
pub fn character_screen_rect(viewport: Viewport, character_size: u32) -> ScreenRect {
    let half = character_size as i32 / 2;
    ScreenRect {
        x: viewport.width as i32 / 2 - half,
        y: viewport.height as i32 / 2 - half,
        width: character_size,
        height: character_size,
    }
}

pub fn tile_screen_rect(coord: GridCoord, tile_size: u32, offset: Vec2) -> ScreenRect {
    let size = tile_size as f32;
    ScreenRect {
        x: (coord.x as f32 * size + offset.x).round() as i32,
        y: (coord.y as f32 * size + offset.y).round() as i32,
        width: tile_size,
        height: tile_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_on_origin_puts_tile_zero_under_character() {
        let offset = map_offset(Vec2::ZERO, Viewport::CANVAS, 32);
        assert_eq!(offset, Vec2::new(384.0, 209.0));
        let tile = tile_screen_rect(GridCoord::new(0, 0), 16, offset);
        let character = character_screen_rect(Viewport::CANVAS, 32);
        assert_eq!((tile.x, tile.y), (character.x, character.y));
    }

    #[test]
    fn camera_moving_right_shifts_map_left() {
        let a = map_offset(Vec2::new(0.0, 0.0), Viewport::CANVAS, 32);
        let b = map_offset(Vec2::new(10.0, -4.0), Viewport::CANVAS, 32);
        assert_eq!(b.sub(a), Vec2::new(-10.0, 4.0));
    }

    #[test]
    fn rect_containment_is_half_open() {
        let rect = ScreenRect {
            x: 10,
            y: 20,
            width: 5,
            height: 5,
        };
        assert!(rect.contains(Vec2::new(10.0, 20.0)));
        assert!(!rect.contains(Vec2::new(15.0, 22.0)));
        assert!(rect.intersects_viewport(Viewport::CANVAS));
        assert!(!ScreenRect {
            x: -16,
            y: 0,
            width: 16,
            height: 16
        }
        .intersects_viewport(Viewport::CANVAS));
        assert!(!ScreenRect {
            x: 800,
            y: 0,
            width: 16,
            height: 16
        }
        .intersects_viewport(Viewport::CANVAS));
    }

    #[test]
    fn far_away_tiles_saturate_instead_of_overflowing() {
        let far = tile_screen_rect(GridCoord::new(i32::MAX, i32::MIN), 16, Vec2::ZERO);
        assert_eq!(far.right(), i32::MAX);
        assert!(!far.intersects_viewport(Viewport::CANVAS));
    }
}
