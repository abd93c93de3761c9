//! Software drawing onto an RGBA8 frame buffer. Everything clips to the buffer bounds.

use crate::app::rendering::transform::ScreenRect;
use crate::assets::LoadedImage;

pub(crate) struct Canvas<'a> {
    frame: &'a mut [u8],
    width: u32,
    height: u32,
}

impl<'a> Canvas<'a> {
    pub(crate) fn new(frame: &'a mut [u8], width: u32, height: u32) -> Self {
        Self {
            frame,
            width,
            height,
        }
    }

    pub(crate) fn width(&self) -> u32 {
        self.width
    }

    pub(crate) fn height(&self) -> u32 {
        self.height
    }

    pub(crate) fn clear(&mut self, color: [u8; 4]) {
        for pixel in self.frame.chunks_exact_mut(4) {
            pixel.copy_from_slice(&color);
        }
    }

    /// Source-over blend; fully transparent colors are skipped.
    pub(crate) fn blend_pixel(&mut self, x: i32, y: i32, color: [u8; 4]) {
        let Some(offset) = self.byte_offset(x, y) else {
            return;
        };
        let alpha = color[3];
        if alpha == 0 {
            return;
        }
        let dst = &mut self.frame[offset..offset + 4];
        if alpha == u8::MAX {
            dst.copy_from_slice(&color);
            return;
        }
        let a = u16::from(alpha);
        for channel in 0..3 {
            let src = u16::from(color[channel]);
            let old = u16::from(dst[channel]);
            dst[channel] = ((src * a + old * (255 - a)) / 255) as u8;
        }
        dst[3] = u8::MAX;
    }

    pub(crate) fn fill_rect(&mut self, x: i32, y: i32, width: i32, height: i32, color: [u8; 4]) {
        let start_x = x.max(0);
        let start_y = y.max(0);
        let end_x = x.saturating_add(width).min(self.width as i32);
        let end_y = y.saturating_add(height).min(self.height as i32);
        for py in start_y..end_y {
            for px in start_x..end_x {
                self.blend_pixel(px, py, color);
            }
        }
    }

    pub(crate) fn rect_outline(&mut self, x: i32, y: i32, width: i32, height: i32, color: [u8; 4]) {
        if width <= 1 || height <= 1 {
            return;
        }
        self.fill_rect(x, y, width, 1, color);
        self.fill_rect(x, y + height - 1, width, 1, color);
        self.fill_rect(x, y + 1, 1, height - 2, color);
        self.fill_rect(x + width - 1, y + 1, 1, height - 2, color);
    }

    pub(crate) fn fill_circle(&mut self, cx: i32, cy: i32, radius: i32, color: [u8; 4]) {
        let r2 = radius * radius;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= r2 {
                    self.blend_pixel(cx + dx, cy + dy, color);
                }
            }
        }
    }

    pub(crate) fn circle_outline(&mut self, cx: i32, cy: i32, radius: i32, color: [u8; 4]) {
        let outer = radius * radius;
        let inner = (radius - 2).max(0).pow(2);
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let d2 = dx * dx + dy * dy;
                if d2 <= outer && d2 > inner {
                    self.blend_pixel(cx + dx, cy + dy, color);
                }
            }
        }
    }

    /// Copies the `src` cell of `image` to `dst` 1:1, alpha-tested. Returns false when the
    /// source cell falls outside the image.
    pub(crate) fn blit_region(&mut self, image: &LoadedImage, src: ScreenRect, dst_x: i32, dst_y: i32) -> bool {
        if src.x < 0 || src.y < 0 || src.right() > image.width as i32 || src.bottom() > image.height as i32 {
            return false;
        }
        for row in 0..src.height as i32 {
            for col in 0..src.width as i32 {
                if let Some(color) = image.pixel((src.x + col) as u32, (src.y + row) as u32) {
                    self.blend_pixel(dst_x + col, dst_y + row, color);
                }
            }
        }
        true
    }

    /// Nearest-neighbour scale of the whole image into `dst`.
    pub(crate) fn blit_scaled(&mut self, image: &LoadedImage, dst: ScreenRect) {
        if image.width == 0 || image.height == 0 || dst.width == 0 || dst.height == 0 {
            return;
        }
        let x_step = image.width as f32 / dst.width as f32;
        let y_step = image.height as f32 / dst.height as f32;
        for row in 0..dst.height {
            let src_y = ((row as f32 * y_step) as u32).min(image.height - 1);
            for col in 0..dst.width {
                let src_x = ((col as f32 * x_step) as u32).min(image.width - 1);
                if let Some(color) = image.pixel(src_x, src_y) {
                    self.blend_pixel(dst.x + col as i32, dst.y + row as i32, color);
                }
            }
        }
    }

    fn byte_offset(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        (offset + 4 <= self.frame.len()).then_some(offset)
    }
}

#[cfg(test)]
pub(crate) fn pixel_at(frame: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
    let offset = (y as usize * width as usize + x as usize) * 4;
    [frame[offset], frame[offset + 1], frame[offset + 2], frame[offset + 3]]
}
