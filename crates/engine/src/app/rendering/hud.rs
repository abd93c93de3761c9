use crate::app::joystick::VirtualJoystick;
use crate::app::rendering::canvas::Canvas;
use crate::app::rendering::font::{draw_text, line_advance, text_width};
use crate::app::rendering::transform::{ScreenRect, Viewport};

const NOTICE_LINES: [&str; 3] = [
    "HANGOUT (BETA)",
    "MOVE WITH WASD OR ARROW KEYS",
    "OR DRAG THE JOYSTICK",
];
const START_LABEL: &str = "START";
const NOTICE_TEXT_SCALE: i32 = 3;
const STATUS_TEXT_SCALE: i32 = 2;
const PANEL_INSET: i32 = 12;
const START_BUTTON_WIDTH: u32 = 160;
const START_BUTTON_HEIGHT: u32 = 44;

const PANEL_BG: [u8; 4] = [10, 12, 16, 210];
const PANEL_BORDER: [u8; 4] = [92, 106, 126, 255];
const TEXT_PRIMARY: [u8; 4] = [244, 248, 252, 255];
const TEXT_DIM: [u8; 4] = [176, 198, 220, 255];
const BUTTON_BG: [u8; 4] = [46, 140, 87, 255];
const JOYSTICK_BASE: [u8; 4] = [255, 255, 255, 70];
const JOYSTICK_STICK: [u8; 4] = [255, 255, 255, 160];

#[derive(Debug, Clone, Copy)]
pub(crate) struct HudData<'a> {
    pub show_start_notice: bool,
    pub joystick: Option<&'a VirtualJoystick>,
    pub status_lines: &'a [String],
}

/// Clickable/touchable start area, centered under the notice text.
pub fn start_button_rect(viewport: Viewport) -> ScreenRect {
    let center = viewport.center();
    ScreenRect {
        x: center.x as i32 - START_BUTTON_WIDTH as i32 / 2,
        y: center.y as i32 + 40,
        width: START_BUTTON_WIDTH,
        height: START_BUTTON_HEIGHT,
    }
}

pub(crate) fn draw_hud(canvas: &mut Canvas<'_>, hud: &HudData<'_>) {
    let viewport = Viewport {
        width: canvas.width(),
        height: canvas.height(),
    };
    if let Some(joystick) = hud.joystick {
        draw_joystick(canvas, joystick);
    }
    if !hud.status_lines.is_empty() {
        draw_status_panel(canvas, hud.status_lines);
    }
    if hud.show_start_notice {
        draw_start_notice(canvas, viewport);
    }
}

fn draw_start_notice(canvas: &mut Canvas<'_>, viewport: Viewport) {
    let scale = NOTICE_TEXT_SCALE;
    let button = start_button_rect(viewport);
    let widest = NOTICE_LINES
        .iter()
        .map(|line| text_width(line, scale))
        .max()
        .unwrap_or(0)
        .max(button.width as i32);
    let text_height = NOTICE_LINES.len() as i32 * line_advance(scale);
    let panel_top = button.y - text_height - PANEL_INSET * 2;
    let panel_left = viewport.width as i32 / 2 - widest / 2 - PANEL_INSET;
    let panel_width = widest + PANEL_INSET * 2;
    let panel_height = button.bottom() - panel_top + PANEL_INSET;

    canvas.fill_rect(panel_left, panel_top, panel_width, panel_height, PANEL_BG);
    canvas.rect_outline(panel_left, panel_top, panel_width, panel_height, PANEL_BORDER);

    let mut y = panel_top + PANEL_INSET;
    for (index, line) in NOTICE_LINES.iter().enumerate() {
        let x = viewport.width as i32 / 2 - text_width(line, scale) / 2;
        let color = if index == 0 { TEXT_PRIMARY } else { TEXT_DIM };
        draw_text(canvas, x, y, line, scale, color);
        y += line_advance(scale);
    }

    canvas.fill_rect(button.x, button.y, button.width as i32, button.height as i32, BUTTON_BG);
    canvas.rect_outline(button.x, button.y, button.width as i32, button.height as i32, TEXT_PRIMARY);
    let label_x = button.x + button.width as i32 / 2 - text_width(START_LABEL, scale) / 2;
    let label_y = button.y + (button.height as i32 - 5 * scale) / 2;
    draw_text(canvas, label_x, label_y, START_LABEL, scale, TEXT_PRIMARY);
}

fn draw_status_panel(canvas: &mut Canvas<'_>, lines: &[String]) {
    let scale = STATUS_TEXT_SCALE;
    let widest = lines
        .iter()
        .map(|line| text_width(line, scale))
        .max()
        .unwrap_or(0);
    let inset = PANEL_INSET / 2;
    let width = widest + inset * 2;
    let height = lines.len() as i32 * line_advance(scale) + inset * 2;
    canvas.fill_rect(inset, inset, width, height, PANEL_BG);
    canvas.rect_outline(inset, inset, width, height, PANEL_BORDER);

    let mut y = inset * 2;
    for line in lines {
        draw_text(canvas, inset * 2, y, line, scale, TEXT_PRIMARY);
        y += line_advance(scale);
    }
}

fn draw_joystick(canvas: &mut Canvas<'_>, joystick: &VirtualJoystick) {
    let layout = joystick.layout();
    let base_x = layout.base_center.x.round() as i32;
    let base_y = layout.base_center.y.round() as i32;
    canvas.circle_outline(base_x, base_y, layout.base_radius as i32, JOYSTICK_BASE);
    let stick = layout.base_center.add(joystick.offset());
    canvas.fill_circle(
        stick.x.round() as i32,
        stick.y.round() as i32,
        layout.stick_radius as i32,
        JOYSTICK_STICK,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::rendering::canvas::pixel_at;

    #[test]
    fn start_button_sits_inside_canvas() {
        let rect = start_button_rect(Viewport::CANVAS);
        assert!(rect.x > 0 && rect.right() < 800);
        assert!(rect.y > 225 && rect.bottom() < 450);
    }

    #[test]
    fn notice_hidden_after_start() {
        let viewport = Viewport::CANVAS;
        let mut frame = vec![0u8; (viewport.width * viewport.height * 4) as usize];
        let button = start_button_rect(viewport);
        let probe = (button.x as u32 + 2, button.y as u32 + 2);

        let mut canvas = Canvas::new(&mut frame, viewport.width, viewport.height);
        draw_hud(
            &mut canvas,
            &HudData {
                show_start_notice: false,
                joystick: None,
                status_lines: &[],
            },
        );
        assert_eq!(pixel_at(&frame, viewport.width, probe.0, probe.1), [0; 4]);

        let mut canvas = Canvas::new(&mut frame, viewport.width, viewport.height);
        draw_hud(
            &mut canvas,
            &HudData {
                show_start_notice: true,
                joystick: None,
                status_lines: &[],
            },
        );
        assert_eq!(pixel_at(&frame, viewport.width, probe.0, probe.1), BUTTON_BG);
    }
}
