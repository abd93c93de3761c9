//! One-finger virtual joystick mapped onto the same directional flags as the keyboard.

use crate::app::input::DirectionFlags;
use crate::app::rendering::Viewport;
use crate::app::scene::Vec2;

pub const JOYSTICK_MAX_OFFSET_PX: f32 = 40.0;
pub const JOYSTICK_DEAD_ZONE_PX: f32 = 10.0;
const JOYSTICK_BASE_RADIUS_PX: f32 = 50.0;
const JOYSTICK_STICK_RADIUS_PX: f32 = 20.0;
const JOYSTICK_MARGIN_PX: f32 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JoystickLayout {
    pub base_center: Vec2,
    pub base_radius: f32,
    pub stick_radius: f32,
    pub max_offset: f32,
    pub dead_zone: f32,
}

impl JoystickLayout {
    /// Base anchored to the bottom-left corner of the canvas.
    pub fn for_viewport(viewport: Viewport) -> Self {
        let inset = JOYSTICK_MARGIN_PX + JOYSTICK_BASE_RADIUS_PX;
        Self {
            base_center: Vec2::new(inset, viewport.height as f32 - inset),
            base_radius: JOYSTICK_BASE_RADIUS_PX,
            stick_radius: JOYSTICK_STICK_RADIUS_PX,
            max_offset: JOYSTICK_MAX_OFFSET_PX,
            dead_zone: JOYSTICK_DEAD_ZONE_PX,
        }
    }

    pub fn base_contains(&self, point: Vec2) -> bool {
        point.sub(self.base_center).length() <= self.base_radius
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ActiveTouch {
    id: u64,
    start: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VirtualJoystick {
    layout: JoystickLayout,
    active: Option<ActiveTouch>,
    offset: Vec2,
    flags: DirectionFlags,
}

impl VirtualJoystick {
    pub fn new(layout: JoystickLayout) -> Self {
        Self {
            layout,
            active: None,
            offset: Vec2::ZERO,
            flags: DirectionFlags::NONE,
        }
    }

    pub fn layout(&self) -> JoystickLayout {
        self.layout
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Clamped stick displacement from the touch start point.
    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub fn flags(&self) -> DirectionFlags {
        self.flags
    }

    /// Starts tracking `touch_id` if it lands on the base and no finger is tracked yet.
    pub fn begin(&mut self, touch_id: u64, point: Vec2) -> bool {
        if self.active.is_some() || !self.layout.base_contains(point) {
            return false;
        }
        self.active = Some(ActiveTouch {
            id: touch_id,
            start: point,
        });
        self.offset = Vec2::ZERO;
        self.flags = DirectionFlags::NONE;
        true
    }

    /// Updates the stick for the tracked finger; other touches are ignored.
    pub fn drag(&mut self, touch_id: u64, point: Vec2) -> bool {
        let Some(active) = self.active.filter(|active| active.id == touch_id) else {
            return false;
        };
        self.offset = clamp_displacement(point.sub(active.start), self.layout.max_offset);
        self.flags = flags_from_displacement(self.offset, self.layout.dead_zone);
        true
    }

    pub fn end(&mut self, touch_id: u64) -> bool {
        if !self.active.is_some_and(|active| active.id == touch_id) {
            return false;
        }
        self.active = None;
        self.offset = Vec2::ZERO;
        self.flags = DirectionFlags::NONE;
        true
    }
}

/// Scales `displacement` down to `max_length` when longer, keeping its direction.
pub fn clamp_displacement(displacement: Vec2, max_length: f32) -> Vec2 {
    let length = displacement.length();
    if length <= max_length || length == 0.0 {
        return displacement;
    }
    displacement.scaled(max_length / length)
}

pub fn flags_from_displacement(displacement: Vec2, dead_zone: f32) -> DirectionFlags {
    DirectionFlags {
        up: displacement.y < -dead_zone,
        down: displacement.y > dead_zone,
        left: displacement.x < -dead_zone,
        right: displacement.x > dead_zone,
    }
}
