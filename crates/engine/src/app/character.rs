use crate::app::input::DirectionFlags;
use crate::app::scene::Vec2;

/// Pixels per frame. Movement is deliberately not scaled by elapsed time.
pub const CHARACTER_SPEED: f32 = 2.0;
pub const CHARACTER_SIZE_PX: u32 = 32;
pub const FRAME_INTERVAL_MS: f32 = 150.0;
const FRAMES_PER_FACING: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Facing {
    Up,
    Down,
    Left,
    Right,
}

impl Facing {
    pub const ALL: [Facing; 4] = [Facing::Up, Facing::Down, Facing::Left, Facing::Right];

    pub fn as_str(self) -> &'static str {
        match self {
            Facing::Up => "up",
            Facing::Down => "down",
            Facing::Left => "left",
            Facing::Right => "right",
        }
    }

    const fn index(self) -> usize {
        match self {
            Facing::Up => 0,
            Facing::Down => 1,
            Facing::Left => 2,
            Facing::Right => 3,
        }
    }
}

/// Sprite keys per facing, in playback order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationSet {
    frames: [Vec<String>; 4],
}

impl AnimationSet {
    pub fn new(up: Vec<String>, down: Vec<String>, left: Vec<String>, right: Vec<String>) -> Self {
        Self {
            frames: [up, down, left, right],
        }
    }

    /// `{prefix}/{facing}_{n}` for n in `1..=frames_per_facing`.
    pub fn from_key_prefix(prefix: &str, frames_per_facing: usize) -> Self {
        let keys = |facing: Facing| {
            (1..=frames_per_facing)
                .map(|n| format!("{prefix}/{}_{n}", facing.as_str()))
                .collect::<Vec<_>>()
        };
        Self::new(
            keys(Facing::Up),
            keys(Facing::Down),
            keys(Facing::Left),
            keys(Facing::Right),
        )
    }

    pub fn player() -> Self {
        Self::from_key_prefix("sprites/player", FRAMES_PER_FACING)
    }

    pub fn frames(&self, facing: Facing) -> &[String] {
        &self.frames[facing.index()]
    }

    pub fn all_keys(&self) -> impl Iterator<Item = &str> {
        self.frames.iter().flatten().map(String::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct Character {
    pub position: Vec2,
    facing: Facing,
    frame: usize,
    frame_timer_ms: f32,
    speed: f32,
    animations: AnimationSet,
}

impl Character {
    pub fn new(position: Vec2, animations: AnimationSet) -> Self {
        Self {
            position,
            facing: Facing::Down,
            frame: 0,
            frame_timer_ms: 0.0,
            speed: CHARACTER_SPEED,
            animations,
        }
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn frame(&self) -> usize {
        self.frame
    }

    pub fn frame_timer_ms(&self) -> f32 {
        self.frame_timer_ms
    }

    pub fn animations(&self) -> &AnimationSet {
        &self.animations
    }

    /// Advances one frame. Returns whether the character moved.
    pub fn update(&mut self, dt_ms: f32, input: DirectionFlags) -> bool {
        let raw = raw_direction(input);
        if raw == Vec2::ZERO {
            self.frame = 0;
            self.frame_timer_ms = 0.0;
            return false;
        }

        self.position = self.position.add(movement_vector(input, self.speed));
        self.facing = facing_for(raw);

        self.frame_timer_ms += dt_ms.max(0.0);
        if self.frame_timer_ms > FRAME_INTERVAL_MS {
            let count = self.animations.frames(self.facing).len().max(1);
            self.frame = (self.frame + 1) % count;
            self.frame_timer_ms = 0.0;
        }
        true
    }

    pub fn current_sprite_key(&self) -> Option<&str> {
        let frames = self.animations.frames(self.facing);
        frames
            .get(self.frame)
            .or_else(|| frames.first())
            .map(String::as_str)
    }
}

fn raw_direction(input: DirectionFlags) -> Vec2 {
    let axis = |negative: bool, positive: bool| f32::from(u8::from(positive)) - f32::from(u8::from(negative));
    Vec2::new(axis(input.left, input.right), axis(input.up, input.down))
}

/// Per-frame displacement: zero, or exactly `speed` long.
pub fn movement_vector(input: DirectionFlags, speed: f32) -> Vec2 {
    raw_direction(input).normalized_or_zero().scaled(speed)
}

/// Horizontal only when strictly dominant; ties face vertically.
pub fn facing_for(direction: Vec2) -> Facing {
    if direction.x.abs() > direction.y.abs() {
        if direction.x > 0.0 {
            Facing::Right
        } else {
            Facing::Left
        }
    } else if direction.y < 0.0 {
        Facing::Up
    } else {
        Facing::Down
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn character() -> Character {
        Character::new(Vec2::new(100.0, 100.0), AnimationSet::player())
    }

    #[test]
    fn movement_magnitude_is_zero_or_speed_for_every_combination() {
        for flags in DirectionFlags::all_combinations() {
            let length = movement_vector(flags, CHARACTER_SPEED).length();
            let cancels = (flags.up == flags.down) && (flags.left == flags.right);
            if cancels {
                assert_eq!(length, 0.0, "flags={flags:?}");
            } else {
                assert!((length - CHARACTER_SPEED).abs() < 1e-5, "flags={flags:?}");
            }
        }
    }

    #[test]
    fn diagonal_ties_face_vertically() {
        assert_eq!(facing_for(Vec2::new(1.0, -1.0)), Facing::Up);
        assert_eq!(facing_for(Vec2::new(-1.0, 1.0)), Facing::Down);
        assert_eq!(facing_for(Vec2::new(1.0, 0.5)), Facing::Right);
        assert_eq!(facing_for(Vec2::new(-1.0, 0.0)), Facing::Left);
    }

    #[test]
    fn idle_resets_frame_from_any_frame() {
        let right = DirectionFlags {
            right: true,
            ..DirectionFlags::NONE
        };
        for steps in 1..=6 {
            let mut hero = character();
            for _ in 0..steps {
                hero.update(151.0, right);
            }
            assert!(!hero.update(16.0, DirectionFlags::NONE));
            assert_eq!(hero.frame(), 0);
            assert_eq!(hero.frame_timer_ms(), 0.0);
        }
    }

    #[test]
    fn holding_up_for_200ms_advances_one_frame_and_faces_up() {
        let mut hero = character();
        let up = DirectionFlags {
            up: true,
            ..DirectionFlags::NONE
        };
        assert!(hero.update(200.0, up));
        assert_eq!(hero.facing(), Facing::Up);
        assert_eq!(hero.frame(), 1);
        assert_eq!(hero.position, Vec2::new(100.0, 98.0));
        assert_eq!(hero.current_sprite_key(), Some("sprites/player/up_2"));
    }

    #[test]
    fn frames_wrap_around() {
        let mut hero = character();
        let left = DirectionFlags {
            left: true,
            ..DirectionFlags::NONE
        };
        for _ in 0..4 {
            hero.update(151.0, left);
        }
        assert_eq!(hero.frame(), 0);
        assert_eq!(hero.current_sprite_key(), Some("sprites/player/left_1"));
    }

    #[test]
    fn opposing_flags_count_as_idle() {
        let mut hero = character();
        let start = hero.position;
        let moved = hero.update(
            16.0,
            DirectionFlags {
                up: true,
                down: true,
                ..DirectionFlags::NONE
            },
        );
        assert!(!moved);
        assert_eq!(hero.position, start);
    }
}
