use crate::app::scene::Vec2;

/// Fraction of the remaining distance covered per frame.
pub const CAMERA_FOLLOW_FRACTION: f32 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FollowCamera {
    pub position: Vec2,
    follow_fraction: f32,
    snapped: bool,
}

impl Default for FollowCamera {
    fn default() -> Self {
        Self::new(CAMERA_FOLLOW_FRACTION)
    }
}

impl FollowCamera {
    pub fn new(follow_fraction: f32) -> Self {
        Self {
            position: Vec2::ZERO,
            follow_fraction: follow_fraction.clamp(0.0, 1.0),
            snapped: false,
        }
    }

    pub fn has_snapped(&self) -> bool {
        self.snapped
    }

    /// First call snaps onto `target`; later calls ease toward it.
    pub fn follow(&mut self, target: Vec2) {
        if !self.snapped {
            self.position = target;
            self.snapped = true;
            return;
        }
        let remaining = target.sub(self.position);
        self.position = self.position.add(remaining.scaled(self.follow_fraction));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_follow_snaps() {
        let mut camera = FollowCamera::default();
        camera.follow(Vec2::new(320.0, -48.0));
        assert_eq!(camera.position, Vec2::new(320.0, -48.0));
    }

    #[test]
    fn converges_monotonically_without_overshoot() {
        let mut camera = FollowCamera::default();
        camera.follow(Vec2::ZERO);
        let target = Vec2::new(100.0, -60.0);

        let mut previous = camera.position;
        for _ in 0..200 {
            camera.follow(target);
            let now = camera.position;
            assert!(now.x >= previous.x && now.x <= target.x);
            assert!(now.y <= previous.y && now.y >= target.y);
            previous = now;
        }
        assert!(target.sub(camera.position).length() < 0.01);
    }

    #[test]
    fn each_step_covers_fifteen_percent() {
        let mut camera = FollowCamera::default();
        camera.follow(Vec2::ZERO);
        camera.follow(Vec2::new(100.0, 0.0));
        assert!((camera.position.x - 15.0).abs() < 1e-4);
    }
}
