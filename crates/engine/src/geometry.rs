use std::f32::consts::{PI, TAU};
use std::ops::{Add, AddAssign, Mul, Sub};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (other - self).length()
    }

    /// Angle of the vector from `self` to `other`, in radians.
    pub fn angle_to(self, other: Vec2) -> f32 {
        let delta = other - self;
        delta.y.atan2(delta.x)
    }

    pub fn from_angle(angle: f32, magnitude: f32) -> Self {
        Self {
            x: angle.cos() * magnitude,
            y: angle.sin() * magnitude,
        }
    }

    /// Rotated counterclockwise by `angle` radians.
    pub fn rotated(self, angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self {
            x: self.x * cos - self.y * sin,
            y: self.x * sin + self.y * cos,
        }
    }

    pub fn normalized_or_zero(self) -> Self {
        let length = self.length();
        if length <= f32::EPSILON {
            Vec2::ZERO
        } else {
            Vec2 {
                x: self.x / length,
                y: self.y / length,
            }
        }
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

/// Wraps an angle into `(-PI, PI]`.
pub fn normalize_angle(angle: f32) -> f32 {
    let mut wrapped = angle % TAU;
    if wrapped <= -PI {
        wrapped += TAU;
    } else if wrapped > PI {
        wrapped -= TAU;
    }
    wrapped
}

/// Signed shortest difference from `from` to `to`.
pub fn angle_difference(from: f32, to: f32) -> f32 {
    normalize_angle(to - from)
}

/// Rotates `current` toward `target` by at most `max_step` radians.
pub fn rotate_toward(current: f32, target: f32, max_step: f32) -> f32 {
    let diff = angle_difference(current, target);
    if diff.abs() <= max_step {
        normalize_angle(target)
    } else {
        normalize_angle(current + max_step.copysign(diff))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn angle_difference_takes_short_way_round() {
        let diff = angle_difference(PI - 0.1, -PI + 0.1);
        assert!((diff - 0.2).abs() < 1e-4);
    }

    #[test]
    fn rotate_toward_clamps_step_and_snaps_when_close() {
        let stepped = rotate_toward(0.0, 1.0, 0.25);
        assert!((stepped - 0.25).abs() < 1e-6);
        let snapped = rotate_toward(0.9, 1.0, 0.25);
        assert!((snapped - 1.0).abs() < 1e-6);
    }

    #[test]
    fn distance_and_direction() {
        let a = Vec2::new(1.0, 1.0);
        let b = Vec2::new(4.0, 5.0);
        assert!((a.distance(b) - 5.0).abs() < 1e-6);
        assert!((a.angle_to(Vec2::new(1.0, 3.0)) - PI / 2.0).abs() < 1e-6);
    }
}
