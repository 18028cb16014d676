//! Vectors as they appear on the wire and in the simulation.
//!
//! The world is y-up: `x`/`z` span the ground plane.

use serde::{Deserialize, Serialize};

/// Position, velocity or Euler rotation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    /// East.
    pub x: f32,
    /// Up.
    pub y: f32,
    /// South.
    pub z: f32,
}

impl Vec3 {
    /// Builds a vector from its components.
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Origin.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Straight up.
    pub const Y: Self = Self::new(0.0, 1.0, 0.0);

    /// Scalar product.
    #[must_use]
    pub fn dot(self, rhs: Self) -> f32 {
        rhs.x * self.x + rhs.y * self.y + rhs.z * self.z
    }

    /// Squared magnitude.
    #[must_use]
    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    /// Magnitude.
    #[must_use]
    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Straight-line distance between two points.
    #[must_use]
    pub fn distance(self, to: Self) -> f32 {
        (to - self).length()
    }

    /// Distance on the ground plane, ignoring height.
    #[must_use]
    pub fn horizontal_distance(self, to: Self) -> f32 {
        (to.x - self.x).hypot(to.z - self.z)
    }

    /// Length of the `(x, z)` projection.
    #[must_use]
    pub fn horizontal_length(self) -> f32 {
        self.x.hypot(self.z)
    }

    /// Linear interpolation toward `other` by `t`.
    #[must_use]
    pub fn lerp(self, target: Self, t: f32) -> Self {
        self + (target - self) * t
    }

    /// True when every component is strictly below `epsilon` in magnitude.
    #[must_use]
    pub fn all_below(self, epsilon: f32) -> bool {
        self.x.abs() < epsilon && self.y.abs() < epsilon && self.z.abs() < epsilon
    }
}

macro_rules! componentwise {
    ($trait:ident, $method:ident, $op:tt) => {
        impl std::ops::$trait for Vec3 {
            type Output = Self;
            fn $method(self, rhs: Self) -> Self {
                Self::new(self.x $op rhs.x, self.y $op rhs.y, self.z $op rhs.z)
            }
        }
    };
}

componentwise!(Add, add, +);
componentwise!(Sub, sub, -);

impl std::ops::AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::ops::Mul<f32> for Vec3 {
    type Output = Self;
    fn mul(self, scale: f32) -> Self {
        Self::new(self.x * scale, self.y * scale, self.z * scale)
    }
}

/// 2D Vector on the ground plane (`x`, `z`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    /// East.
    pub x: f32,
    /// South.
    pub z: f32,
}

impl Vec2 {
    /// Builds a ground-plane vector.
    #[must_use]
    pub const fn new(x: f32, z: f32) -> Self {
        Self { x, z }
    }

    /// Origin.
    pub const ZERO: Self = Self::new(0.0, 0.0);

    /// Unit vector along +X.
    pub const X: Self = Self::new(1.0, 0.0);

    /// Magnitude.
    #[must_use]
    pub fn length(self) -> f32 {
        self.x.hypot(self.z)
    }

    /// Returns the unit vector in the same direction, or +X for a zero vector.
    #[must_use]
    pub fn normalized(self) -> Self {
        let len = self.length();
        if len <= f32::EPSILON {
            Self::X
        } else {
            Self::new(self.x / len, self.z / len)
        }
    }
}
