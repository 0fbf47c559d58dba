use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

use crate::constants::EPSILON;

/// Vector in scene space. Used both for positions and for directions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    pub const UP: Self = Self::new(0.0, 1.0, 0.0);
    pub const FORWARD: Self = Self::new(0.0, 0.0, 1.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn length_squared(self) -> f64 {
        self.dot(self)
    }

    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    pub fn distance(self, other: Self) -> f64 {
        (other - self).length()
    }

    /// Unit-length copy. Returns zero for near-zero magnitude.
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len < EPSILON {
            return Self::ZERO;
        }
        self / len
    }

    pub fn is_degenerate(self) -> bool {
        self.length_squared() < EPSILON * EPSILON
    }

    /// Component-wise linear interpolation, `t` unclamped.
    pub fn lerp(self, other: Self, t: f64) -> Self {
        self + (other - self) * t
    }

    /// Unsigned angle in degrees. Degenerate inputs yield 0.
    pub fn angle_between(self, other: Self) -> f64 {
        let denom = (self.length_squared() * other.length_squared()).sqrt();
        if denom < EPSILON {
            return 0.0;
        }
        let cos = (self.dot(other) / denom).clamp(-1.0, 1.0);
        cos.acos().to_degrees()
    }

    /// Remove the component along `normal`.
    pub fn project_on_plane(self, normal: Self) -> Self {
        let sq = normal.length_squared();
        if sq < EPSILON {
            return self;
        }
        self - normal * (self.dot(normal) / sq)
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<[f64; 3]> for Vec3 {
    fn from(arr: [f64; 3]) -> Self {
        Self::new(arr[0], arr[1], arr[2])
    }
}

impl From<Vec3> for [f64; 3] {
    fn from(v: Vec3) -> Self {
        v.to_array()
    }
}

impl Add for Vec3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Vec3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Div<f64> for Vec3 {
    type Output = Self;

    fn div(self, rhs: f64) -> Self {
        Self::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

impl Neg for Vec3 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Box spanning two corners in any order.
    pub fn from_corners(a: Vec3, b: Vec3) -> Self {
        Self {
            min: Vec3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Vec3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size * 0.5;
        Self::from_corners(center - half, center + half)
    }

    pub fn center(&self) -> Vec3 {
        self.min.lerp(self.max, 0.5)
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn contains(&self, p: Vec3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// Point at fractional position `t` (each axis in [0, 1]) across the box.
    pub fn lerp_point(&self, t: Vec3) -> Vec3 {
        Vec3::new(
            self.min.x + (self.max.x - self.min.x) * t.x,
            self.min.y + (self.max.y - self.min.y) * t.y,
            self.min.z + (self.max.z - self.min.z) * t.z,
        )
    }

    /// Slab test. Returns the entry distance along `dir` (unit length expected),
    /// or `None` on a miss. A box containing the origin is never entered, so
    /// it is a miss too.
    pub fn ray_intersect(&self, origin: Vec3, dir: Vec3) -> Option<f64> {
        let mut t_entry = f64::NEG_INFINITY;
        let mut t_exit = f64::INFINITY;

        for (o, d, lo, hi) in [
            (origin.x, dir.x, self.min.x, self.max.x),
            (origin.y, dir.y, self.min.y, self.max.y),
            (origin.z, dir.z, self.min.z, self.max.z),
        ] {
            if d.abs() < EPSILON {
                // Parallel to this slab: must already be inside it
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d;
            let mut t0 = (lo - o) * inv;
            let mut t1 = (hi - o) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_entry = t_entry.max(t0);
            t_exit = t_exit.min(t1);
            if t_entry > t_exit {
                return None;
            }
        }

        if t_entry <= 0.0 {
            return None;
        }
        Some(t_entry)
    }
}
