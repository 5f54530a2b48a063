//! [`Position3d`] – a point in the depth sensor's rectangular frame.
//!
//! Units are metres. The sensor convention is `x` to the right, `y` up and
//! `z` away from the camera.

use std::f64::consts::TAU;
use std::ops::{Add, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

/// A 3-D position (or displacement) in rectangular coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position3d {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position3d {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// The origin.
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Build a position from spherical coordinates: radius `r`, polar angle
    /// `theta` measured from +z and azimuth `phi` measured from +x towards +y.
    pub fn from_spherical(r: f64, theta: f64, phi: f64) -> Self {
        Self::new(
            r * theta.sin() * phi.cos(),
            r * theta.sin() * phi.sin(),
            r * theta.cos(),
        )
    }

    pub fn dot(self, rhs: Self) -> f64 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    pub fn cross(self, rhs: Self) -> Self {
        Self::new(
            self.y * rhs.z - self.z * rhs.y,
            self.z * rhs.x - self.x * rhs.z,
            self.x * rhs.y - self.y * rhs.x,
        )
    }

    /// Euclidean norm.
    pub fn magnitude(self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Unsigned angle between two vectors in `[0, π]`.
    ///
    /// Returns `0.0` when either vector has zero length, since the angle is
    /// undefined there.
    pub fn angle_between(self, rhs: Self) -> f64 {
        let denom = self.magnitude() * rhs.magnitude();
        if denom == 0.0 {
            return 0.0;
        }
        // Rounding can push the cosine a hair outside [-1, 1].
        (self.dot(rhs) / denom).clamp(-1.0, 1.0).acos()
    }

    /// Spherical radius (same as [`magnitude`][Self::magnitude]).
    pub fn r(self) -> f64 {
        self.magnitude()
    }

    /// Cylindrical radius: distance from the z axis.
    pub fn rho(self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Azimuth from +x towards +y, normalised to `[0, 2π)`.
    pub fn phi(self) -> f64 {
        let phi = self.y.atan2(self.x);
        if phi < 0.0 { phi + TAU } else { phi }
    }

    /// Polar angle from +z in `[0, π]`.
    pub fn theta(self) -> f64 {
        let r = self.r();
        if r == 0.0 {
            return 0.0;
        }
        (self.z / r).clamp(-1.0, 1.0).acos()
    }

    /// Whether every component is finite.
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Position3d {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Position3d {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Position3d {
    type Output = Self;

    fn mul(self, k: f64) -> Self {
        Self::new(self.x * k, self.y * k, self.z * k)
    }
}

impl Neg for Position3d {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}
