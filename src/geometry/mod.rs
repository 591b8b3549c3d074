use crate::{Vec3f, Point3f, Float};
use cgmath::prelude::*;
use std::ops::{Deref, Neg};

pub mod bounds;

pub use bounds::*;

pub fn distance(p1: Point3f, p2: Point3f) -> Float {
    (p1 - p2).magnitude()
}

#[derive(Clone, Copy, Debug)]
pub struct Ray {
    pub origin: Point3f,
    pub dir: Vec3f,
    pub t_min: Float,
    pub t_max: Float,

    /// Number of scattering events along the path that produced this ray.
    pub depth: u16,
}

impl Ray {
    pub fn new(origin: Point3f, dir: Vec3f) -> Self {
        Self {
            origin, dir, t_min: 0.0, t_max: std::f32::INFINITY, depth: 0
        }
    }

    /// A ray that only considers hits with `t` in `[t_min, t_max]`.
    pub fn segment(origin: Point3f, dir: Vec3f, t_min: Float, t_max: Float) -> Self {
        Self { origin, dir, t_min, t_max, depth: 0 }
    }

    pub fn with_depth(mut self, depth: u16) -> Self {
        self.depth = depth;
        self
    }

    pub fn at(&self, t: Float) -> Point3f {
        self.origin + (self.dir * t)
    }

    pub fn contains(&self, t: Float) -> bool {
        t > self.t_min && t < self.t_max
    }
}


#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Normal3(pub Vec3f);

impl Normal3 {
    pub fn new(x: Float, y: Float, z: Float) -> Self {
        Self(Vec3f::new(x, y, z))
    }

    pub fn faceforward(self, v: Vec3f) -> Self {
        if self.dot(v) < 0.0 {
            Self(-self.0)
        } else {
            self
        }
    }
}

impl Deref for Normal3 {
    type Target = Vec3f;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Neg for Normal3 {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl From<Vec3f> for Normal3 {
    fn from(v: Vec3f) -> Self {
        Self(v)
    }
}

impl From<Normal3> for Vec3f {
    fn from(n: Normal3) -> Self {
        n.0
    }
}
