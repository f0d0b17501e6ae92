#![warn(missing_docs)]

//! Math types for the bvh4 ray query stack.
//!
//! Thin wrappers around nalgebra providing the single-precision types
//! the quantized BVH4 works in: points, vectors, axis-aligned boxes,
//! triangles, and the sentinel and tolerance constants shared by the
//! codec, the intersection kernels and the builder.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f32>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f32>;

/// Distance reported when nothing was intersected.
///
/// Matches the value the GPU shader uses, so results compare bit-for-bit.
pub const NO_HIT: f32 = 1e30;

/// Direction components with a smaller magnitude are treated as zero
/// when precomputing the reciprocal direction.
pub const DIRECTION_EPSILON: f32 = 1e-8;

/// Determinant and distance threshold of the ray/triangle test.
pub const TRIANGLE_EPSILON: f32 = 1e-7;

/// Returns true if `t` is a real hit distance rather than [`NO_HIT`].
#[inline]
pub fn is_hit(t: f32) -> bool {
    t < NO_HIT
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Point3,
    /// Maximum corner.
    pub max: Point3,
}

impl Aabb {
    /// Create an AABB from min and max corners.
    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    /// Create an empty (inverted) AABB suitable for expansion.
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Point3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    /// True if `min <= max` on every axis.
    ///
    /// An empty box, or one with a NaN bound, is not valid.
    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }

    /// Expand this AABB to include a point.
    pub fn include_point(&mut self, p: &Point3) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    /// Expand this AABB to include another box. Empty boxes are ignored.
    pub fn include_aabb(&mut self, other: &Aabb) {
        if other.is_valid() {
            self.include_point(&other.min);
            self.include_point(&other.max);
        }
    }

    /// Smallest box containing both inputs.
    pub fn union(&self, other: &Aabb) -> Aabb {
        let mut out = *self;
        out.include_aabb(other);
        out
    }

    /// True if `p` lies inside or on the boundary of the box.
    pub fn contains_point(&self, p: &Point3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// True if `other` lies entirely inside this box.
    pub fn contains_aabb(&self, other: &Aabb) -> bool {
        self.contains_point(&other.min) && self.contains_point(&other.max)
    }

    /// Box center.
    pub fn center(&self) -> Point3 {
        nalgebra::center(&self.min, &self.max)
    }

    /// Extent along each axis.
    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    /// Min corner as an array, in x, y, z order.
    pub fn min_array(&self) -> [f32; 3] {
        [self.min.x, self.min.y, self.min.z]
    }

    /// Max corner as an array, in x, y, z order.
    pub fn max_array(&self) -> [f32; 3] {
        [self.max.x, self.max.y, self.max.z]
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

/// A triangle given by its three vertex positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Triangle {
    /// Vertex positions.
    pub v: [Point3; 3],
}

impl Triangle {
    /// Create a triangle from three vertices.
    pub fn new(v0: Point3, v1: Point3, v2: Point3) -> Self {
        Self { v: [v0, v1, v2] }
    }

    /// Create a triangle from raw coordinate triples.
    pub fn from_arrays(v0: [f32; 3], v1: [f32; 3], v2: [f32; 3]) -> Self {
        Self::new(Point3::from(v0), Point3::from(v1), Point3::from(v2))
    }

    /// Bounding box of the three vertices.
    pub fn aabb(&self) -> Aabb {
        let mut aabb = Aabb::empty();
        for p in &self.v {
            aabb.include_point(p);
        }
        aabb
    }

    /// Vertex average.
    pub fn centroid(&self) -> Point3 {
        Point3::from((self.v[0].coords + self.v[1].coords + self.v[2].coords) / 3.0)
    }

    /// Point at barycentric coordinates `(u, v)`: `(1 - u - v) v0 + u v1 + v v2`.
    pub fn point_at(&self, u: f32, v: f32) -> Point3 {
        let w = 1.0 - u - v;
        Point3::from(self.v[0].coords * w + self.v[1].coords * u + self.v[2].coords * v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_empty_aabb_is_invalid() {
        assert!(!Aabb::empty().is_valid());
        assert!(Aabb::new(Point3::origin(), Point3::origin()).is_valid());
    }

    #[test]
    fn test_nan_bound_is_invalid() {
        let aabb = Aabb::new(Point3::new(f32::NAN, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        assert!(!aabb.is_valid());
    }

    #[test]
    fn test_union_ignores_empty() {
        let a = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        assert_eq!(a.union(&Aabb::empty()), a);
        let b = Aabb::new(Point3::new(-1.0, 0.5, 0.5), Point3::new(0.5, 2.0, 0.5));
        let u = a.union(&b);
        assert_eq!(u.min, Point3::new(-1.0, 0.0, 0.0));
        assert_eq!(u.max, Point3::new(1.0, 2.0, 1.0));
        assert!(u.contains_aabb(&a));
        assert!(u.contains_aabb(&b));
    }

    #[test]
    fn test_triangle_aabb() {
        let tri = Triangle::from_arrays([0.0, 0.0, 0.0], [2.0, -1.0, 0.0], [1.0, 3.0, 0.5]);
        let aabb = tri.aabb();
        assert_eq!(aabb.min, Point3::new(0.0, -1.0, 0.0));
        assert_eq!(aabb.max, Point3::new(2.0, 3.0, 0.5));
    }

    #[test]
    fn test_point_at_vertices() {
        let tri = Triangle::from_arrays([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        assert_eq!(tri.point_at(0.0, 0.0), tri.v[0]);
        assert_eq!(tri.point_at(1.0, 0.0), tri.v[1]);
        assert_eq!(tri.point_at(0.0, 1.0), tri.v[2]);
        let c = tri.centroid();
        assert_relative_eq!(c.x, 1.0 / 3.0);
        assert_relative_eq!(c.y, 1.0 / 3.0);
    }

    #[test]
    fn test_is_hit() {
        assert!(is_hit(0.0));
        assert!(is_hit(1e29));
        assert!(!is_hit(NO_HIT));
    }
}
