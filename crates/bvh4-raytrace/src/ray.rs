//! Ray representation.

use bvh4_math::{Aabb, Point3, Vec3, DIRECTION_EPSILON, NO_HIT};
use serde::{Deserialize, Serialize};

use crate::intersect::intersect_aabb;

/// A ray in 3D space defined by origin and direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ray {
    /// Origin point of the ray.
    pub origin: Point3,
    /// Unit direction of the ray.
    pub direction: Vec3,
    /// Precomputed reciprocal of direction components for slab tests.
    inv_direction: Vec3,
}

impl Ray {
    /// Create a new ray from origin and direction.
    ///
    /// The direction will be normalized. Components whose magnitude is
    /// below [`DIRECTION_EPSILON`] get a reciprocal of [`NO_HIT`] rather
    /// than a signed infinity, which keeps the slab test free of NaNs.
    ///
    /// A zero direction is kept as is. Such a ray hits no triangle, so
    /// every query with it reports a miss.
    pub fn new(origin: Point3, direction: Vec3) -> Self {
        let direction = direction.try_normalize(0.0).unwrap_or(direction);
        let inv = |d: f32| if d.abs() > DIRECTION_EPSILON { 1.0 / d } else { NO_HIT };
        Self {
            origin,
            direction,
            inv_direction: Vec3::new(inv(direction.x), inv(direction.y), inv(direction.z)),
        }
    }

    /// Create a ray from raw coordinate triples.
    pub fn from_arrays(origin: [f32; 3], direction: [f32; 3]) -> Self {
        Self::new(Point3::from(origin), Vec3::from(direction))
    }

    /// Reciprocal direction used by the slab test.
    #[inline]
    pub fn inv_direction(&self) -> &Vec3 {
        &self.inv_direction
    }

    /// Evaluate the ray at parameter `t`: `origin + t * direction`.
    #[inline]
    pub fn at(&self, t: f32) -> Point3 {
        self.origin + self.direction * t
    }

    /// Entry distance into `aabb`, or `None` if the ray misses it.
    ///
    /// A ray starting inside the box enters at distance zero.
    pub fn intersect_aabb(&self, aabb: &Aabb) -> Option<f32> {
        let t = intersect_aabb(self, &aabb.min_array(), &aabb.max_array());
        bvh4_math::is_hit(t).then_some(t)
    }
}
