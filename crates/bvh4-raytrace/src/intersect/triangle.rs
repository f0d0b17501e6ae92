//! Ray-triangle intersection (Möller–Trumbore).

use bvh4_math::{Triangle, NO_HIT, TRIANGLE_EPSILON};

use crate::Ray;

/// A ray-triangle hit with its barycentric coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    /// Distance along the ray.
    pub t: f32,
    /// Weight of the second vertex.
    pub u: f32,
    /// Weight of the third vertex.
    pub v: f32,
}

/// Intersect a ray with a triangle, returning distance and barycentrics.
///
/// Both faces are hit; only near-parallel rays (|det| below
/// [`TRIANGLE_EPSILON`]) are rejected. Hits at or before the epsilon
/// distance are discarded so a ray leaving a surface does not hit it again.
#[inline]
pub fn intersect_triangle_uv(ray: &Ray, tri: &Triangle) -> Option<TriangleHit> {
    let e1 = tri.v[1] - tri.v[0];
    let e2 = tri.v[2] - tri.v[0];
    let p = ray.direction.cross(&e2);
    let det = e1.dot(&p);

    if det.abs() < TRIANGLE_EPSILON {
        return None;
    }

    let inv_det = 1.0 / det;
    let s = ray.origin - tri.v[0];
    let u = inv_det * s.dot(&p);
    if u < 0.0 || u > 1.0 {
        return None;
    }

    let q = s.cross(&e1);
    let v = inv_det * ray.direction.dot(&q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = inv_det * e2.dot(&q);
    (t > TRIANGLE_EPSILON).then_some(TriangleHit { t, u, v })
}

/// Distance to a triangle along the ray, or [`NO_HIT`].
#[inline]
pub fn intersect_triangle(ray: &Ray, tri: &Triangle) -> f32 {
    intersect_triangle_uv(ray, tri).map_or(NO_HIT, |hit| hit.t)
}
