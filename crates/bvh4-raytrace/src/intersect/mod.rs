//! Ray intersection kernels.
//!
//! Both kernels are pure and allocation-free, and report a miss with the
//! [`NO_HIT`](bvh4_math::NO_HIT) sentinel rather than an `Option`, so the
//! traversal loop can compare distances without branching on the result.

mod aabb;
mod triangle;

pub use aabb::intersect_aabb;
pub use triangle::{intersect_triangle, intersect_triangle_uv, TriangleHit};
