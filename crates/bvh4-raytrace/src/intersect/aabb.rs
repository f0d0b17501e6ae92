//! Ray-box slab test.

use bvh4_math::{DIRECTION_EPSILON, NO_HIT};

use crate::Ray;

/// Distance at which `ray` enters the box `min..max`.
///
/// Returns the entry distance clamped to zero when the ray starts inside,
/// or [`NO_HIT`] when the box is missed or lies entirely behind the
/// origin. Never returns a negative distance or NaN for finite input.
///
/// On an axis the ray does not move along, the slab is either the whole
/// line (origin within `min..=max`, faces included) or empty.
#[inline]
pub fn intersect_aabb(ray: &Ray, min: &[f32; 3], max: &[f32; 3]) -> f32 {
    let o = &ray.origin;
    let d = &ray.direction;
    let inv = ray.inv_direction();

    let (t1x, t2x) = slab(o.x, d.x, inv.x, min[0], max[0]);
    let (t1y, t2y) = slab(o.y, d.y, inv.y, min[1], max[1]);
    let (t1z, t2z) = slab(o.z, d.z, inv.z, min[2], max[2]);

    let t_min = t1x.max(t1y).max(t1z);
    let t_max = t2x.min(t2y).min(t2z);

    let entry = t_min.max(0.0);
    if t_max >= entry {
        entry
    } else {
        NO_HIT
    }
}

/// Entry and exit distance of one axis slab.
#[inline]
fn slab(o: f32, d: f32, inv: f32, min: f32, max: f32) -> (f32, f32) {
    if d.abs() > DIRECTION_EPSILON {
        let t1 = (min - o) * inv;
        let t2 = (max - o) * inv;
        (t1.min(t2), t1.max(t2))
    } else if min <= o && o <= max {
        (f32::NEG_INFINITY, f32::INFINITY)
    } else {
        (f32::INFINITY, f32::NEG_INFINITY)
    }
}
