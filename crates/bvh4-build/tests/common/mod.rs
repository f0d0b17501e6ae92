//! Shared helpers for the build pipeline tests.

#![allow(dead_code)]

use bvh4_build::{Bvh2, NodeId};
use bvh4_math::{Aabb, Point3, Triangle};
use bvh4_raytrace::Ray;

/// Binary tree by recursive median split on the longest centroid axis.
pub fn median_split(triangles: &[Triangle], max_leaf: usize) -> Bvh2 {
    let mut bvh = Bvh2::new();
    if !triangles.is_empty() {
        let mut ids: Vec<u32> = (0..triangles.len() as u32).collect();
        bvh.root = split(&mut bvh, triangles, &mut ids, max_leaf);
    }
    bvh
}

fn split(bvh: &mut Bvh2, triangles: &[Triangle], ids: &mut [u32], max_leaf: usize) -> NodeId {
    if ids.len() <= max_leaf {
        return bvh.push_leaf(ids.to_vec());
    }

    let mut centroids = Aabb::empty();
    for &id in ids.iter() {
        centroids.include_point(&triangles[id as usize].centroid());
    }
    let axis = centroids.extent().imax();
    ids.sort_by(|&a, &b| {
        let ca = triangles[a as usize].centroid()[axis];
        let cb = triangles[b as usize].centroid()[axis];
        ca.total_cmp(&cb)
    });

    let mid = ids.len() / 2;
    let (left, right) = ids.split_at_mut(mid);
    let left = split(bvh, triangles, left, max_leaf);
    let right = split(bvh, triangles, right, max_leaf);
    bvh.push_internal(left, right)
}

/// Small triangles scattered through the cube `[-1, 1]^3`.
pub fn random_triangles(rng: &mut oorandom::Rand32, count: usize) -> Vec<Triangle> {
    let mut coord = |scale: f32| (rng.rand_float() * 2.0 - 1.0) * scale;
    (0..count)
        .map(|_| {
            let c = Point3::new(coord(0.9), coord(0.9), coord(0.9));
            let mut vertex = || Point3::new(c.x + coord(0.2), c.y + coord(0.2), c.z + coord(0.2));
            Triangle::new(vertex(), vertex(), vertex())
        })
        .collect()
}

/// A ray from outside the cube aimed at a random point inside it.
pub fn random_ray(rng: &mut oorandom::Rand32) -> Ray {
    let mut coord = |scale: f32| (rng.rand_float() * 2.0 - 1.0) * scale;
    let origin = Point3::new(coord(3.0), coord(3.0), coord(3.0));
    let target = Point3::new(coord(1.0), coord(1.0), coord(1.0));
    Ray::new(origin, target - origin)
}
