//! Nearest-hit traversal of a quantized BVH4.
//!
//! The walk is iterative over a [`TraversalStack`]. Each popped node is
//! decoded, box-tested, and either pruned, intersected (leaf) or expanded
//! (internal). Equal distances go to the lower triangle index, and boxes
//! entered exactly at the current hit distance are still opened, so the
//! result is independent of the order children are visited in; only the
//! visit counters change.

use std::convert::Infallible;

use bvh4_codec::{decode, decode_strict, first_child, DecodedNode, BRANCHING};
use bvh4_math::{Point3, Triangle, Vec3, NO_HIT};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TraversalError};
use crate::intersect::{intersect_aabb, intersect_triangle};
use crate::stack::TraversalStack;
use crate::{ChildOrder, Ray, TraversalSettings};

/// Closest triangle hit, or none.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClosestHit {
    /// Index of the hit triangle in the triangle array.
    pub triangle: Option<u32>,
    /// Hit distance, [`NO_HIT`] when nothing was hit.
    pub distance: f32,
}

impl ClosestHit {
    /// Nothing hit.
    pub const MISS: Self = Self {
        triangle: None,
        distance: NO_HIT,
    };
}

/// Outcome of one ray query, with per-query counters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraversalResult {
    /// Nodes popped from the stack, including invalid and pruned ones.
    pub nodes_visited: u32,
    /// Leaves whose triangles were tested.
    pub leaf_nodes_visited: u32,
    /// Ray/box kernel invocations.
    pub box_tests: u32,
    /// Index of the closest hit triangle.
    pub hit_triangle: Option<u32>,
    /// Distance to the closest hit, [`NO_HIT`] on a miss.
    pub distance: f32,
}

impl TraversalResult {
    fn start() -> Self {
        Self {
            nodes_visited: 0,
            leaf_nodes_visited: 0,
            box_tests: 0,
            hit_triangle: None,
            distance: NO_HIT,
        }
    }

    /// True if a triangle was hit.
    pub fn is_hit(&self) -> bool {
        self.hit_triangle.is_some()
    }

    /// The hit, without the counters.
    pub fn closest(&self) -> ClosestHit {
        ClosestHit {
            triangle: self.hit_triangle,
            distance: self.distance,
        }
    }
}

/// Query the tree with default settings.
///
/// `words` is the flat node array (word 0 = node count). Damaged nodes
/// and out-of-range triangle references are skipped.
pub fn traverse(words: &[u32], triangles: &[Triangle], origin: Point3, direction: Vec3) -> TraversalResult {
    traverse_with(words, triangles, &Ray::new(origin, direction), &TraversalSettings::default())
}

/// Query the tree, skipping damaged nodes and triangle references.
pub fn traverse_with(
    words: &[u32],
    triangles: &[Triangle],
    ray: &Ray,
    settings: &TraversalSettings,
) -> TraversalResult {
    match walk::<Lenient>(words, triangles, ray, settings) {
        Ok(result) => result,
        Err(never) => match never {},
    }
}

/// Query the tree, failing on the first damaged node or triangle reference.
///
/// Meant for validating freshly built trees and for tests; nodes the
/// header declares but the array does not hold are errors here.
pub fn traverse_strict(
    words: &[u32],
    triangles: &[Triangle],
    ray: &Ray,
    settings: &TraversalSettings,
) -> Result<TraversalResult> {
    walk::<Strict>(words, triangles, ray, settings)
}

/// Closest hit by testing every triangle in order.
///
/// Reference answer for traversal; on an exact tie the lowest index wins.
pub fn closest_hit_linear(triangles: &[Triangle], ray: &Ray) -> ClosestHit {
    let mut best = ClosestHit::MISS;
    for (i, tri) in triangles.iter().enumerate() {
        let t = intersect_triangle(ray, tri);
        if t < best.distance {
            best = ClosestHit {
                triangle: Some(i as u32),
                distance: t,
            };
        }
    }
    best
}

#[inline]
fn culled(distance: f32, closest: f32, prune: bool) -> bool {
    distance >= NO_HIT || (prune && distance > closest)
}

/// How a walk reacts to damaged nodes and triangle references.
trait Faults {
    type Error;

    fn node(words: &[u32], index: u32) -> std::result::Result<DecodedNode, Self::Error>;

    fn missing_triangle(node: u32, triangle: u32, triangles: usize) -> std::result::Result<(), Self::Error>;
}

/// Skip what cannot be read.
struct Lenient;

impl Faults for Lenient {
    type Error = Infallible;

    #[inline]
    fn node(words: &[u32], index: u32) -> std::result::Result<DecodedNode, Infallible> {
        Ok(decode(words, index))
    }

    fn missing_triangle(node: u32, triangle: u32, _triangles: usize) -> std::result::Result<(), Infallible> {
        debug!("leaf {node} references missing triangle {triangle}, skipping rest of leaf");
        Ok(())
    }
}

/// Stop at the first fault.
struct Strict;

impl Faults for Strict {
    type Error = TraversalError;

    #[inline]
    fn node(words: &[u32], index: u32) -> Result<DecodedNode> {
        Ok(decode_strict(words, index)?)
    }

    fn missing_triangle(node: u32, triangle: u32, triangles: usize) -> Result<()> {
        Err(TraversalError::TriangleOutOfRange {
            node,
            triangle,
            triangles,
        })
    }
}

fn walk<F: Faults>(
    words: &[u32],
    triangles: &[Triangle],
    ray: &Ray,
    settings: &TraversalSettings,
) -> std::result::Result<TraversalResult, F::Error> {
    let node_count = words.first().copied().unwrap_or(0) as u64;
    let mut result = TraversalResult::start();
    let mut stack = TraversalStack::new();
    stack.push(0);

    while let Some(index) = stack.pop() {
        result.nodes_visited += 1;

        let node = F::node(words, index)?;
        if !node.valid {
            continue;
        }

        result.box_tests += 1;
        let d = intersect_aabb(ray, &node.min, &node.max);
        if culled(d, result.distance, settings.prune) {
            continue;
        }

        if node.is_leaf() {
            result.leaf_nodes_visited += 1;
            for tri in node.triangles() {
                let Some(triangle) = triangles.get(tri as usize) else {
                    F::missing_triangle(index, tri, triangles.len())?;
                    break;
                };
                let t = intersect_triangle(ray, triangle);
                let closer = t < result.distance
                    || (t == result.distance && result.hit_triangle.is_some_and(|hit| tri < hit));
                if closer {
                    result.distance = t;
                    result.hit_triangle = Some(tri);
                }
            }
            continue;
        }

        let first = first_child(index);
        let children = (first..first + BRANCHING as u64).filter(|&c| c < node_count);

        match settings.child_order {
            ChildOrder::Sequential => {
                for child in children {
                    stack.push(child as u32);
                }
            }
            ChildOrder::NearFirst => {
                let mut near = [(0.0f32, 0u32); BRANCHING as usize];
                let mut n = 0;
                for child in children {
                    let child = child as u32;
                    let node = F::node(words, child)?;
                    if !node.valid {
                        continue;
                    }
                    result.box_tests += 1;
                    let d = intersect_aabb(ray, &node.min, &node.max);
                    if culled(d, result.distance, settings.prune) {
                        continue;
                    }
                    near[n] = (d, child);
                    n += 1;
                }
                near[..n].sort_by(|a, b| a.0.total_cmp(&b.0));
                for &(_, child) in near[..n].iter().rev() {
                    stack.push(child);
                }
            }
        }
    }

    Ok(result)
}
