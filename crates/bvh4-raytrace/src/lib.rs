#![warn(missing_docs)]

//! Nearest-hit ray queries over a quantized BVH4.
//!
//! The tree is a flat array of 32-bit words (see [`bvh4_codec`]); nodes
//! are decoded on the fly while an explicit stack walks the hierarchy.
//! Queries are read-only over the node words and triangles, so any number
//! of them can run in parallel against one [`Scene`].
//!
//! # Architecture
//!
//! - [`Ray`] - Ray with precomputed reciprocal direction
//! - [`intersect`] - Ray/box slab test and Möller–Trumbore ray/triangle test
//! - [`traverse`] - Stack-based nearest-hit traversal
//! - [`Scene`] - Owned node array and triangles with batch tracing
//!
//! # Example
//!
//! ```
//! use bvh4_codec::{NodeArray, NodeRecord};
//! use bvh4_math::{Point3, Triangle, Vec3};
//! use bvh4_raytrace::traverse;
//!
//! let tri = Triangle::from_arrays([-1.0, -1.0, 0.0], [1.0, -1.0, 0.0], [0.0, 1.0, 0.0]);
//! let nodes = NodeArray::from_records(&[NodeRecord::leaf(&tri.aabb(), 0, 1).unwrap()]);
//!
//! let result = traverse(
//!     nodes.words(),
//!     &[tri],
//!     Point3::new(0.0, 0.0, 2.5),
//!     Vec3::new(0.0, 0.0, -1.0),
//! );
//! assert_eq!(result.hit_triangle, Some(0));
//! assert_eq!(result.distance, 2.5);
//! ```

pub mod error;
pub mod intersect;
mod ray;
mod scene;
mod stack;
mod traverse;

use serde::{Deserialize, Serialize};

pub use error::{Result, TraversalError};
pub use ray::Ray;
pub use scene::Scene;
pub use stack::{TraversalStack, STACK_SIZE};
pub use traverse::{closest_hit_linear, traverse, traverse_strict, traverse_with, ClosestHit, TraversalResult};

/// Order in which an internal node's children are pushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChildOrder {
    /// Push children by slot; the last slot is popped first.
    Sequential,
    /// Box-test children first and pop the nearest first.
    #[default]
    NearFirst,
}

/// Settings for a ray query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraversalSettings {
    /// How children are ordered on the stack.
    pub child_order: ChildOrder,
    /// Skip boxes entered farther away than the current hit.
    ///
    /// Disabling this only culls boxes the ray misses outright. The hit
    /// is unchanged either way; only the visit counters differ.
    pub prune: bool,
}

impl Default for TraversalSettings {
    fn default() -> Self {
        Self {
            child_order: ChildOrder::NearFirst,
            prune: true,
        }
    }
}
