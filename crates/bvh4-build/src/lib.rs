#![warn(missing_docs)]

//! Turning binary BVHs into quantized BVH4 node arrays.
//!
//! Building starts from an existing binary hierarchy held in a [`Bvh2`]
//! working table. The table is rewritten in place to four-wide form,
//! either by [`collapse`] (breadth-first leaf gathering per depth group)
//! or by [`promote_grandchildren`], and then laid out by [`encode`] as the
//! flat word array that `bvh4-raytrace` queries.
//!
//! # Example
//!
//! ```
//! use bvh4_build::{collapse, encode, Bvh2, DepthGroups, EncodeSettings};
//! use bvh4_math::Triangle;
//!
//! let triangles: Vec<Triangle> = (0..3)
//!     .map(|i| {
//!         let x = i as f32;
//!         Triangle::from_arrays([x, 0.0, 0.0], [x + 0.5, 0.0, 0.0], [x, 0.5, 0.0])
//!     })
//!     .collect();
//!
//! let mut bvh = Bvh2::new();
//! let a = bvh.push_leaf(vec![0]);
//! let b = bvh.push_leaf(vec![1]);
//! let c = bvh.push_leaf(vec![2]);
//! let ab = bvh.push_internal(a, b);
//! bvh.root = bvh.push_internal(ab, c);
//!
//! let groups = DepthGroups::from_root(&bvh)?;
//! collapse(&mut bvh, &groups, groups.max_depth().unwrap_or(0))?;
//! let encoded = encode(&bvh, &triangles, &EncodeSettings::default())?;
//!
//! assert_eq!(encoded.nodes.node_count(), 4);
//! assert_eq!(encoded.triangle_order, vec![2, 0, 1]);
//! # Ok::<(), bvh4_build::BuildError>(())
//! ```

pub mod collapse;
pub mod encode;
pub mod error;
pub mod tree;

pub use collapse::{collapse, promote_grandchildren, CollapseStats};
pub use encode::{encode, EncodeSettings, EncodeStats, EncodedBvh4};
pub use error::{BuildError, Result};
pub use tree::{Bvh2, DepthGroups, NodeId, NodeKind, WorkNode, INVALID};
