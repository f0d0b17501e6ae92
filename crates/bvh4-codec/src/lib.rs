#![warn(missing_docs)]

//! Quantized BVH4 node format.
//!
//! Nodes are stored as a flat array of 32-bit words that a WGSL shader
//! decodes with `unpack2x16float`; this crate is the CPU side of that
//! contract and must stay bit-compatible with it.
//!
//! # Architecture
//!
//! - [`half`] - IEEE-754 binary16 conversion
//! - [`NodeRecord`] - one packed 4-word node, encode and decode
//! - [`NodeArray`] - the whole array, with JSON and byte interchange
//! - [`decode`] / [`decode_strict`] - index into raw words
//!
//! # Example
//!
//! ```
//! use bvh4_codec::{NodeArray, NodeRecord};
//!
//! let leaf = NodeRecord::encode([-1.0; 3], [1.0; 3], 0, 2).unwrap();
//! let nodes = NodeArray::from_records(&[leaf]);
//! let node = nodes.node(0);
//! assert!(node.valid && node.is_leaf());
//! assert_eq!(node.triangles(), 0..2);
//! ```

mod array;
pub mod error;
pub mod half;
mod node;

pub use array::NodeArray;
pub use error::{CodecError, Result};
pub use node::{
    decode, decode_strict, first_child, DecodedNode, NodeRecord, BRANCHING, COUNT_BITS,
    MAX_FIRST_TRIANGLE, MAX_LEAF_TRIANGLES, NODE_WORDS,
};
