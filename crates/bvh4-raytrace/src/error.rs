//! Error types for strict traversal.

use bvh4_codec::CodecError;
use thiserror::Error;

/// Faults in a node array found by strict traversal.
///
/// Lenient traversal never reports these; it skips the damaged node or
/// triangle reference instead.
#[derive(Error, Debug)]
pub enum TraversalError {
    /// A node could not be decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// A leaf references a triangle past the end of the triangle array.
    #[error("leaf {node} references triangle {triangle} but only {triangles} exist")]
    TriangleOutOfRange {
        /// Leaf node index.
        node: u32,
        /// Offending triangle index.
        triangle: u32,
        /// Length of the triangle array.
        triangles: usize,
    },
}

/// Result type for strict traversal.
pub type Result<T> = std::result::Result<T, TraversalError>;
