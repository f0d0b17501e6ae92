//! Error types for the tree builder.

use bvh4_codec::CodecError;
use thiserror::Error;

/// Errors that can occur while collapsing or encoding a tree.
#[derive(Error, Debug)]
pub enum BuildError {
    /// A node id points past the node table.
    #[error("node {node} is out of range for a table of {len} nodes")]
    NodeOutOfRange {
        /// Offending id.
        node: u32,
        /// Table length.
        len: usize,
    },

    /// A node was reached twice; the table is not a tree.
    #[error("node {0} is reachable along more than one path")]
    NotATree(u32),

    /// An internal node has no children.
    #[error("internal node {0} has no children")]
    ChildlessInternal(u32),

    /// The heap layout needs more slots than allowed.
    #[error("layout needs slot {slots} but at most {max} nodes are allowed")]
    TooManyNodes {
        /// Slot that did not fit.
        slots: u64,
        /// Configured node limit.
        max: u32,
    },

    /// A leaf references a triangle that does not exist.
    #[error("triangle {triangle} is out of range for {triangles} triangles")]
    TriangleOutOfRange {
        /// Offending triangle id.
        triangle: u32,
        /// Number of triangles supplied.
        triangles: usize,
    },

    /// A record could not be encoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// A working table could not be read or written as JSON.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid encoder settings.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

/// Result type for builder operations.
pub type Result<T> = std::result::Result<T, BuildError>;
