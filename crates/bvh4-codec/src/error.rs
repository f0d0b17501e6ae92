//! Error types for the node codec.

use thiserror::Error;

/// Errors raised when packing, validating or exchanging node data.
#[derive(Error, Debug)]
pub enum CodecError {
    /// A leaf holds more triangles than the 3-bit count field can encode.
    #[error("leaf triangle count {0} exceeds the 3-bit field (max 7)")]
    TriangleCountOverflow(u32),

    /// The first triangle index does not fit in the 29-bit field.
    #[error("first triangle index {0} exceeds the 29-bit field")]
    TriangleIndexOverflow(u32),

    /// A node record lies past the end of the word array.
    #[error("node {index} is out of range (node count {node_count}, {words} words)")]
    NodeOutOfRange {
        /// Requested node index.
        index: u32,
        /// Node count stored in word 0.
        node_count: u32,
        /// Length of the word array.
        words: usize,
    },

    /// The word array is shorter than its node count promises.
    #[error("node array has {words} words but declares {node_count} nodes")]
    Truncated {
        /// Length of the word array.
        words: usize,
        /// Node count stored in word 0.
        node_count: u32,
    },

    /// The word array has no header word.
    #[error("node array is empty")]
    Empty,

    /// Byte buffer length is not a multiple of four.
    #[error("byte length {0} is not a whole number of 32-bit words")]
    ByteLength(usize),

    /// JSON interchange failed.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;
