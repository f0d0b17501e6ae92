//! Flat node arrays and their interchange formats.

use serde::{Deserialize, Serialize};

use crate::error::{CodecError, Result};
use crate::node::{decode, decode_strict, DecodedNode, NodeRecord, NODE_WORDS};

/// A quantized BVH4 as a flat array of 32-bit words.
///
/// Word 0 holds the node count, followed by one [`NodeRecord`] per node.
/// The array is immutable once built; ray queries share it read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeArray {
    words: Vec<u32>,
}

impl NodeArray {
    /// Wrap raw words without checking them.
    ///
    /// Queries tolerate truncated arrays; use [`NodeArray::validate`] to
    /// reject them up front.
    pub fn from_words(words: Vec<u32>) -> Self {
        Self { words }
    }

    /// Build an array from records, setting the node count header.
    pub fn from_records(records: &[NodeRecord]) -> Self {
        let mut words = Vec::with_capacity(1 + records.len() * NODE_WORDS);
        words.push(records.len() as u32);
        words.extend_from_slice(bytemuck::cast_slice(records));
        Self { words }
    }

    /// Parse the JSON array-of-integers interchange form.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to the JSON array-of-integers interchange form.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Read little-endian words from a byte buffer.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() % 4 != 0 {
            return Err(CodecError::ByteLength(bytes.len()));
        }
        let words = bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Ok(Self { words })
    }

    /// Little-endian byte stream of the words, as written to disk.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    /// Native-endian view of the words for GPU upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.words)
    }

    /// The raw words, header included.
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Node count stored in the header, zero for an empty array.
    pub fn node_count(&self) -> u32 {
        self.words.first().copied().unwrap_or(0)
    }

    /// Number of words, header included.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// True if the array has no header word.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Decode node `index`; out-of-range nodes decode as absent.
    pub fn node(&self, index: u32) -> DecodedNode {
        decode(&self.words, index)
    }

    /// Decode node `index`, failing if it lies past the array.
    pub fn node_strict(&self, index: u32) -> Result<DecodedNode> {
        decode_strict(&self.words, index)
    }

    /// Raw record of node `index`.
    pub fn record(&self, index: u32) -> Option<NodeRecord> {
        let base = 1 + index as usize * NODE_WORDS;
        NodeRecord::from_words(self.words.get(base..base + NODE_WORDS)?)
    }

    /// Check that the array holds exactly the records its header declares.
    pub fn validate(&self) -> Result<()> {
        let node_count = match self.words.first() {
            Some(&n) => n,
            None => return Err(CodecError::Empty),
        };
        if self.words.len() != 1 + node_count as usize * NODE_WORDS {
            return Err(CodecError::Truncated {
                words: self.words.len(),
                node_count,
            });
        }
        Ok(())
    }

    /// Iterate over `(index, node)` for every declared node.
    pub fn iter(&self) -> impl Iterator<Item = (u32, DecodedNode)> + '_ {
        (0..self.node_count()).map(move |i| (i, self.node(i)))
    }
}

impl From<Vec<u32>> for NodeArray {
    fn from(words: Vec<u32>) -> Self {
        Self::from_words(words)
    }
}

impl AsRef<[u32]> for NodeArray {
    fn as_ref(&self) -> &[u32] {
        &self.words
    }
}
