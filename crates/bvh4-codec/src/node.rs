//! Packed BVH4 node records.
//!
//! A record is four 32-bit words:
//!
//! | word | low 16 bits | high 16 bits |
//! |------|-------------|--------------|
//! | 0    | min.x       | min.y        |
//! | 1    | min.z       | max.x        |
//! | 2    | max.y       | max.z        |
//! | 3    | `first_triangle << 3 \| triangle_count` ||
//!
//! A count of zero marks an internal node whose children are the records
//! at `4 * i + 1 ..= 4 * i + 4`; children are computed, never stored.

use bytemuck::{Pod, Zeroable};
use bvh4_math::{Aabb, Point3};
use serde::{Deserialize, Serialize};

use crate::error::{CodecError, Result};
use crate::half::{
    f16_bits_to_f32, f32_to_f16_bits, f32_to_f16_bits_down, f32_to_f16_bits_up, pack_2x16_bits,
    F16_INFINITY, F16_NEG_INFINITY,
};

/// Words per node record.
pub const NODE_WORDS: usize = 4;

/// Maximum children of an internal node.
pub const BRANCHING: u32 = 4;

/// Bits used by the triangle count field.
pub const COUNT_BITS: u32 = 3;

/// Largest triangle count a single leaf can carry.
pub const MAX_LEAF_TRIANGLES: u32 = (1 << COUNT_BITS) - 1;

/// Largest first-triangle index that fits beside the count field.
pub const MAX_FIRST_TRIANGLE: u32 = u32::MAX >> COUNT_BITS;

/// Index of the first child record of node `index`.
#[inline]
pub fn first_child(index: u32) -> u64 {
    index as u64 * BRANCHING as u64 + 1
}

/// GPU-compatible packed node record.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize)]
pub struct NodeRecord {
    /// The four packed words.
    pub words: [u32; 4],
}

impl NodeRecord {
    /// Pack bounds and a triangle range, rounding bounds to nearest even.
    ///
    /// Leaves must carry at most [`MAX_LEAF_TRIANGLES`] triangles.
    pub fn encode(min: [f32; 3], max: [f32; 3], first_triangle: u32, triangle_count: u32) -> Result<Self> {
        let min = min.map(f32_to_f16_bits);
        let max = max.map(f32_to_f16_bits);
        Self::from_half_bits(min, max, first_triangle, triangle_count)
    }

    /// Pack bounds so that the decoded box always contains `min..max`.
    ///
    /// Minimums round towards negative infinity and maximums towards
    /// positive infinity.
    pub fn encode_conservative(
        min: [f32; 3],
        max: [f32; 3],
        first_triangle: u32,
        triangle_count: u32,
    ) -> Result<Self> {
        let min = min.map(f32_to_f16_bits_down);
        let max = max.map(f32_to_f16_bits_up);
        Self::from_half_bits(min, max, first_triangle, triangle_count)
    }

    /// Internal node covering `aabb`, quantized conservatively.
    pub fn internal(aabb: &Aabb) -> Self {
        Self::from_parts(
            aabb.min_array().map(f32_to_f16_bits_down),
            aabb.max_array().map(f32_to_f16_bits_up),
            0,
        )
    }

    /// Leaf covering `aabb` that references `count` triangles from `first`.
    pub fn leaf(aabb: &Aabb, first: u32, count: u32) -> Result<Self> {
        Self::encode_conservative(aabb.min_array(), aabb.max_array(), first, count)
    }

    /// A record that always decodes as invalid.
    ///
    /// Used for unused child slots; min is +inf and max is -inf.
    pub fn dead() -> Self {
        Self::from_parts([F16_INFINITY; 3], [F16_NEG_INFINITY; 3], 0)
    }

    fn from_half_bits(min: [u16; 3], max: [u16; 3], first_triangle: u32, triangle_count: u32) -> Result<Self> {
        if triangle_count > MAX_LEAF_TRIANGLES {
            return Err(CodecError::TriangleCountOverflow(triangle_count));
        }
        if first_triangle > MAX_FIRST_TRIANGLE {
            return Err(CodecError::TriangleIndexOverflow(first_triangle));
        }
        Ok(Self::from_parts(min, max, first_triangle << COUNT_BITS | triangle_count))
    }

    fn from_parts(min: [u16; 3], max: [u16; 3], meta: u32) -> Self {
        Self {
            words: [
                pack_2x16_bits(min[0], min[1]),
                pack_2x16_bits(min[2], max[0]),
                pack_2x16_bits(max[1], max[2]),
                meta,
            ],
        }
    }

    /// Build a record from a slice of exactly four words.
    pub fn from_words(words: &[u32]) -> Option<Self> {
        let words: [u32; 4] = words.try_into().ok()?;
        Some(Self { words })
    }

    /// Unpack the record.
    pub fn decode(&self) -> DecodedNode {
        let [w0, w1, w2, meta] = self.words;
        let half = |w: u32, hi: bool| f16_bits_to_f32(if hi { (w >> 16) as u16 } else { w as u16 });

        let min = [half(w0, false), half(w0, true), half(w1, false)];
        let max = [half(w1, true), half(w2, false), half(w2, true)];
        let valid = min[0] <= max[0] && min[1] <= max[1] && min[2] <= max[2];

        DecodedNode {
            valid,
            min,
            max,
            first_triangle: meta >> COUNT_BITS,
            triangle_count: meta & MAX_LEAF_TRIANGLES,
        }
    }
}

/// A node record unpacked to full precision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodedNode {
    /// `min <= max` on every axis. Invalid nodes must be skipped.
    pub valid: bool,
    /// Minimum corner.
    pub min: [f32; 3],
    /// Maximum corner.
    pub max: [f32; 3],
    /// First triangle of a leaf's range.
    pub first_triangle: u32,
    /// Number of triangles; zero for internal nodes.
    pub triangle_count: u32,
}

impl DecodedNode {
    /// The "no such node" value: invalid with every field zeroed.
    pub const ABSENT: Self = Self {
        valid: false,
        min: [0.0; 3],
        max: [0.0; 3],
        first_triangle: 0,
        triangle_count: 0,
    };

    /// True if the node references triangles.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.triangle_count > 0
    }

    /// Bounds as a box.
    pub fn aabb(&self) -> Aabb {
        Aabb::new(Point3::from(self.min), Point3::from(self.max))
    }

    /// Triangle indices referenced by a leaf; empty for internal nodes.
    pub fn triangles(&self) -> std::ops::Range<u32> {
        self.first_triangle..self.first_triangle.saturating_add(self.triangle_count)
    }
}

/// Word offset of node `index`'s record, if it ends inside `len` words.
#[inline]
fn record_offset(len: usize, index: u32) -> Option<usize> {
    let base = 1usize.checked_add((index as usize).checked_mul(NODE_WORDS)?)?;
    (base + NODE_WORDS - 1 < len).then_some(base)
}

/// Decode node `index` of a flat node array.
///
/// Word 0 of `words` is the node count. A record that would end past the
/// array decodes as [`DecodedNode::ABSENT`]; callers treat it exactly
/// like a missing node.
#[inline]
pub fn decode(words: &[u32], index: u32) -> DecodedNode {
    match record_offset(words.len(), index) {
        Some(base) => NodeRecord {
            words: [words[base], words[base + 1], words[base + 2], words[base + 3]],
        }
        .decode(),
        None => DecodedNode::ABSENT,
    }
}

/// Decode node `index`, failing if the record lies past the array.
pub fn decode_strict(words: &[u32], index: u32) -> Result<DecodedNode> {
    if record_offset(words.len(), index).is_none() {
        return Err(CodecError::NodeOutOfRange {
            index,
            node_count: words.first().copied().unwrap_or(0),
            words: words.len(),
        });
    }
    Ok(decode(words, index))
}
