//! Laying a wide working tree out as a quantized node array.
//!
//! Slot `s` holds the node whose children live at `4s+1 .. 4s+4`, so the
//! shape of the tree decides how many slots the array needs. Unused slots
//! are filled with dead records.

use bvh4_codec::{first_child, NodeArray, NodeRecord, BRANCHING, MAX_LEAF_TRIANGLES};
use bvh4_math::{Aabb, Triangle};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{BuildError, Result};
use crate::tree::{Bvh2, NodeId, NodeKind, INVALID};

const WIDTH: usize = BRANCHING as usize;

/// Encoder parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodeSettings {
    /// Upper bound on the node count of the output array.
    pub max_nodes: u32,
    /// Largest leaf written before it is split into child leaves.
    pub max_leaf_triangles: u32,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            max_nodes: 1 << 22,
            max_leaf_triangles: MAX_LEAF_TRIANGLES,
        }
    }
}

impl EncodeSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if self.max_nodes == 0 {
            return Err(BuildError::InvalidSettings("max_nodes must be positive".into()));
        }
        if self.max_leaf_triangles == 0 || self.max_leaf_triangles > MAX_LEAF_TRIANGLES {
            return Err(BuildError::InvalidSettings(format!(
                "max_leaf_triangles must be between 1 and {MAX_LEAF_TRIANGLES}"
            )));
        }
        Ok(())
    }
}

/// Counters describing an encoded array.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeStats {
    /// Node count written to the header.
    pub slots: u32,
    /// Internal records.
    pub internal_nodes: u32,
    /// Leaf records.
    pub leaf_nodes: u32,
    /// Dead records: unused slots and empty subtrees.
    pub dead_slots: u32,
    /// Working leaves too large for one record.
    pub split_leaves: u32,
}

/// An encoded tree together with the triangle order its leaves index.
#[derive(Debug, Clone)]
pub struct EncodedBvh4 {
    /// The node array.
    pub nodes: NodeArray,
    /// `triangle_order[i]` is the input triangle stored at position `i`.
    pub triangle_order: Vec<u32>,
    /// Layout counters.
    pub stats: EncodeStats,
}

impl EncodedBvh4 {
    /// Rearrange per-triangle data into the order the leaves reference.
    pub fn reorder_triangles<T: Clone>(&self, source: &[T]) -> Result<Vec<T>> {
        self.triangle_order
            .iter()
            .map(|&i| {
                source.get(i as usize).cloned().ok_or(BuildError::TriangleOutOfRange {
                    triangle: i,
                    triangles: source.len(),
                })
            })
            .collect()
    }

    /// Input triangle stored at position `index`.
    pub fn original_triangle(&self, index: u32) -> Option<u32> {
        self.triangle_order.get(index as usize).copied()
    }
}

/// Encode the wide tree below `bvh.root`.
///
/// Bounds come from `triangles`, indexed by the ids held in the leaves,
/// and are quantized outwards so every triangle stays inside its box.
/// Leaves larger than [`EncodeSettings::max_leaf_triangles`] are sorted
/// along their longest axis and split into up to four child leaves.
pub fn encode(bvh: &Bvh2, triangles: &[Triangle], settings: &EncodeSettings) -> Result<EncodedBvh4> {
    settings.validate()?;

    let mut encoder = Encoder {
        bvh,
        triangles,
        settings,
        records: Vec::new(),
        order: Vec::new(),
        seen: vec![false; bvh.len()],
        stats: EncodeStats::default(),
    };
    if bvh.root != INVALID {
        encoder.node(bvh.root, 0)?;
    }
    Ok(encoder.finish())
}

struct Encoder<'a> {
    bvh: &'a Bvh2,
    triangles: &'a [Triangle],
    settings: &'a EncodeSettings,
    records: Vec<NodeRecord>,
    order: Vec<u32>,
    seen: Vec<bool>,
    stats: EncodeStats,
}

impl<'a> Encoder<'a> {
    /// Reserve `slot`, growing the record array with dead records.
    fn place(&mut self, slot: u64) -> Result<usize> {
        if slot >= u64::from(self.settings.max_nodes) {
            return Err(BuildError::TooManyNodes {
                slots: slot,
                max: self.settings.max_nodes,
            });
        }
        let slot = slot as usize;
        if slot >= self.records.len() {
            self.records.resize(slot + 1, NodeRecord::dead());
        }
        Ok(slot)
    }

    /// Write working node `id` at `slot` and return its bounds.
    fn node(&mut self, id: NodeId, slot: u64) -> Result<Aabb> {
        let index = self.place(slot)?;
        let bvh = self.bvh;
        let node = bvh.node(id)?;
        if std::mem::replace(&mut self.seen[id as usize], true) {
            return Err(BuildError::NotATree(id));
        }

        let children = match &node.kind {
            NodeKind::Leaf(tris) => return self.leaf(tris, index),
            NodeKind::Internal(children) => children,
        };

        let first = first_child(index as u32);
        let mut bounds = Aabb::empty();
        let mut written = 0;
        for &child in children.iter().filter(|&&c| c != INVALID) {
            bounds.include_aabb(&self.node(child, first + written)?);
            written += 1;
        }
        if written == 0 {
            return Err(BuildError::ChildlessInternal(id));
        }

        self.internal(index, &bounds);
        Ok(bounds)
    }

    /// Write a leaf at `index`, splitting it if it is too large.
    fn leaf(&mut self, tris: &[u32], index: usize) -> Result<Aabb> {
        let bounds = self.bounds(tris)?;
        if tris.is_empty() {
            self.records[index] = NodeRecord::dead();
            return Ok(bounds);
        }

        if tris.len() <= self.settings.max_leaf_triangles as usize {
            let first = self.order.len() as u32;
            self.order.extend_from_slice(tris);
            self.records[index] = NodeRecord::leaf(&bounds, first, tris.len() as u32)?;
            self.stats.leaf_nodes += 1;
            return Ok(bounds);
        }

        self.stats.split_leaves += 1;
        let triangles = self.triangles;
        let axis = bounds.extent().imax();
        let mut sorted = tris.to_vec();
        sorted.sort_by(|&a, &b| {
            let ca = triangles[a as usize].centroid()[axis];
            let cb = triangles[b as usize].centroid()[axis];
            ca.total_cmp(&cb)
        });

        let first = first_child(index as u32);
        let chunk = sorted.len().div_ceil(WIDTH);
        for (k, part) in sorted.chunks(chunk).enumerate() {
            let child = self.place(first + k as u64)?;
            self.leaf(part, child)?;
        }

        self.internal(index, &bounds);
        Ok(bounds)
    }

    fn internal(&mut self, index: usize, bounds: &Aabb) {
        if bounds.is_valid() {
            self.records[index] = NodeRecord::internal(bounds);
            self.stats.internal_nodes += 1;
        } else {
            self.records[index] = NodeRecord::dead();
        }
    }

    /// Union of the triangle boxes, failing on unknown ids.
    fn bounds(&self, tris: &[u32]) -> Result<Aabb> {
        let mut bounds = Aabb::empty();
        for &t in tris {
            let tri = self.triangles.get(t as usize).ok_or(BuildError::TriangleOutOfRange {
                triangle: t,
                triangles: self.triangles.len(),
            })?;
            bounds.include_aabb(&tri.aabb());
        }
        Ok(bounds)
    }

    fn finish(mut self) -> EncodedBvh4 {
        self.stats.slots = self.records.len() as u32;
        self.stats.dead_slots = self.stats.slots - self.stats.internal_nodes - self.stats.leaf_nodes;
        debug!(
            "encoded {} slots: {} internal, {} leaves, {} dead, {} leaves split, {} triangle refs",
            self.stats.slots,
            self.stats.internal_nodes,
            self.stats.leaf_nodes,
            self.stats.dead_slots,
            self.stats.split_leaves,
            self.order.len()
        );
        EncodedBvh4 {
            nodes: NodeArray::from_records(&self.records),
            triangle_order: self.order,
            stats: self.stats,
        }
    }
}
