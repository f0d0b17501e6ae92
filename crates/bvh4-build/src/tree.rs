//! Working node tables for the collapse.
//!
//! A [`Bvh2`] starts out binary. Every node keeps its binary `links` for
//! its whole life; collapse and promotion only rewrite `kind`, which holds
//! the node's triangles or its (up to four) wide children.

use std::collections::{BTreeMap, VecDeque};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{BuildError, Result};

/// Index into a [`Bvh2`] node table.
pub type NodeId = u32;

/// Sentinel for "no node".
pub const INVALID: NodeId = u32::MAX;

/// Contents of a working node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Triangle ids held directly.
    Leaf(Vec<u32>),
    /// Wide children, padded with [`INVALID`].
    Internal([NodeId; 4]),
}

/// One node of the working table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkNode {
    /// Binary left and right children, [`INVALID`] for leaves.
    pub links: [NodeId; 2],
    /// Current contents.
    pub kind: NodeKind,
}

impl WorkNode {
    /// A leaf holding `triangles`.
    pub fn leaf(triangles: Vec<u32>) -> Self {
        Self {
            links: [INVALID; 2],
            kind: NodeKind::Leaf(triangles),
        }
    }

    /// A binary internal node.
    pub fn internal(left: NodeId, right: NodeId) -> Self {
        Self {
            links: [left, right],
            kind: NodeKind::Internal([left, right, INVALID, INVALID]),
        }
    }

    /// True if the node currently holds triangles.
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    /// Triangle ids of a leaf; empty for internal nodes.
    pub fn triangles(&self) -> &[u32] {
        match &self.kind {
            NodeKind::Leaf(triangles) => triangles,
            NodeKind::Internal(_) => &[],
        }
    }

    /// Wide children that are not [`INVALID`], in slot order.
    pub fn children(&self) -> impl Iterator<Item = NodeId> + '_ {
        let slots: &[NodeId] = match &self.kind {
            NodeKind::Leaf(_) => &[],
            NodeKind::Internal(children) => children,
        };
        slots.iter().copied().filter(|&c| c != INVALID)
    }

    /// Binary links that are not [`INVALID`].
    pub fn valid_links(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.links.iter().copied().filter(|&c| c != INVALID)
    }
}

/// A node table with a designated root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bvh2 {
    /// All nodes, addressed by [`NodeId`].
    pub nodes: Vec<WorkNode>,
    /// Root id, [`INVALID`] for an empty tree.
    pub root: NodeId,
}

impl Default for Bvh2 {
    fn default() -> Self {
        Self::new()
    }
}

impl Bvh2 {
    /// An empty table.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            root: INVALID,
        }
    }

    /// Append a leaf and return its id.
    pub fn push_leaf(&mut self, triangles: Vec<u32>) -> NodeId {
        self.push(WorkNode::leaf(triangles))
    }

    /// Append a binary internal node and return its id.
    pub fn push_internal(&mut self, left: NodeId, right: NodeId) -> NodeId {
        self.push(WorkNode::internal(left, right))
    }

    fn push(&mut self, node: WorkNode) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(node);
        id
    }

    /// Number of nodes in the table, reachable or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if the table has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a node.
    pub fn node(&self, id: NodeId) -> Result<&WorkNode> {
        self.nodes.get(id as usize).ok_or(BuildError::NodeOutOfRange {
            node: id,
            len: self.nodes.len(),
        })
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut WorkNode> {
        let len = self.nodes.len();
        self.nodes
            .get_mut(id as usize)
            .ok_or(BuildError::NodeOutOfRange { node: id, len })
    }

    /// Parse a table from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the table to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Check the wide tree hanging off the root.
    ///
    /// Every reachable internal node must have between one and four
    /// children, every child id must exist, and no node may be reached
    /// twice.
    pub fn check_wide(&self) -> Result<()> {
        if self.root == INVALID {
            return Ok(());
        }
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let node = self.node(id)?;
            let slot = &mut seen[id as usize];
            if *slot {
                return Err(BuildError::NotATree(id));
            }
            *slot = true;
            if node.is_leaf() {
                continue;
            }
            let before = stack.len();
            stack.extend(node.children());
            if stack.len() == before {
                return Err(BuildError::ChildlessInternal(id));
            }
        }
        Ok(())
    }

    /// Triangle ids reachable through the wide tree, in depth-first order.
    pub fn wide_triangles(&self) -> Result<Vec<u32>> {
        self.check_wide()?;
        let mut out = Vec::new();
        let mut stack = Vec::new();
        if self.root != INVALID {
            stack.push(self.root);
        }
        while let Some(id) = stack.pop() {
            let node = self.node(id)?;
            out.extend_from_slice(node.triangles());
            stack.extend(node.children());
        }
        Ok(out)
    }
}

/// Node ids grouped by depth, processed shallowest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthGroups {
    groups: BTreeMap<u32, Vec<NodeId>>,
}

impl DepthGroups {
    /// No groups.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `id` at `depth`.
    pub fn insert(&mut self, depth: u32, id: NodeId) {
        self.groups.entry(depth).or_default().push(id);
    }

    /// Ids at `depth`, empty if none.
    pub fn get(&self, depth: u32) -> &[NodeId] {
        self.groups.get(&depth).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Deepest recorded depth.
    pub fn max_depth(&self) -> Option<u32> {
        self.groups.keys().next_back().copied()
    }

    /// Iterate over `(depth, ids)` from shallowest.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &[NodeId])> + '_ {
        self.groups.iter().map(|(&d, ids)| (d, ids.as_slice()))
    }

    /// Group every node reachable from the root by its binary depth.
    pub fn from_root(bvh: &Bvh2) -> Result<Self> {
        let mut groups = Self::new();
        if bvh.root == INVALID {
            return Ok(groups);
        }
        let mut seen = vec![false; bvh.len()];
        let mut queue = VecDeque::from([(bvh.root, 0u32)]);
        while let Some((id, depth)) = queue.pop_front() {
            let node = bvh.node(id)?;
            if std::mem::replace(&mut seen[id as usize], true) {
                warn!("node {id} reached twice while grouping depths, keeping first");
                continue;
            }
            groups.insert(depth, id);
            queue.extend(node.valid_links().map(|c| (c, depth + 1)));
        }
        Ok(groups)
    }
}

impl From<BTreeMap<u32, Vec<NodeId>>> for DepthGroups {
    fn from(groups: BTreeMap<u32, Vec<NodeId>>) -> Self {
        Self { groups }
    }
}
