//! Rewriting binary nodes into four-wide nodes.
//!
//! Two strategies share the working table:
//!
//! - [`collapse`] gathers up to four leaves per internal node breadth-first
//!   over the binary links, depth group by depth group.
//! - [`promote_grandchildren`] replaces every internal node's children with
//!   its grandchildren, which keeps every triangle reachable.

use std::collections::VecDeque;

use bvh4_codec::BRANCHING;
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use crate::error::{BuildError, Result};
use crate::tree::{Bvh2, DepthGroups, NodeId, NodeKind, INVALID};

const WIDTH: usize = BRANCHING as usize;

/// Counters from one collapse or promotion pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollapseStats {
    /// Internal nodes rewritten.
    pub processed: usize,
    /// Internal nodes that found no leaves and became leaves themselves.
    pub forced_leaves: usize,
    /// Nodes that accepted four leaves while candidates were still queued.
    pub truncated: usize,
}

/// Collapse the nodes listed in `groups` for depths `0..=max_depth`.
///
/// For each internal node, candidates are taken first-in first-out from
/// its binary children: a leaf is accepted as a wide child, an internal
/// node is replaced by its own binary children. Gathering stops at four
/// accepted leaves. Whatever is still queued at that point is abandoned,
/// and the triangles below it are no longer reachable from this node;
/// [`CollapseStats::truncated`] counts how often that happens.
///
/// A node that finds no leaf at all becomes a leaf holding every triangle
/// of its subtree. Leaves in the groups are skipped. Nodes that are not
/// listed are left untouched.
pub fn collapse(bvh: &mut Bvh2, groups: &DepthGroups, max_depth: u32) -> Result<CollapseStats> {
    let mut stats = CollapseStats::default();

    for depth in 0..=max_depth {
        for &id in groups.get(depth) {
            if bvh.node(id)?.is_leaf() {
                continue;
            }
            stats.processed += 1;

            let (accepted, abandoned) = gather_leaves(bvh, id)?;
            if abandoned > 0 {
                stats.truncated += 1;
                trace!("node {id}: {abandoned} queued candidates abandoned");
            }

            let kind = if accepted.is_empty() {
                stats.forced_leaves += 1;
                NodeKind::Leaf(merge_subtree(bvh, id)?)
            } else {
                let mut children = [INVALID; WIDTH];
                children[..accepted.len()].copy_from_slice(&accepted);
                NodeKind::Internal(children)
            };
            trace!("node {id} at depth {depth} -> {kind:?}");
            bvh.node_mut(id)?.kind = kind;
        }
    }

    if stats.truncated > 0 {
        warn!(
            "collapse abandoned queued subtrees at {} nodes; their triangles are unreachable from there",
            stats.truncated
        );
    }
    debug!(
        "collapse: {} nodes processed, {} forced to leaves, {} truncated",
        stats.processed, stats.forced_leaves, stats.truncated
    );
    Ok(stats)
}

/// Breadth-first leaf search below `id`, returning the accepted leaves and
/// the number of candidates left in the queue.
fn gather_leaves(bvh: &Bvh2, id: NodeId) -> Result<(Vec<NodeId>, usize)> {
    let mut queue: VecDeque<NodeId> = bvh.node(id)?.valid_links().collect();
    let mut accepted = Vec::with_capacity(WIDTH);
    let mut budget = bvh.len();

    while accepted.len() < WIDTH {
        let Some(c) = queue.pop_front() else {
            break;
        };
        budget = budget.checked_sub(1).ok_or(BuildError::NotATree(id))?;
        let child = bvh.node(c)?;
        if child.is_leaf() {
            accepted.push(c);
        } else {
            queue.extend(child.valid_links());
        }
    }

    Ok((accepted, queue.len()))
}

/// Every triangle below `id`, in depth-first stack-pop order.
fn merge_subtree(bvh: &Bvh2, id: NodeId) -> Result<Vec<u32>> {
    let mut triangles = Vec::new();
    let mut stack: Vec<NodeId> = bvh.node(id)?.valid_links().collect();
    let mut budget = bvh.len();

    while let Some(c) = stack.pop() {
        budget = budget.checked_sub(1).ok_or(BuildError::NotATree(id))?;
        let node = bvh.node(c)?;
        if node.is_leaf() {
            triangles.extend_from_slice(node.triangles());
        } else {
            stack.extend(node.valid_links());
        }
    }

    Ok(triangles)
}

/// Give every internal node of a binary table its grandchildren as wide
/// children.
///
/// A leaf child is kept in place of its (nonexistent) children. Since the
/// binary links are never rewritten, the nodes between a node and its new
/// children stay in the table but drop out of the wide tree.
pub fn promote_grandchildren(bvh: &mut Bvh2) -> Result<CollapseStats> {
    let mut stats = CollapseStats::default();

    for id in 0..bvh.len() as NodeId {
        let node = bvh.node(id)?;
        if node.is_leaf() {
            continue;
        }

        let mut children = [INVALID; WIDTH];
        let mut n = 0;
        for c in node.valid_links() {
            let child = bvh.node(c)?;
            if child.is_leaf() {
                children[n] = c;
                n += 1;
            } else {
                for g in child.valid_links() {
                    children[n] = g;
                    n += 1;
                }
            }
        }

        stats.processed += 1;
        let kind = if n == 0 {
            stats.forced_leaves += 1;
            NodeKind::Leaf(Vec::new())
        } else {
            NodeKind::Internal(children)
        };
        bvh.node_mut(id)?.kind = kind;
    }

    debug!(
        "promotion: {} nodes processed, {} without descendants",
        stats.processed, stats.forced_leaves
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::fixtures::{toy, toy_groups};

    fn children(bvh: &Bvh2, id: NodeId) -> [NodeId; 4] {
        match bvh.nodes[id as usize].kind {
            NodeKind::Internal(children) => children,
            NodeKind::Leaf(_) => panic!("node {id} is a leaf"),
        }
    }

    /// Eight single-triangle leaves under a perfect binary tree.
    fn balanced_eight() -> Bvh2 {
        let mut bvh = Bvh2::new();
        for i in 0..8 {
            bvh.push_leaf(vec![i]);
        }
        let a1 = bvh.push_internal(0, 1);
        let a2 = bvh.push_internal(2, 3);
        let b1 = bvh.push_internal(4, 5);
        let b2 = bvh.push_internal(6, 7);
        let a = bvh.push_internal(a1, a2);
        let b = bvh.push_internal(b1, b2);
        bvh.root = bvh.push_internal(a, b);
        bvh
    }

    #[test]
    fn test_toy_collapse() {
        let mut bvh = toy();
        let stats = collapse(&mut bvh, &toy_groups(), 2).unwrap();

        assert_eq!(children(&bvh, 5), [2, 4, INVALID, INVALID]);
        assert_eq!(children(&bvh, 6), [3, 2, 4, INVALID]);
        assert_eq!(children(&bvh, 7), [1, 3, 2, 4]);
        assert_eq!(
            stats,
            CollapseStats {
                processed: 3,
                forced_leaves: 0,
                truncated: 0
            }
        );

        bvh.check_wide().unwrap();
        let mut tris = bvh.wide_triangles().unwrap();
        tris.sort_unstable();
        assert_eq!(tris, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_toy_collapse_with_derived_groups() {
        let mut bvh = toy();
        let groups = DepthGroups::from_root(&bvh).unwrap();
        let max_depth = groups.max_depth().unwrap();
        let stats = collapse(&mut bvh, &groups, max_depth).unwrap();
        assert_eq!(stats.processed, 3);
        assert_eq!(bvh, {
            let mut expected = toy();
            collapse(&mut expected, &toy_groups(), 2).unwrap();
            expected
        });
    }

    #[test]
    fn test_max_depth_limits_processing() {
        let mut bvh = toy();
        let stats = collapse(&mut bvh, &toy_groups(), 0).unwrap();
        assert_eq!(stats.processed, 1);
        assert_eq!(children(&bvh, 7), [1, 3, 2, 4]);
        assert_eq!(children(&bvh, 6), [3, 5, INVALID, INVALID]);
        assert_eq!(children(&bvh, 5), [2, 4, INVALID, INVALID]);
    }

    #[test]
    fn test_fifth_leaf_is_abandoned() {
        let mut bvh = balanced_eight();
        let groups = DepthGroups::from_root(&bvh).unwrap();
        let stats = collapse(&mut bvh, &groups, groups.max_depth().unwrap()).unwrap();

        assert_eq!(children(&bvh, bvh.root), [0, 1, 2, 3]);
        assert_eq!(stats.truncated, 1);
        assert_eq!(stats.forced_leaves, 0);
        assert_eq!(stats.processed, 7);

        // Leaves 4..8 are no longer below the root.
        let mut tris = bvh.wide_triangles().unwrap();
        tris.sort_unstable();
        assert_eq!(tris, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_node_without_leaves_becomes_leaf() {
        let mut bvh = Bvh2::new();
        let x = bvh.push_internal(INVALID, INVALID);
        let y = bvh.push_internal(INVALID, INVALID);
        bvh.root = bvh.push_internal(x, y);
        let mut groups = DepthGroups::new();
        groups.insert(0, bvh.root);

        let stats = collapse(&mut bvh, &groups, 0).unwrap();
        assert_eq!(stats.forced_leaves, 1);
        assert_eq!(bvh.nodes[bvh.root as usize].kind, NodeKind::Leaf(vec![]));
        // Links survive so later passes can still walk the binary tree.
        assert_eq!(bvh.nodes[bvh.root as usize].links, [x, y]);
    }

    #[test]
    fn test_merge_subtree_pops_right_first() {
        let bvh = toy();
        assert_eq!(merge_subtree(&bvh, 7).unwrap(), vec![3, 2, 0, 1]);
        assert_eq!(merge_subtree(&bvh, 5).unwrap(), vec![2, 0]);
    }

    #[test]
    fn test_bad_ids_are_errors() {
        let mut bvh = toy();
        let mut groups = DepthGroups::new();
        groups.insert(0, 99);
        assert!(matches!(
            collapse(&mut bvh, &groups, 0),
            Err(BuildError::NodeOutOfRange { node: 99, len: 8 })
        ));

        bvh.nodes[5].links = [2, 42];
        assert!(matches!(
            collapse(&mut bvh, &toy_groups(), 2),
            Err(BuildError::NodeOutOfRange { node: 42, .. })
        ));
    }

    #[test]
    fn test_cycle_is_detected() {
        let mut bvh = Bvh2::new();
        let a = bvh.push_internal(INVALID, INVALID);
        let b = bvh.push_internal(a, INVALID);
        bvh.nodes[a as usize].links = [b, INVALID];
        bvh.root = a;
        let mut groups = DepthGroups::new();
        groups.insert(0, a);
        assert!(matches!(collapse(&mut bvh, &groups, 0), Err(BuildError::NotATree(_))));
    }

    #[test]
    fn test_promote_toy() {
        let mut bvh = toy();
        let stats = promote_grandchildren(&mut bvh).unwrap();
        assert_eq!(stats.processed, 3);
        assert_eq!(children(&bvh, 5), [2, 4, INVALID, INVALID]);
        assert_eq!(children(&bvh, 6), [3, 2, 4, INVALID]);
        assert_eq!(children(&bvh, 7), [3, 5, 1, INVALID]);

        bvh.check_wide().unwrap();
        let mut tris = bvh.wide_triangles().unwrap();
        tris.sort_unstable();
        assert_eq!(tris, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_promote_keeps_every_triangle() {
        let mut bvh = balanced_eight();
        promote_grandchildren(&mut bvh).unwrap();
        let (a1, b2) = (8, 11);
        assert_eq!(children(&bvh, bvh.root), [a1, 9, 10, b2]);
        assert_eq!(children(&bvh, a1), [0, 1, INVALID, INVALID]);

        bvh.check_wide().unwrap();
        let mut tris = bvh.wide_triangles().unwrap();
        tris.sort_unstable();
        assert_eq!(tris, (0..8).collect::<Vec<_>>());
    }
}
