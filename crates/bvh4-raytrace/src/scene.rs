//! A node array paired with the triangles it indexes.

use bvh4_codec::NodeArray;
use bvh4_math::Triangle;
use log::debug;
use rayon::prelude::*;

use crate::error::{Result, TraversalError};
use crate::traverse::{closest_hit_linear, traverse_strict, traverse_with, ClosestHit, TraversalResult};
use crate::{Ray, TraversalSettings};

/// An immutable tree and triangle array ready for queries.
///
/// Nothing is mutated once the scene is built, so it can be shared by
/// reference across threads without locking.
#[derive(Debug, Clone)]
pub struct Scene {
    nodes: NodeArray,
    triangles: Vec<Triangle>,
    settings: TraversalSettings,
}

impl Scene {
    /// Create a scene using default traversal settings.
    pub fn new(nodes: NodeArray, triangles: Vec<Triangle>) -> Self {
        debug!(
            "scene: {} nodes over {} words, {} triangles",
            nodes.node_count(),
            nodes.len(),
            triangles.len()
        );
        Self {
            nodes,
            triangles,
            settings: TraversalSettings::default(),
        }
    }

    /// Replace the traversal settings used by [`Scene::trace`].
    pub fn with_settings(mut self, settings: TraversalSettings) -> Self {
        self.settings = settings;
        self
    }

    /// The node array.
    pub fn nodes(&self) -> &NodeArray {
        &self.nodes
    }

    /// The triangle array leaf ranges index into.
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Settings used by [`Scene::trace`] and [`Scene::trace_batch`].
    pub fn settings(&self) -> &TraversalSettings {
        &self.settings
    }

    /// Check the array length against its header and every leaf range
    /// against the triangle array.
    pub fn validate(&self) -> Result<()> {
        self.nodes.validate()?;
        for (index, node) in self.nodes.iter() {
            if !node.valid || !node.is_leaf() {
                continue;
            }
            if let Some(triangle) = node.triangles().find(|&t| t as usize >= self.triangles.len()) {
                return Err(TraversalError::TriangleOutOfRange {
                    node: index,
                    triangle,
                    triangles: self.triangles.len(),
                });
            }
        }
        Ok(())
    }

    /// Nearest hit along `ray`.
    pub fn trace(&self, ray: &Ray) -> TraversalResult {
        self.trace_with(ray, &self.settings)
    }

    /// Nearest hit along `ray` with explicit settings.
    pub fn trace_with(&self, ray: &Ray, settings: &TraversalSettings) -> TraversalResult {
        traverse_with(self.nodes.words(), &self.triangles, ray, settings)
    }

    /// Nearest hit along `ray`, failing on damaged nodes.
    pub fn trace_strict(&self, ray: &Ray) -> Result<TraversalResult> {
        traverse_strict(self.nodes.words(), &self.triangles, ray, &self.settings)
    }

    /// Trace many rays in parallel, returning results in input order.
    pub fn trace_batch(&self, rays: &[Ray]) -> Vec<TraversalResult> {
        rays.par_iter().map(|ray| self.trace(ray)).collect()
    }

    /// Nearest hit by testing every triangle, ignoring the tree.
    pub fn closest_hit_linear(&self, ray: &Ray) -> ClosestHit {
        closest_hit_linear(&self.triangles, ray)
    }
}
