use std::collections::BTreeSet;

use requant_ir::{EdgeId, GraphView};
use serde::{Deserialize, Serialize};

use crate::PolicyConfig;

/// Strength of a recorded quantization boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundaryStrength {
    /// No transformation pass may merge or reorder operators across it.
    Hard,
    /// Passes may cross, at the explicit cost of the training/inference
    /// arithmetic-equivalence guarantee. Always surfaced as a warning.
    Soft,
}

/// A graph edge recorded as a quantization boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryEdge {
    /// The boundary edge.
    pub edge: EdgeId,
    /// Hard or soft.
    pub strength: BoundaryStrength,
}

/// The set of boundary edges for one conversion, split by strength.
///
/// Edges are kept in ordered sets so every consumer observes the same
/// iteration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundarySet {
    pub(crate) hard: BTreeSet<EdgeId>,
    pub(crate) soft: BTreeSet<EdgeId>,
}

impl BoundarySet {
    /// Hard boundary edges.
    pub fn hard_edges(&self) -> &BTreeSet<EdgeId> {
        &self.hard
    }

    /// Soft boundary edges.
    pub fn soft_edges(&self) -> &BTreeSet<EdgeId> {
        &self.soft
    }

    /// Whether no boundary of either strength was recorded.
    pub fn is_empty(&self) -> bool {
        self.hard.is_empty() && self.soft.is_empty()
    }

    /// All recorded boundaries, hard first, each in edge order.
    pub fn iter(&self) -> impl Iterator<Item = BoundaryEdge> + '_ {
        let hard = self.hard.iter().map(|edge| BoundaryEdge {
            edge: edge.clone(),
            strength: BoundaryStrength::Hard,
        });
        let soft = self.soft.iter().map(|edge| BoundaryEdge {
            edge: edge.clone(),
            strength: BoundaryStrength::Soft,
        });
        hard.chain(soft)
    }
}

/// Result of boundary computation over one graph snapshot.
#[derive(Debug, Clone, Default)]
pub struct BoundaryOutcome {
    /// Recorded boundaries.
    pub boundaries: BoundarySet,
    /// Names of marker operators the plan must schedule for removal.
    pub markers_to_remove: Vec<String>,
}

/// Derive the boundary set from the graph's fake-quant markers.
///
/// Each marker defines a hard boundary on its output edge by default.
/// `drop_fake_quant` removes the marker instead, recording no boundary;
/// otherwise `relax_quant_boundary` demotes the boundary to soft. Runs once
/// per conversion over a single consistent snapshot.
pub fn compute_boundaries(graph: &GraphView, policy: &PolicyConfig) -> BoundaryOutcome {
    let mut outcome = BoundaryOutcome::default();

    for marker in graph.fake_quant_markers() {
        let Some(edge) = marker.output_edge() else {
            log::warn!("fake-quant marker `{}` has no output edge, ignoring", marker.name);
            continue;
        };

        if policy.drop_fake_quant() {
            log::debug!("dropping fake-quant marker `{}`", marker.name);
            outcome.markers_to_remove.push(marker.name.clone());
        } else if policy.relax_quant_boundary() {
            log::warn!(
                "boundary at `{edge}` demoted to soft; passes crossing it break \
                 training/inference arithmetic equivalence"
            );
            outcome.boundaries.soft.insert(edge);
        } else {
            outcome.boundaries.hard.insert(edge);
        }
    }

    outcome
}
