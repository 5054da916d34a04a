use core::fmt;
use std::collections::BTreeSet;

use requant_ir::EdgeId;
use serde::{Deserialize, Serialize};

use crate::{BoundarySet, Diagnostic, PolicyConfig};

/// A graph-rewrite pass the external executor knows how to apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PassKind {
    /// Delete fake-quant marker nodes. Tied to `drop_fake_quant`.
    MarkerRemoval,
    /// Drop pure ordering (control) dependencies.
    ControlDepElision,
    /// Fuse recurrent-cell operator patterns. A heuristic pattern match,
    /// independently disable-able.
    RecurrentFusion,
    /// An externally supplied rewrite, opaque to the engine apart from
    /// whether it may reorder operators relative to markers.
    Rewrite {
        /// Executor-side identifier.
        name: String,
        /// Whether the pass may reorder operators across marker edges.
        crosses_markers: bool,
    },
}

impl PassKind {
    /// Whether the pass may reorder operators relative to fake-quant
    /// markers. Fusion and elision operate strictly within a region and
    /// never cross; marker removal deletes nodes without reordering.
    pub fn crosses_markers(&self) -> bool {
        match self {
            Self::Rewrite { crosses_markers, .. } => *crosses_markers,
            _ => false,
        }
    }

    /// The standard candidate set for a conversion job.
    pub fn default_candidates() -> Vec<PassKind> {
        vec![
            Self::MarkerRemoval,
            Self::ControlDepElision,
            Self::RecurrentFusion,
        ]
    }

    // Fixed phase rank: removal passes run before fusion so patterns are
    // matched on the cleaned graph. Externally supplied rewrites keep their
    // input order at the end.
    fn phase(&self) -> u8 {
        match self {
            Self::MarkerRemoval => 0,
            Self::ControlDepElision => 1,
            Self::RecurrentFusion => 2,
            Self::Rewrite { .. } => 3,
        }
    }
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MarkerRemoval => f.write_str("marker-removal"),
            Self::ControlDepElision => f.write_str("control-dep-elision"),
            Self::RecurrentFusion => f.write_str("recurrent-fusion"),
            Self::Rewrite { name, .. } => f.write_str(name),
        }
    }
}

/// The subset of the graph a pass may touch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Region {
    /// No restriction.
    WholeGraph,
    /// Everywhere except across the listed boundary edges.
    Excluding(BTreeSet<EdgeId>),
}

/// One scheduled pass with its applicability region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassStep {
    /// The pass to apply.
    pub kind: PassKind,
    /// Where it may apply.
    pub region: Region,
}

/// Ordered sequence of rewrite passes for the external executor.
///
/// Computed once per conversion; given identical inputs the plan is
/// identical.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PassPlan {
    /// Steps in application order.
    pub steps: Vec<PassStep>,
}

impl PassPlan {
    /// Whether a pass of the given kind was scheduled.
    pub fn contains(&self, kind: &PassKind) -> bool {
        self.steps.iter().any(|step| &step.kind == kind)
    }

    /// Whether nothing was scheduled.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl fmt::Display for PassPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, step) in self.steps.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            match &step.region {
                Region::WholeGraph => write!(f, "{}", step.kind)?,
                Region::Excluding(edges) => {
                    write!(f, "{} (excluding {} boundary edges)", step.kind, edges.len())?
                }
            }
        }
        Ok(())
    }
}

/// Plan-level failures. Fatal to the whole job.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    /// An operator is neither convertible nor, with custom operators
    /// disabled, representable as an opaque custom operator. Propagated
    /// from the graph view's supportability classification, never generated
    /// by the scheduler itself.
    #[error("operator `{operator}` ({kind}) is not convertible and custom operators are disabled")]
    UnsupportedOperator {
        /// Name of the offending operator.
        operator: String,
        /// Its kind, for the message.
        kind: String,
    },
}

/// A built plan plus the warnings its construction raised.
#[derive(Debug, Clone, Default)]
pub struct ScheduleOutcome {
    /// The plan for the executor.
    pub plan: PassPlan,
    /// Soft-boundary warnings.
    pub diagnostics: Vec<Diagnostic>,
}

/// Order and gate the candidate passes against the boundary set and policy.
///
/// Passes that never cross a boundary get the whole graph. Crossing passes
/// are restricted to hard-boundary-excluded regions; soft boundaries are
/// crossable but each crossing is surfaced as a warning diagnostic, never
/// silently.
pub fn build_plan(
    candidates: &[PassKind],
    boundaries: &BoundarySet,
    policy: &PolicyConfig,
) -> ScheduleOutcome {
    let mut outcome = ScheduleOutcome::default();

    let mut admitted: Vec<PassKind> = Vec::with_capacity(candidates.len());
    for pass in candidates {
        let admit = match pass {
            PassKind::MarkerRemoval => policy.drop_fake_quant(),
            PassKind::ControlDepElision => policy.drop_control_dependencies(),
            PassKind::RecurrentFusion => !policy.disable_recurrent_fusion(),
            PassKind::Rewrite { .. } => true,
        };
        if admit {
            admitted.push(pass.clone());
        } else {
            log::debug!("pass `{pass}` gated off by policy");
        }
    }

    // Stable sort keeps input order within a phase, so the plan is a pure
    // function of its inputs.
    admitted.sort_by_key(|pass| pass.phase());

    for pass in admitted {
        let region = if pass.crosses_markers() {
            for edge in boundaries.soft_edges() {
                log::warn!("pass `{pass}` will cross the soft boundary at `{edge}`");
                outcome.diagnostics.push(Diagnostic::SoftBoundaryCrossed {
                    pass: pass.to_string(),
                    edge: edge.clone(),
                });
            }

            if boundaries.hard_edges().is_empty() {
                Region::WholeGraph
            } else {
                Region::Excluding(boundaries.hard_edges().clone())
            }
        } else {
            Region::WholeGraph
        };

        outcome.plan.steps.push(PassStep { kind: pass, region });
    }

    outcome
}
