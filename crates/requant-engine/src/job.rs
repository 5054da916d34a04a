use requant_ir::{GraphView, custom_only_operators};

use crate::{
    BoundarySet, Diagnostic, PassKind, PassPlan, PlanError, PolicyConfig, PolicyError,
    PolicyFlags, ResolutionOutcome, build_plan, compute_boundaries, resolve_all,
};

/// Job-level failures. Fatal; the plan is never partially produced.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum JobError {
    /// Flag validation failed.
    #[error(transparent)]
    Policy(#[from] PolicyError),
    /// Plan construction failed.
    #[error(transparent)]
    Plan(#[from] PlanError),
}

/// Everything the rewrite executor and exporter need for one conversion.
#[derive(Debug, Clone)]
pub struct JobPlan {
    /// The validated policy the decisions were made under.
    pub policy: PolicyConfig,
    /// Per-array decisions and failures.
    pub resolution: ResolutionOutcome,
    /// Boundary set the plan was gated against.
    pub boundaries: BoundarySet,
    /// The pass plan for the executor.
    pub plan: PassPlan,
    /// Per-array and job-level notices, in the order they were raised.
    pub diagnostics: Vec<Diagnostic>,
}

/// Run one conversion job's decision pipeline over a graph snapshot.
///
/// Validates the flags, resolves every array, computes boundaries, and
/// builds the pass plan. The graph is never mutated; per-array failures are
/// collected into the returned plan while policy and plan failures abort
/// the job.
pub fn plan_conversion(
    flags: PolicyFlags,
    graph: &GraphView,
    candidates: &[PassKind],
) -> Result<JobPlan, JobError> {
    let policy = flags.validate()?;

    // Operators that can only ride along as opaque custom operators are
    // fatal up front when the policy forbids them.
    if !policy.allow_custom_ops() {
        if let Some(op) = custom_only_operators(graph).first() {
            return Err(PlanError::UnsupportedOperator {
                operator: op.name.clone(),
                kind: op.kind.to_string(),
            }
            .into());
        }
    }

    let resolution = resolve_all(&policy, graph.arrays());
    let boundary = compute_boundaries(graph, &policy);
    let schedule = build_plan(candidates, &boundary.boundaries, &policy);

    let mut diagnostics: Vec<Diagnostic> =
        resolution.failures.iter().map(Diagnostic::from).collect();
    diagnostics.extend(schedule.diagnostics);

    log::debug!(
        "planned conversion: {} decisions, {} failures, plan [{}]",
        resolution.decisions.len(),
        resolution.failures.len(),
        schedule.plan
    );

    Ok(JobPlan {
        policy,
        resolution,
        boundaries: boundary.boundaries,
        plan: schedule.plan,
        diagnostics,
    })
}
