#![warn(missing_docs)]

//! Decision engine for a model-conversion tool.
//!
//! Given a validated [`PolicyConfig`] and a read-only [`requant_ir::GraphView`],
//! the engine decides the final numeric representation of every array
//! (dequantize, re-quantize with affine uint8 parameters, or pass through)
//! and builds an ordered [`PassPlan`] of graph-rewrite passes gated against
//! quantization boundaries. Applying the plan and mutating the graph is the
//! external rewrite executor's job; this crate only classifies and plans.
//!
//! The pipeline for one conversion job:
//!
//! 1. [`PolicyFlags::validate`] — raw flags into an immutable policy.
//! 2. [`resolve_all`] — one [`QuantizationDecision`] per real-number array,
//!    with per-array failures collected rather than aborting the batch.
//! 3. [`compute_boundaries`] — fake-quant markers into hard/soft boundaries.
//! 4. [`build_plan`] — candidate passes into a deterministic, boundary-gated
//!    plan.
//!
//! [`plan_conversion`] wires the four steps together.

mod boundary;
mod diagnostic;
mod job;
mod policy;
mod range;
mod resolve;
mod schedule;

pub use boundary::*;
pub use diagnostic::*;
pub use job::*;
pub use policy::*;
pub use range::*;
pub use resolve::*;
pub use schedule::*;
