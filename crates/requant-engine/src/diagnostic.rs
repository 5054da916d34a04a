use core::fmt;

use requant_ir::EdgeId;
use serde::{Deserialize, Serialize};

use crate::ResolveError;

/// Severity of a diagnostic notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    /// The job proceeded, but a guarantee was weakened or a heuristic
    /// substitution was made.
    Warning,
    /// A per-array operation failed. Other arrays are unaffected.
    Error,
}

/// Structured notices surfaced to the caller alongside the job outcome.
///
/// Per-array failures are also available as typed errors; the diagnostic
/// form exists so a caller can present one uniform list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Diagnostic {
    /// An array had no observed range and no default was configured.
    MissingRange {
        /// Name of the affected array.
        array: String,
    },
    /// Quantization was requested for an array whose range could not be
    /// resolved.
    QuantizationInfeasible {
        /// Name of the affected array.
        array: String,
    },
    /// A resolved range could not produce a positive scale.
    DegenerateRange {
        /// Name of the affected array.
        array: String,
        /// Resolved lower bound.
        min: f64,
        /// Resolved upper bound.
        max: f64,
    },
    /// A rewrite pass was allowed across a relaxed quantization boundary,
    /// breaking the training/inference arithmetic-equivalence guarantee.
    SoftBoundaryCrossed {
        /// Name of the crossing pass.
        pass: String,
        /// The demoted boundary edge.
        edge: EdgeId,
    },
}

impl Diagnostic {
    /// Severity class of this notice.
    pub fn severity(&self) -> Severity {
        match self {
            Self::SoftBoundaryCrossed { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRange { array } => {
                write!(f, "array `{array}` is missing a (min, max) range")
            }
            Self::QuantizationInfeasible { array } => {
                write!(f, "quantization is infeasible for array `{array}`")
            }
            Self::DegenerateRange { array, min, max } => {
                write!(f, "array `{array}` has a degenerate range [{min}, {max}]")
            }
            Self::SoftBoundaryCrossed { pass, edge } => write!(
                f,
                "pass `{pass}` crosses the relaxed quantization boundary at `{edge}`; \
                 quantized inference may no longer match quantized training"
            ),
        }
    }
}

impl From<&ResolveError> for Diagnostic {
    fn from(err: &ResolveError) -> Self {
        match err {
            ResolveError::QuantizationInfeasible { array } => Self::QuantizationInfeasible {
                array: array.clone(),
            },
            ResolveError::DegenerateRange { array, min, max } => Self::DegenerateRange {
                array: array.clone(),
                min: *min,
                max: *max,
            },
        }
    }
}
