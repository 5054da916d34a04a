use requant_ir::{ArrayDescriptor, MinMax};
use serde::{Deserialize, Serialize};

use crate::PolicyConfig;

/// Where a resolved range came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangeOrigin {
    /// Measured statistics recorded on the array. Authoritative.
    Observed,
    /// The policy's fallback range. Exists purely to unblock
    /// experimentation; accuracy-sensitive tooling must be able to tell it
    /// apart from measured statistics.
    Synthetic,
}

/// A `(min, max)` range with its provenance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedRange {
    /// Lower bound.
    pub min: f64,
    /// Upper bound.
    pub max: f64,
    /// Provenance tag.
    pub origin: RangeOrigin,
}

/// Per-array range resolution failure. Recoverable; reported as a
/// named-array diagnostic, never fatal to the whole job.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RangeError {
    /// The array has no observed range and the policy provides no default.
    #[error("array `{array}` has no observed (min, max) range and the policy provides no default")]
    MissingRange {
        /// Name of the affected array.
        array: String,
    },
}

/// Resolve the `(min, max)` range for one array.
///
/// Observed statistics always win, regardless of the policy's default
/// range; the default only fills in for arrays that were never measured.
pub fn resolve_range(
    policy: &PolicyConfig,
    array: &ArrayDescriptor,
) -> Result<ResolvedRange, RangeError> {
    if let Some(MinMax { min, max }) = array.range {
        return Ok(ResolvedRange {
            min,
            max,
            origin: RangeOrigin::Observed,
        });
    }

    match policy.default_range() {
        Some(MinMax { min, max }) => {
            log::debug!(
                "array `{}` has no observed range, substituting synthetic default [{min}, {max}]",
                array.name
            );
            Ok(ResolvedRange {
                min,
                max,
                origin: RangeOrigin::Synthetic,
            })
        }
        None => Err(RangeError::MissingRange {
            array: array.name.clone(),
        }),
    }
}
