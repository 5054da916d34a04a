use rayon::prelude::*;
use requant_ir::{ArrayDescriptor, ElementKind, QuantParams};
use serde::{Deserialize, Serialize};

use crate::{InferenceKind, PolicyConfig, RangeError, RangeOrigin, resolve_range};

/// Top of the quantized integer domain `[0, 255]`.
const QUANT_MAX: f64 = 255.0;

/// Final representation decision for one array.
///
/// Computed once per array per job, consumed by the exporter, never mutated
/// afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantizationDecision {
    /// Name of the decided array.
    pub array: String,
    /// Final element kind.
    pub kind: ElementKind,
    /// Affine parameters, present exactly when `kind` is quantized.
    pub params: Option<QuantParams>,
    /// Provenance of the range the parameters were derived from, when a
    /// range was consulted.
    pub range_origin: Option<RangeOrigin>,
}

impl QuantizationDecision {
    fn pass_through(array: &ArrayDescriptor) -> Self {
        Self {
            array: array.name.clone(),
            kind: array.kind,
            params: array.quant,
            range_origin: None,
        }
    }
}

/// Per-array type resolution failures. Recoverable; collected per batch.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ResolveError {
    /// Quantization was requested but no range could be resolved.
    #[error(
        "cannot quantize array `{array}`: no observed (min, max) range and no default configured"
    )]
    QuantizationInfeasible {
        /// Name of the affected array.
        array: String,
    },

    /// The resolved range cannot produce a positive scale.
    #[error("cannot quantize array `{array}`: degenerate range [{min}, {max}]")]
    DegenerateRange {
        /// Name of the affected array.
        array: String,
        /// Resolved lower bound.
        min: f64,
        /// Resolved upper bound.
        max: f64,
    },
}

impl ResolveError {
    /// Name of the array the failure concerns.
    pub fn array(&self) -> &str {
        match self {
            Self::QuantizationInfeasible { array } => array,
            Self::DegenerateRange { array, .. } => array,
        }
    }
}

/// Map a real `[min, max]` range onto the integer domain `[0, 255]`.
///
/// `scale = (max - min) / 255`, `zero_point = round(-min / scale)` clamped
/// to `[0, 255]`. Rounding ties break away from zero (`f64::round`), which
/// fixes the bit-exactness of the round-trip property.
fn affine_params(array: &str, min: f64, max: f64) -> Result<QuantParams, ResolveError> {
    if !(min < max) {
        return Err(ResolveError::DegenerateRange {
            array: array.to_owned(),
            min,
            max,
        });
    }

    let scale = (max - min) / QUANT_MAX;
    let zero_point = (-min / scale).round().clamp(0.0, QUANT_MAX) as i64;
    Ok(QuantParams::new(scale, zero_point))
}

/// Decide the final representation of one array.
///
/// Resolution depends only on the array's own role, kind, and range plus
/// the read-only policy, so results are order-independent and reproducible.
pub fn resolve_type(
    policy: &PolicyConfig,
    array: &ArrayDescriptor,
) -> Result<QuantizationDecision, ResolveError> {
    // Non-real kinds pass through untouched; inference-type flags never
    // apply to them.
    if !array.kind.is_real() {
        return Ok(QuantizationDecision::pass_through(array));
    }

    let Some(target) = policy.effective_inference_kind(array.role) else {
        // No inference type requested: output representation equals input
        // representation.
        return Ok(QuantizationDecision::pass_through(array));
    };

    match (array.kind, target) {
        // Dequantize: drop the scale/zero-point.
        (ElementKind::QuantUint8, InferenceKind::Float) => Ok(QuantizationDecision {
            array: array.name.clone(),
            kind: ElementKind::Float,
            params: None,
            range_origin: None,
        }),

        // Quantize: resolve a range and derive affine parameters.
        (ElementKind::Float, InferenceKind::QuantizedUint8) => {
            let range = resolve_range(policy, array).map_err(|err| match err {
                RangeError::MissingRange { array } => {
                    ResolveError::QuantizationInfeasible { array }
                }
            })?;
            let params = affine_params(&array.name, range.min, range.max)?;

            log::debug!(
                "quantizing array `{}` over [{}, {}]: scale {}, zero point {}",
                array.name,
                range.min,
                range.max,
                params.scale,
                params.zero_point
            );

            Ok(QuantizationDecision {
                array: array.name.clone(),
                kind: ElementKind::QuantUint8,
                params: Some(params),
                range_origin: Some(range.origin),
            })
        }

        // Target equals current representation.
        _ => Ok(QuantizationDecision::pass_through(array)),
    }
}

/// Outcome of a batch resolution pass: one entry per array, successes and
/// failures side by side.
#[derive(Debug, Clone, Default)]
pub struct ResolutionOutcome {
    /// Successful decisions, in input array order.
    pub decisions: Vec<QuantizationDecision>,
    /// Per-array failures, in input array order.
    pub failures: Vec<ResolveError>,
}

impl ResolutionOutcome {
    /// Whether every array resolved successfully.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Resolve every array in the batch.
///
/// Per-array resolution shares nothing but the read-only policy, so the
/// batch runs in parallel. Failures are collected rather than aborting the
/// remaining arrays, favoring maximal diagnostic yield; output order always
/// matches input order.
pub fn resolve_all(policy: &PolicyConfig, arrays: &[ArrayDescriptor]) -> ResolutionOutcome {
    let results: Vec<_> = arrays
        .par_iter()
        .map(|array| resolve_type(policy, array))
        .collect();

    let mut outcome = ResolutionOutcome::default();
    for result in results {
        match result {
            Ok(decision) => outcome.decisions.push(decision),
            Err(err) => {
                log::warn!("{err}");
                outcome.failures.push(err);
            }
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use requant_ir::ArrayRole;

    use super::*;
    use crate::{FileFormat, InferenceKind, PolicyFlags};

    fn quantizing_policy() -> PolicyConfig {
        PolicyFlags {
            input_format: FileFormat::TrainingGraph,
            output_format: FileFormat::MobileBinary,
            inference_type: Some(InferenceKind::QuantizedUint8),
            ..Default::default()
        }
        .validate()
        .unwrap()
    }

    #[test]
    fn quantize_symmetric_unit_range() {
        let array = ArrayDescriptor::float("act").with_range(-1.0, 1.0);
        let decision = resolve_type(&quantizing_policy(), &array).unwrap();

        assert_eq!(decision.kind, ElementKind::QuantUint8);
        let params = decision.params.unwrap();
        assert_relative_eq!(params.scale, 2.0 / 255.0, max_relative = 1e-12);
        assert_eq!(params.zero_point, 128);
        assert_eq!(decision.range_origin, Some(RangeOrigin::Observed));
    }

    #[test]
    fn zero_point_clamped_for_positive_only_range() {
        // min > 0 puts the raw zero point below the domain.
        let array = ArrayDescriptor::float("act").with_range(1.0, 6.0);
        let params = resolve_type(&quantizing_policy(), &array)
            .unwrap()
            .params
            .unwrap();
        assert_eq!(params.zero_point, 0);
    }

    #[test]
    fn non_real_kinds_pass_through() {
        for kind in [ElementKind::Int32, ElementKind::Str, ElementKind::Bool] {
            let array = ArrayDescriptor::float("idx").with_kind(kind);
            let decision = resolve_type(&quantizing_policy(), &array).unwrap();
            assert_eq!(decision.kind, kind);
            assert!(decision.params.is_none());
        }
    }

    #[test]
    fn dequantize_discards_params() {
        let policy = PolicyFlags {
            input_format: FileFormat::TrainingGraph,
            output_format: FileFormat::MobileBinary,
            inference_type: Some(InferenceKind::Float),
            ..Default::default()
        }
        .validate()
        .unwrap();

        let array = ArrayDescriptor::float("w").quantized(0.02, 100);
        let decision = resolve_type(&policy, &array).unwrap();
        assert_eq!(decision.kind, ElementKind::Float);
        assert!(decision.params.is_none());
    }

    #[test]
    fn no_inference_type_means_pass_through() {
        let policy = PolicyFlags {
            input_format: FileFormat::TrainingGraph,
            output_format: FileFormat::MobileBinary,
            ..Default::default()
        }
        .validate()
        .unwrap();

        let array = ArrayDescriptor::float("w").quantized(0.02, 100);
        let decision = resolve_type(&policy, &array).unwrap();
        assert_eq!(decision.kind, ElementKind::QuantUint8);
        assert_eq!(decision.params, Some(QuantParams::new(0.02, 100)));
    }

    #[test]
    fn input_override_applies_to_designated_inputs_only() {
        let policy = PolicyFlags {
            input_format: FileFormat::TrainingGraph,
            output_format: FileFormat::MobileBinary,
            inference_type: Some(InferenceKind::QuantizedUint8),
            inference_input_type: Some(InferenceKind::Float),
            ..Default::default()
        }
        .validate()
        .unwrap();

        let input = ArrayDescriptor::float("in").with_range(-1.0, 1.0).as_input();
        let decision = resolve_type(&policy, &input).unwrap();
        assert_eq!(decision.kind, ElementKind::Float);

        let hidden = ArrayDescriptor::float("hidden").with_range(-1.0, 1.0);
        assert_eq!(
            resolve_type(&policy, &hidden).unwrap().kind,
            ElementKind::QuantUint8
        );
        assert_eq!(hidden.role, ArrayRole::Ordinary);
    }

    #[test]
    fn missing_range_becomes_infeasible() {
        let array = ArrayDescriptor::float("act");
        let err = resolve_type(&quantizing_policy(), &array).unwrap_err();
        assert_eq!(err, ResolveError::QuantizationInfeasible { array: "act".into() });
    }

    #[test]
    fn degenerate_range_rejected() {
        let array = ArrayDescriptor::float("act").with_range(2.0, 2.0);
        let err = resolve_type(&quantizing_policy(), &array).unwrap_err();
        assert!(matches!(err, ResolveError::DegenerateRange { .. }));
    }

    #[test]
    fn resolution_is_idempotent() {
        let policy = quantizing_policy();
        let array = ArrayDescriptor::float("act").with_range(-0.5, 3.5);

        let first = resolve_type(&policy, &array).unwrap();
        let second = resolve_type(&policy, &array).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn quantize_dequantize_round_trip_within_one_unit() {
        let (min, max) = (-1.0, 1.0);
        let first = affine_params("act", min, max).unwrap();

        // Dequantize the integer domain back to reals, then re-quantize.
        let min_rt = first.scale * (0.0 - first.zero_point as f64);
        let max_rt = first.scale * (QUANT_MAX - first.zero_point as f64);
        let second = affine_params("act", min_rt, max_rt).unwrap();

        assert_relative_eq!(first.scale, second.scale, max_relative = 1e-9);
        assert!((first.zero_point - second.zero_point).abs() <= 1);
    }

    #[test]
    fn batch_collects_failures_without_aborting() {
        let policy = quantizing_policy();
        let arrays = vec![
            ArrayDescriptor::float("ok").with_range(-1.0, 1.0),
            ArrayDescriptor::float("missing"),
            ArrayDescriptor::float("idx").with_kind(ElementKind::Int32),
        ];

        let outcome = resolve_all(&policy, &arrays);
        assert_eq!(outcome.decisions.len(), 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].array(), "missing");
        assert!(!outcome.is_complete());
    }
}
