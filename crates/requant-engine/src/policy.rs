use requant_ir::{ArrayRole, MinMax};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// On-disk representations the conversion tool translates between.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum FileFormat {
    /// Format not specified. Invalid wherever a concrete format is required.
    #[default]
    Unknown,
    /// General-purpose training-graph format.
    TrainingGraph,
    /// Mobile-inference binary format.
    MobileBinary,
    /// Visualization format.
    Visualization,
}

/// Numeric representation requested for inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum InferenceKind {
    /// Floating-point inference.
    Float,
    /// Affine-quantized 8-bit unsigned integer inference.
    QuantizedUint8,
}

/// Tri-state control-dependency switch.
///
/// The unset state is a format-dependent default, resolved against the
/// output format once at validation time rather than checked ad hoc at use
/// sites.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlDepPolicy {
    /// Drop control dependencies when the output format is not the
    /// training-graph format, keep them when it is.
    #[default]
    Default,
    /// Always keep control dependencies.
    Keep,
    /// Always drop control dependencies.
    Drop,
}

/// Raw conversion flags as supplied by the user, prior to validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyFlags {
    /// Format of the graph being read.
    pub input_format: FileFormat,
    /// Format of the graph being written.
    pub output_format: FileFormat,
    /// Target representation for all real-number arrays.
    pub inference_type: Option<InferenceKind>,
    /// Representation override for designated-input arrays only.
    pub inference_input_type: Option<InferenceKind>,
    /// Fallback range lower bound for arrays lacking observed statistics.
    pub default_range_min: Option<f64>,
    /// Fallback range upper bound for arrays lacking observed statistics.
    pub default_range_max: Option<f64>,
    /// Remove fake-quant markers entirely, recording no boundary.
    pub drop_fake_quant: bool,
    /// Demote fake-quant boundaries from hard to soft, letting passes cross
    /// them at the cost of the training/inference equivalence guarantee.
    pub relax_quant_boundary: bool,
    /// Permit operators only representable as opaque custom operators.
    pub allow_custom_ops: bool,
    /// Control-dependency handling; see [`ControlDepPolicy`].
    pub drop_control_dependency: ControlDepPolicy,
    /// Skip the recurrent-cell fusion pass. The pattern match is a
    /// heuristic, so it must be independently disable-able.
    pub disable_recurrent_fusion: bool,
}

/// Policy validation failures. All fatal; the job cannot start.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PolicyError {
    /// A format enum was left `UNKNOWN` for a role that requires a concrete
    /// format.
    #[error("{role} format must be concrete, got `{format}`")]
    UnknownFormat {
        /// Which side of the conversion is missing its format.
        role: &'static str,
        /// The offending value.
        format: FileFormat,
    },

    /// Only one of `default_range_min` / `default_range_max` was set.
    #[error("default_range_min and default_range_max must be set together")]
    HalfOpenDefaultRange,

    /// `default_range_min >= default_range_max`.
    #[error("invalid default range: min {min} must be less than max {max}")]
    InvalidDefaultRange {
        /// Configured lower bound.
        min: f64,
        /// Configured upper bound.
        max: f64,
    },
}

impl PolicyFlags {
    /// Validate the raw flags into an immutable [`PolicyConfig`].
    ///
    /// Performed once per conversion job; the resulting config is read-only
    /// for the job's duration.
    pub fn validate(self) -> Result<PolicyConfig, PolicyError> {
        if self.input_format == FileFormat::Unknown {
            return Err(PolicyError::UnknownFormat {
                role: "input",
                format: self.input_format,
            });
        }
        if self.output_format == FileFormat::Unknown {
            return Err(PolicyError::UnknownFormat {
                role: "output",
                format: self.output_format,
            });
        }

        let default_range = match (self.default_range_min, self.default_range_max) {
            (None, None) => None,
            (Some(min), Some(max)) => {
                if min >= max {
                    return Err(PolicyError::InvalidDefaultRange { min, max });
                }
                Some(MinMax::new(min, max))
            }
            _ => return Err(PolicyError::HalfOpenDefaultRange),
        };

        // Resolve the tri-state against the output format now so use sites
        // see a plain bool.
        let drop_control_dependencies = match self.drop_control_dependency {
            ControlDepPolicy::Keep => false,
            ControlDepPolicy::Drop => true,
            ControlDepPolicy::Default => self.output_format != FileFormat::TrainingGraph,
        };

        Ok(PolicyConfig {
            input_format: self.input_format,
            output_format: self.output_format,
            inference_type: self.inference_type,
            inference_input_type: self.inference_input_type,
            default_range,
            drop_fake_quant: self.drop_fake_quant,
            relax_quant_boundary: self.relax_quant_boundary,
            allow_custom_ops: self.allow_custom_ops,
            drop_control_dependencies,
            disable_recurrent_fusion: self.disable_recurrent_fusion,
        })
    }
}

impl TryFrom<PolicyFlags> for PolicyConfig {
    type Error = PolicyError;

    fn try_from(flags: PolicyFlags) -> Result<Self, Self::Error> {
        flags.validate()
    }
}

/// Immutable, validated view of the conversion flags.
///
/// Constructed once per job via [`PolicyFlags::validate`]; all accessors are
/// pure reads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyConfig {
    input_format: FileFormat,
    output_format: FileFormat,
    inference_type: Option<InferenceKind>,
    inference_input_type: Option<InferenceKind>,
    default_range: Option<MinMax>,
    drop_fake_quant: bool,
    relax_quant_boundary: bool,
    allow_custom_ops: bool,
    drop_control_dependencies: bool,
    disable_recurrent_fusion: bool,
}

impl PolicyConfig {
    /// Format of the graph being read.
    pub fn input_format(&self) -> FileFormat {
        self.input_format
    }

    /// Format of the graph being written.
    pub fn output_format(&self) -> FileFormat {
        self.output_format
    }

    /// Fallback range for arrays lacking observed statistics.
    pub fn default_range(&self) -> Option<MinMax> {
        self.default_range
    }

    /// Whether fake-quant markers are removed outright.
    pub fn drop_fake_quant(&self) -> bool {
        self.drop_fake_quant
    }

    /// Whether fake-quant boundaries are demoted to soft.
    pub fn relax_quant_boundary(&self) -> bool {
        self.relax_quant_boundary
    }

    /// Whether opaque custom operators are permitted in the output.
    pub fn allow_custom_ops(&self) -> bool {
        self.allow_custom_ops
    }

    /// Control-dependency elision, already resolved against the output
    /// format.
    pub fn drop_control_dependencies(&self) -> bool {
        self.drop_control_dependencies
    }

    /// Whether the recurrent-cell fusion pass is skipped.
    pub fn disable_recurrent_fusion(&self) -> bool {
        self.disable_recurrent_fusion
    }

    /// The target representation in effect for an array with the given role.
    ///
    /// Designated inputs honor the `inference_input_type` override before
    /// falling back to `inference_type`; every other array uses
    /// `inference_type` directly. `None` means pass-through.
    pub fn effective_inference_kind(&self, role: ArrayRole) -> Option<InferenceKind> {
        match role {
            ArrayRole::DesignatedInput => self.inference_input_type.or(self.inference_type),
            ArrayRole::Ordinary => self.inference_type,
        }
    }
}
