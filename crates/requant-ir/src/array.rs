use serde::{Deserialize, Serialize};

/// The element kind of an array.
///
/// Only [`Float`](ElementKind::Float) and [`QuantUint8`](ElementKind::QuantUint8)
/// are real-number kinds; the others pass through type resolution unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    /// 32-bit floating point.
    Float,
    /// Affine-quantized 8-bit unsigned integer.
    QuantUint8,
    /// Plain 32-bit integer (indices, shapes). Never quantized.
    Int32,
    /// String payload. Never quantized.
    Str,
    /// Boolean payload. Never quantized.
    Bool,
    /// Kind not declared by the source format.
    Unknown,
}

impl ElementKind {
    /// Whether this kind carries real-number semantics and therefore takes
    /// part in quantization decisions.
    pub fn is_real(&self) -> bool {
        matches!(self, Self::Float | Self::QuantUint8)
    }
}

/// The role of an array within the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArrayRole {
    /// Any array that is not an explicit model input.
    Ordinary,
    /// An array explicitly marked as a model input, eligible for an
    /// independent representation override.
    DesignatedInput,
}

/// An observed or synthetic `(min, max)` range over an array's values.
#[derive(new, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMax {
    /// Lower bound.
    pub min: f64,
    /// Upper bound.
    pub max: f64,
}

/// Affine quantization parameters mapping reals onto an integer domain.
///
/// A real value `r` is represented as `q` with `r = scale * (q - zero_point)`.
#[derive(new, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantParams {
    /// Real-valued step between adjacent integer levels.
    pub scale: f64,
    /// Integer level representing real zero.
    pub zero_point: i64,
}

/// Per-array view handed to the engine. Consumed, never owned.
#[derive(new, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayDescriptor {
    /// Unique array name within the graph.
    pub name: String,
    /// Role tag.
    pub role: ArrayRole,
    /// Declared element kind.
    pub kind: ElementKind,
    /// Observed `(min, max)` statistics, when the source recorded them.
    pub range: Option<MinMax>,
    /// Existing quantization parameters, when the array is already quantized.
    pub quant: Option<QuantParams>,
}

impl ArrayDescriptor {
    /// An ordinary float array with no statistics, the common starting state.
    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name.into(), ArrayRole::Ordinary, ElementKind::Float, None, None)
    }

    /// Attach an observed range.
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.range = Some(MinMax::new(min, max));
        self
    }

    /// Mark the array as a designated model input.
    pub fn as_input(mut self) -> Self {
        self.role = ArrayRole::DesignatedInput;
        self
    }

    /// Replace the declared element kind.
    pub fn with_kind(mut self, kind: ElementKind) -> Self {
        self.kind = kind;
        self
    }

    /// Attach existing quantization parameters and mark the array quantized.
    pub fn quantized(mut self, scale: f64, zero_point: i64) -> Self {
        self.kind = ElementKind::QuantUint8;
        self.quant = Some(QuantParams::new(scale, zero_point));
        self
    }
}
