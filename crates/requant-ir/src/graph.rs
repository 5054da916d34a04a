use core::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::ArrayDescriptor;

/// Operators the conversion pipeline knows how to translate natively, plus
/// the marker and opaque kinds the engine has to reason about.
///
/// The set of convertible kinds is deliberately coarse: the engine only
/// needs to tell markers and opaque operators apart from everything else.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum OperatorKind {
    /// Elementwise addition.
    Add,
    /// Elementwise multiplication.
    Mul,
    /// Tensor concatenation.
    Concat,
    /// Dense matrix multiply plus bias.
    FullyConnected,
    /// 2D convolution.
    Conv2d,
    /// Depthwise 2D convolution.
    DepthwiseConv2d,
    /// Sigmoid activation.
    Sigmoid,
    /// Hyperbolic tangent activation.
    Tanh,
    /// Softmax activation.
    Softmax,
    /// Reshape without data movement.
    Reshape,
    /// A fused recurrent cell produced by the fusion pass.
    RecurrentCell,
    /// Training-time quantization simulation marker. Defines an
    /// arithmetic-equivalence boundary on its output edge.
    FakeQuant,
    /// An operator the pipeline cannot translate. Representable only as an
    /// opaque custom operator, and only when the policy allows those.
    Custom(String),
}

/// A graph edge, identified by the name of the array flowing over it.
#[derive(new, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub String);

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single operator in the graph view.
#[derive(new, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorRecord {
    /// Unique operator name.
    pub name: String,
    /// Operator kind.
    pub kind: OperatorKind,
    /// Names of consumed arrays, in positional order.
    pub inputs: Vec<String>,
    /// Names of produced arrays, in positional order.
    pub outputs: Vec<String>,
    /// Names of operators this one has a pure ordering (control) dependency
    /// on, carrying no data.
    pub control_inputs: Vec<String>,
}

impl OperatorRecord {
    /// A data-only operator with no control dependencies.
    pub fn simple(
        name: impl Into<String>,
        kind: OperatorKind,
        inputs: Vec<String>,
        outputs: Vec<String>,
    ) -> Self {
        Self::new(name.into(), kind, inputs, outputs, Vec::new())
    }

    /// The output edge of the operator, when it has one.
    ///
    /// Markers always produce exactly one output; a marker record without one
    /// is malformed and yields `None`.
    pub fn output_edge(&self) -> Option<EdgeId> {
        self.outputs.first().map(|name| EdgeId::new(name.clone()))
    }
}

/// Read-only snapshot of a model graph: arrays plus operators.
///
/// The engine classifies this view and plans against it; mutation is the
/// rewrite executor's business.
#[derive(new, Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphView {
    arrays: Vec<ArrayDescriptor>,
    operators: Vec<OperatorRecord>,
}

impl GraphView {
    /// All array descriptors, in declaration order.
    pub fn arrays(&self) -> &[ArrayDescriptor] {
        &self.arrays
    }

    /// All operator records, in declaration order.
    pub fn operators(&self) -> &[OperatorRecord] {
        &self.operators
    }

    /// Look up an array by name.
    pub fn array(&self, name: &str) -> Option<&ArrayDescriptor> {
        self.arrays.iter().find(|a| a.name == name)
    }

    /// All fake-quant marker operators, in declaration order.
    pub fn fake_quant_markers(&self) -> impl Iterator<Item = &OperatorRecord> {
        self.operators
            .iter()
            .filter(|op| op.kind == OperatorKind::FakeQuant)
    }

    /// Whether any operator carries a control dependency.
    pub fn has_control_dependencies(&self) -> bool {
        self.operators.iter().any(|op| !op.control_inputs.is_empty())
    }
}
