use crate::{GraphView, OperatorKind, OperatorRecord};

/// How an operator can be carried into the output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorSupport {
    /// Translated natively by the conversion pipeline.
    Native,
    /// Only representable as an opaque custom operator. Whether that is
    /// acceptable is a policy question, not an IR one.
    CustomOnly,
}

impl OperatorKind {
    /// Classify the operator's supportability.
    pub fn support(&self) -> OperatorSupport {
        match self {
            OperatorKind::Custom(_) => OperatorSupport::CustomOnly,
            _ => OperatorSupport::Native,
        }
    }
}

/// Operators in the graph that are only representable as opaque custom
/// operators, in declaration order.
pub fn custom_only_operators(graph: &GraphView) -> Vec<&OperatorRecord> {
    graph
        .operators()
        .iter()
        .filter(|op| op.kind.support() == OperatorSupport::CustomOnly)
        .collect()
}
