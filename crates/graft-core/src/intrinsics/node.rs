use crate::ir::{Constant, Invoke, NodeId};

use super::ForeignCallDescriptor;

/// Placeholder for a recognised call, expanded by the lowering phase.
///
/// While the node is in the graph it is pending; lowering removes it and
/// either splices a snippet or restores `original`.
#[derive(Debug, Clone, PartialEq)]
pub struct IntrinsicNode {
    pub receiver: NodeId,
    /// Value produced by the extraction contract, consumed by the snippet.
    pub operand: NodeId,
    pub descriptor: &'static ForeignCallDescriptor,
    /// Result when the operand turns out to be null.
    pub fallback: Constant,
    pub original: Invoke,
}

impl IntrinsicNode {
    pub fn inputs(&self) -> Vec<NodeId> {
        let mut inputs = vec![self.receiver, self.operand];
        inputs.extend(self.original.receiver);
        inputs.extend(self.original.args.iter().copied());
        inputs
    }
}
