//! Graph construction surface used by method parsers and snippet fragments.
//!
//! The builder is where call sites are recognised: `invoke` consults the
//! signature registry and emits an intrinsic node when the substitution's
//! extraction contract understands the receiver.

use graft_core::error::Error;
use graft_core::intrinsics::{ForeignCallDescriptor, IntrinsicNode, MethodSignature, SignatureRegistry};
use graft_core::ir::{
    BlockId, BranchProbability, Constant, Graph, Invoke, NodeId, NodeKind, Stamp,
    Terminator,
};

use crate::report::{LoweringDecision, LoweringEvent, LoweringReport};

/// Result every substitution falls back to when its operand is null.
pub const DEFAULT_FALLBACK: Constant = Constant::Int(0);

pub struct GraphBuilder<'a> {
    graph: Graph,
    current: BlockId,
    registry: Option<&'a SignatureRegistry>,
    report: LoweringReport,
}

impl<'a> GraphBuilder<'a> {
    /// Builder that never intrinsifies.
    pub fn new(method: MethodSignature) -> Self {
        let graph = Graph::new(method);
        let current = graph.entry();
        Self {
            graph,
            current,
            registry: None,
            report: LoweringReport::default(),
        }
    }

    /// Builder that recognises the calls listed in `registry`.
    pub fn with_registry(method: MethodSignature, registry: &'a SignatureRegistry) -> Self {
        let mut builder = Self::new(method);
        builder.registry = Some(registry);
        builder
    }

    pub fn method(&self) -> &MethodSignature {
        self.graph.method()
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn current_block(&self) -> BlockId {
        self.current
    }

    pub fn new_block(&mut self) -> BlockId {
        self.graph.add_block()
    }

    pub fn switch_to(&mut self, block: BlockId) {
        self.current = block;
    }

    pub fn parameter(&mut self, stamp: Stamp) -> NodeId {
        self.graph.add_parameter(stamp)
    }

    pub fn constant(&mut self, constant: Constant) -> NodeId {
        self.graph.add_constant(constant)
    }

    pub fn append(&mut self, kind: NodeKind, stamp: Stamp) -> NodeId {
        self.graph.append(self.current, kind, stamp)
    }

    pub fn is_null(&mut self, value: NodeId) -> NodeId {
        self.append(NodeKind::IsNull(value), Stamp::boolean())
    }

    pub fn add(&mut self, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.append(NodeKind::Add(lhs, rhs), Stamp::int())
    }

    pub fn foreign_call(
        &mut self,
        descriptor: &'static ForeignCallDescriptor,
        args: Vec<NodeId>,
    ) -> NodeId {
        self.append(
            NodeKind::ForeignCall { descriptor, args },
            Stamp::for_kind(descriptor.result),
        )
    }

    /// Build a call to `target`. Recognised calls become intrinsic nodes when
    /// the substitution's extraction contract accepts the receiver; anything
    /// else is an ordinary invoke.
    pub fn invoke(
        &mut self,
        target: MethodSignature,
        receiver: Option<NodeId>,
        args: Vec<NodeId>,
        result: Stamp,
    ) -> NodeId {
        let original = Invoke {
            target,
            receiver,
            args,
        };
        match self.try_intrinsify(&original, &result) {
            Some(node) => node,
            None => self.append(NodeKind::Invoke(original), result),
        }
    }

    fn try_intrinsify(&mut self, original: &Invoke, result: &Stamp) -> Option<NodeId> {
        let entry = self.registry?.lookup(&original.target)?;
        // Static substitutions read their first argument instead.
        let subject = original.receiver.or_else(|| original.args.first().copied());
        let extracted = match subject {
            Some(subject) => entry
                .extraction
                .extract(&mut self.graph, self.current, subject)
                .map(|operand| (subject, operand)),
            None => Err(graft_core::intrinsics::ExtractionFailure::MissingOperand),
        };
        match extracted {
            Ok((receiver, operand)) => {
                graft_core::trace!(
                    "intrinsifying {} in {} via {}",
                    original.target,
                    self.graph.method(),
                    entry.substitute
                );
                let node = IntrinsicNode {
                    receiver,
                    operand,
                    descriptor: entry.descriptor,
                    fallback: DEFAULT_FALLBACK,
                    original: original.clone(),
                };
                Some(self.append(NodeKind::Intrinsic(node), result.clone()))
            }
            Err(failure) => {
                let error = Error::ExtractionFailure {
                    signature: original.target.clone(),
                    failure,
                };
                let event = LoweringEvent::new(
                    self.graph.method(),
                    &original.target,
                    LoweringDecision::OrdinaryCall,
                    error.to_string(),
                );
                self.report.push(event);
                None
            }
        }
    }

    /// Terminate the current block with a two-way branch on `condition` and
    /// return `(true_block, false_block)`.
    pub fn if_then_else(
        &mut self,
        condition: NodeId,
        probability: BranchProbability,
    ) -> (BlockId, BlockId) {
        let true_block = self.new_block();
        let false_block = self.new_block();
        self.graph.set_terminator(
            self.current,
            Terminator::If {
                condition,
                true_block,
                false_block,
                probability,
            },
        );
        (true_block, false_block)
    }

    pub fn ret(&mut self, value: Option<NodeId>) {
        self.graph.set_terminator(self.current, Terminator::Return(value));
    }

    pub fn finish(self) -> (Graph, LoweringReport) {
        (self.graph, self.report)
    }

    pub fn into_graph(self) -> Graph {
        self.graph
    }

    pub(crate) fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_core::intrinsics::{
        default_substitutions, int_stream_sum_signature, INT_ARRAY_SPLITERATOR_ARRAY,
        INT_STREAM_SUM,
    };
    use graft_core::ir::{Shape, ValueKind};

    fn registry() -> SignatureRegistry {
        SignatureRegistry::bootstrap(default_substitutions()).unwrap()
    }

    fn method() -> MethodSignature {
        MethodSignature::new_static("demo.Main", "total", vec![ValueKind::Object])
    }

    fn array_stream() -> Stamp {
        Stamp::object().non_null().with_shape(Shape::ArrayBacked {
            element: ValueKind::Int,
            storage: INT_ARRAY_SPLITERATOR_ARRAY,
        })
    }

    #[test]
    fn recognised_call_becomes_intrinsic() {
        let registry = registry();
        let mut builder = GraphBuilder::with_registry(method(), &registry);
        let stream = builder.parameter(array_stream());
        let sum = builder.invoke(int_stream_sum_signature(), Some(stream), vec![], Stamp::int());
        builder.ret(Some(sum));
        let (graph, report) = builder.finish();

        assert!(report.events.is_empty());
        match &graph.node(sum).unwrap().kind {
            NodeKind::Intrinsic(node) => {
                assert_eq!(node.descriptor, &INT_STREAM_SUM);
                assert_eq!(node.receiver, stream);
                assert_eq!(node.fallback, Constant::Int(0));
                assert!(matches!(
                    graph.node(node.operand).unwrap().kind,
                    NodeKind::LoadField { object, .. } if object == stream
                ));
            }
            other => panic!("expected intrinsic, found {:?}", other),
        }
    }

    #[test]
    fn unknown_receiver_keeps_ordinary_call() {
        let registry = registry();
        let mut builder = GraphBuilder::with_registry(method(), &registry);
        let stream = builder.parameter(Stamp::object().non_null());
        let sum = builder.invoke(int_stream_sum_signature(), Some(stream), vec![], Stamp::int());
        builder.ret(Some(sum));
        let (graph, report) = builder.finish();

        assert!(matches!(graph.node(sum).unwrap().kind, NodeKind::Invoke(_)));
        assert_eq!(graph.pending_intrinsics(), Vec::<NodeId>::new());
        assert_eq!(report.count(LoweringDecision::OrdinaryCall), 1);
        assert!(report.events[0].reason.contains("unknown"));
    }

    #[test]
    fn builder_without_registry_never_intrinsifies() {
        let mut builder = GraphBuilder::new(method());
        let stream = builder.parameter(array_stream());
        let sum = builder.invoke(int_stream_sum_signature(), Some(stream), vec![], Stamp::int());
        builder.ret(Some(sum));
        let graph = builder.into_graph();
        assert!(matches!(graph.node(sum).unwrap().kind, NodeKind::Invoke(_)));
    }
}
