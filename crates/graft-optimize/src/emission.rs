use graft_core::error::{Error, Result};
use graft_core::intrinsics::MethodSignature;
use graft_core::ir::{Graph, NodeKind};
use graft_core::pretty::{pretty, PrettyOptions};

use crate::report::LoweringReport;

/// No intrinsic node may reach code emission.
pub fn verify_no_pending_intrinsics(graph: &Graph) -> Result<()> {
    let pending = graph.pending_intrinsics();
    if !pending.is_empty() {
        return Err(Error::PendingIntrinsics {
            method: graph.method().to_string(),
            count: pending.len(),
        });
    }
    Ok(())
}

/// Final artifact of one compilation job.
#[derive(Debug, Clone)]
pub struct CompiledUnit {
    pub method: MethodSignature,
    pub graph: Graph,
    pub listing: String,
    pub events: LoweringReport,
}

impl CompiledUnit {
    pub fn emit(graph: Graph, events: LoweringReport, options: &PrettyOptions) -> Result<Self> {
        verify_no_pending_intrinsics(&graph)?;
        let listing = pretty(&graph, options.clone()).to_string();
        Ok(Self {
            method: graph.method().clone(),
            graph,
            listing,
            events,
        })
    }

    /// Names of the foreign calls the unit issues, in node order.
    pub fn foreign_calls(&self) -> Vec<&'static str> {
        self.graph
            .nodes()
            .filter_map(|(_, node)| match &node.kind {
                NodeKind::ForeignCall { descriptor, .. } => Some(descriptor.name),
                _ => None,
            })
            .collect()
    }

    /// Targets of the ordinary calls left in the unit.
    pub fn invokes(&self) -> Vec<&MethodSignature> {
        self.graph
            .nodes()
            .filter_map(|(_, node)| match &node.kind {
                NodeKind::Invoke(invoke) => Some(&invoke.target),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GraphBuilder;
    use graft_core::intrinsics::{
        default_substitutions, int_stream_sum_signature, SignatureRegistry,
        INT_ARRAY_SPLITERATOR_ARRAY,
    };
    use graft_core::ir::{Shape, Stamp, ValueKind};

    #[test]
    fn pending_intrinsic_blocks_emission() {
        let registry = SignatureRegistry::bootstrap(default_substitutions()).unwrap();
        let method = MethodSignature::new_static("demo.Main", "total", vec![ValueKind::Object]);
        let mut builder = GraphBuilder::with_registry(method, &registry);
        let stream = builder.parameter(Stamp::object().non_null().with_shape(Shape::ArrayBacked {
            element: ValueKind::Int,
            storage: INT_ARRAY_SPLITERATOR_ARRAY,
        }));
        let sum = builder.invoke(int_stream_sum_signature(), Some(stream), vec![], Stamp::int());
        builder.ret(Some(sum));
        let (graph, report) = builder.finish();

        let error = CompiledUnit::emit(graph, report, &PrettyOptions::default()).unwrap_err();
        assert!(matches!(error, Error::PendingIntrinsics { count: 1, .. }));
    }
}
