//! Lowering phase: expand every pending intrinsic node into its snippet.
//!
//! The sweep visits intrinsic nodes in ascending id order, so two runs over
//! equal graphs produce equal results. A node whose native entry is missing
//! from the active runtime is turned back into the call it replaced; every
//! other failure aborts the compilation job.

use graft_core::error::{Error, Result};
use graft_core::intrinsics::IntrinsicNode;
use graft_core::ir::{Graph, LoweringStage, NodeId, NodeKind};

use crate::cancel::CancellationToken;
use crate::report::{LoweringDecision, LoweringEvent, LoweringReport};
use crate::snippets::{
    Arguments, MetaAccess, ParamRole, SnippetRegistry, SnippetTemplateCache, UsageReplacer,
    DEFAULT_REPLACER,
};

/// Everything one lowering run borrows from the compiler instance.
pub struct LoweringContext<'a> {
    pub snippets: &'a SnippetRegistry,
    pub cache: &'a SnippetTemplateCache,
    pub meta: MetaAccess<'a>,
    pub lowering_stage: LoweringStage,
    pub cancel: &'a CancellationToken,
    pub replacer: &'a dyn UsageReplacer,
}

impl<'a> LoweringContext<'a> {
    pub fn new(
        snippets: &'a SnippetRegistry,
        cache: &'a SnippetTemplateCache,
        meta: MetaAccess<'a>,
        lowering_stage: LoweringStage,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            snippets,
            cache,
            meta,
            lowering_stage,
            cancel,
            replacer: &DEFAULT_REPLACER,
        }
    }

    pub fn with_replacer(mut self, replacer: &'a dyn UsageReplacer) -> Self {
        self.replacer = replacer;
        self
    }
}

pub fn lower_intrinsics(graph: &mut Graph, cx: &LoweringContext<'_>) -> Result<LoweringReport> {
    let mut report = LoweringReport::default();
    for id in graph.pending_intrinsics() {
        cx.cancel.check(graph.method())?;
        let Some(NodeKind::Intrinsic(node)) = graph.node(id).map(|node| node.kind.clone()) else {
            continue;
        };
        let event = lower_one(graph, cx, id, &node)?;
        report.push(event);
    }
    cx.cancel.check(graph.method())?;

    let pruned = graph.prune_dead_nodes();
    graft_core::debug!(
        "lowered {} intrinsic(s) in {} ({} restored, {} dead node(s) pruned)",
        report.count(LoweringDecision::LoweredToSnippet),
        graph.method(),
        report.count(LoweringDecision::DescriptorUnavailable)
            + report.count(LoweringDecision::OrdinaryCall),
        pruned
    );
    Ok(report)
}

fn lower_one(
    graph: &mut Graph,
    cx: &LoweringContext<'_>,
    id: NodeId,
    node: &IntrinsicNode,
) -> Result<LoweringEvent> {
    let method = graph.method().clone();
    let target = &node.original.target;

    let Some(info) = cx.snippets.for_descriptor(node.descriptor) else {
        restore_call(graph, id, node);
        return Ok(LoweringEvent::new(
            &method,
            target,
            LoweringDecision::OrdinaryCall,
            format!("no snippet implements `{}`", node.descriptor.name),
        ));
    };
    if let Err(error) = cx.meta.foreign_calls.resolve(node.descriptor) {
        restore_call(graph, id, node);
        return Ok(LoweringEvent::new(
            &method,
            target,
            LoweringDecision::DescriptorUnavailable,
            error.to_string(),
        ));
    }

    let fallback = graph.add_constant(node.fallback);
    let mut args = Arguments::new(info.clone(), graph.guards_stage(), cx.lowering_stage);
    for param in info.params {
        let value = match param.role {
            ParamRole::Operand => node.operand,
            ParamRole::Fallback => fallback,
        };
        args.add(param.name, value);
    }

    let template = cx.cache.template(id, &args)?;
    match template.instantiate(&cx.meta, graph, id, cx.replacer, &args) {
        Ok(result) => Ok(LoweringEvent::new(
            &method,
            target,
            LoweringDecision::LoweredToSnippet,
            format!("{} -> {} via {}", id, result, info.id),
        )),
        Err(error @ Error::DescriptorUnavailable { .. }) => {
            restore_call(graph, id, node);
            Ok(LoweringEvent::new(
                &method,
                target,
                LoweringDecision::DescriptorUnavailable,
                error.to_string(),
            ))
        }
        Err(error) => Err(error),
    }
}

/// Put the recognised call back in place of the intrinsic node.
fn restore_call(graph: &mut Graph, id: NodeId, node: &IntrinsicNode) {
    if let Some(slot) = graph.node_mut(id) {
        slot.kind = NodeKind::Invoke(node.original.clone());
    }
}
