use std::collections::HashMap;
use std::sync::Arc;

use graft_core::error::{Error, Result};
use graft_core::intrinsics::{
    ForeignCallDescriptor, ForeignCallDirectory, MethodSignature, SideEffect,
};
use graft_core::ir::{BlockId, Graph, NodeId, NodeKind, Stamp, Terminator, ValueKind};

use crate::builder::GraphBuilder;

use super::{Arguments, SnippetInfo, TemplateKey};

/// Runtime metadata the host exposes to instantiation.
#[derive(Debug, Clone, Copy)]
pub struct MetaAccess<'a> {
    pub foreign_calls: &'a ForeignCallDirectory,
}

impl<'a> MetaAccess<'a> {
    pub fn new(foreign_calls: &'a ForeignCallDirectory) -> Self {
        Self { foreign_calls }
    }
}

/// How usages of a replaced node are rewired to the fragment's result.
pub trait UsageReplacer: Sync {
    fn replace(&self, graph: &mut Graph, replaced: NodeId, result: NodeId);
}

/// Rewires every usage of the replaced node to the result.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultReplacer;

impl UsageReplacer for DefaultReplacer {
    fn replace(&self, graph: &mut Graph, replaced: NodeId, result: NodeId) {
        graph.replace_at_usages(replaced, result);
    }
}

pub const DEFAULT_REPLACER: DefaultReplacer = DefaultReplacer;

/// A built fragment ready to be copied into graphs.
#[derive(Debug)]
pub struct SnippetTemplate {
    key: TemplateKey,
    info: Arc<SnippetInfo>,
    fragment: Graph,
}

impl SnippetTemplate {
    pub(crate) fn build(info: Arc<SnippetInfo>, key: TemplateKey) -> Result<Self> {
        let method = MethodSignature::new_static(
            "<snippet>",
            info.id.0,
            info.params.iter().map(|param| param.kind).collect(),
        );
        let mut builder = GraphBuilder::new(method);
        builder.graph_mut().set_guards_stage(key.guards_stage)?;
        let formals: Vec<NodeId> = info
            .params
            .iter()
            .map(|param| builder.parameter(Stamp::for_kind(param.kind)))
            .collect();
        (info.build)(&mut builder, &formals)?;
        let fragment = builder.into_graph();
        verify_fragment(&info, &fragment)?;
        Ok(Self {
            key,
            info,
            fragment,
        })
    }

    pub fn key(&self) -> TemplateKey {
        self.key
    }

    pub fn info(&self) -> &Arc<SnippetInfo> {
        &self.info
    }

    pub fn fragment(&self) -> &Graph {
        &self.fragment
    }

    /// Foreign calls the fragment issues.
    pub fn foreign_calls(&self) -> Vec<&'static ForeignCallDescriptor> {
        self.fragment
            .nodes()
            .filter_map(|(_, node)| match &node.kind {
                NodeKind::ForeignCall { descriptor, .. } => Some(*descriptor),
                _ => None,
            })
            .collect()
    }

    /// Copy the fragment into `graph` in place of `replaced`, bind the formals
    /// to `args` and rewire usages of `replaced` to the fragment's result.
    ///
    /// Every check runs before the graph is touched, so on error `graph` is
    /// unchanged. Returns the node now standing for the result.
    pub fn instantiate(
        &self,
        meta: &MetaAccess<'_>,
        graph: &mut Graph,
        replaced: NodeId,
        replacer: &dyn UsageReplacer,
        args: &Arguments,
    ) -> Result<NodeId> {
        let snippet = self.info.id.0;
        if graph.guards_stage() != self.key.guards_stage {
            return Err(Error::StageMismatch {
                snippet,
                requested: graph.guards_stage(),
                required: self.key.guards_stage,
            });
        }
        crate::snippet_ensure!(
            args.cache_key() == self.key,
            snippet,
            "arguments were prepared for a different template"
        );
        let actuals = args.bind()?;
        for descriptor in self.foreign_calls() {
            meta.foreign_calls.resolve(descriptor)?;
        }
        let Some((block, index)) = graph.locate(replaced) else {
            crate::snippet_bail!(snippet, format!("{} is not scheduled", replaced));
        };
        let result_stamp = match graph.stamp(replaced) {
            Some(stamp) => stamp.clone(),
            None => crate::snippet_bail!(snippet, format!("{} is not in the graph", replaced)),
        };

        let mut block_map: HashMap<BlockId, BlockId> = HashMap::new();
        for (fragment_block, _) in self.fragment.blocks() {
            block_map.insert(fragment_block, graph.add_block());
        }

        let mut node_map: HashMap<NodeId, NodeId> = HashMap::new();
        for (formal, actual) in self.fragment.parameters().iter().zip(&actuals) {
            node_map.insert(*formal, *actual);
        }
        let mut copied = Vec::new();
        for (id, node) in self.fragment.nodes() {
            if matches!(node.kind, NodeKind::Parameter(_)) {
                continue;
            }
            let copy = graph.add_floating(node.kind.clone(), node.stamp.clone());
            node_map.insert(id, copy);
            copied.push(copy);
        }
        for copy in copied {
            if let Some(node) = graph.node_mut(copy) {
                node.kind.map_inputs(|input| node_map[&input]);
                if let NodeKind::Phi(inputs) = &mut node.kind {
                    for (pred, _) in inputs.iter_mut() {
                        *pred = block_map[&*pred];
                    }
                }
            }
        }

        let continuation = graph.split_block_at(block, index);
        let mut returns: Vec<(BlockId, NodeId)> = Vec::new();
        for (fragment_block, body) in self.fragment.blocks() {
            let target = block_map[&fragment_block];
            graph.block_mut(target).nodes = body.nodes.iter().map(|id| node_map[id]).collect();
            let terminator = match &body.terminator {
                Terminator::Return(Some(value)) => {
                    returns.push((target, node_map[value]));
                    Terminator::Jump(continuation)
                }
                Terminator::Return(None) => Terminator::Jump(continuation),
                Terminator::Jump(next) => Terminator::Jump(block_map[next]),
                Terminator::If {
                    condition,
                    true_block,
                    false_block,
                    probability,
                } => Terminator::If {
                    condition: node_map[condition],
                    true_block: block_map[true_block],
                    false_block: block_map[false_block],
                    probability: *probability,
                },
                Terminator::Unreachable => Terminator::Unreachable,
            };
            graph.set_terminator(target, terminator);
        }
        graph.set_terminator(block, Terminator::Jump(block_map[&self.fragment.entry()]));

        let result = if returns.len() == 1 {
            returns[0].1
        } else {
            let phi = graph.add_floating(NodeKind::Phi(returns), result_stamp);
            graph.block_mut(continuation).nodes.insert(0, phi);
            phi
        };
        replacer.replace(graph, replaced, result);
        graph.remove_node(replaced);
        Ok(result)
    }
}

/// Reject fragments the instantiation cannot splice.
fn verify_fragment(info: &SnippetInfo, fragment: &Graph) -> Result<()> {
    let snippet = info.id.0;
    crate::snippet_ensure!(
        info.result != ValueKind::Void,
        snippet,
        "snippets must produce a value"
    );
    crate::snippet_ensure!(
        fragment.parameters().len() == info.params.len(),
        snippet,
        "fragment declared extra parameters"
    );
    let mut returns = 0;
    for (block, body) in fragment.blocks() {
        for id in &body.nodes {
            let Some(node) = fragment.node(*id) else {
                crate::snippet_bail!(snippet, format!("{} schedules removed node {}", block, id));
            };
            match &node.kind {
                NodeKind::Invoke(invoke) => crate::snippet_bail!(
                    snippet,
                    format!("call to {} must be inlined or intrinsified", invoke.target)
                ),
                NodeKind::Intrinsic(_) => {
                    crate::snippet_bail!(snippet, "fragment contains an unlowered intrinsic")
                }
                NodeKind::ForeignCall { descriptor, .. } => verify_foreign_call(info, descriptor)?,
                _ => {}
            }
            for input in node.kind.inputs() {
                crate::snippet_ensure!(
                    fragment.node(input).is_some(),
                    snippet,
                    format!("{} uses missing node {}", id, input)
                );
            }
        }
        match &body.terminator {
            Terminator::Return(value) => {
                returns += 1;
                let Some(value) = value else {
                    crate::snippet_bail!(snippet, format!("{} returns no value", block));
                };
                let kind = fragment.stamp(*value).map(|stamp| stamp.kind);
                crate::snippet_ensure!(
                    kind == Some(info.result),
                    snippet,
                    format!("{} returns a value of the wrong kind", block)
                );
            }
            Terminator::Unreachable => {
                crate::snippet_bail!(snippet, format!("{} is not terminated", block))
            }
            Terminator::Jump(_) | Terminator::If { .. } => {}
        }
    }
    crate::snippet_ensure!(returns > 0, snippet, "fragment never returns");
    Ok(())
}

/// A fragment may only call natives that leave no observable effect, survive
/// re-execution after a deoptimization, and kill nothing the snippet did not
/// declare.
fn verify_foreign_call(info: &SnippetInfo, descriptor: &ForeignCallDescriptor) -> Result<()> {
    let snippet = info.id.0;
    crate::snippet_ensure!(
        descriptor.side_effect == SideEffect::NoSideEffect,
        snippet,
        format!("foreign call {} has side effects", descriptor.name)
    );
    crate::snippet_ensure!(
        descriptor.is_deopt_safe(),
        snippet,
        format!("foreign call {} is not safe across deoptimization", descriptor.name)
    );
    if let Some(location) = descriptor
        .killed_locations
        .iter()
        .find(|location| !info.kills(**location))
    {
        crate::snippet_bail!(
            snippet,
            format!(
                "foreign call {} kills {:?}, which the snippet does not declare",
                descriptor.name, location
            )
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snippets::int_stream_sum::int_stream_sum_snippet;
    use crate::snippets::{ParamRole, SnippetId, SnippetParam};
    use graft_core::intrinsics::{LocationIdentity, INT_STREAM_SUM};
    use graft_core::ir::{BranchProbability, GuardsStage, LoweringStage};

    fn key(info: &SnippetInfo) -> TemplateKey {
        TemplateKey {
            snippet: info.id,
            guards_stage: GuardsStage::FixedDeopts,
            lowering_stage: LoweringStage::MidTier,
        }
    }

    #[test]
    fn int_stream_sum_fragment_has_cold_null_guard() {
        let info = Arc::new(int_stream_sum_snippet());
        let template = SnippetTemplate::build(info.clone(), key(&info)).unwrap();
        let fragment = template.fragment();

        assert_eq!(fragment.guards_stage(), GuardsStage::FixedDeopts);
        assert_eq!(template.foreign_calls(), vec![&INT_STREAM_SUM]);
        match &fragment.block(fragment.entry()).terminator {
            Terminator::If { probability, .. } => {
                assert_eq!(*probability, BranchProbability::NOT_FREQUENT);
                assert!(probability.is_synthetic());
                assert!(probability.is_cold());
            }
            other => panic!("expected null guard, found {:?}", other),
        }
    }

    const CALLING_PARAMS: &[SnippetParam] = &[SnippetParam {
        name: "value",
        kind: ValueKind::Object,
        role: ParamRole::Operand,
    }];

    fn calls_back_into_managed_code(builder: &mut GraphBuilder<'_>, params: &[NodeId]) -> Result<()> {
        let target = MethodSignature::new_instance("demo.Stream", "sum", vec![]);
        let value = builder.invoke(target, Some(params[0]), vec![], Stamp::int());
        builder.ret(Some(value));
        Ok(())
    }

    #[test]
    fn fragments_may_not_call_managed_code() {
        let info = Arc::new(SnippetInfo {
            id: SnippetId("calls_back"),
            params: CALLING_PARAMS,
            result: ValueKind::Int,
            required_guards_stage: GuardsStage::FixedDeopts,
            killed_locations: &[],
            descriptor: &INT_STREAM_SUM,
            build: calls_back_into_managed_code,
        });
        let error = SnippetTemplate::build(info.clone(), key(&info)).unwrap_err();
        assert!(error.to_string().contains("must be inlined or intrinsified"));
    }

    static WRITES_HEAP: ForeignCallDescriptor = ForeignCallDescriptor {
        name: "writes_heap",
        args: &[ValueKind::Object],
        result: ValueKind::Int,
        side_effect: SideEffect::HasSideEffect,
        reexecutable: true,
        can_deoptimize: false,
        killed_locations: &[],
    };

    static MAY_DEOPTIMIZE: ForeignCallDescriptor = ForeignCallDescriptor {
        name: "may_deoptimize",
        args: &[ValueKind::Object],
        result: ValueKind::Int,
        side_effect: SideEffect::NoSideEffect,
        reexecutable: false,
        can_deoptimize: true,
        killed_locations: &[],
    };

    static LOCKS_OBJECT: ForeignCallDescriptor = ForeignCallDescriptor {
        name: "locks_object",
        args: &[ValueKind::Object],
        result: ValueKind::Int,
        side_effect: SideEffect::NoSideEffect,
        reexecutable: true,
        can_deoptimize: false,
        killed_locations: &[LocationIdentity::MarkWord],
    };

    fn call_and_return(
        builder: &mut GraphBuilder<'_>,
        params: &[NodeId],
        descriptor: &'static ForeignCallDescriptor,
    ) -> Result<()> {
        let value = builder.foreign_call(descriptor, vec![params[0]]);
        builder.ret(Some(value));
        Ok(())
    }

    fn calls_writes_heap(builder: &mut GraphBuilder<'_>, params: &[NodeId]) -> Result<()> {
        call_and_return(builder, params, &WRITES_HEAP)
    }

    fn calls_may_deoptimize(builder: &mut GraphBuilder<'_>, params: &[NodeId]) -> Result<()> {
        call_and_return(builder, params, &MAY_DEOPTIMIZE)
    }

    fn calls_locks_object(builder: &mut GraphBuilder<'_>, params: &[NodeId]) -> Result<()> {
        call_and_return(builder, params, &LOCKS_OBJECT)
    }

    fn calling_snippet(
        name: &'static str,
        killed_locations: &'static [LocationIdentity],
        build: crate::snippets::FragmentBuilder,
    ) -> Arc<SnippetInfo> {
        Arc::new(SnippetInfo {
            id: SnippetId(name),
            params: CALLING_PARAMS,
            result: ValueKind::Int,
            required_guards_stage: GuardsStage::FixedDeopts,
            killed_locations,
            descriptor: &INT_STREAM_SUM,
            build,
        })
    }

    #[test]
    fn fragments_may_not_call_side_effecting_natives() {
        let info = calling_snippet("writes_heap", &[], calls_writes_heap);
        let error = SnippetTemplate::build(info.clone(), key(&info)).unwrap_err();
        assert!(error.to_string().contains("writes_heap has side effects"));
    }

    #[test]
    fn fragments_may_not_call_natives_unsafe_across_deoptimization() {
        let info = calling_snippet("may_deoptimize", &[], calls_may_deoptimize);
        let error = SnippetTemplate::build(info.clone(), key(&info)).unwrap_err();
        assert!(error.to_string().contains("not safe across deoptimization"));
    }

    #[test]
    fn killed_locations_must_be_declared() {
        let undeclared = calling_snippet("locks_undeclared", &[], calls_locks_object);
        let error = SnippetTemplate::build(undeclared.clone(), key(&undeclared)).unwrap_err();
        assert!(error.to_string().contains("kills MarkWord"));

        let declared = calling_snippet(
            "locks_declared",
            &[LocationIdentity::MarkWord],
            calls_locks_object,
        );
        let template = SnippetTemplate::build(declared.clone(), key(&declared)).unwrap();
        assert_eq!(template.foreign_calls(), vec![&LOCKS_OBJECT]);

        let any = calling_snippet("locks_any", &[LocationIdentity::Any], calls_locks_object);
        assert!(SnippetTemplate::build(any.clone(), key(&any)).is_ok());
    }
}
