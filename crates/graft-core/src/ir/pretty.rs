use std::fmt::{self, Formatter};

use itertools::Itertools;

use crate::pretty::{PrettyCtx, PrettyPrintable};

use super::{Graph, Node, NodeId, NodeKind, Terminator};

impl PrettyPrintable for Graph {
    fn fmt_pretty(&self, f: &mut Formatter<'_>, ctx: &mut PrettyCtx<'_>) -> fmt::Result {
        ctx.writeln(
            f,
            format!("graph {} [{:?}] {{", self.method(), self.guards_stage()),
        )?;
        ctx.with_indent(|ctx| {
            for (idx, param) in self.parameters().iter().enumerate() {
                if let Some(node) = self.node(*param) {
                    ctx.writeln(f, format!("{} = param({}) : {}", param, idx, node.stamp))?;
                }
            }
            for (block_id, block) in self.blocks() {
                ctx.writeln(f, format!("{}:", block_id))?;
                ctx.with_indent(|ctx| {
                    for id in &block.nodes {
                        if let Some(node) = self.node(*id) {
                            ctx.writeln(f, format_node(self, *id, node, ctx.options.show_stamps))?;
                        }
                    }
                    ctx.writeln(f, format_terminator(self, &block.terminator))
                })?;
            }
            Ok(())
        })?;
        ctx.writeln(f, "}")
    }
}

fn format_value(graph: &Graph, id: NodeId) -> String {
    match graph.node(id).map(|node| &node.kind) {
        Some(NodeKind::Constant(constant)) => format!("{}", constant),
        Some(_) => format!("{}", id),
        None => format!("{}<removed>", id),
    }
}

fn format_node(graph: &Graph, id: NodeId, node: &Node, show_stamp: bool) -> String {
    let value = |input: NodeId| format_value(graph, input);
    let body = match &node.kind {
        NodeKind::Parameter(index) => format!("param({})", index),
        NodeKind::Constant(constant) => format!("const {}", constant),
        NodeKind::IsNull(input) => format!("is_null {}", value(*input)),
        NodeKind::Add(lhs, rhs) => format!("add {}, {}", value(*lhs), value(*rhs)),
        NodeKind::LoadField { object, field } => format!("load {}.{}", value(*object), field),
        NodeKind::Invoke(invoke) => {
            let receiver = invoke
                .receiver
                .map(|receiver| format!("{}.", value(receiver)))
                .unwrap_or_default();
            format!(
                "invoke {}{}({})",
                receiver,
                invoke.target,
                invoke.args.iter().map(|arg| value(*arg)).join(", ")
            )
        }
        NodeKind::ForeignCall { descriptor, args } => format!(
            "foreign_call {}({})",
            descriptor.name,
            args.iter().map(|arg| value(*arg)).join(", ")
        ),
        NodeKind::Intrinsic(intrinsic) => format!(
            "intrinsic {}({}) fallback {}",
            intrinsic.descriptor.name,
            value(intrinsic.operand),
            intrinsic.fallback
        ),
        NodeKind::Phi(inputs) => format!(
            "phi {}",
            inputs
                .iter()
                .map(|(block, input)| format!("[{}: {}]", block, value(*input)))
                .join(", ")
        ),
    };
    if show_stamp {
        format!("{} = {} : {}", id, body, node.stamp)
    } else {
        format!("{} = {}", id, body)
    }
}

fn format_terminator(graph: &Graph, terminator: &Terminator) -> String {
    match terminator {
        Terminator::Return(Some(value)) => format!("return {}", format_value(graph, *value)),
        Terminator::Return(None) => "return".to_string(),
        Terminator::Jump(target) => format!("jump {}", target),
        Terminator::If {
            condition,
            true_block,
            false_block,
            probability,
        } => format!(
            "if {} then {} else {} [{}]",
            format_value(graph, *condition),
            true_block,
            false_block,
            probability
        ),
        Terminator::Unreachable => "unreachable".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intrinsics::MethodSignature;
    use crate::ir::{BranchProbability, Constant, Stamp, ValueKind};
    use crate::pretty::{pretty, PrettyOptions};

    #[test]
    fn prints_blocks_and_probabilities() {
        let mut graph = Graph::new(MethodSignature::new_static(
            "demo.Main",
            "pick",
            vec![ValueKind::Object],
        ));
        let entry = graph.entry();
        let p = graph.add_parameter(Stamp::object());
        let check = graph.append(entry, NodeKind::IsNull(p), Stamp::boolean());
        let cold = graph.add_block();
        let hot = graph.add_block();
        let zero = graph.add_constant(Constant::Int(0));
        graph.set_terminator(
            entry,
            Terminator::If {
                condition: check,
                true_block: cold,
                false_block: hot,
                probability: BranchProbability::NOT_FREQUENT,
            },
        );
        graph.set_terminator(cold, Terminator::Return(Some(zero)));
        graph.set_terminator(hot, Terminator::Return(Some(zero)));

        let listing = pretty(&graph, PrettyOptions::default()).to_string();
        assert!(listing.starts_with("graph demo.Main.pick(Object) [FloatingGuards] {"));
        assert!(listing.contains("n1 = is_null n0"));
        assert!(listing.contains("if n1 then b1 else b2 [p=0.1 synthetic]"));
        assert!(listing.contains("return 0"));
    }
}
