use std::collections::HashMap;

use graft_core::error::Result;
use graft_core::intrinsics::MethodSignature;
use graft_core::ir::{BlockId, Graph, NodeId, NodeKind, Terminator};

use crate::runtime::Runtime;
use crate::value::Value;
use crate::{interp_bail, interp_ensure};

const MAX_BLOCK_VISITS: usize = 10_000;

/// Result of running one graph, plus the calls it made.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub result: Option<Value>,
    pub foreign_calls: Vec<&'static str>,
    pub invokes: Vec<MethodSignature>,
}

pub struct Evaluator<'a> {
    runtime: &'a Runtime,
}

struct Frame<'g> {
    graph: &'g Graph,
    values: HashMap<NodeId, Value>,
    foreign_calls: Vec<&'static str>,
    invokes: Vec<MethodSignature>,
}

impl<'g> Frame<'g> {
    fn value(&self, id: NodeId) -> Result<Value> {
        if let Some(value) = self.values.get(&id) {
            return Ok(value.clone());
        }
        match self.graph.node(id).map(|node| &node.kind) {
            Some(NodeKind::Constant(constant)) => Ok((*constant).into()),
            Some(_) => interp_bail!("value used before it is defined", id),
            None => interp_bail!("use of removed node", id),
        }
    }

    fn values(&self, ids: &[NodeId]) -> Result<Vec<Value>> {
        ids.iter().map(|id| self.value(*id)).collect()
    }
}

impl<'a> Evaluator<'a> {
    pub fn new(runtime: &'a Runtime) -> Self {
        Self { runtime }
    }

    pub fn evaluate(&self, graph: &Graph, args: &[Value]) -> Result<Execution> {
        interp_ensure!(
            args.len() == graph.parameters().len(),
            format!(
                "{} takes {} argument(s), got {}",
                graph.method(),
                graph.parameters().len(),
                args.len()
            )
        );
        let mut frame = Frame {
            graph,
            values: graph.parameters().iter().copied().zip(args.iter().cloned()).collect(),
            foreign_calls: Vec::new(),
            invokes: Vec::new(),
        };

        let mut previous: Option<BlockId> = None;
        let mut current = graph.entry();
        for _ in 0..MAX_BLOCK_VISITS {
            let block = graph.block(current);
            for id in &block.nodes {
                let value = self.eval_node(&mut frame, *id, previous)?;
                frame.values.insert(*id, value);
            }
            let next = match &block.terminator {
                Terminator::Return(value) => {
                    let result = value.map(|id| frame.value(id)).transpose()?;
                    graft_core::trace!("{} returned {:?}", graph.method(), result);
                    return Ok(Execution {
                        result,
                        foreign_calls: frame.foreign_calls,
                        invokes: frame.invokes,
                    });
                }
                Terminator::Jump(target) => *target,
                Terminator::If {
                    condition,
                    true_block,
                    false_block,
                    ..
                } => match frame.value(*condition)?.as_bool() {
                    Some(true) => *true_block,
                    Some(false) => *false_block,
                    None => interp_bail!("branch condition is not a boolean", condition),
                },
                Terminator::Unreachable => interp_bail!("reached an unterminated block", current),
            };
            previous = Some(current);
            current = next;
        }
        interp_bail!(format!(
            "{} did not return within {} blocks",
            graph.method(),
            MAX_BLOCK_VISITS
        ))
    }

    fn eval_node(&self, frame: &mut Frame<'_>, id: NodeId, previous: Option<BlockId>) -> Result<Value> {
        let graph = frame.graph;
        let Some(node) = graph.node(id) else {
            interp_bail!("scheduled node was removed", id);
        };
        match &node.kind {
            NodeKind::Parameter(_) | NodeKind::Constant(_) => frame.value(id),
            NodeKind::IsNull(input) => Ok(Value::Boolean(frame.value(*input)?.is_null())),
            NodeKind::Add(lhs, rhs) => {
                match (frame.value(*lhs)?.as_int(), frame.value(*rhs)?.as_int()) {
                    (Some(lhs), Some(rhs)) => Ok(Value::Int(lhs.wrapping_add(rhs))),
                    _ => interp_bail!("add expects two ints", id),
                }
            }
            NodeKind::LoadField { object, field } => match frame.value(*object)? {
                Value::Object(object) => match object.field(field) {
                    Some(value) => Ok(value.clone()),
                    None => interp_bail!(format!("{} has no field {}", object.type_name, field), id),
                },
                Value::Null => interp_bail!(format!("null dereference loading {}", field), id),
                other => interp_bail!(format!("cannot load {} from {}", field, other), id),
            },
            NodeKind::Invoke(invoke) => {
                let receiver = invoke.receiver.map(|receiver| frame.value(receiver)).transpose()?;
                let args = frame.values(&invoke.args)?;
                frame.invokes.push(invoke.target.clone());
                self.runtime
                    .call_managed(&invoke.target, receiver.as_ref(), &args)
            }
            NodeKind::ForeignCall { descriptor, args } => {
                let args = frame.values(args)?;
                frame.foreign_calls.push(descriptor.name);
                self.runtime.call_native(descriptor.name, &args)
            }
            NodeKind::Intrinsic(intrinsic) => interp_bail!(
                format!("intrinsic {} was never lowered", intrinsic.descriptor.name),
                id
            ),
            NodeKind::Phi(inputs) => {
                let Some((_, input)) = inputs.iter().find(|(pred, _)| Some(*pred) == previous) else {
                    interp_bail!("phi has no input for the incoming edge", id);
                };
                frame.value(*input)
            }
        }
    }
}
