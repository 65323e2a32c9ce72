//! Scheduled graph IR for one method.
//!
//! Nodes live in an arena addressed by [`NodeId`]; removed nodes leave a
//! tombstone so ids stay stable for the lifetime of the graph. Parameters and
//! constants float, every other node is scheduled in exactly one block.

pub mod pretty;
pub mod stage;
pub mod stamp;

use std::collections::HashMap;
use std::fmt;

use crate::error::Result;
use crate::intrinsics::{ForeignCallDescriptor, IntrinsicNode, MethodSignature};

pub use stage::{BranchProbability, GuardsStage, LoweringStage};
pub use stamp::{Constant, FieldRef, Nullness, Shape, Stamp, ValueKind};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct BlockId(pub u32);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

/// An ordinary (non-intrinsified) method invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Invoke {
    pub target: MethodSignature,
    pub receiver: Option<NodeId>,
    pub args: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Parameter(u32),
    Constant(Constant),
    IsNull(NodeId),
    Add(NodeId, NodeId),
    LoadField {
        object: NodeId,
        field: FieldRef,
    },
    Invoke(Invoke),
    ForeignCall {
        descriptor: &'static ForeignCallDescriptor,
        args: Vec<NodeId>,
    },
    Intrinsic(IntrinsicNode),
    Phi(Vec<(BlockId, NodeId)>),
}

impl NodeKind {
    /// Floating nodes are not scheduled in any block.
    pub fn is_floating(&self) -> bool {
        matches!(self, NodeKind::Parameter(_) | NodeKind::Constant(_))
    }

    /// Nodes that may be dropped once nothing uses them.
    pub fn is_pure(&self) -> bool {
        matches!(
            self,
            NodeKind::Constant(_)
                | NodeKind::IsNull(_)
                | NodeKind::Add(_, _)
                | NodeKind::LoadField { .. }
                | NodeKind::Phi(_)
        )
    }

    pub fn inputs(&self) -> Vec<NodeId> {
        match self {
            NodeKind::Parameter(_) | NodeKind::Constant(_) => Vec::new(),
            NodeKind::IsNull(value) => vec![*value],
            NodeKind::Add(lhs, rhs) => vec![*lhs, *rhs],
            NodeKind::LoadField { object, .. } => vec![*object],
            NodeKind::Invoke(invoke) => invoke.receiver.iter().chain(&invoke.args).copied().collect(),
            NodeKind::ForeignCall { args, .. } => args.clone(),
            NodeKind::Intrinsic(node) => node.inputs(),
            NodeKind::Phi(inputs) => inputs.iter().map(|(_, value)| *value).collect(),
        }
    }

    pub fn map_inputs(&mut self, mut f: impl FnMut(NodeId) -> NodeId) {
        match self {
            NodeKind::Parameter(_) | NodeKind::Constant(_) => {}
            NodeKind::IsNull(value) => *value = f(*value),
            NodeKind::Add(lhs, rhs) => {
                *lhs = f(*lhs);
                *rhs = f(*rhs);
            }
            NodeKind::LoadField { object, .. } => *object = f(*object),
            NodeKind::Invoke(invoke) => map_invoke(invoke, &mut f),
            NodeKind::ForeignCall { args, .. } => {
                for arg in args {
                    *arg = f(*arg);
                }
            }
            NodeKind::Intrinsic(node) => {
                node.receiver = f(node.receiver);
                node.operand = f(node.operand);
                map_invoke(&mut node.original, &mut f);
            }
            NodeKind::Phi(inputs) => {
                for (_, value) in inputs {
                    *value = f(*value);
                }
            }
        }
    }
}

fn map_invoke(invoke: &mut Invoke, f: &mut impl FnMut(NodeId) -> NodeId) {
    if let Some(receiver) = invoke.receiver.as_mut() {
        *receiver = f(*receiver);
    }
    for arg in &mut invoke.args {
        *arg = f(*arg);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub stamp: Stamp,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Terminator {
    Return(Option<NodeId>),
    Jump(BlockId),
    If {
        condition: NodeId,
        true_block: BlockId,
        false_block: BlockId,
        probability: BranchProbability,
    },
    Unreachable,
}

impl Terminator {
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            Terminator::Return(_) | Terminator::Unreachable => Vec::new(),
            Terminator::Jump(target) => vec![*target],
            Terminator::If {
                true_block,
                false_block,
                ..
            } => vec![*true_block, *false_block],
        }
    }

    pub fn inputs(&self) -> Vec<NodeId> {
        match self {
            Terminator::Return(Some(value)) => vec![*value],
            Terminator::If { condition, .. } => vec![*condition],
            _ => Vec::new(),
        }
    }

    fn map_inputs(&mut self, mut f: impl FnMut(NodeId) -> NodeId) {
        match self {
            Terminator::Return(Some(value)) => *value = f(*value),
            Terminator::If { condition, .. } => *condition = f(*condition),
            _ => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub nodes: Vec<NodeId>,
    pub terminator: Terminator,
}

impl Block {
    fn new() -> Self {
        Self {
            nodes: Vec::new(),
            terminator: Terminator::Unreachable,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Graph {
    method: MethodSignature,
    nodes: Vec<Option<Node>>,
    blocks: Vec<Block>,
    parameters: Vec<NodeId>,
    entry: BlockId,
    guards_stage: GuardsStage,
}

impl Graph {
    pub fn new(method: MethodSignature) -> Self {
        Self {
            method,
            nodes: Vec::new(),
            blocks: vec![Block::new()],
            parameters: Vec::new(),
            entry: BlockId(0),
            guards_stage: GuardsStage::FloatingGuards,
        }
    }

    pub fn method(&self) -> &MethodSignature {
        &self.method
    }

    pub fn entry(&self) -> BlockId {
        self.entry
    }

    pub fn guards_stage(&self) -> GuardsStage {
        self.guards_stage
    }

    /// Advance the guard stage. Stages never move backwards.
    pub fn set_guards_stage(&mut self, stage: GuardsStage) -> Result<()> {
        if stage < self.guards_stage {
            bail!(
                "guard stage of {} cannot move back from {:?} to {:?}",
                self.method,
                self.guards_stage,
                stage
            );
        }
        self.guards_stage = stage;
        Ok(())
    }

    pub fn parameters(&self) -> &[NodeId] {
        &self.parameters
    }

    pub fn add_parameter(&mut self, stamp: Stamp) -> NodeId {
        let index = self.parameters.len() as u32;
        let id = self.add_floating(NodeKind::Parameter(index), stamp);
        self.parameters.push(id);
        id
    }

    pub fn add_constant(&mut self, constant: Constant) -> NodeId {
        self.add_floating(NodeKind::Constant(constant), constant.stamp())
    }

    /// Allocate a node without scheduling it.
    pub fn add_floating(&mut self, kind: NodeKind, stamp: Stamp) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(Node { kind, stamp }));
        id
    }

    /// Allocate a node and schedule it at the end of `block`.
    pub fn append(&mut self, block: BlockId, kind: NodeKind, stamp: Stamp) -> NodeId {
        let id = self.add_floating(kind, stamp);
        self.blocks[block.0 as usize].nodes.push(id);
        id
    }

    pub fn add_block(&mut self) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(Block::new());
        id
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0 as usize]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.blocks[id.0 as usize]
    }

    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &Block)> {
        self.blocks
            .iter()
            .enumerate()
            .map(|(idx, block)| (BlockId(idx as u32), block))
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn set_terminator(&mut self, block: BlockId, terminator: Terminator) {
        self.block_mut(block).terminator = terminator;
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    pub fn stamp(&self, id: NodeId) -> Option<&Stamp> {
        self.node(id).map(|node| &node.stamp)
    }

    /// Live nodes in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(idx, node)| node.as_ref().map(|node| (NodeId(idx as u32), node)))
    }

    pub fn node_count(&self) -> usize {
        self.nodes().count()
    }

    pub fn count_nodes(&self, predicate: impl Fn(&NodeKind) -> bool) -> usize {
        self.nodes().filter(|(_, node)| predicate(&node.kind)).count()
    }

    /// Intrinsic nodes still waiting to be lowered, in ascending id order.
    pub fn pending_intrinsics(&self) -> Vec<NodeId> {
        self.nodes()
            .filter(|(_, node)| matches!(node.kind, NodeKind::Intrinsic(_)))
            .map(|(id, _)| id)
            .collect()
    }

    /// Position of a scheduled node.
    pub fn locate(&self, id: NodeId) -> Option<(BlockId, usize)> {
        self.blocks().find_map(|(block_id, block)| {
            block
                .nodes
                .iter()
                .position(|candidate| *candidate == id)
                .map(|idx| (block_id, idx))
        })
    }

    /// Move the nodes from `index` onwards and the terminator of `block` into
    /// a fresh block. Phis in the old successors are retargeted to it. `block`
    /// is left with `Unreachable` until the caller wires it again.
    pub fn split_block_at(&mut self, block: BlockId, index: usize) -> BlockId {
        let tail = self.add_block();
        let moved_nodes = self.block_mut(block).nodes.split_off(index);
        let terminator =
            std::mem::replace(&mut self.block_mut(block).terminator, Terminator::Unreachable);
        let successors = terminator.successors();
        {
            let tail_block = self.block_mut(tail);
            tail_block.nodes = moved_nodes;
            tail_block.terminator = terminator;
        }
        for successor in successors {
            let phis: Vec<NodeId> = self.block(successor).nodes.clone();
            for phi in phis {
                if let Some(Node {
                    kind: NodeKind::Phi(inputs),
                    ..
                }) = self.node_mut(phi)
                {
                    for (pred, _) in inputs.iter_mut() {
                        if *pred == block {
                            *pred = tail;
                        }
                    }
                }
            }
        }
        tail
    }

    /// Number of node and terminator inputs referring to `id`.
    pub fn usage_count(&self, id: NodeId) -> usize {
        let from_nodes: usize = self
            .nodes()
            .map(|(_, node)| node.kind.inputs().iter().filter(|input| **input == id).count())
            .sum();
        let from_terminators: usize = self
            .blocks
            .iter()
            .map(|block| {
                block
                    .terminator
                    .inputs()
                    .iter()
                    .filter(|input| **input == id)
                    .count()
            })
            .sum();
        from_nodes + from_terminators
    }

    /// Rewire every data edge pointing at `old` to `new`.
    pub fn replace_at_usages(&mut self, old: NodeId, new: NodeId) {
        let swap = |input: NodeId| if input == old { new } else { input };
        for node in self.nodes.iter_mut().flatten() {
            node.kind.map_inputs(swap);
        }
        for block in &mut self.blocks {
            block.terminator.map_inputs(swap);
        }
    }

    /// Unschedule and tombstone a node. Usages must have been rewired.
    pub fn remove_node(&mut self, id: NodeId) {
        if let Some((block, idx)) = self.locate(id) {
            self.block_mut(block).nodes.remove(idx);
        }
        if let Some(slot) = self.nodes.get_mut(id.0 as usize) {
            *slot = None;
        }
    }

    /// Drop pure nodes nothing uses any more; returns how many were removed.
    pub fn prune_dead_nodes(&mut self) -> usize {
        let mut removed = 0;
        loop {
            let mut counts: HashMap<NodeId, usize> = HashMap::new();
            for (_, node) in self.nodes() {
                for input in node.kind.inputs() {
                    *counts.entry(input).or_default() += 1;
                }
            }
            for block in &self.blocks {
                for input in block.terminator.inputs() {
                    *counts.entry(input).or_default() += 1;
                }
            }
            let dead: Vec<NodeId> = self
                .nodes()
                .filter(|(id, node)| node.kind.is_pure() && !counts.contains_key(id))
                .map(|(id, _)| id)
                .collect();
            if dead.is_empty() {
                return removed;
            }
            for id in dead {
                self.remove_node(id);
                removed += 1;
            }
        }
    }
}
