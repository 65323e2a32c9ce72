//! Typed extraction contracts.
//!
//! A substitution often needs an operand other than the receiver itself,
//! such as the array backing a stream. Contracts read the receiver's
//! [`Shape`] and either append the accessor nodes or refuse explicitly.

use std::fmt;

use crate::ir::{BlockId, Graph, NodeId, NodeKind, Shape, Stamp, ValueKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionFailure {
    /// The receiver might be null, so its representation cannot be read.
    MaybeNull,
    /// The representation is not described to the compiler.
    UnknownShape,
    /// The representation is known but differs from what the contract reads.
    UnsupportedShape(String),
    /// The call site does not supply the operand the contract reads.
    MissingOperand,
}

impl fmt::Display for ExtractionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionFailure::MaybeNull => write!(f, "receiver may be null"),
            ExtractionFailure::UnknownShape => write!(f, "receiver representation is unknown"),
            ExtractionFailure::UnsupportedShape(shape) => {
                write!(f, "unsupported receiver representation {}", shape)
            }
            ExtractionFailure::MissingOperand => write!(f, "call site has no receiver"),
        }
    }
}

pub trait ExtractionContract: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Append whatever nodes are needed to produce the operand to `block`.
    /// Must leave the graph untouched when it fails.
    fn extract(
        &self,
        graph: &mut Graph,
        block: BlockId,
        receiver: NodeId,
    ) -> Result<NodeId, ExtractionFailure>;
}

/// Passes the receiver through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReceiverOperand;

impl ExtractionContract for ReceiverOperand {
    fn name(&self) -> &'static str {
        "receiver"
    }

    fn extract(
        &self,
        graph: &mut Graph,
        _block: BlockId,
        receiver: NodeId,
    ) -> Result<NodeId, ExtractionFailure> {
        graph
            .node(receiver)
            .map(|_| receiver)
            .ok_or(ExtractionFailure::MissingOperand)
    }
}

/// Loads the primitive array backing an array-backed receiver.
#[derive(Debug, Clone, Copy)]
pub struct ArrayStorage {
    pub element: ValueKind,
}

impl ExtractionContract for ArrayStorage {
    fn name(&self) -> &'static str {
        "array-storage"
    }

    fn extract(
        &self,
        graph: &mut Graph,
        block: BlockId,
        receiver: NodeId,
    ) -> Result<NodeId, ExtractionFailure> {
        let stamp = graph
            .stamp(receiver)
            .ok_or(ExtractionFailure::MissingOperand)?;
        let storage = match &stamp.shape {
            Shape::ArrayBacked { element, storage } if *element == self.element => *storage,
            Shape::ArrayBacked { element, .. } => {
                return Err(ExtractionFailure::UnsupportedShape(format!(
                    "{}[]-backed",
                    element
                )))
            }
            Shape::Opaque(name) => return Err(ExtractionFailure::UnsupportedShape(name.clone())),
            Shape::Unknown => return Err(ExtractionFailure::UnknownShape),
        };
        if !stamp.is_non_null() {
            return Err(ExtractionFailure::MaybeNull);
        }
        // The backing array itself may still be null; the snippet guards it.
        Ok(graph.append(
            block,
            NodeKind::LoadField {
                object: receiver,
                field: storage,
            },
            Stamp::for_kind(storage.kind),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intrinsics::MethodSignature;
    use crate::ir::FieldRef;

    const STORAGE: FieldRef = FieldRef {
        holder: "demo.IntArrayStream",
        name: "array",
        kind: ValueKind::Object,
    };

    fn graph() -> Graph {
        Graph::new(MethodSignature::new_static("demo.Main", "run", vec![]))
    }

    #[test]
    fn loads_storage_of_known_non_null_receiver() {
        let mut graph = graph();
        let receiver = graph.add_parameter(
            Stamp::object()
                .non_null()
                .with_shape(Shape::ArrayBacked {
                    element: ValueKind::Int,
                    storage: STORAGE,
                }),
        );
        let entry = graph.entry();
        let contract = ArrayStorage {
            element: ValueKind::Int,
        };
        let operand = contract.extract(&mut graph, entry, receiver).unwrap();
        assert_eq!(
            graph.node(operand).unwrap().kind,
            NodeKind::LoadField {
                object: receiver,
                field: STORAGE
            }
        );
        assert_eq!(graph.block(entry).nodes, vec![operand]);
    }

    #[test]
    fn refuses_unknown_or_nullable_receivers_without_touching_graph() {
        let mut graph = graph();
        let entry = graph.entry();
        let contract = ArrayStorage {
            element: ValueKind::Int,
        };

        let unknown = graph.add_parameter(Stamp::object().non_null());
        assert_eq!(
            contract.extract(&mut graph, entry, unknown),
            Err(ExtractionFailure::UnknownShape)
        );

        let nullable = graph.add_parameter(Stamp::object().with_shape(Shape::ArrayBacked {
            element: ValueKind::Int,
            storage: STORAGE,
        }));
        assert_eq!(
            contract.extract(&mut graph, entry, nullable),
            Err(ExtractionFailure::MaybeNull)
        );

        let ranged = graph.add_parameter(
            Stamp::object()
                .non_null()
                .with_shape(Shape::Opaque("demo.RangeStream".into())),
        );
        assert!(matches!(
            contract.extract(&mut graph, entry, ranged),
            Err(ExtractionFailure::UnsupportedShape(_))
        ));
        assert!(graph.block(entry).nodes.is_empty());
    }
}
