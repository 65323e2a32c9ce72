//! Intrinsic vocabulary shared by the graph builder and the lowering phase.
//!
//! The registry decides at call sites which methods become intrinsic nodes;
//! descriptors and the foreign call directory describe the native code the
//! snippets eventually call.

pub mod catalog;
mod descriptor;
mod directory;
mod extraction;
mod node;
mod registry;
mod signature;

pub use catalog::{
    default_substitutions, int_stream_sum_signature, ExtractionSpec, SubstitutionSpec,
    INT_ARRAY_SPLITERATOR_ARRAY, INT_PIPELINE,
};
pub use descriptor::{ForeignCallDescriptor, LocationIdentity, SideEffect, INT_STREAM_SUM};
pub use directory::{CallingConvention, ForeignCallDirectory, NativeEntry};
pub use extraction::{ArrayStorage, ExtractionContract, ExtractionFailure, ReceiverOperand};
pub use node::IntrinsicNode;
pub use registry::{SignatureRegistry, SubstitutionEntry};
pub use signature::MethodSignature;
