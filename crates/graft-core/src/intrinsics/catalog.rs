use std::sync::Arc;

use crate::ir::{FieldRef, ValueKind};

use super::{
    ArrayStorage, ExtractionContract, ForeignCallDescriptor, MethodSignature, ReceiverOperand,
    SubstitutionEntry, INT_STREAM_SUM,
};

/// How the operand handed to the native code is obtained from the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionSpec {
    Receiver,
    ArrayStorage(ValueKind),
}

impl ExtractionSpec {
    pub fn contract(self) -> Arc<dyn ExtractionContract> {
        match self {
            ExtractionSpec::Receiver => Arc::new(ReceiverOperand),
            ExtractionSpec::ArrayStorage(element) => Arc::new(ArrayStorage { element }),
        }
    }
}

/// One bootstrap tuple: the recognised method and its substitute.
#[derive(Debug, Clone, Copy)]
pub struct SubstitutionSpec {
    pub owner: &'static str,
    pub name: &'static str,
    pub params: &'static [ValueKind],
    pub is_static: bool,
    pub substitute: &'static str,
    pub descriptor: &'static ForeignCallDescriptor,
    pub extraction: ExtractionSpec,
}

impl SubstitutionSpec {
    pub fn signature(&self) -> MethodSignature {
        MethodSignature {
            owner: self.owner.to_string(),
            name: self.name.to_string(),
            params: self.params.to_vec(),
            is_static: self.is_static,
        }
    }

    pub fn entry(&self) -> SubstitutionEntry {
        SubstitutionEntry {
            substitute: self.substitute,
            descriptor: self.descriptor,
            extraction: self.extraction.contract(),
        }
    }
}

pub const INT_PIPELINE: &str = "java.util.stream.IntPipeline";

/// Array held by an array-backed int stream source.
pub const INT_ARRAY_SPLITERATOR_ARRAY: FieldRef = FieldRef {
    holder: "java.util.Spliterators$IntArraySpliterator",
    name: "array",
    kind: ValueKind::Object,
};

static SUBSTITUTIONS: &[SubstitutionSpec] = &[SubstitutionSpec {
    owner: INT_PIPELINE,
    name: "sum",
    params: &[],
    is_static: false,
    substitute: "int_stream_sum",
    descriptor: &INT_STREAM_SUM,
    extraction: ExtractionSpec::ArrayStorage(ValueKind::Int),
}];

pub fn default_substitutions() -> &'static [SubstitutionSpec] {
    SUBSTITUTIONS
}

/// Signature of `IntPipeline.sum()`.
pub fn int_stream_sum_signature() -> MethodSignature {
    MethodSignature::new_instance(INT_PIPELINE, "sum", Vec::new())
}
