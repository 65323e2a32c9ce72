//! Guarded lowering of `IntPipeline.sum()` over an array-backed stream.

use graft_core::error::Result;
use graft_core::intrinsics::{LocationIdentity, INT_STREAM_SUM};
use graft_core::ir::{BranchProbability, GuardsStage, NodeId, ValueKind};

use crate::builder::GraphBuilder;

use super::{ParamRole, SnippetId, SnippetInfo, SnippetParam};

pub const INT_STREAM_SUM_SNIPPET: SnippetId = SnippetId("int_stream_sum_snippet");

const PARAMS: &[SnippetParam] = &[
    SnippetParam {
        name: "thisObj",
        kind: ValueKind::Object,
        role: ParamRole::Operand,
    },
    SnippetParam {
        name: "fallback",
        kind: ValueKind::Int,
        role: ParamRole::Fallback,
    },
];

const KILLED: &[LocationIdentity] = &[LocationIdentity::MarkWord];

/// ```text
/// if (thisObj == null)  // p = 0.1, synthetic
///     return fallback;
/// return int_stream_sum(thisObj);
/// ```
fn build(builder: &mut GraphBuilder<'_>, params: &[NodeId]) -> Result<()> {
    let [this_obj, fallback] = params else {
        crate::snippet_bail!(INT_STREAM_SUM_SNIPPET.0, "expected two formals");
    };
    let is_null = builder.is_null(*this_obj);
    let (null_block, call_block) = builder.if_then_else(is_null, BranchProbability::NOT_FREQUENT);

    builder.switch_to(null_block);
    builder.ret(Some(*fallback));

    builder.switch_to(call_block);
    let sum = builder.foreign_call(&INT_STREAM_SUM, vec![*this_obj]);
    builder.ret(Some(sum));
    Ok(())
}

pub fn int_stream_sum_snippet() -> SnippetInfo {
    SnippetInfo {
        id: INT_STREAM_SUM_SNIPPET,
        params: PARAMS,
        result: ValueKind::Int,
        required_guards_stage: GuardsStage::FixedDeopts,
        killed_locations: KILLED,
        descriptor: &INT_STREAM_SUM,
        build,
    }
}
