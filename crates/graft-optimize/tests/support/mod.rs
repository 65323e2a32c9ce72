#![allow(dead_code)]

use graft_core::error::Result;
use graft_core::intrinsics::{
    int_stream_sum_signature, CallingConvention, ForeignCallDirectory, IntrinsicNode,
    MethodSignature, INT_ARRAY_SPLITERATOR_ARRAY, INT_STREAM_SUM,
};
use graft_core::ir::{Constant, Invoke, NodeKind, Shape, Stamp, ValueKind};
use graft_interpret::{Evaluator, Execution, Runtime, Value};
use graft_optimize::builder::DEFAULT_FALLBACK;
use graft_optimize::GraphBuilder;

pub const SUM_ENTRY: u64 = 0x7f00_2000;

pub fn linked_directory() -> ForeignCallDirectory {
    let mut directory = ForeignCallDirectory::new();
    directory.link(INT_STREAM_SUM.name, SUM_ENTRY, CallingConvention::Fast);
    directory
}

pub fn method(name: &str) -> MethodSignature {
    MethodSignature::new_static("demo.Streams", name, vec![ValueKind::Object])
}

/// Non-null stream known to be backed by an `int[]`.
pub fn array_stream() -> Stamp {
    Stamp::object().non_null().with_shape(Shape::ArrayBacked {
        element: ValueKind::Int,
        storage: INT_ARRAY_SPLITERATOR_ARRAY,
    })
}

/// `return stream.sum();`
pub fn parse_total(builder: &mut GraphBuilder<'_>) -> Result<()> {
    let stream = builder.parameter(array_stream());
    let sum = builder.invoke(int_stream_sum_signature(), Some(stream), vec![], Stamp::int());
    builder.ret(Some(sum));
    Ok(())
}

/// `return stream.sum() + 100;`
pub fn parse_total_plus_bias(builder: &mut GraphBuilder<'_>) -> Result<()> {
    let stream = builder.parameter(array_stream());
    let sum = builder.invoke(int_stream_sum_signature(), Some(stream), vec![], Stamp::int());
    let bias = builder.constant(Constant::Int(100));
    let total = builder.add(sum, bias);
    builder.ret(Some(total));
    Ok(())
}

/// Same call on a stream whose representation the compiler cannot see.
pub fn parse_total_opaque(builder: &mut GraphBuilder<'_>) -> Result<()> {
    let stream = builder.parameter(
        Stamp::object()
            .non_null()
            .with_shape(Shape::Opaque("java.util.stream.IntPipeline$Head".to_string())),
    );
    let sum = builder.invoke(int_stream_sum_signature(), Some(stream), vec![], Stamp::int());
    builder.ret(Some(sum));
    Ok(())
}

/// `return a.sum() + b.sum();`
pub fn parse_two_sums(builder: &mut GraphBuilder<'_>) -> Result<()> {
    let a = builder.parameter(array_stream());
    let b = builder.parameter(array_stream());
    let first = builder.invoke(int_stream_sum_signature(), Some(a), vec![], Stamp::int());
    let second = builder.invoke(int_stream_sum_signature(), Some(b), vec![], Stamp::int());
    let total = builder.add(first, second);
    builder.ret(Some(total));
    Ok(())
}

/// An intrinsic node whose operand is the null constant.
pub fn parse_null_operand(builder: &mut GraphBuilder<'_>) -> Result<()> {
    let stream = builder.parameter(array_stream());
    let operand = builder.constant(Constant::Null);
    let node = IntrinsicNode {
        receiver: stream,
        operand,
        descriptor: &INT_STREAM_SUM,
        fallback: DEFAULT_FALLBACK,
        original: Invoke {
            target: int_stream_sum_signature(),
            receiver: Some(stream),
            args: vec![],
        },
    };
    let sum = builder.append(NodeKind::Intrinsic(node), Stamp::int());
    builder.ret(Some(sum));
    Ok(())
}

pub fn run(graph: &graft_core::ir::Graph, args: &[Value]) -> Result<Execution> {
    let runtime = Runtime::with_stream_library();
    Evaluator::new(&runtime).evaluate(graph, args)
}
