use graft_core::error::{Error, Result};
use graft_core::intrinsics::{
    int_stream_sum_signature, IntrinsicNode, MethodSignature, INT_ARRAY_SPLITERATOR_ARRAY,
    INT_STREAM_SUM,
};
use graft_core::ir::{
    BranchProbability, Constant, Graph, Invoke, NodeKind, Stamp, Terminator, ValueKind,
};
use graft_interpret::{Evaluator, Runtime, Value};
use pretty_assertions::assert_eq;

fn method(params: Vec<ValueKind>) -> MethodSignature {
    MethodSignature::new_static("demo.Main", "run", params)
}

#[test]
fn adds_wrap_on_overflow() -> Result<()> {
    let mut graph = Graph::new(method(vec![ValueKind::Int]));
    let entry = graph.entry();
    let p = graph.add_parameter(Stamp::int());
    let one = graph.add_constant(Constant::Int(1));
    let sum = graph.append(entry, NodeKind::Add(p, one), Stamp::int());
    graph.set_terminator(entry, Terminator::Return(Some(sum)));

    let runtime = Runtime::new();
    let execution = Evaluator::new(&runtime).evaluate(&graph, &[Value::Int(i32::MAX)])?;
    assert_eq!(execution.result, Some(Value::Int(i32::MIN)));
    Ok(())
}

#[test]
fn phi_picks_the_incoming_edge() -> Result<()> {
    let mut graph = Graph::new(method(vec![ValueKind::Object]));
    let entry = graph.entry();
    let p = graph.add_parameter(Stamp::object());
    let check = graph.append(entry, NodeKind::IsNull(p), Stamp::boolean());
    let null_block = graph.add_block();
    let other_block = graph.add_block();
    let merge = graph.add_block();
    graph.set_terminator(
        entry,
        Terminator::If {
            condition: check,
            true_block: null_block,
            false_block: other_block,
            probability: BranchProbability::NOT_FREQUENT,
        },
    );
    let minus_one = graph.add_constant(Constant::Int(-1));
    let one = graph.add_constant(Constant::Int(1));
    graph.set_terminator(null_block, Terminator::Jump(merge));
    graph.set_terminator(other_block, Terminator::Jump(merge));
    let phi = graph.append(
        merge,
        NodeKind::Phi(vec![(null_block, minus_one), (other_block, one)]),
        Stamp::int(),
    );
    graph.set_terminator(merge, Terminator::Return(Some(phi)));

    let runtime = Runtime::new();
    let evaluator = Evaluator::new(&runtime);
    assert_eq!(
        evaluator.evaluate(&graph, &[Value::Null])?.result,
        Some(Value::Int(-1))
    );
    assert_eq!(
        evaluator
            .evaluate(&graph, &[Value::int_array_stream(&[])])?
            .result,
        Some(Value::Int(1))
    );
    Ok(())
}

#[test]
fn managed_and_native_sums_agree() -> Result<()> {
    let mut graph = Graph::new(method(vec![ValueKind::Object]));
    let entry = graph.entry();
    let stream = graph.add_parameter(Stamp::object().non_null());
    let managed = graph.append(
        entry,
        NodeKind::Invoke(Invoke {
            target: int_stream_sum_signature(),
            receiver: Some(stream),
            args: vec![],
        }),
        Stamp::int(),
    );
    let array = graph.append(
        entry,
        NodeKind::LoadField {
            object: stream,
            field: INT_ARRAY_SPLITERATOR_ARRAY,
        },
        Stamp::object(),
    );
    let native = graph.append(
        entry,
        NodeKind::ForeignCall {
            descriptor: &INT_STREAM_SUM,
            args: vec![array],
        },
        Stamp::int(),
    );
    let both = graph.append(entry, NodeKind::Add(managed, native), Stamp::int());
    graph.set_terminator(entry, Terminator::Return(Some(both)));

    let runtime = Runtime::with_stream_library();
    let execution =
        Evaluator::new(&runtime).evaluate(&graph, &[Value::int_array_stream(&[5, 6, 7])])?;
    assert_eq!(execution.result, Some(Value::Int(36)));
    assert_eq!(execution.invokes, vec![int_stream_sum_signature()]);
    assert_eq!(execution.foreign_calls, vec!["int_stream_sum"]);
    Ok(())
}

#[test]
fn unlowered_intrinsic_is_an_evaluation_error() {
    let mut graph = Graph::new(method(vec![ValueKind::Object]));
    let entry = graph.entry();
    let stream = graph.add_parameter(Stamp::object().non_null());
    let sum = graph.append(
        entry,
        NodeKind::Intrinsic(IntrinsicNode {
            receiver: stream,
            operand: stream,
            descriptor: &INT_STREAM_SUM,
            fallback: Constant::Int(0),
            original: Invoke {
                target: int_stream_sum_signature(),
                receiver: Some(stream),
                args: vec![],
            },
        }),
        Stamp::int(),
    );
    graph.set_terminator(entry, Terminator::Return(Some(sum)));

    let runtime = Runtime::with_stream_library();
    let error = Evaluator::new(&runtime)
        .evaluate(&graph, &[Value::int_array_stream(&[1])])
        .unwrap_err();
    assert!(matches!(&error, Error::Evaluation(message) if message.contains("never lowered")));
}

#[test]
fn null_dereference_is_reported() {
    let mut graph = Graph::new(method(vec![ValueKind::Object]));
    let entry = graph.entry();
    let stream = graph.add_parameter(Stamp::object());
    let array = graph.append(
        entry,
        NodeKind::LoadField {
            object: stream,
            field: INT_ARRAY_SPLITERATOR_ARRAY,
        },
        Stamp::object(),
    );
    graph.set_terminator(entry, Terminator::Return(Some(array)));

    let runtime = Runtime::new();
    let error = Evaluator::new(&runtime)
        .evaluate(&graph, &[Value::Null])
        .unwrap_err();
    assert!(error.to_string().contains("null dereference"));
}
