//! Managed methods and native entries the evaluator can call.

use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use graft_core::error::Result;
use graft_core::intrinsics::{
    int_stream_sum_signature, MethodSignature, INT_ARRAY_SPLITERATOR_ARRAY, INT_STREAM_SUM,
};

use crate::error::evaluation_error;
use crate::value::Value;

type ManagedFn = dyn Fn(Option<&Value>, &[Value]) -> Result<Value> + Send + Sync;
type NativeFn = dyn Fn(&[Value]) -> Result<Value> + Send + Sync;

#[derive(Clone, Default)]
pub struct Runtime {
    managed: HashMap<MethodSignature, Arc<ManagedFn>>,
    natives: HashMap<&'static str, Arc<NativeFn>>,
}

impl Runtime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runtime providing `IntPipeline.sum()` as a managed method over the
    /// stream and `int_stream_sum` as a native entry over its backing array.
    pub fn with_stream_library() -> Self {
        let mut runtime = Self::new();
        runtime.define_managed(int_stream_sum_signature(), |receiver, _args| {
            match receiver {
                Some(stream) => sum_stream(stream),
                None => Err(evaluation_error("IntPipeline.sum() needs a receiver")),
            }
        });
        runtime.define_native(INT_STREAM_SUM.name, |args| match args {
            [Value::IntArray(values)] => Ok(sum_ints(values)),
            _ => Err(evaluation_error(format!(
                "{} expects one int array, got {:?}",
                INT_STREAM_SUM.name, args
            ))),
        });
        runtime
    }

    pub fn define_managed(
        &mut self,
        signature: MethodSignature,
        body: impl Fn(Option<&Value>, &[Value]) -> Result<Value> + Send + Sync + 'static,
    ) {
        self.managed.insert(signature, Arc::new(body));
    }

    pub fn define_native(
        &mut self,
        name: &'static str,
        body: impl Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    ) {
        self.natives.insert(name, Arc::new(body));
    }

    pub fn call_managed(
        &self,
        signature: &MethodSignature,
        receiver: Option<&Value>,
        args: &[Value],
    ) -> Result<Value> {
        let body = self
            .managed
            .get(signature)
            .ok_or_else(|| evaluation_error(format!("no managed method {}", signature)))?;
        body(receiver, args)
    }

    pub fn call_native(&self, name: &str, args: &[Value]) -> Result<Value> {
        let body = self
            .natives
            .get(name)
            .ok_or_else(|| evaluation_error(format!("no native entry `{}`", name)))?;
        body(args)
    }
}

impl Debug for Runtime {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("managed", &self.managed.keys().collect::<Vec<_>>())
            .field("natives", &self.natives.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn sum_stream(stream: &Value) -> Result<Value> {
    let Value::Object(object) = stream else {
        return Err(evaluation_error(format!("cannot sum {}", stream)));
    };
    match object.field(&INT_ARRAY_SPLITERATOR_ARRAY) {
        Some(Value::IntArray(values)) => Ok(sum_ints(values)),
        _ => Err(evaluation_error(format!(
            "{} has no backing int array",
            object.type_name
        ))),
    }
}

fn sum_ints(values: &[i32]) -> Value {
    Value::Int(values.iter().fold(0i32, |acc, value| acc.wrapping_add(*value)))
}
