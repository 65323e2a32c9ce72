//! Reference evaluator for graft graphs.
//!
//! Runs a scheduled graph against a small managed/native runtime so that a
//! method can be executed before and after intrinsic lowering and the two
//! results compared.

pub mod error;
pub mod evaluator;
pub mod runtime;
pub mod value;

pub use evaluator::{Evaluator, Execution};
pub use runtime::Runtime;
pub use value::{Object, Value};
