// graft-optimize: intrinsic substitution and snippet lowering
//
// Architecture:
// - builder: graph construction with call-site intrinsification
// - snippets: snippet registration, template cache and instantiation
// - lowering: the phase that expands every pending intrinsic node
// - emission: pre-emission invariant checks and the compiled unit
// - pipeline/compiler: staged compilation jobs owned by one compiler instance

pub mod builder;
pub mod cancel;
pub mod compiler;
pub mod emission;
pub mod error;
pub mod lowering;
pub mod pipeline;
pub mod report;
pub mod snippets;

// Re-export key types for convenience
pub use builder::GraphBuilder;
pub use cancel::CancellationToken;
pub use compiler::{CompilationOutcome, CompilationRequest, Compiler, CompilerOptions, MethodParser};
pub use emission::CompiledUnit;
pub use lowering::{lower_intrinsics, LoweringContext};
pub use report::{LoweringDecision, LoweringEvent, LoweringReport};
