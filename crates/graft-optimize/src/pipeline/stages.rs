//! The stages of one compilation job: parse, fix guards, lower intrinsics,
//! emit.

use std::sync::Arc;

use graft_core::intrinsics::{ForeignCallDirectory, MethodSignature, SignatureRegistry};
use graft_core::ir::{Graph, GuardsStage, LoweringStage};
use graft_core::pretty::PrettyOptions;

use super::{PipelineDiagnostics, PipelineError, PipelineStage};
use crate::builder::GraphBuilder;
use crate::cancel::CancellationToken;
use crate::compiler::CompilationRequest;
use crate::emission::CompiledUnit;
use crate::lowering::{lower_intrinsics, LoweringContext};
use crate::report::LoweringReport;
use crate::snippets::{MetaAccess, SnippetRegistry, SnippetTemplateCache};

pub const STAGE_PARSE: &str = "parse";
pub const STAGE_GUARD_LOWERING: &str = "guard-lowering";
pub const STAGE_LOWER_INTRINSICS: &str = "lower-intrinsics";
pub const STAGE_EMIT: &str = "emit";

/// A method in flight between stages.
#[derive(Debug)]
pub struct JobState {
    pub method: MethodSignature,
    pub graph: Graph,
    pub report: LoweringReport,
    pub cancel: CancellationToken,
}

impl JobState {
    fn check_cancelled(&self, stage: &'static str) -> Result<(), PipelineError> {
        self.cancel
            .check(&self.method)
            .map_err(|err| PipelineError::new(stage, err))
    }
}

pub struct ParseStage {
    pub registry: Arc<SignatureRegistry>,
    pub intrinsify: bool,
}

impl PipelineStage for ParseStage {
    type SrcCtx = CompilationRequest;
    type DstCtx = JobState;

    fn name(&self) -> &'static str {
        STAGE_PARSE
    }

    fn run(
        &self,
        request: CompilationRequest,
        diagnostics: &mut PipelineDiagnostics,
    ) -> Result<JobState, PipelineError> {
        request
            .cancel
            .check(&request.method)
            .map_err(|err| PipelineError::new(STAGE_PARSE, err))?;
        let mut builder = if self.intrinsify {
            GraphBuilder::with_registry(request.method.clone(), &self.registry)
        } else {
            GraphBuilder::new(request.method.clone())
        };
        request
            .parser
            .parse(&mut builder)
            .map_err(|err| PipelineError::new(STAGE_PARSE, err))?;
        let (graph, report) = builder.finish();
        diagnostics.extend(report.diagnostics());
        Ok(JobState {
            method: request.method,
            graph,
            report,
            cancel: request.cancel,
        })
    }
}

/// Advances the graph's guard stage before lowering.
pub struct GuardLoweringStage {
    pub target: GuardsStage,
}

impl PipelineStage for GuardLoweringStage {
    type SrcCtx = JobState;
    type DstCtx = JobState;

    fn name(&self) -> &'static str {
        STAGE_GUARD_LOWERING
    }

    fn run(
        &self,
        mut state: JobState,
        _diagnostics: &mut PipelineDiagnostics,
    ) -> Result<JobState, PipelineError> {
        state.check_cancelled(STAGE_GUARD_LOWERING)?;
        state
            .graph
            .set_guards_stage(self.target)
            .map_err(|err| PipelineError::new(STAGE_GUARD_LOWERING, err))?;
        Ok(state)
    }
}

pub struct LowerIntrinsicsStage {
    pub snippets: Arc<SnippetRegistry>,
    pub cache: Arc<SnippetTemplateCache>,
    pub directory: Arc<ForeignCallDirectory>,
    pub lowering_stage: LoweringStage,
}

impl PipelineStage for LowerIntrinsicsStage {
    type SrcCtx = JobState;
    type DstCtx = JobState;

    fn name(&self) -> &'static str {
        STAGE_LOWER_INTRINSICS
    }

    fn run(
        &self,
        mut state: JobState,
        diagnostics: &mut PipelineDiagnostics,
    ) -> Result<JobState, PipelineError> {
        let cx = LoweringContext::new(
            &self.snippets,
            &self.cache,
            MetaAccess::new(&self.directory),
            self.lowering_stage,
            &state.cancel,
        );
        let report = lower_intrinsics(&mut state.graph, &cx)
            .map_err(|err| PipelineError::new(STAGE_LOWER_INTRINSICS, err))?;
        diagnostics.extend(report.diagnostics());
        state.report.extend(report);
        Ok(state)
    }
}

pub struct EmitStage {
    pub pretty: PrettyOptions,
}

impl PipelineStage for EmitStage {
    type SrcCtx = JobState;
    type DstCtx = CompiledUnit;

    fn name(&self) -> &'static str {
        STAGE_EMIT
    }

    fn run(
        &self,
        state: JobState,
        _diagnostics: &mut PipelineDiagnostics,
    ) -> Result<CompiledUnit, PipelineError> {
        state.check_cancelled(STAGE_EMIT)?;
        CompiledUnit::emit(state.graph, state.report, &self.pretty)
            .map_err(|err| PipelineError::new(STAGE_EMIT, err))
    }
}
