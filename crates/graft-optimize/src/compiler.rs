//! A compiler instance and the jobs it runs.
//!
//! Registries and the template cache are built once per instance and shared
//! read-mostly by every job. Jobs may run concurrently on any number of
//! threads through `&Compiler`; a failing job bails out without affecting the
//! instance or its other jobs.

use std::sync::Arc;

use graft_core::config;
use graft_core::diagnostics::{Diagnostic, DiagnosticManager};
use graft_core::error::{Error, Result};
use graft_core::intrinsics::{
    default_substitutions, ForeignCallDirectory, MethodSignature, SignatureRegistry,
    SubstitutionSpec,
};
use graft_core::ir::{GuardsStage, LoweringStage};
use graft_core::pretty::PrettyOptions;

use crate::builder::GraphBuilder;
use crate::cancel::CancellationToken;
use crate::emission::CompiledUnit;
use crate::pipeline::stages::{
    EmitStage, GuardLoweringStage, LowerIntrinsicsStage, ParseStage,
};
use crate::pipeline::{Pipeline, PipelineBuilder, PipelineDiagnostics, PipelineOptions};
use crate::snippets::{SnippetRegistry, SnippetTemplateCache};

pub const DEFAULT_RETAINED_BAILOUTS: usize = 64;

#[derive(Debug, Clone)]
pub struct CompilerOptions {
    pub lowering_stage: LoweringStage,
    /// Guard stage the graph is advanced to before intrinsics are lowered.
    pub guards_stage_at_lowering: GuardsStage,
    /// Recognise registered calls while parsing.
    pub intrinsify: bool,
    pub verbose: bool,
    pub pretty: PrettyOptions,
    /// Most recent bailouts kept on the compiler; older ones are dropped.
    pub retained_bailouts: usize,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            lowering_stage: LoweringStage::MidTier,
            guards_stage_at_lowering: GuardsStage::FixedDeopts,
            intrinsify: !config::intrinsics_disabled(),
            verbose: config::verbose_diagnostics(),
            pretty: PrettyOptions::default(),
            retained_bailouts: DEFAULT_RETAINED_BAILOUTS,
        }
    }
}

impl CompilerOptions {
    pub fn with_lowering_stage(mut self, stage: LoweringStage) -> Self {
        self.lowering_stage = stage;
        self
    }

    pub fn with_guards_stage_at_lowering(mut self, stage: GuardsStage) -> Self {
        self.guards_stage_at_lowering = stage;
        self
    }

    pub fn with_intrinsify(mut self, intrinsify: bool) -> Self {
        self.intrinsify = intrinsify;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_retained_bailouts(mut self, retained: usize) -> Self {
        self.retained_bailouts = retained;
        self
    }
}

/// Turns a method body into graph nodes.
pub trait MethodParser: Send + Sync {
    fn parse(&self, builder: &mut GraphBuilder<'_>) -> Result<()>;
}

impl<F> MethodParser for F
where
    F: Fn(&mut GraphBuilder<'_>) -> Result<()> + Send + Sync,
{
    fn parse(&self, builder: &mut GraphBuilder<'_>) -> Result<()> {
        self(builder)
    }
}

pub struct CompilationRequest {
    pub method: MethodSignature,
    pub parser: Arc<dyn MethodParser>,
    pub cancel: CancellationToken,
}

impl CompilationRequest {
    pub fn new(method: MethodSignature, parser: impl MethodParser + 'static) -> Self {
        Self {
            method,
            parser: Arc::new(parser),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

#[derive(Debug)]
pub enum CompilationOutcome {
    Compiled(CompiledUnit),
    /// The job was abandoned; nothing was emitted for `method`.
    Bailout {
        method: MethodSignature,
        stage: &'static str,
        error: Error,
    },
}

impl CompilationOutcome {
    pub fn unit(&self) -> Option<&CompiledUnit> {
        match self {
            CompilationOutcome::Compiled(unit) => Some(unit),
            CompilationOutcome::Bailout { .. } => None,
        }
    }

    pub fn into_unit(self) -> Result<CompiledUnit> {
        match self {
            CompilationOutcome::Compiled(unit) => Ok(unit),
            CompilationOutcome::Bailout { error, .. } => Err(error),
        }
    }

    pub fn is_bailout(&self) -> bool {
        matches!(self, CompilationOutcome::Bailout { .. })
    }
}

pub struct Compiler {
    registry: Arc<SignatureRegistry>,
    snippets: Arc<SnippetRegistry>,
    cache: Arc<SnippetTemplateCache>,
    directory: Arc<ForeignCallDirectory>,
    options: CompilerOptions,
    diagnostics: DiagnosticManager,
    pipeline: Pipeline<CompilationRequest, CompiledUnit>,
}

impl Compiler {
    /// Build a compiler instance. A conflicting catalog is fatal.
    pub fn bootstrap(
        catalog: &[SubstitutionSpec],
        directory: ForeignCallDirectory,
        options: CompilerOptions,
    ) -> Result<Self> {
        let registry = SignatureRegistry::bootstrap(catalog)?.freeze();
        let snippets = Arc::new(SnippetRegistry::with_defaults());
        let cache = Arc::new(SnippetTemplateCache::new());
        let directory = Arc::new(directory);
        let pipeline = PipelineBuilder::<CompilationRequest, CompilationRequest>::new()
            .add_stage(ParseStage {
                registry: registry.clone(),
                intrinsify: options.intrinsify,
            })
            .add_stage(GuardLoweringStage {
                target: options.guards_stage_at_lowering,
            })
            .add_stage(LowerIntrinsicsStage {
                snippets: snippets.clone(),
                cache: cache.clone(),
                directory: directory.clone(),
                lowering_stage: options.lowering_stage,
            })
            .add_stage(EmitStage {
                pretty: options.pretty.clone(),
            })
            .build();
        graft_core::info!(
            "compiler ready: {} substitution(s), {} snippet(s), {} native entr(ies)",
            registry.len(),
            snippets.len(),
            directory.len()
        );
        Ok(Self {
            registry,
            snippets,
            cache,
            directory,
            diagnostics: DiagnosticManager::bounded(options.retained_bailouts),
            options,
            pipeline,
        })
    }

    /// Compiler with the shipped catalog.
    pub fn with_defaults(directory: ForeignCallDirectory, options: CompilerOptions) -> Result<Self> {
        Self::bootstrap(default_substitutions(), directory, options)
    }

    pub fn compile(&self, request: CompilationRequest) -> CompilationOutcome {
        let method = request.method.clone();
        let mut diagnostics = PipelineDiagnostics::default();
        let options = PipelineOptions {
            verbose: self.options.verbose,
        };
        // Per-job diagnostics were emitted stage by stage and travel with the
        // unit's events; only bailouts outlive the job.
        match self.pipeline.run(request, &mut diagnostics, &options) {
            Ok(unit) => {
                graft_core::debug!("compiled {}", method);
                CompilationOutcome::Compiled(unit)
            }
            Err(err) => {
                graft_core::warn!("bailing out of {} at {}: {}", method, err.stage, err.source);
                self.diagnostics.add_diagnostic(
                    Diagnostic::error(format!("{}: {}", method, err.source))
                        .with_source_context(err.stage)
                        .with_code("bailout"),
                );
                CompilationOutcome::Bailout {
                    method,
                    stage: err.stage,
                    error: err.source,
                }
            }
        }
    }

    pub fn registry(&self) -> &SignatureRegistry {
        &self.registry
    }

    pub fn snippets(&self) -> &SnippetRegistry {
        &self.snippets
    }

    pub fn template_cache(&self) -> &SnippetTemplateCache {
        &self.cache
    }

    pub fn directory(&self) -> &ForeignCallDirectory {
        &self.directory
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// The most recent bailouts, at most `retained_bailouts` of them.
    pub fn diagnostics(&self) -> &DiagnosticManager {
        &self.diagnostics
    }
}
