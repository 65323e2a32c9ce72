use graft_core::diagnostics::{Diagnostic, DiagnosticDisplayOptions, DiagnosticManager};
use graft_core::error::Error;
use std::fmt;

use super::PipelineOptions;

#[derive(Debug, Default, Clone)]
pub struct PipelineDiagnostics {
    pub items: Vec<Diagnostic>,
    emitted: Vec<Diagnostic>,
}

impl PipelineDiagnostics {
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    /// Render the diagnostics collected by `stage` and retire them.
    pub fn emit_stage(&mut self, stage: &'static str, options: &PipelineOptions) {
        if self.items.is_empty() {
            return;
        }
        let opts = DiagnosticDisplayOptions::new(options.verbose);
        DiagnosticManager::emit(&self.items, Some(stage), &opts);
        self.emitted.extend(self.items.drain(..).map(|diagnostic| {
            if diagnostic.source_context.is_some() {
                diagnostic
            } else {
                diagnostic.with_source_context(stage)
            }
        }));
    }

    pub fn extend(&mut self, diagnostics: Vec<Diagnostic>) {
        if diagnostics.is_empty() {
            return;
        }
        self.items.extend(diagnostics);
    }

    /// Everything emitted so far plus anything still pending.
    pub fn into_all(mut self) -> Vec<Diagnostic> {
        self.emitted.append(&mut self.items);
        self.emitted
    }
}

#[derive(Debug)]
pub struct PipelineError {
    pub stage: &'static str,
    pub source: Error,
}

impl PipelineError {
    pub fn new(stage: &'static str, source: impl Into<Error>) -> Self {
        Self {
            stage,
            source: source.into(),
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.stage, self.source)
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}
