mod error;
pub mod stages;

use std::marker::PhantomData;

pub use error::{PipelineDiagnostics, PipelineError};

/// Options every stage run can see.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Render info-level diagnostics.
    pub verbose: bool,
}

pub trait PipelineStage: Send + Sync {
    type SrcCtx;
    type DstCtx;

    fn name(&self) -> &'static str;
    fn run(
        &self,
        context: Self::SrcCtx,
        diagnostics: &mut PipelineDiagnostics,
    ) -> Result<Self::DstCtx, PipelineError>;
}

type StageFn<Src, Dst> = dyn Fn(Src, &mut PipelineDiagnostics, &PipelineOptions) -> Result<Dst, PipelineError>
    + Send
    + Sync;

pub struct Pipeline<Src, Dst> {
    run: Box<StageFn<Src, Dst>>,
}

impl<Src, Dst> Pipeline<Src, Dst> {
    pub fn run(
        &self,
        context: Src,
        diagnostics: &mut PipelineDiagnostics,
        options: &PipelineOptions,
    ) -> Result<Dst, PipelineError> {
        (self.run)(context, diagnostics, options)
    }
}

pub struct PipelineBuilder<Src, Dst> {
    pipeline: Pipeline<Src, Dst>,
    _marker: PhantomData<(Src, Dst)>,
}

impl<Src> PipelineBuilder<Src, Src> {
    pub fn new() -> Self {
        let run = |context: Src,
                   _diagnostics: &mut PipelineDiagnostics,
                   _options: &PipelineOptions| Ok(context);
        Self {
            pipeline: Pipeline { run: Box::new(run) },
            _marker: PhantomData,
        }
    }
}

impl<Src> Default for PipelineBuilder<Src, Src> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Src, Mid> PipelineBuilder<Src, Mid> {
    pub fn add_stage<Next, S>(self, stage: S) -> PipelineBuilder<Src, Next>
    where
        S: PipelineStage<SrcCtx = Mid, DstCtx = Next> + 'static,
        Src: 'static,
        Mid: 'static,
        Next: 'static,
    {
        let name = stage.name();
        let previous = self.pipeline.run;
        let run = move |context: Src,
                        diagnostics: &mut PipelineDiagnostics,
                        options: &PipelineOptions| {
            let mid = previous(context, diagnostics, options)?;
            graft_core::trace!("running stage {}", name);
            match stage.run(mid, diagnostics) {
                Ok(next) => {
                    diagnostics.emit_stage(name, options);
                    Ok(next)
                }
                Err(err) => {
                    diagnostics.emit_stage(name, options);
                    if err.stage == name {
                        Err(err)
                    } else {
                        Err(PipelineError::new(name, err.source))
                    }
                }
            }
        };

        PipelineBuilder {
            pipeline: Pipeline { run: Box::new(run) },
            _marker: PhantomData,
        }
    }

    pub fn build(self) -> Pipeline<Src, Mid> {
        self.pipeline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_core::diagnostics::Diagnostic;
    use graft_core::error::Error;

    struct Double;

    impl PipelineStage for Double {
        type SrcCtx = i32;
        type DstCtx = i32;

        fn name(&self) -> &'static str {
            "double"
        }

        fn run(&self, context: i32, diagnostics: &mut PipelineDiagnostics) -> Result<i32, PipelineError> {
            diagnostics.push(Diagnostic::info(format!("doubling {}", context)));
            Ok(context * 2)
        }
    }

    struct RejectOdd;

    impl PipelineStage for RejectOdd {
        type SrcCtx = i32;
        type DstCtx = String;

        fn name(&self) -> &'static str {
            "reject-odd"
        }

        fn run(&self, context: i32, _diagnostics: &mut PipelineDiagnostics) -> Result<String, PipelineError> {
            if context % 2 != 0 {
                return Err(PipelineError::new("reject-odd", Error::snippet("odd")));
            }
            Ok(context.to_string())
        }
    }

    #[test]
    fn stages_run_in_order_and_tag_diagnostics() {
        let pipeline = PipelineBuilder::<i32, i32>::new()
            .add_stage(Double)
            .add_stage(RejectOdd)
            .build();
        let mut diagnostics = PipelineDiagnostics::default();
        let out = pipeline
            .run(21, &mut diagnostics, &PipelineOptions::default())
            .unwrap();
        assert_eq!(out, "42");
        let all = diagnostics.into_all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].source_context.as_deref(), Some("double"));
    }
}
