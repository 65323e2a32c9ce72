use std::sync::Arc;

use graft_core::error::Result;
use graft_core::ir::{GuardsStage, LoweringStage, NodeId};

use super::{SnippetInfo, TemplateKey};

/// Actual operands for one instantiation, keyed by formal name.
///
/// Built per call site and dropped once the fragment is spliced.
#[derive(Debug)]
pub struct Arguments {
    info: Arc<SnippetInfo>,
    guards_stage: GuardsStage,
    lowering_stage: LoweringStage,
    values: Vec<(&'static str, NodeId)>,
}

impl Arguments {
    pub fn new(info: Arc<SnippetInfo>, guards_stage: GuardsStage, lowering_stage: LoweringStage) -> Self {
        Self {
            info,
            guards_stage,
            lowering_stage,
            values: Vec::new(),
        }
    }

    pub fn add(&mut self, name: &'static str, value: NodeId) -> &mut Self {
        self.values.push((name, value));
        self
    }

    pub fn info(&self) -> &Arc<SnippetInfo> {
        &self.info
    }

    pub fn guards_stage(&self) -> GuardsStage {
        self.guards_stage
    }

    pub fn lowering_stage(&self) -> LoweringStage {
        self.lowering_stage
    }

    pub fn cache_key(&self) -> TemplateKey {
        TemplateKey {
            snippet: self.info.id,
            guards_stage: self.guards_stage,
            lowering_stage: self.lowering_stage,
        }
    }

    /// Actual values in formal order. Every formal must be bound exactly once
    /// and no unknown name may appear.
    pub fn bind(&self) -> Result<Vec<NodeId>> {
        let snippet = self.info.id.0;
        let mut bound: Vec<Option<NodeId>> = vec![None; self.info.params.len()];
        for (name, value) in &self.values {
            let Some(index) = self.info.param_index(name) else {
                crate::snippet_bail!(snippet, format!("unknown parameter `{}`", name));
            };
            crate::snippet_ensure!(
                bound[index].is_none(),
                snippet,
                format!("parameter `{}` bound twice", name)
            );
            bound[index] = Some(*value);
        }
        bound
            .into_iter()
            .zip(self.info.params)
            .map(|(value, param)| {
                value.ok_or_else(|| {
                    crate::error::snippet_error_for(
                        snippet,
                        format!("parameter `{}` is not bound", param.name),
                    )
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snippets::int_stream_sum::int_stream_sum_snippet;
    use graft_core::error::Error;

    fn arguments() -> Arguments {
        Arguments::new(
            Arc::new(int_stream_sum_snippet()),
            GuardsStage::FixedDeopts,
            LoweringStage::MidTier,
        )
    }

    #[test]
    fn binds_in_formal_order() {
        let mut args = arguments();
        args.add("fallback", NodeId(9)).add("thisObj", NodeId(4));
        assert_eq!(args.bind().unwrap(), vec![NodeId(4), NodeId(9)]);
    }

    #[test]
    fn rejects_missing_unknown_and_duplicate_names() {
        let mut missing = arguments();
        missing.add("thisObj", NodeId(1));
        assert!(matches!(missing.bind(), Err(Error::Snippet(msg)) if msg.contains("`fallback` is not bound")));

        let mut unknown = arguments();
        unknown.add("other", NodeId(1));
        assert!(matches!(unknown.bind(), Err(Error::Snippet(msg)) if msg.contains("unknown parameter")));

        let mut twice = arguments();
        twice
            .add("thisObj", NodeId(1))
            .add("thisObj", NodeId(2))
            .add("fallback", NodeId(3));
        assert!(matches!(twice.bind(), Err(Error::Snippet(msg)) if msg.contains("bound twice")));
    }
}
