use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use graft_core::collections::ConcurrentMap;
use graft_core::error::{Error, Result};
use graft_core::ir::{GuardsStage, LoweringStage, NodeId};

use super::{Arguments, SnippetId, SnippetTemplate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct TemplateKey {
    pub snippet: SnippetId,
    pub guards_stage: GuardsStage,
    pub lowering_stage: LoweringStage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub builds: usize,
    pub hits: usize,
    pub entries: usize,
}

/// Templates shared by every compilation of one compiler instance.
///
/// Entries are only ever added. Concurrent misses on one key are serialised
/// on the key's shard so exactly one build happens and every caller receives
/// the same `Arc`.
#[derive(Default)]
pub struct SnippetTemplateCache {
    templates: ConcurrentMap<TemplateKey, Arc<SnippetTemplate>>,
    builds: AtomicUsize,
    hits: AtomicUsize,
}

impl SnippetTemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the template for `args`, building it on first request.
    ///
    /// `node` is the intrinsic being lowered and only feeds the trace log.
    pub fn template(&self, node: NodeId, args: &Arguments) -> Result<Arc<SnippetTemplate>> {
        let info = args.info();
        if args.guards_stage() != info.required_guards_stage {
            return Err(Error::StageMismatch {
                snippet: info.id.0,
                requested: args.guards_stage(),
                required: info.required_guards_stage,
            });
        }
        let key = args.cache_key();
        let (template, built) = self.templates.get_or_try_insert_with(key, || {
            SnippetTemplate::build(info.clone(), key).map(Arc::new)
        })?;
        if built {
            self.builds.fetch_add(1, Ordering::Relaxed);
            graft_core::debug!(
                "built snippet template {} for {:?}/{:?} (requested by {})",
                key.snippet,
                key.guards_stage,
                key.lowering_stage,
                node
            );
        } else {
            self.hits.fetch_add(1, Ordering::Relaxed);
            graft_core::trace!("reusing snippet template {} for {}", key.snippet, node);
        }
        Ok(template)
    }

    pub fn get(&self, key: &TemplateKey) -> Option<Arc<SnippetTemplate>> {
        self.templates.get_cloned(key)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            builds: self.builds.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            entries: self.templates.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snippets::int_stream_sum::int_stream_sum_snippet;

    fn args(info: &Arc<crate::snippets::SnippetInfo>, guards: GuardsStage, lowering: LoweringStage) -> Arguments {
        Arguments::new(info.clone(), guards, lowering)
    }

    #[test]
    fn same_key_shares_instance_and_new_stage_builds_another() {
        let cache = SnippetTemplateCache::new();
        let info = Arc::new(int_stream_sum_snippet());

        let first = cache
            .template(NodeId(1), &args(&info, GuardsStage::FixedDeopts, LoweringStage::MidTier))
            .unwrap();
        let second = cache
            .template(NodeId(2), &args(&info, GuardsStage::FixedDeopts, LoweringStage::MidTier))
            .unwrap();
        let third = cache
            .template(NodeId(3), &args(&info, GuardsStage::FixedDeopts, LoweringStage::LowTier))
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(
            cache.stats(),
            CacheStats {
                builds: 2,
                hits: 1,
                entries: 2
            }
        );
    }

    #[test]
    fn wrong_guard_stage_is_rejected_without_building() {
        let cache = SnippetTemplateCache::new();
        let info = Arc::new(int_stream_sum_snippet());
        let result = cache.template(
            NodeId(1),
            &args(&info, GuardsStage::FloatingGuards, LoweringStage::MidTier),
        );
        assert!(matches!(
            result,
            Err(Error::StageMismatch {
                requested: GuardsStage::FloatingGuards,
                required: GuardsStage::FixedDeopts,
                ..
            })
        ));
        assert_eq!(cache.stats().entries, 0);
    }
}
