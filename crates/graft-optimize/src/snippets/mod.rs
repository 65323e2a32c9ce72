//! Snippet engine.
//!
//! A snippet is a small graph fragment written against [`GraphBuilder`] whose
//! formal parameters are bound to the operands of the node it replaces. The
//! fragment is built once per (snippet, guard stage, lowering stage) and
//! shared through [`SnippetTemplateCache`].

mod arguments;
mod cache;
pub mod int_stream_sum;
mod template;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use graft_core::error::Result;
use graft_core::intrinsics::{ForeignCallDescriptor, LocationIdentity};
use graft_core::ir::{GuardsStage, NodeId, ValueKind};

use crate::builder::GraphBuilder;

pub use arguments::Arguments;
pub use cache::{CacheStats, SnippetTemplateCache, TemplateKey};
pub use template::{DefaultReplacer, MetaAccess, SnippetTemplate, UsageReplacer, DEFAULT_REPLACER};

/// Identity of a snippet function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct SnippetId(pub &'static str);

impl fmt::Display for SnippetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// What an intrinsic node supplies for a formal parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamRole {
    /// The operand produced by the extraction contract.
    Operand,
    /// The node's fallback constant.
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnippetParam {
    pub name: &'static str,
    pub kind: ValueKind,
    pub role: ParamRole,
}

/// Builds a fragment; receives one parameter node per formal, in order.
pub type FragmentBuilder = fn(&mut GraphBuilder<'_>, &[NodeId]) -> Result<()>;

pub struct SnippetInfo {
    pub id: SnippetId,
    pub params: &'static [SnippetParam],
    pub result: ValueKind,
    pub required_guards_stage: GuardsStage,
    pub killed_locations: &'static [LocationIdentity],
    /// Foreign call this snippet implements; used to dispatch intrinsic nodes.
    pub descriptor: &'static ForeignCallDescriptor,
    pub build: FragmentBuilder,
}

impl SnippetInfo {
    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|param| param.name == name)
    }

    /// Whether the snippet declares that it may overwrite `location`.
    pub fn kills(&self, location: LocationIdentity) -> bool {
        self.killed_locations
            .iter()
            .any(|killed| *killed == LocationIdentity::Any || *killed == location)
    }
}

impl fmt::Debug for SnippetInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnippetInfo")
            .field("id", &self.id)
            .field("params", &self.params)
            .field("result", &self.result)
            .field("required_guards_stage", &self.required_guards_stage)
            .field("descriptor", &self.descriptor.name)
            .finish()
    }
}

/// Registered snippets of one compiler instance, dispatched by descriptor.
#[derive(Debug, Default)]
pub struct SnippetRegistry {
    snippets: HashMap<SnippetId, Arc<SnippetInfo>>,
    by_descriptor: HashMap<&'static str, SnippetId>,
}

impl SnippetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every snippet shipped with the compiler.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.snippet(int_stream_sum::int_stream_sum_snippet());
        registry
    }

    /// Register a snippet. Registering the same identity again returns the
    /// first registration unchanged, and a descriptor keeps dispatching to the
    /// first snippet registered for it.
    pub fn snippet(&mut self, info: SnippetInfo) -> Arc<SnippetInfo> {
        if let Some(existing) = self.snippets.get(&info.id) {
            return existing.clone();
        }
        let info = Arc::new(info);
        self.by_descriptor
            .entry(info.descriptor.name)
            .or_insert(info.id);
        self.snippets.insert(info.id, info.clone());
        info
    }

    pub fn get(&self, id: SnippetId) -> Option<&Arc<SnippetInfo>> {
        self.snippets.get(&id)
    }

    pub fn for_descriptor(&self, descriptor: &ForeignCallDescriptor) -> Option<&Arc<SnippetInfo>> {
        self.by_descriptor
            .get(descriptor.name)
            .and_then(|id| self.snippets.get(id))
    }

    pub fn len(&self) -> usize {
        self.snippets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_core::intrinsics::INT_STREAM_SUM;

    #[test]
    fn registration_is_idempotent_per_identity() {
        let mut registry = SnippetRegistry::new();
        let first = registry.snippet(int_stream_sum::int_stream_sum_snippet());
        let second = registry.snippet(int_stream_sum::int_stream_sum_snippet());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
        assert!(Arc::ptr_eq(
            registry.for_descriptor(&INT_STREAM_SUM).unwrap(),
            &first
        ));
        assert_eq!(first.param_index("fallback"), Some(1));
    }

    #[test]
    fn descriptor_dispatch_keeps_first_snippet() {
        let mut registry = SnippetRegistry::new();
        let first = registry.snippet(int_stream_sum::int_stream_sum_snippet());
        let second = registry.snippet(SnippetInfo {
            id: SnippetId("int_stream_sum_alternate"),
            ..int_stream_sum::int_stream_sum_snippet()
        });
        assert_eq!(registry.len(), 2);
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(
            registry.for_descriptor(&INT_STREAM_SUM).map(|info| info.id),
            Some(int_stream_sum::INT_STREAM_SUM_SNIPPET)
        );
    }

    #[test]
    fn killed_locations_cover_any() {
        let info = int_stream_sum::int_stream_sum_snippet();
        assert!(info.kills(LocationIdentity::MarkWord));
        assert!(!info.kills(LocationIdentity::Field("value")));
        let wide = SnippetInfo {
            killed_locations: &[LocationIdentity::Any],
            ..int_stream_sum::int_stream_sum_snippet()
        };
        assert!(wide.kills(LocationIdentity::Field("value")));
    }
}
