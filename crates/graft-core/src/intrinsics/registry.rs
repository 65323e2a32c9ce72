use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};

use super::catalog::SubstitutionSpec;
use super::{ExtractionContract, ForeignCallDescriptor, MethodSignature};

/// What a recognised method is replaced with.
#[derive(Debug, Clone)]
pub struct SubstitutionEntry {
    /// Identity of the substitute implementation.
    pub substitute: &'static str,
    pub descriptor: &'static ForeignCallDescriptor,
    pub extraction: Arc<dyn ExtractionContract>,
}

/// Method signature to substitution table.
///
/// Filled while the compiler boots and shared behind an `Arc` afterwards, so
/// lookups during compilation need no synchronisation.
#[derive(Debug, Default)]
pub struct SignatureRegistry {
    entries: HashMap<MethodSignature, SubstitutionEntry>,
}

impl SignatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a bootstrap catalog, rejecting duplicates.
    pub fn bootstrap(catalog: &[SubstitutionSpec]) -> Result<Self> {
        let mut registry = Self::new();
        for spec in catalog {
            registry.register(spec.signature(), spec.entry())?;
        }
        debug!("signature registry bootstrapped with {} entries", registry.len());
        Ok(registry)
    }

    pub fn register(&mut self, signature: MethodSignature, entry: SubstitutionEntry) -> Result<()> {
        if let Some(existing) = self.entries.get(&signature) {
            return Err(Error::RegistrationConflict {
                signature,
                existing: existing.substitute,
            });
        }
        self.entries.insert(signature, entry);
        Ok(())
    }

    /// Finish bootstrap; the registry is read-only from here on.
    pub fn freeze(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn lookup(&self, signature: &MethodSignature) -> Option<&SubstitutionEntry> {
        self.entries.get(signature)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
