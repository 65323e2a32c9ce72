use std::collections::HashMap;

use crate::error::{Error, Result};

use super::ForeignCallDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallingConvention {
    C,
    Fast,
    Cold,
}

/// Resolved native entry for one descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeEntry {
    pub address: u64,
    pub calling_convention: CallingConvention,
}

/// Native entries available in the active runtime configuration.
///
/// Populated by the host while it initializes; the compiler only reads it.
#[derive(Debug, Clone, Default)]
pub struct ForeignCallDirectory {
    entries: HashMap<&'static str, NativeEntry>,
}

impl ForeignCallDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn link(&mut self, name: &'static str, address: u64, calling_convention: CallingConvention) {
        self.entries.insert(
            name,
            NativeEntry {
                address,
                calling_convention,
            },
        );
    }

    pub fn resolve(&self, descriptor: &ForeignCallDescriptor) -> Result<NativeEntry> {
        self.entries
            .get(descriptor.name)
            .copied()
            .ok_or(Error::DescriptorUnavailable {
                descriptor: descriptor.name,
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
