use std::fmt;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::ir::ValueKind;

/// Identity of a managed method. Used as the registry key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodSignature {
    pub owner: String,
    pub name: String,
    pub params: Vec<ValueKind>,
    pub is_static: bool,
}

impl MethodSignature {
    pub fn new_instance(owner: impl Into<String>, name: impl Into<String>, params: Vec<ValueKind>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            params,
            is_static: false,
        }
    }

    pub fn new_static(owner: impl Into<String>, name: impl Into<String>, params: Vec<ValueKind>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            params,
            is_static: true,
        }
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}({})",
            self.owner,
            self.name,
            self.params.iter().join(", ")
        )
    }
}
