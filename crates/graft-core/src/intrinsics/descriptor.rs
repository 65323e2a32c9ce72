use std::fmt;

use itertools::Itertools;

use crate::ir::ValueKind;

/// Memory a foreign call may write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationIdentity {
    Any,
    /// The object header word used for locking and identity hashes.
    MarkWord,
    Field(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SideEffect {
    NoSideEffect,
    HasSideEffect,
}

/// ABI contract of one native entry point.
///
/// Descriptors are declared as statics and shared by reference between every
/// node that calls them.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ForeignCallDescriptor {
    pub name: &'static str,
    pub args: &'static [ValueKind],
    pub result: ValueKind,
    pub side_effect: SideEffect,
    /// Safe to re-execute after a deoptimization rolls back to a prior state.
    pub reexecutable: bool,
    /// The callee may deoptimize the caller.
    pub can_deoptimize: bool,
    pub killed_locations: &'static [LocationIdentity],
}

impl ForeignCallDescriptor {
    /// Safe to place on a path that may later deoptimize.
    pub fn is_deopt_safe(&self) -> bool {
        self.reexecutable && !self.can_deoptimize
    }
}

impl fmt::Display for ForeignCallDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}) -> {}",
            self.name,
            self.args.iter().join(", "),
            self.result
        )
    }
}

/// Sums the elements of an `int[]` in native code.
pub static INT_STREAM_SUM: ForeignCallDescriptor = ForeignCallDescriptor {
    name: "int_stream_sum",
    args: &[ValueKind::Object],
    result: ValueKind::Int,
    side_effect: SideEffect::NoSideEffect,
    reexecutable: true,
    can_deoptimize: false,
    killed_locations: &[],
};
