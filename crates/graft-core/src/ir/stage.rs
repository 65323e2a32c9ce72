use serde::{Deserialize, Serialize};
use std::fmt;

/// How far guards have been lowered in a graph. Only moves forward.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum GuardsStage {
    /// Guards float freely and may be reordered.
    FloatingGuards,
    /// Guards are fixed to control flow; deoptimizations are explicit.
    FixedDeopts,
    /// Frame states have been assigned; no new deoptimization points.
    AfterFsa,
}

/// Which lowering round is currently running.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum LoweringStage {
    HighTier,
    MidTier,
    LowTier,
}

/// Probability that the true branch of an `If` is taken.
///
/// `Synthetic` values are attached by the compiler itself where no profile
/// exists; layout treats them as fixed hints and never merges them with
/// profile data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BranchProbability {
    Profiled(f64),
    Synthetic(f64),
}

impl BranchProbability {
    pub const NOT_FREQUENT: BranchProbability = BranchProbability::Synthetic(0.1);

    pub fn value(self) -> f64 {
        match self {
            BranchProbability::Profiled(v) | BranchProbability::Synthetic(v) => v,
        }
    }

    pub fn is_synthetic(self) -> bool {
        matches!(self, BranchProbability::Synthetic(_))
    }

    /// A branch taken at most this often is laid out as a cold path.
    pub fn is_cold(self) -> bool {
        self.value() <= Self::NOT_FREQUENT.value()
    }
}

impl fmt::Display for BranchProbability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BranchProbability::Profiled(v) => write!(f, "p={v}"),
            BranchProbability::Synthetic(v) => write!(f, "p={v} synthetic"),
        }
    }
}
