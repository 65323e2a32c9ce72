use crate::intrinsics::{ExtractionFailure, MethodSignature};
use crate::ir::GuardsStage;
use std::result;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Two substitutions were registered for the same signature at bootstrap.
    #[error("registration conflict: {signature} is already substituted by `{existing}`")]
    RegistrationConflict {
        signature: MethodSignature,
        existing: &'static str,
    },
    /// The receiver shape is not understood by the extraction contract.
    #[error("extraction failed for {signature}: {failure}")]
    ExtractionFailure {
        signature: MethodSignature,
        failure: ExtractionFailure,
    },
    /// A snippet was requested or instantiated under the wrong guard stage.
    #[error(
        "stage mismatch for snippet `{snippet}`: graph is at {requested:?}, snippet requires {required:?}"
    )]
    StageMismatch {
        snippet: &'static str,
        requested: GuardsStage,
        required: GuardsStage,
    },
    /// The active runtime has no native entry for a foreign call.
    #[error("foreign call `{descriptor}` has no native entry in the active runtime")]
    DescriptorUnavailable { descriptor: &'static str },
    #[error("{count} intrinsic node(s) still pending at emission of {method}")]
    PendingIntrinsics { method: String, count: usize },
    #[error("compilation of {method} was cancelled")]
    Cancelled { method: String },
    #[error("Snippet error: {0}")]
    Snippet(String),
    #[error("Evaluation error: {0}")]
    Evaluation(String),
    #[error("Generic error: {0}")]
    Generic(eyre::Report),
}

impl Error {
    /// Errors that abort the current compilation job but never the compiler.
    pub fn is_job_fatal(&self) -> bool {
        !matches!(self, Error::RegistrationConflict { .. })
    }

    pub fn snippet(message: impl Into<String>) -> Self {
        Error::Snippet(message.into())
    }

    pub fn evaluation(message: impl Into<String>) -> Self {
        Error::Evaluation(message.into())
    }
}

pub type Result<T> = result::Result<T, Error>;

// Convert from eyre::Report to our Error type
impl From<eyre::Report> for Error {
    fn from(err: eyre::Report) -> Self {
        Error::Generic(err)
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Generic(eyre::Report::msg(s))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Generic(eyre::Report::new(e))
    }
}
