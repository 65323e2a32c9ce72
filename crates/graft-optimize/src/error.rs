use graft_core::error::Error;

/// Create a snippet error
pub fn snippet_error(message: impl Into<String>) -> Error {
    Error::snippet(message)
}

/// Create a snippet error naming the snippet it concerns
pub fn snippet_error_for(snippet: &str, message: impl Into<String>) -> Error {
    Error::snippet(format!("{}: {}", snippet, message.into()))
}

// Convenience macros for generating snippet errors

/// Macro to return early with a snippet error
#[macro_export]
macro_rules! snippet_bail {
    ($message:expr) => {
        return Err($crate::error::snippet_error($message))
    };
    ($snippet:expr, $message:expr) => {
        return Err($crate::error::snippet_error_for($snippet, $message))
    };
}

/// Macro to ensure a condition is true, or return a snippet error
#[macro_export]
macro_rules! snippet_ensure {
    ($cond:expr, $message:expr) => {
        if !($cond) {
            $crate::snippet_bail!($message);
        }
    };
    ($cond:expr, $snippet:expr, $message:expr) => {
        if !($cond) {
            $crate::snippet_bail!($snippet, $message);
        }
    };
}
