use graft_core::error::Error;

/// Create an evaluation error
pub fn evaluation_error(message: impl Into<String>) -> Error {
    Error::evaluation(message)
}

/// Create an evaluation error naming the node it concerns
pub fn evaluation_error_at(message: impl Into<String>, node: impl std::fmt::Display) -> Error {
    Error::evaluation(format!("{} (at {})", message.into(), node))
}

// Convenience macros for generating evaluation errors

/// Macro to return early with an evaluation error
#[macro_export]
macro_rules! interp_bail {
    ($message:expr) => {
        return Err($crate::error::evaluation_error($message))
    };
    ($message:expr, $node:expr) => {
        return Err($crate::error::evaluation_error_at($message, $node))
    };
}

/// Macro to ensure a condition is true, or return an evaluation error
#[macro_export]
macro_rules! interp_ensure {
    ($cond:expr, $message:expr) => {
        if !($cond) {
            $crate::interp_bail!($message);
        }
    };
    ($cond:expr, $message:expr, $node:expr) => {
        if !($cond) {
            $crate::interp_bail!($message, $node);
        }
    };
}
