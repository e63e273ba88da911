//! Crate-wide [`error::Error`] and the context helpers used to wrap it on the way up.
use std::fmt::Debug;
pub mod error;
pub mod result;

/// Attaches the value being processed and the function that failed on it.
pub trait WithDebugObjectAndFnName<S: Into<String>, O: Debug + 'static> {
    fn with_debug_object_and_fn_name(self, obj: O, fn_name: S) -> Self;
}

/// Prefixes an error with a human readable message.
pub trait WithMsg<S: Into<String>> {
    fn with_msg(self, msg: S) -> Self;
}
