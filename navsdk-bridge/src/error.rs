//! Error taxonomy for the bridge layer.
//!
//! Configuration, target and module errors indicate integration misuse and
//! are returned synchronously from the call site. Native operation failures
//! come back as `Err` from the async operation that triggered them and are
//! never retried by the bridge.

use crate::session::SessionState;
use thiserror::Error;

pub type BridgeResult<T> = Result<T, BridgeError>;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// A symbolic view command has no id in the native command table.
    #[error("command `{0}` is not registered with the native view manager")]
    Configuration(String),

    /// A view operation was issued without a mounted native view handle.
    #[error("no native view handle to dispatch against")]
    InvalidTarget,

    /// Neither the declared interface nor the legacy registry exposes the
    /// requested native module.
    #[error("native module `{0}` is unavailable in this build")]
    ModuleUnavailable(&'static str),

    /// The operation needs a Ready session.
    #[error("session is not ready (state: {0:?})")]
    NotReady(SessionState),

    /// The session has been cleaned up; no further operations are accepted.
    #[error("session has been cleaned up")]
    SessionClosed,

    /// Opaque failure reported by the native layer for a specific call.
    #[error(transparent)]
    Native(#[from] NativeError),
}

/// Failure surfaced by the native layer for one entry point.
///
/// The bridge does not interpret these beyond logging; `code` carries the
/// platform error code when the native side supplies one.
#[derive(Debug, Clone, Error)]
#[error("native call `{call}` failed: {message}")]
pub struct NativeError {
    pub call: String,
    pub code: Option<i64>,
    pub message: String,
}

impl NativeError {
    pub fn new(call: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            call: call.into(),
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(call: impl Into<String>, code: i64, message: impl Into<String>) -> Self {
        Self {
            call: call.into(),
            code: Some(code),
            message: message.into(),
        }
    }
}
