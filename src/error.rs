//! Error types for the bridge.
//!
//! This module defines error codes, the dispatch error record surfaced to the
//! host, and the main error type used throughout the crate.

use crate::registry::EventKind;
use serde::{Deserialize, Serialize};

/// Error codes for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Error raised by script code (including `error()` calls)
    ScriptError,
    /// Script source failed to compile
    SyntaxError,
    /// The allocator could not satisfy a request
    MemoryError,
    /// The scripting context is unusable after an earlier allocation failure
    ContextPoisoned,
    /// A host capability failed (e.g. rejected paste)
    HostError,
    /// Invalid argument passed across the script/host boundary
    InvalidArgument,
    /// Internal bridge error (bug)
    InternalError,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::ScriptError => write!(f, "SCRIPT_ERROR"),
            ErrorCode::SyntaxError => write!(f, "SYNTAX_ERROR"),
            ErrorCode::MemoryError => write!(f, "MEMORY_ERROR"),
            ErrorCode::ContextPoisoned => write!(f, "CONTEXT_POISONED"),
            ErrorCode::HostError => write!(f, "HOST_ERROR"),
            ErrorCode::InvalidArgument => write!(f, "INVALID_ARGUMENT"),
            ErrorCode::InternalError => write!(f, "INTERNAL_ERROR"),
        }
    }
}

/// Error details from a failed dispatch or boot run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchError {
    /// Error code
    pub code: ErrorCode,

    /// Human-readable message
    pub message: String,

    /// Event being dispatched when the failure happened (none for the boot chunk)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<EventKind>,

    /// Lua traceback, when captured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traceback: Option<String>,
}

impl DispatchError {
    /// Create a new dispatch error
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            event: None,
            traceback: None,
        }
    }

    /// Create a script error
    pub fn script_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ScriptError, message)
    }

    /// Create a syntax error
    pub fn syntax_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SyntaxError, message)
    }

    /// Create a memory error
    pub fn memory_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::MemoryError, message)
    }

    /// Create the error returned by every entry point once the context is poisoned
    pub fn context_poisoned() -> Self {
        Self::new(
            ErrorCode::ContextPoisoned,
            "scripting context is unusable after an allocation failure",
        )
    }

    /// Create an internal error
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Attach the event being dispatched
    pub fn with_event(mut self, event: EventKind) -> Self {
        self.event = Some(event);
        self
    }

    /// Attach a traceback
    pub fn with_traceback(mut self, traceback: impl Into<String>) -> Self {
        self.traceback = Some(traceback.into());
        self
    }

    /// Whether this failure leaves the scripting context unusable
    pub fn is_fatal(&self) -> bool {
        matches!(self.code, ErrorCode::MemoryError | ErrorCode::ContextPoisoned)
    }

    /// Classify an mlua error, unwrapping callback wrappers down to the root cause
    pub fn from_lua(err: &mlua::Error) -> Self {
        match err {
            mlua::Error::CallbackError { traceback, cause } => {
                Self::from_lua(cause).with_traceback(traceback.clone())
            }
            mlua::Error::WithContext { cause, .. } => Self::from_lua(cause),
            mlua::Error::MemoryError(msg) => Self::memory_error(msg.clone()),
            mlua::Error::SyntaxError { message, .. } => Self::syntax_error(message.clone()),
            mlua::Error::RuntimeError(msg) => {
                let (message, traceback) = split_traceback(msg);
                let err = Self::script_error(message);
                match traceback {
                    Some(traceback) => err.with_traceback(traceback),
                    None => err,
                }
            }
            mlua::Error::BadArgument { .. } | mlua::Error::FromLuaConversionError { .. } => {
                Self::new(ErrorCode::InvalidArgument, err.to_string())
            }
            mlua::Error::ExternalError(inner) => match inner.downcast_ref::<HostError>() {
                Some(host) => Self::new(ErrorCode::HostError, host.to_string()),
                None => Self::script_error(inner.to_string()),
            },
            other => Self::script_error(other.to_string()),
        }
    }
}

/// Marker Lua puts in front of a traceback appended to an error message
const TRACEBACK_MARKER: &str = "\nstack traceback:";

/// Split a Lua error message into the message proper and its traceback
fn split_traceback(msg: &str) -> (&str, Option<&str>) {
    match msg.find(TRACEBACK_MARKER) {
        Some(at) => (&msg[..at], Some(&msg[at + 1..])),
        None => (msg, None),
    }
}

impl std::fmt::Display for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] ", self.code)?;
        if let Some(event) = self.event {
            write!(f, "{}: ", event)?;
        }
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for DispatchError {}

impl From<mlua::Error> for DispatchError {
    fn from(err: mlua::Error) -> Self {
        Self::from_lua(&err)
    }
}

/// Failure reported by a host capability
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    /// The clipboard read was rejected by the host
    #[error("paste rejected: {0}")]
    PasteRejected(String),

    /// Any other host-side failure
    #[error("host error: {0}")]
    Other(String),
}

/// Main error type for the bridge
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Lua runtime error outside of a dispatch
    #[error("Lua error: {0}")]
    Lua(#[from] mlua::Error),

    /// Dispatch or boot failure
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The allocator refused to create the scripting context
    #[error("failed to allocate the scripting context")]
    AllocationFailed,

    /// The context was poisoned by an earlier allocation failure
    #[error("scripting context is poisoned")]
    ContextPoisoned,

    /// Invalid state
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl BridgeError {
    /// Convert to a DispatchError for reporting to the host
    pub fn to_dispatch_error(&self) -> DispatchError {
        match self {
            BridgeError::Lua(e) => DispatchError::from_lua(e),
            BridgeError::Dispatch(e) => e.clone(),
            BridgeError::Config(e) => DispatchError::new(ErrorCode::InvalidArgument, e.to_string()),
            BridgeError::Io(e) => DispatchError::internal_error(e.to_string()),
            BridgeError::AllocationFailed => DispatchError::memory_error(self.to_string()),
            BridgeError::ContextPoisoned => DispatchError::context_poisoned(),
            BridgeError::InvalidState(msg) => DispatchError::internal_error(msg.clone()),
        }
    }
}

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Status codes returned to the host by every entry point
pub mod status_codes {
    /// Success
    pub const SUCCESS: i32 = 0;
    /// A script-level error occurred (already reported)
    pub const FAILURE: i32 = 1;
}

/// Outcome of a host-facing entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// The call completed without a script error
    Success,
    /// A script error occurred and has been reported
    Failure,
}

impl Status {
    /// Numeric status for the host ABI
    pub fn code(self) -> i32 {
        match self {
            Status::Success => status_codes::SUCCESS,
            Status::Failure => status_codes::FAILURE,
        }
    }

    /// Whether the call succeeded
    pub fn is_success(self) -> bool {
        self == Status::Success
    }
}

impl<T, E> From<&std::result::Result<T, E>> for Status {
    fn from(result: &std::result::Result<T, E>) -> Self {
        if result.is_ok() {
            Status::Success
        } else {
            Status::Failure
        }
    }
}

impl From<Status> for i32 {
    fn from(status: Status) -> Self {
        status.code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::ScriptError.to_string(), "SCRIPT_ERROR");
        assert_eq!(ErrorCode::ContextPoisoned.to_string(), "CONTEXT_POISONED");
    }

    #[test]
    fn test_dispatch_error_display_includes_event() {
        let err = DispatchError::script_error("boom").with_event(EventKind::OnFrame);
        assert_eq!(err.to_string(), "[SCRIPT_ERROR] OnFrame: boom");
    }

    #[test]
    fn test_callback_error_is_unwrapped() {
        let err = mlua::Error::CallbackError {
            traceback: "stack traceback:\n\t[C]: in ?".into(),
            cause: Arc::new(mlua::Error::RuntimeError("inner".into())),
        };
        let converted = DispatchError::from_lua(&err);
        assert_eq!(converted.code, ErrorCode::ScriptError);
        assert_eq!(converted.message, "inner");
        assert!(converted.traceback.unwrap().contains("traceback"));
    }

    #[test]
    fn test_runtime_error_traceback_is_split_off() {
        let err = mlua::Error::RuntimeError(
            "boot.lua:1: attempt to call a nil value (local 'f')\nstack traceback:\n\t[C]: in ?"
                .into(),
        );
        let converted = DispatchError::from_lua(&err);
        assert_eq!(converted.message, "boot.lua:1: attempt to call a nil value (local 'f')");
        assert_eq!(
            converted.traceback.as_deref(),
            Some("stack traceback:\n\t[C]: in ?")
        );

        let plain = DispatchError::from_lua(&mlua::Error::RuntimeError("plain".into()));
        assert_eq!(plain.message, "plain");
        assert!(plain.traceback.is_none());
    }

    #[test]
    fn test_memory_error_is_fatal() {
        let err = DispatchError::from_lua(&mlua::Error::MemoryError("not enough memory".into()));
        assert_eq!(err.code, ErrorCode::MemoryError);
        assert!(err.is_fatal());
        assert!(!DispatchError::script_error("x").is_fatal());
    }

    #[test]
    fn test_host_error_is_classified() {
        let err = mlua::Error::external(HostError::PasteRejected("denied".into()));
        let converted = DispatchError::from_lua(&err);
        assert_eq!(converted.code, ErrorCode::HostError);
        assert!(converted.message.contains("denied"));
    }

    #[test]
    fn test_dispatch_error_serialization() {
        let err = DispatchError::script_error("oops").with_event(EventKind::OnChar);
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("SCRIPT_ERROR"));
        assert!(json.contains("OnChar"));
        assert!(!json.contains("traceback"));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(Status::Success.code(), status_codes::SUCCESS);
        assert_eq!(Status::Failure.code(), status_codes::FAILURE);
        let ok: std::result::Result<(), ()> = Ok(());
        assert_eq!(Status::from(&ok), Status::Success);
        assert_eq!(i32::from(Status::Failure), 1);
    }

    #[test]
    fn test_bridge_error_conversion() {
        let converted = BridgeError::ContextPoisoned.to_dispatch_error();
        assert_eq!(converted.code, ErrorCode::ContextPoisoned);
    }
}
