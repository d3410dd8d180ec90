//! Logging and error host functions.
//!
//! `OnError(message)` forwards a message to the host's error handler through
//! the error channel. `Log(level, message)` writes to the diagnostic stream
//! only. Neither requires anything from the script beyond a message.

use crate::capability::Host;
use crate::channel::ErrorChannel;
use mlua::Lua;
use std::rc::Rc;

/// Log levels accepted by `Log`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level
    Debug = 0,
    /// Info level
    Info = 1,
    /// Warning level
    Warn = 2,
    /// Error level
    Error = 3,
}

impl From<i32> for LogLevel {
    fn from(level: i32) -> Self {
        match level {
            0 => LogLevel::Debug,
            1 => LogLevel::Info,
            2 => LogLevel::Warn,
            3 => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

/// Write a script message to the diagnostic stream
pub fn log(level: LogLevel, message: &str) {
    match level {
        LogLevel::Debug => tracing::debug!(source = "script", "{}", message),
        LogLevel::Info => tracing::info!(source = "script", "{}", message),
        LogLevel::Warn => tracing::warn!(source = "script", "{}", message),
        LogLevel::Error => tracing::error!(source = "script", "{}", message),
    }
}

/// Install `OnError` and `Log`
pub fn register(lua: &Lua, host: Rc<dyn Host>) -> mlua::Result<()> {
    let globals = lua.globals();

    globals.set(
        "OnError",
        lua.create_function(move |_, message: Option<String>| {
            ErrorChannel::forward(host.as_ref(), message.as_deref().unwrap_or("nil"));
            Ok(())
        })?,
    )?;

    globals.set(
        "Log",
        lua.create_function(|_, (level, message): (i32, String)| {
            log(LogLevel::from(level), &message);
            Ok(())
        })?,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingHost;

    #[test]
    fn test_on_error_forwards_to_host() {
        let lua = Lua::new();
        let host = Rc::new(RecordingHost::new());
        register(&lua, host.clone()).unwrap();

        lua.load(r#"OnError("something broke")"#).exec().unwrap();
        assert_eq!(host.errors(), vec!["something broke".to_string()]);
    }

    #[test]
    fn test_on_error_as_xpcall_handler() {
        let lua = Lua::new();
        let host = Rc::new(RecordingHost::new());
        register(&lua, host.clone()).unwrap();

        let ok: bool = lua
            .load(r#"return xpcall(function() error("inner", 0) end, OnError)"#)
            .eval()
            .unwrap();
        assert!(!ok);
        assert_eq!(host.errors(), vec!["inner".to_string()]);
    }

    #[test]
    fn test_log_levels() {
        assert_eq!(LogLevel::from(0), LogLevel::Debug);
        assert_eq!(LogLevel::from(3), LogLevel::Error);
        assert_eq!(LogLevel::from(99), LogLevel::Info);

        let lua = Lua::new();
        register(&lua, Rc::new(RecordingHost::new())).unwrap();
        lua.load(r#"Log(2, "careful")"#).exec().unwrap();
    }
}
