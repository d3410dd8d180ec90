//! Event dispatch.
//!
//! A dispatch looks up the Main Object and the callable registered for the
//! event, then calls it as `callable(main_object, args...)` with a fixed
//! argument list per event kind:
//!
//! | Event       | Arguments after the receiver          |
//! |-------------|---------------------------------------|
//! | `OnInit`    | none                                  |
//! | `OnFrame`   | none                                  |
//! | `OnKeyDown` | `key: string`, `is_repeat: boolean`   |
//! | `OnKeyUp`   | `key: string`, `is_repeat: boolean?`  |
//! | `OnChar`    | `text: string`, `is_repeat: boolean`  |
//!
//! A missing callable is a silent no-op. Calls run through
//! [`mlua::Function::call_async`] so a callback may suspend on `Paste`.

use crate::error::DispatchError;
use crate::registry::{self, EventKind};
use mlua::{Lua, MultiValue, Table, Value};
use tracing::trace;

/// An event together with its positional arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// `OnInit()`
    Init,
    /// `OnFrame()`
    Frame,
    /// `OnKeyDown(key, is_repeat)`
    KeyDown {
        /// Key name
        key: String,
        /// Auto-repeat flag
        is_repeat: bool,
    },
    /// `OnKeyUp(key[, is_repeat])`; the flag is omitted entirely when `None`
    KeyUp {
        /// Key name
        key: String,
        /// Auto-repeat flag, if the caller supplied one
        is_repeat: Option<bool>,
    },
    /// `OnChar(text, is_repeat)`
    Char {
        /// Input text
        text: String,
        /// Auto-repeat flag
        is_repeat: bool,
    },
}

impl Event {
    /// Create a key-down event
    pub fn key_down(key: impl Into<String>, is_repeat: bool) -> Self {
        Event::KeyDown {
            key: key.into(),
            is_repeat,
        }
    }

    /// Create a key-up event
    pub fn key_up(key: impl Into<String>, is_repeat: Option<bool>) -> Self {
        Event::KeyUp {
            key: key.into(),
            is_repeat,
        }
    }

    /// Create a char event
    pub fn char(text: impl Into<String>, is_repeat: bool) -> Self {
        Event::Char {
            text: text.into(),
            is_repeat,
        }
    }

    /// Registry slot this event dispatches to
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Init => EventKind::OnInit,
            Event::Frame => EventKind::OnFrame,
            Event::KeyDown { .. } => EventKind::OnKeyDown,
            Event::KeyUp { .. } => EventKind::OnKeyUp,
            Event::Char { .. } => EventKind::OnChar,
        }
    }

    /// Number of arguments passed after the receiver
    pub fn arity(&self) -> usize {
        match self {
            Event::Init | Event::Frame => 0,
            Event::KeyUp { is_repeat: None, .. } => 1,
            Event::KeyDown { .. } | Event::KeyUp { .. } | Event::Char { .. } => 2,
        }
    }

    fn to_args(&self, lua: &Lua, receiver: Option<Table>) -> mlua::Result<MultiValue> {
        let mut args = Vec::with_capacity(1 + self.arity());
        args.push(receiver.map_or(Value::Nil, Value::Table));

        match self {
            Event::Init | Event::Frame => {}
            Event::KeyDown { key, is_repeat } => {
                args.push(Value::String(lua.create_string(key)?));
                args.push(Value::Boolean(*is_repeat));
            }
            Event::KeyUp { key, is_repeat } => {
                args.push(Value::String(lua.create_string(key)?));
                if let Some(is_repeat) = is_repeat {
                    args.push(Value::Boolean(*is_repeat));
                }
            }
            Event::Char { text, is_repeat } => {
                args.push(Value::String(lua.create_string(text)?));
                args.push(Value::Boolean(*is_repeat));
            }
        }

        Ok(args.into_iter().collect())
    }
}

/// What a successful dispatch did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A callable was found and returned normally
    Handled,
    /// Nothing was registered for the event
    NoHandler,
}

/// Dispatch `event` to its registered callable.
///
/// Script failures come back as a [`DispatchError`] tagged with the event;
/// the Lua state stays usable unless the error is fatal.
pub async fn dispatch(lua: &Lua, event: &Event) -> Result<DispatchOutcome, DispatchError> {
    let kind = event.kind();
    let tag = |err: mlua::Error| DispatchError::from_lua(&err).with_event(kind);

    let receiver = registry::main_object(lua).map_err(tag)?;
    let Some(callable) = registry::callback(lua, kind).map_err(tag)? else {
        trace!(event = %kind, "no handler registered");
        return Ok(DispatchOutcome::NoHandler);
    };

    let args = event.to_args(lua, receiver).map_err(tag)?;
    callable.call_async::<()>(args).await.map_err(tag)?;

    Ok(DispatchOutcome::Handled)
}
