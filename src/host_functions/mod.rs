//! Host functions exposed to scripts.
//!
//! These globals are installed into the Lua state at init and are the only
//! way script code reaches the callback registry, the error channel and the
//! host's input and clipboard services.

pub mod callbacks;
pub mod clipboard;
pub mod input;
pub mod logging;

use crate::capability::Host;
use mlua::Lua;
use std::rc::Rc;

/// Install every host function into `lua`
pub fn register_all(lua: &Lua, host: Rc<dyn Host>) -> mlua::Result<()> {
    callbacks::register(lua)?;
    logging::register(lua, Rc::clone(&host))?;
    input::register(lua, Rc::clone(&host))?;
    clipboard::register(lua, host)?;
    Ok(())
}

/// Names of the globals installed by [`register_all`]
pub const GLOBALS: &[&str] = &[
    "SetCallback",
    "GetCallback",
    "SetMainObject",
    "GetMainObject",
    "OnError",
    "Log",
    "GetCursorPos",
    "IsKeyDown",
    "Copy",
    "Paste",
];
