//! Callback registration host functions.
//!
//! Script-facing view of the callback registry:
//!
//! ```lua
//! SetCallback("OnFrame", function(self) ... end)
//! SetCallback("OnFrame")          -- clears the entry
//! local f = GetCallback("OnFrame")
//! SetMainObject({ ready = false })
//! local main = GetMainObject()
//! ```

use crate::registry::{self, EventKind};
use mlua::{Function, Lua, Table};

/// Resolve a callback name, raising a script error for unknown names
fn event_kind(name: &str) -> mlua::Result<EventKind> {
    name.parse::<EventKind>()
        .map_err(|e| mlua::Error::RuntimeError(e.to_string()))
}

/// `SetCallback(name, callable?)`
///
/// # Arguments
/// * `name` - One of the event names (`OnInit`, `OnFrame`, ...)
/// * `callable` - Function to register; `nil` or absent clears the entry
pub fn set_callback(lua: &Lua, name: &str, callable: Option<Function>) -> mlua::Result<()> {
    let kind = event_kind(name)?;
    registry::set_callback(lua, kind, callable)
}

/// `GetCallback(name)` - the registered function or `nil`
pub fn get_callback(lua: &Lua, name: &str) -> mlua::Result<Option<Function>> {
    let kind = event_kind(name)?;
    registry::callback(lua, kind)
}

/// Install the registration globals
pub fn register(lua: &Lua) -> mlua::Result<()> {
    let globals = lua.globals();

    globals.set(
        "SetCallback",
        lua.create_function(|lua, (name, callable): (String, Option<Function>)| {
            set_callback(lua, &name, callable)
        })?,
    )?;

    globals.set(
        "GetCallback",
        lua.create_function(|lua, name: String| get_callback(lua, &name))?,
    )?;

    globals.set(
        "SetMainObject",
        lua.create_function(|lua, object: Option<Table>| registry::set_main_object(lua, object))?,
    )?;

    globals.set(
        "GetMainObject",
        lua.create_function(|lua, ()| registry::main_object(lua))?,
    )?;

    Ok(())
}
