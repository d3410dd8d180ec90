//! Input host functions.
//!
//! Cursor position and key state are read straight from the host on every
//! call; nothing is cached between frames.

use crate::capability::Host;
use mlua::Lua;
use std::rc::Rc;

/// `GetCursorPos()` - returns `x, y`
pub fn cursor_pos(host: &dyn Host) -> (i32, i32) {
    (host.cursor_x(), host.cursor_y())
}

/// `IsKeyDown(name)` - whether the named key is held
pub fn is_key_down(host: &dyn Host, name: &str) -> bool {
    host.is_key_down(name)
}

/// Install the input globals
pub fn register(lua: &Lua, host: Rc<dyn Host>) -> mlua::Result<()> {
    let globals = lua.globals();

    let cursor_host = Rc::clone(&host);
    globals.set(
        "GetCursorPos",
        lua.create_function(move |_, ()| Ok(cursor_pos(cursor_host.as_ref())))?,
    )?;

    globals.set(
        "IsKeyDown",
        lua.create_function(move |_, name: String| Ok(is_key_down(host.as_ref(), &name)))?,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingHost;

    #[test]
    fn test_cursor_pos() {
        let lua = Lua::new();
        let host = Rc::new(RecordingHost::new());
        host.cursor.set((120, -4));
        register(&lua, host.clone()).unwrap();

        let (x, y): (i32, i32) = lua.load("return GetCursorPos()").eval().unwrap();
        assert_eq!((x, y), (120, -4));

        host.cursor.set((1, 2));
        let (x, y): (i32, i32) = lua.load("return GetCursorPos()").eval().unwrap();
        assert_eq!((x, y), (1, 2));
    }

    #[test]
    fn test_is_key_down() {
        let lua = Lua::new();
        let host = Rc::new(RecordingHost::new());
        host.keys_down.borrow_mut().insert("Shift".to_string());
        register(&lua, host).unwrap();

        let (shift, ctrl): (bool, bool) = lua
            .load(r#"return IsKeyDown("Shift"), IsKeyDown("Control")"#)
            .eval()
            .unwrap();
        assert!(shift);
        assert!(!ctrl);
    }

    #[test]
    fn test_is_key_down_requires_name() {
        let lua = Lua::new();
        register(&lua, Rc::new(RecordingHost::new())).unwrap();
        assert!(lua.load("return IsKeyDown()").exec().is_err());
    }
}
