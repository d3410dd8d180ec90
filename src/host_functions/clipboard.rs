//! Clipboard host functions.
//!
//! `Copy` is synchronous. `Paste` is an async function: the calling script
//! suspends until the host's paste future resolves, and resumes with the
//! clipboard text. A rejected paste raises a script error in the caller.

use crate::capability::Host;
use mlua::Lua;
use std::rc::Rc;
use tracing::debug;

/// Install the clipboard globals
pub fn register(lua: &Lua, host: Rc<dyn Host>) -> mlua::Result<()> {
    let globals = lua.globals();

    let copy_host = Rc::clone(&host);
    globals.set(
        "Copy",
        lua.create_function(move |_, text: String| {
            copy_host.copy(&text);
            Ok(())
        })?,
    )?;

    globals.set(
        "Paste",
        lua.create_async_function(move |_, ()| {
            let pending = host.paste();
            async move {
                let text = pending.await.map_err(mlua::Error::external)?;
                debug!(bytes = text.len(), "paste resolved");
                Ok::<_, mlua::Error>(text)
            }
        })?,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingHost;
    use mlua::Function;

    #[test]
    fn test_copy() {
        let lua = Lua::new();
        let host = Rc::new(RecordingHost::new());
        register(&lua, host.clone()).unwrap();

        lua.load(r#"Copy("hello")"#).exec().unwrap();
        assert_eq!(host.copied.borrow().as_slice(), ["hello".to_string()]);
    }

    #[tokio::test]
    async fn test_paste_suspends_and_resumes() {
        let lua = Lua::new();
        let host = Rc::new(RecordingHost::new());
        *host.clipboard.borrow_mut() = Some("pasted text".to_string());
        register(&lua, host).unwrap();

        let f: Function = lua
            .load("return function() return 'got: ' .. Paste() end")
            .eval()
            .unwrap();
        let result: String = f.call_async(()).await.unwrap();
        assert_eq!(result, "got: pasted text");
    }

    #[tokio::test]
    async fn test_rejected_paste_raises() {
        let lua = Lua::new();
        register(&lua, Rc::new(RecordingHost::new())).unwrap();

        let f: Function = lua.load("return function() return Paste() end").eval().unwrap();
        let err = f.call_async::<String>(()).await.unwrap_err();
        assert!(err.to_string().contains("clipboard unavailable"));
    }
}
