//! Test doubles shared by the unit tests and the `tests/` suite.
//!
//! Only the public API is used here, so the integration tests can include
//! this file as a module.

use driver_bridge::{CommandEncoder, DrawSubsystem, Host, HostError, PasteFuture};
use futures::FutureExt;
use mlua::Lua;
use std::cell::{Cell, RefCell};
use std::collections::HashSet;

/// Host that records every call
#[derive(Default)]
pub struct RecordingHost {
    pub errors: RefCell<Vec<String>>,
    pub copied: RefCell<Vec<String>>,
    pub commits: RefCell<Vec<Vec<u8>>>,
    pub keys_down: RefCell<HashSet<String>>,
    pub cursor: Cell<(i32, i32)>,
    pub clipboard: RefCell<Option<String>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.borrow().clone()
    }
}

impl Host for RecordingHost {
    fn on_error(&self, message: &str) {
        self.errors.borrow_mut().push(message.to_string());
    }

    fn cursor_x(&self) -> i32 {
        self.cursor.get().0
    }

    fn cursor_y(&self) -> i32 {
        self.cursor.get().1
    }

    fn is_key_down(&self, name: &str) -> bool {
        self.keys_down.borrow().contains(name)
    }

    fn copy(&self, text: &str) {
        self.copied.borrow_mut().push(text.to_string());
    }

    fn paste(&self) -> PasteFuture {
        let content = self.clipboard.borrow().clone();
        async move {
            tokio::task::yield_now().await;
            content.ok_or_else(|| HostError::PasteRejected("clipboard unavailable".into()))
        }
        .boxed_local()
    }

    fn draw_commit(&self, buffer: &[u8]) {
        self.commits.borrow_mut().push(buffer.to_vec());
    }
}

/// Encoder wrapper that counts surface open/close calls
#[derive(Default)]
pub struct CountingDraw {
    pub encoder: CommandEncoder,
    pub begins: Cell<usize>,
    pub ends: Cell<usize>,
}

impl DrawSubsystem for CountingDraw {
    fn install(&self, lua: &Lua) -> mlua::Result<()> {
        self.encoder.install(lua)
    }

    fn begin(&self) {
        self.begins.set(self.begins.get() + 1);
        self.encoder.begin();
    }

    fn with_buffer(&self, f: &mut dyn FnMut(&[u8])) {
        self.encoder.with_buffer(f);
    }

    fn end(&self) {
        self.ends.set(self.ends.get() + 1);
        self.encoder.end();
    }
}
