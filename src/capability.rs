//! Host capabilities required by the bridge.
//!
//! The host owns input, clipboard, rendering and error reporting. The bridge
//! only sees it through the [`Host`] trait and exposes a narrow subset of it
//! to scripts (see [`crate::host_functions`]).

use crate::error::HostError;
use futures::future::LocalBoxFuture;
use futures::FutureExt;

/// Future returned by [`Host::paste`]
pub type PasteFuture = LocalBoxFuture<'static, Result<String, HostError>>;

/// Calls the bridge makes into the host
pub trait Host {
    /// Receive an error message raised by script code or a failed dispatch.
    /// Must not block.
    fn on_error(&self, message: &str);

    /// Cursor X position in surface pixels
    fn cursor_x(&self) -> i32;

    /// Cursor Y position in surface pixels
    fn cursor_y(&self) -> i32;

    /// Whether the named key is currently held
    fn is_key_down(&self, name: &str) -> bool;

    /// Place text on the clipboard
    fn copy(&self, text: &str);

    /// Read the clipboard; resolves once the host has the content
    fn paste(&self) -> PasteFuture;

    /// Consume one frame's draw commands.
    ///
    /// The slice is only valid for the duration of this call; the host must
    /// copy or render it before returning.
    fn draw_commit(&self, buffer: &[u8]);
}

/// Host that ignores every call; useful for headless runs
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHost;

impl Host for NullHost {
    fn on_error(&self, _message: &str) {}

    fn cursor_x(&self) -> i32 {
        0
    }

    fn cursor_y(&self) -> i32 {
        0
    }

    fn is_key_down(&self, _name: &str) -> bool {
        false
    }

    fn copy(&self, _text: &str) {}

    fn paste(&self) -> PasteFuture {
        futures::future::ready(Ok(String::new())).boxed_local()
    }

    fn draw_commit(&self, _buffer: &[u8]) {}
}
