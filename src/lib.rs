//! # Driver Bridge
//!
//! This library connects an embedded Lua runtime to a host that owns input,
//! rendering and the clipboard. The host calls into the bridge on discrete
//! events; the bridge forwards them to script-defined callbacks and exposes
//! a narrow set of host capabilities back to scripts.
//!
//! ## Architecture
//!
//! ```text
//! Host (event loop, renderer, clipboard)
//!     │
//!     │ start / on_frame / on_key_down / on_key_up / on_char
//!     ▼
//! Bridge ── FrameController ── DrawSubsystem
//!     │
//!     │ dispatch (EventKind → registered callable)
//!     ▼
//! Lua state (ScriptContext, AllocatorAdapter)
//!     │
//!     │ SetCallback, GetCursorPos, Paste, OnError, ...
//!     ▼
//! Host trait
//! ```
//!
//! ## Features
//!
//! - **Fixed calling convention**: each event kind has a fixed argument list,
//!   with the Main Object passed first
//! - **Failure isolation**: a failing callback returns status `1` and leaves
//!   the context usable; drawing surfaces are always closed
//! - **Per-frame buffer hand-off**: the command buffer is lent to the host
//!   exactly once per frame
//! - **Suspending paste**: `Paste()` suspends the calling script until the
//!   host resolves the clipboard
//! - **Bounded memory**: all script memory comes from a host allocator with an
//!   optional limit

#![deny(missing_docs)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod alloc;
pub mod blocking;
pub mod bridge;
pub mod capability;
pub mod channel;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod draw;
pub mod error;
pub mod frame;
pub mod host_functions;
pub mod metrics;
pub mod registry;

#[cfg(test)]
extern crate self as driver_bridge;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use alloc::{AllocatorAdapter, AllocatorStats};
pub use blocking::BlockingBridge;
pub use bridge::Bridge;
pub use capability::{Host, NullHost, PasteFuture};
pub use config::BridgeConfig;
pub use context::ScriptContext;
pub use dispatch::{DispatchOutcome, Event};
pub use draw::{CommandEncoder, DrawSubsystem};
pub use error::{BridgeError, DispatchError, ErrorCode, HostError, Status};
pub use frame::FrameState;
pub use metrics::{BridgeMetrics, BridgeStats};
pub use registry::EventKind;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install a `tracing` subscriber that honors `RUST_LOG` and logs this crate
/// at debug level by default.
///
/// Does nothing if a global subscriber is already set.
pub fn init_tracing() {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "driver_bridge=debug".parse() {
        filter = filter.add_directive(directive);
    }
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
