//! Frame loop controller.
//!
//! One frame is a single open/close bracket of the drawing surface:
//!
//! ```text
//! Idle --begin--> SurfaceOpen --OnFrame--> Dispatched --hand off--> BufferHandedOff --end--> Idle
//! ```
//!
//! The buffer is handed to the host after the `OnFrame` callback returns,
//! whether it succeeded or not, and the surface is always closed before
//! [`FrameController::run_frame`] returns.

use crate::capability::Host;
use crate::dispatch::{self, DispatchOutcome, Event};
use crate::draw::DrawSubsystem;
use crate::error::DispatchError;
use mlua::Lua;
use tracing::trace;

/// Position in the per-frame state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// No surface open
    Idle,
    /// Surface open, `OnFrame` not yet dispatched
    SurfaceOpen,
    /// `OnFrame` returned (or failed)
    Dispatched,
    /// Buffer passed to the host
    BufferHandedOff,
}

/// Result of one frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    /// Outcome of the `OnFrame` dispatch
    pub outcome: Result<DispatchOutcome, DispatchError>,
    /// Size of the buffer handed to the host
    pub bytes_handed_off: usize,
}

impl FrameReport {
    /// Whether the frame callback succeeded
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Closes the surface when dropped, so every exit path ends the frame
struct SurfaceGuard<'a> {
    draw: &'a dyn DrawSubsystem,
    state: &'a mut FrameState,
}

impl<'a> SurfaceGuard<'a> {
    fn open(draw: &'a dyn DrawSubsystem, state: &'a mut FrameState) -> Self {
        debug_assert_eq!(*state, FrameState::Idle, "frames must not nest");
        draw.begin();
        *state = FrameState::SurfaceOpen;
        Self { draw, state }
    }

    fn advance(&mut self, next: FrameState) {
        *self.state = next;
    }
}

impl Drop for SurfaceGuard<'_> {
    fn drop(&mut self) {
        self.draw.end();
        *self.state = FrameState::Idle;
    }
}

/// Drives the begin / dispatch / hand-off / end sequence
#[derive(Debug)]
pub struct FrameController {
    state: FrameState,
    frames: u64,
}

impl FrameController {
    /// Create an idle controller
    pub fn new() -> Self {
        Self {
            state: FrameState::Idle,
            frames: 0,
        }
    }

    /// Current state; `Idle` between frames
    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Frames run so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Run one frame.
    ///
    /// The host sees the buffer only inside [`Host::draw_commit`]; the
    /// borrowed slice cannot outlive that call, and the surface is closed
    /// right after it.
    pub async fn run_frame(
        &mut self,
        lua: &Lua,
        draw: &dyn DrawSubsystem,
        host: &dyn Host,
    ) -> FrameReport {
        self.frames += 1;
        let mut surface = SurfaceGuard::open(draw, &mut self.state);

        let outcome = dispatch::dispatch(lua, &Event::Frame).await;
        surface.advance(FrameState::Dispatched);

        let mut bytes_handed_off = 0;
        draw.with_buffer(&mut |buffer| {
            bytes_handed_off = buffer.len();
            host.draw_commit(buffer);
        });
        surface.advance(FrameState::BufferHandedOff);
        trace!(bytes = bytes_handed_off, "frame buffer handed off");

        drop(surface);

        FrameReport {
            outcome,
            bytes_handed_off,
        }
    }
}

impl Default for FrameController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::{decode_commands, Command};
    use crate::registry::{self, EventKind};
    use crate::test_support::{CountingDraw, RecordingHost};

    fn setup(frame_source: Option<&str>) -> (Lua, CountingDraw, RecordingHost) {
        let lua = Lua::new();
        registry::install(&lua);
        let draw = CountingDraw::default();
        draw.install(&lua).unwrap();
        if let Some(source) = frame_source {
            let f = lua.load(source).eval().unwrap();
            registry::set_callback(&lua, EventKind::OnFrame, Some(f)).unwrap();
        }
        (lua, draw, RecordingHost::new())
    }

    #[tokio::test]
    async fn test_frame_hands_off_buffer() {
        let (lua, draw, host) =
            setup(Some("return function() SetColor(9, 8, 7, 6) end"));
        let mut controller = FrameController::new();

        let report = controller.run_frame(&lua, &draw, &host).await;
        assert_eq!(report.outcome, Ok(DispatchOutcome::Handled));
        assert_eq!(report.bytes_handed_off, 5);
        assert_eq!(controller.state(), FrameState::Idle);
        assert_eq!(controller.frames(), 1);

        let commits = host.commits.borrow();
        assert_eq!(commits.len(), 1);
        assert_eq!(
            decode_commands(&commits[0]).unwrap(),
            vec![Command::SetColor { r: 9, g: 8, b: 7, a: 6 }]
        );
    }

    #[tokio::test]
    async fn test_failing_frame_still_closes_surface() {
        let (lua, draw, host) = setup(Some(
            "return function() SetColor(1, 1, 1) error('frame broke') end",
        ));
        let mut controller = FrameController::new();

        for _ in 0..3 {
            let report = controller.run_frame(&lua, &draw, &host).await;
            assert!(!report.is_success());
            assert_eq!(controller.state(), FrameState::Idle);
        }

        assert_eq!(draw.begins.get(), 3);
        assert_eq!(draw.ends.get(), 3);
        assert!(!draw.encoder.is_open());
        // Commands recorded before the error are still handed off
        assert_eq!(host.commits.borrow().len(), 3);
    }

    #[tokio::test]
    async fn test_frame_without_handler_commits_empty_buffer() {
        let (lua, draw, host) = setup(None);
        let mut controller = FrameController::new();

        let report = controller.run_frame(&lua, &draw, &host).await;
        assert_eq!(report.outcome, Ok(DispatchOutcome::NoHandler));
        assert_eq!(report.bytes_handed_off, 0);
        assert_eq!(host.commits.borrow().as_slice(), [Vec::<u8>::new()]);
        assert_eq!(draw.ends.get(), 1);
    }
}
