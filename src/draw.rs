//! Drawing collaborator interface and a minimal command encoder.
//!
//! The frame loop only needs four things from a drawing subsystem: register
//! its primitives, open a surface, expose the encoded bytes, and close the
//! surface. [`CommandEncoder`] is a small implementation that understands
//! the two commands the renderer consumes (`SetColor` and `DrawImage`).

use mlua::Lua;
use std::cell::RefCell;
use std::rc::Rc;

/// Opcode for `SetColor(r, g, b, a)`
pub const OP_SET_COLOR: u8 = 0x01;

/// Opcode for `DrawImage(handle, x, y, w, h, s1, t1, s2, t2)`
pub const OP_DRAW_IMAGE: u8 = 0x02;

/// Image handle that means "fill with the current color"
pub const SOLID_FILL: u32 = 0;

const SET_COLOR_LEN: usize = 1 + 4;
const DRAW_IMAGE_LEN: usize = 1 + 4 + 8 * 4;

/// Producer of per-frame command buffers
pub trait DrawSubsystem {
    /// Register drawing primitives into script scope
    fn install(&self, lua: &Lua) -> mlua::Result<()>;

    /// Open the drawing surface for a new frame
    fn begin(&self);

    /// Lend the bytes encoded since `begin` to `f`
    fn with_buffer(&self, f: &mut dyn FnMut(&[u8]));

    /// Close the surface; the buffer is invalid afterwards
    fn end(&self);
}

/// A decoded draw command
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Set the fill color
    SetColor {
        /// Red
        r: u8,
        /// Green
        g: u8,
        /// Blue
        b: u8,
        /// Alpha
        a: u8,
    },
    /// Draw an image region, or fill a rectangle when `handle` is [`SOLID_FILL`]
    DrawImage {
        /// Image handle
        handle: u32,
        /// Destination rectangle `[x, y, width, height]`
        rect: [f32; 4],
        /// Texture coordinates `[s1, t1, s2, t2]`
        uv: [f32; 4],
    },
}

/// Errors from [`decode_commands`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Unknown opcode at the given offset
    #[error("unknown opcode {opcode:#04x} at offset {offset}")]
    UnknownOpcode {
        /// Byte offset
        offset: usize,
        /// Opcode found
        opcode: u8,
    },
    /// Command truncated at the given offset
    #[error("truncated command at offset {0}")]
    Truncated(usize),
}

/// Decode a command buffer produced by [`CommandEncoder`]
pub fn decode_commands(buffer: &[u8]) -> Result<Vec<Command>, DecodeError> {
    let mut commands = Vec::new();
    let mut offset = 0;

    while offset < buffer.len() {
        let opcode = buffer[offset];
        let len = match opcode {
            OP_SET_COLOR => SET_COLOR_LEN,
            OP_DRAW_IMAGE => DRAW_IMAGE_LEN,
            _ => return Err(DecodeError::UnknownOpcode { offset, opcode }),
        };
        let body = buffer
            .get(offset + 1..offset + len)
            .ok_or(DecodeError::Truncated(offset))?;

        commands.push(match opcode {
            OP_SET_COLOR => Command::SetColor {
                r: body[0],
                g: body[1],
                b: body[2],
                a: body[3],
            },
            _ => {
                let handle = u32::from_le_bytes([body[0], body[1], body[2], body[3]]);
                let mut floats = [0f32; 8];
                for (i, chunk) in body[4..].chunks_exact(4).enumerate() {
                    floats[i] = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                }
                Command::DrawImage {
                    handle,
                    rect: [floats[0], floats[1], floats[2], floats[3]],
                    uv: [floats[4], floats[5], floats[6], floats[7]],
                }
            }
        });
        offset += len;
    }

    Ok(commands)
}

#[derive(Debug, Default)]
struct EncoderState {
    open: bool,
    bytes: Vec<u8>,
    commands: usize,
}

impl EncoderState {
    fn ensure_open(&self, primitive: &str) -> mlua::Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(mlua::Error::RuntimeError(format!(
                "{} called while no drawing surface is open",
                primitive
            )))
        }
    }
}

/// Little-endian command encoder
#[derive(Debug, Clone, Default)]
pub struct CommandEncoder {
    state: Rc<RefCell<EncoderState>>,
}

impl CommandEncoder {
    /// Create a closed encoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a surface is currently open
    pub fn is_open(&self) -> bool {
        self.state.borrow().open
    }

    /// Commands encoded since the surface was opened
    pub fn command_count(&self) -> usize {
        self.state.borrow().commands
    }

    /// Encode `SetColor`
    pub fn set_color(&self, r: u8, g: u8, b: u8, a: u8) -> mlua::Result<()> {
        let mut state = self.state.borrow_mut();
        state.ensure_open("SetColor")?;
        state.bytes.extend_from_slice(&[OP_SET_COLOR, r, g, b, a]);
        state.commands += 1;
        Ok(())
    }

    /// Encode `DrawImage`
    pub fn draw_image(&self, handle: u32, rect: [f32; 4], uv: [f32; 4]) -> mlua::Result<()> {
        let mut state = self.state.borrow_mut();
        state.ensure_open("DrawImage")?;
        state.bytes.push(OP_DRAW_IMAGE);
        state.bytes.extend_from_slice(&handle.to_le_bytes());
        for value in rect.iter().chain(uv.iter()) {
            state.bytes.extend_from_slice(&value.to_le_bytes());
        }
        state.commands += 1;
        Ok(())
    }
}

impl DrawSubsystem for CommandEncoder {
    fn install(&self, lua: &Lua) -> mlua::Result<()> {
        let globals = lua.globals();

        let encoder = self.clone();
        let set_color = lua.create_function(
            move |_, (r, g, b, a): (u8, u8, u8, Option<u8>)| {
                encoder.set_color(r, g, b, a.unwrap_or(u8::MAX))
            },
        )?;
        globals.set("SetColor", set_color)?;

        let encoder = self.clone();
        let draw_image = lua.create_function(
            move |_,
                  (handle, x, y, w, h, s1, t1, s2, t2): (
                u32,
                f32,
                f32,
                f32,
                f32,
                Option<f32>,
                Option<f32>,
                Option<f32>,
                Option<f32>,
            )| {
                let uv = [
                    s1.unwrap_or(0.0),
                    t1.unwrap_or(0.0),
                    s2.unwrap_or(1.0),
                    t2.unwrap_or(1.0),
                ];
                encoder.draw_image(handle, [x, y, w, h], uv)
            },
        )?;
        globals.set("DrawImage", draw_image)?;

        Ok(())
    }

    fn begin(&self) {
        let mut state = self.state.borrow_mut();
        debug_assert!(!state.open, "drawing surface opened twice");
        state.open = true;
        state.bytes.clear();
        state.commands = 0;
    }

    fn with_buffer(&self, f: &mut dyn FnMut(&[u8])) {
        let state = self.state.borrow();
        f(&state.bytes);
    }

    fn end(&self) {
        let mut state = self.state.borrow_mut();
        state.open = false;
        state.bytes.clear();
        state.commands = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drawing_requires_open_surface() {
        let encoder = CommandEncoder::new();
        assert!(encoder.set_color(1, 2, 3, 4).is_err());

        encoder.begin();
        assert!(encoder.set_color(1, 2, 3, 4).is_ok());
        assert_eq!(encoder.command_count(), 1);
        encoder.end();

        assert!(!encoder.is_open());
        assert_eq!(encoder.command_count(), 0);
    }

    #[test]
    fn test_encoded_buffer_decodes() {
        let encoder = CommandEncoder::new();
        encoder.begin();
        encoder.set_color(255, 0, 0, 128).unwrap();
        encoder
            .draw_image(SOLID_FILL, [10.0, 20.0, 30.0, 40.0], [0.0, 0.0, 1.0, 1.0])
            .unwrap();

        let mut decoded = Vec::new();
        encoder.with_buffer(&mut |bytes| {
            assert_eq!(bytes.len(), SET_COLOR_LEN + DRAW_IMAGE_LEN);
            decoded = decode_commands(bytes).unwrap();
        });
        encoder.end();

        assert_eq!(
            decoded,
            vec![
                Command::SetColor { r: 255, g: 0, b: 0, a: 128 },
                Command::DrawImage {
                    handle: SOLID_FILL,
                    rect: [10.0, 20.0, 30.0, 40.0],
                    uv: [0.0, 0.0, 1.0, 1.0],
                },
            ]
        );
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert_eq!(
            decode_commands(&[0x7f]),
            Err(DecodeError::UnknownOpcode { offset: 0, opcode: 0x7f })
        );
        assert_eq!(
            decode_commands(&[OP_SET_COLOR, 1, 2]),
            Err(DecodeError::Truncated(0))
        );
    }

    #[test]
    fn test_script_primitives() {
        let lua = Lua::new();
        let encoder = CommandEncoder::new();
        encoder.install(&lua).unwrap();

        // Outside a frame the primitive raises
        assert!(lua.load("SetColor(1, 2, 3)").exec().is_err());

        encoder.begin();
        lua.load("SetColor(1, 2, 3); DrawImage(7, 0, 0, 16, 16)")
            .exec()
            .unwrap();

        let mut decoded = Vec::new();
        encoder.with_buffer(&mut |bytes| decoded = decode_commands(bytes).unwrap());
        encoder.end();

        assert_eq!(decoded[0], Command::SetColor { r: 1, g: 2, b: 3, a: 255 });
        assert_eq!(
            decoded[1],
            Command::DrawImage {
                handle: 7,
                rect: [0.0, 0.0, 16.0, 16.0],
                uv: [0.0, 0.0, 1.0, 1.0],
            }
        );
    }
}
