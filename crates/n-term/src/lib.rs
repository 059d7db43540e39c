// SPDX-License-Identifier: MIT
//
// n-term — Terminal rendering engine.
//
// Callers paint a FrameBuffer through a clipped Painter (text, boxes,
// sub-cell blits of RGBA images), then hand it to a RenderSession, which
// diffs it against the previous frame and emits only the escape bytes
// needed to turn one into the other. Terminal features are described by a
// plain TermCaps value; nothing here probes or owns the terminal.
//
// No TUI frameworks: every byte sent to the terminal is produced by the
// ansi module and accounted for in the frame's budget.

pub mod ansi;
pub mod blit;
pub mod buffer;
pub mod caps;
pub mod cell;
pub mod color;
pub mod diff;
pub mod error;
pub mod output;
pub mod painter;
pub mod scroll;

pub use buffer::{FrameBuffer, Rect};
pub use caps::{RenderOptions, TermCaps};
pub use cell::{Attr, Cell, Style};
pub use diff::{CursorRequest, RenderSession, RenderStats};
pub use error::{Error, Result};
pub use painter::Painter;
