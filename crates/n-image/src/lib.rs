// SPDX-License-Identifier: MIT
//
// n-image — Terminal image protocols for n-term.
//
// Where the blitters in n-term approximate a raster with glyphs, this crate
// sends the pixels themselves: Kitty graphics (APC), Sixel (DCS), and
// iTerm2 inline images (OSC 1337). Each encoder appends one complete escape
// sequence to an `OutputBuffer` or nothing at all.
//
// The presenter sits on top: it takes a frame's worth of image commands,
// picks a protocol per command from the terminal's capabilities, keeps
// Kitty images resident across frames, and deletes the ones that went away.

pub mod cache;
pub mod hash;
pub mod iterm2;
pub mod kitty;
pub mod protocol;
pub mod scale;
pub mod scratch;
pub mod sixel;

pub use cache::{ImageCommand, ImageFormat, ImageFrame, ImagePresenter};
pub use protocol::{ImageProtocol, select_protocol};
pub use scale::{FitMode, scale_rgba};
pub use scratch::ScratchArena;

/// Pixels with alpha below this are transparent for Sixel.
pub const ALPHA_THRESHOLD: u8 = 128;
