// SPDX-License-Identifier: MIT
//
// Terminal capabilities and render options.
//
// Capabilities are a plain value handed in by the caller. Nothing here
// probes the terminal: detection lives outside the engine, and the demo
// binary loads overrides from a TOML file. Every field has a default, so a
// file only needs to name what differs:
//
//   color_mode = "256"
//   sgr_attrs = "BOLD | UNDERLINE | REVERSE"
//   supports_sync_update = false
//
//   [blit]
//   supports_sextant = true
//
//   [images]
//   supports_kitty = true

use serde::Deserialize;

use crate::ansi::SgrStyle;
use crate::blit::BlitCaps;
use crate::cell::{Attr, Style};
use crate::color::{CellColor, ColorMode};
use crate::error::Result;

/// Default cell size in pixels when the terminal doesn't report one.
pub const DEFAULT_CELL_WIDTH_PX: u32 = 8;
pub const DEFAULT_CELL_HEIGHT_PX: u32 = 16;

/// Default per-frame output budget.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 4 * 1024 * 1024;

// ─── Image Capabilities ──────────────────────────────────────────────────────

/// Which image protocols the terminal speaks, and its cell size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_field_names)]
pub struct ImageCaps {
    pub supports_kitty: bool,
    pub supports_sixel: bool,
    pub supports_iterm2: bool,
    pub cell_width_px: u32,
    pub cell_height_px: u32,
}

impl Default for ImageCaps {
    fn default() -> Self {
        Self {
            supports_kitty: false,
            supports_sixel: false,
            supports_iterm2: false,
            cell_width_px: DEFAULT_CELL_WIDTH_PX,
            cell_height_px: DEFAULT_CELL_HEIGHT_PX,
        }
    }
}

// ─── Terminal Capabilities ───────────────────────────────────────────────────

/// Everything the renderer needs to know about the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct TermCaps {
    pub color_mode: ColorMode,
    /// Attributes the terminal renders; others are dropped before output.
    pub sgr_attrs: Attr,
    /// DEC mode 2026.
    pub supports_sync_update: bool,
    /// DECSTBM plus SU/SD.
    pub supports_scroll_region: bool,
    /// DECSCUSR.
    pub supports_cursor_shape: bool,
    /// OSC 8.
    pub supports_hyperlinks: bool,
    /// SGR 58/59.
    pub supports_underline_color: bool,
    pub blit: BlitCaps,
    pub images: ImageCaps,
}

impl Default for TermCaps {
    /// A modern truecolor terminal without image protocols.
    fn default() -> Self {
        Self {
            color_mode: ColorMode::Rgb,
            sgr_attrs: Attr::all(),
            supports_sync_update: true,
            supports_scroll_region: true,
            supports_cursor_shape: true,
            supports_hyperlinks: true,
            supports_underline_color: false,
            blit: BlitCaps::default(),
            images: ImageCaps::default(),
        }
    }
}

impl TermCaps {
    /// Parse capabilities from TOML. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// [`Error::Config`](crate::Error::Config) when the text is not valid
    /// TOML or a value has the wrong type.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// A dumb terminal: 16 colors, no attributes, no optional features.
    #[must_use]
    pub fn dumb() -> Self {
        Self {
            color_mode: ColorMode::Ansi16,
            sgr_attrs: Attr::empty(),
            supports_sync_update: false,
            supports_scroll_region: false,
            supports_cursor_shape: false,
            supports_hyperlinks: false,
            supports_underline_color: false,
            blit: BlitCaps {
                is_dumb: true,
                supports_unicode: false,
                ..BlitCaps::default()
            },
            images: ImageCaps::default(),
        }
    }

    /// Degrade `style` to what this terminal will actually show.
    #[must_use]
    pub fn resolve(&self, style: &Style) -> SgrStyle {
        SgrStyle {
            fg: CellColor::degrade(style.fg, self.color_mode),
            bg: CellColor::degrade(style.bg, self.color_mode),
            attrs: style.attrs & self.sgr_attrs,
            underline_rgb: if self.supports_underline_color { style.underline_rgb } else { 0 },
        }
    }
}

// ─── Render Options ──────────────────────────────────────────────────────────

/// Knobs for a `RenderSession`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Try DECSTBM + SU/SD when rows moved vertically.
    pub scroll_optimization: bool,
    /// A frame larger than this fails with `Limit` and emits nothing.
    pub max_frame_bytes: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            scroll_optimization: true,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

impl RenderOptions {
    /// Parse options from TOML. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// [`Error::Config`](crate::Error::Config) on malformed input.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
