// SPDX-License-Identifier: MIT
//
// n-render — drive the rendering engine end to end.
//
// Paints a test card (or a PNG) into a FrameBuffer: a title bar, a boxed
// sub-cell blit of the raster, and a log pane. Renders it, then appends a
// few log lines and renders again so the diff (and the scroll region, when
// the log pane spans the screen) does the work. Optionally sends the raster
// through an image protocol on top.
//
//   n-render [--cols N] [--rows N] [--caps FILE] [--image FILE.png]
//            [--blitter NAME] [--protocol NAME] [--fit NAME] [--no-scroll]
//            [--alt]
//
// Capabilities come from a TOML file (see n_term::caps); without one a
// modern truecolor terminal is assumed. Logs go to stderr, filtered by
// RUST_LOG (default "warn").

use std::env;
use std::io::{self, Write};
use std::process::ExitCode;

use n_image::{FitMode, ImageCommand, ImageFrame, ImagePresenter, ImageProtocol};
use n_term::ansi::{self, CursorShape};
use n_term::blit::{self, Blitter, RgbaImage};
use n_term::buffer::{FrameBuffer, Rect};
use n_term::caps::{RenderOptions, TermCaps};
use n_term::cell::{Attr, Style};
use n_term::diff::{CursorRequest, RenderSession};
use n_term::error::{Error, Result};
use n_term::output::OutputBuffer;
use n_term::painter::Painter;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "\
usage: n-render [options]
  --cols N          grid width (default 80)
  --rows N          grid height (default 24)
  --caps FILE       terminal capabilities (TOML)
  --image FILE      PNG to show instead of the test card
  --blitter NAME    auto|braille|sextant|quadrant|halfblock|ascii
  --protocol NAME   none|auto|kitty|sixel|iterm2 (default none)
  --fit NAME        fill|contain|cover (default contain)
  --no-scroll       disable the scroll-region optimization
  --alt             draw on the alternate screen, leave on Enter";

const TITLE: Style = Style::colors(0x10_1018, 0x7A_A2F7).with_attrs(Attr::BOLD);
const PANE: Style = Style::colors(0xC0_CAF5, 0x1A_1B26);
const BORDER: Style = Style::colors(0x56_5F89, 0x1A_1B26);

// ─── Arguments ───────────────────────────────────────────────────────────────

struct Args {
    cols: u16,
    rows: u16,
    caps: Option<String>,
    image: Option<String>,
    blitter: Blitter,
    protocol: ImageProtocol,
    fit: FitMode,
    scroll: bool,
    alt: bool,
}

fn parse_blitter(name: &str) -> Result<Blitter> {
    Ok(match name {
        "auto" => Blitter::Auto,
        "braille" => Blitter::Braille,
        "sextant" => Blitter::Sextant,
        "quadrant" => Blitter::Quadrant,
        "halfblock" => Blitter::Halfblock,
        "ascii" => Blitter::Ascii,
        _ => return Err(Error::InvalidArgument("unknown blitter")),
    })
}

fn parse_args() -> Result<Option<Args>> {
    let mut args = Args {
        cols: 80,
        rows: 24,
        caps: None,
        image: None,
        blitter: Blitter::Auto,
        protocol: ImageProtocol::None,
        fit: FitMode::Contain,
        scroll: true,
        alt: false,
    };
    let mut it = env::args().skip(1);
    while let Some(flag) = it.next() {
        let mut value = || it.next().ok_or(Error::InvalidArgument("flag needs a value"));
        match flag.as_str() {
            "--cols" => args.cols = value()?.parse().map_err(|_| Error::InvalidArgument("--cols"))?,
            "--rows" => args.rows = value()?.parse().map_err(|_| Error::InvalidArgument("--rows"))?,
            "--caps" => args.caps = Some(value()?),
            "--image" => args.image = Some(value()?),
            "--blitter" => args.blitter = parse_blitter(&value()?)?,
            "--protocol" => args.protocol = value()?.parse()?,
            "--fit" => args.fit = value()?.parse()?,
            "--no-scroll" => args.scroll = false,
            "--alt" => args.alt = true,
            "-h" | "--help" => return Ok(None),
            _ => return Err(Error::InvalidArgument("unknown flag")),
        }
    }
    Ok(Some(args))
}

// ─── Raster ──────────────────────────────────────────────────────────────────

/// An owned RGBA raster.
struct Raster {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
}

impl Raster {
    fn load(path: &str) -> Result<Self> {
        let img = image::open(path).map_err(|e| Error::Encode(e.to_string()))?.to_rgba8();
        let (width, height) = img.dimensions();
        Ok(Self {
            pixels: img.into_raw(),
            width,
            height,
        })
    }

    /// Hue sweep across, fading to black downward, with a transparent disc
    /// in the middle so the pane color shows through.
    fn test_card(width: u32, height: u32) -> Self {
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
        let (cx, cy) = (f64::from(width) / 2.0, f64::from(height) / 2.0);
        let radius = f64::from(width.min(height)) / 5.0;
        for y in 0..height {
            let shade = 1.0 - f64::from(y) / f64::from(height);
            for x in 0..width {
                let (r, g, b) = hue(f64::from(x) / f64::from(width));
                let inside = (f64::from(x) - cx).hypot(f64::from(y) - cy) < radius;
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let px = [
                    (r * shade * 255.0) as u8,
                    (g * shade * 255.0) as u8,
                    (b * shade * 255.0) as u8,
                    if inside { 0 } else { 255 },
                ];
                pixels.extend_from_slice(&px);
            }
        }
        Self { pixels, width, height }
    }

    fn view(&self) -> Result<RgbaImage<'_>> {
        RgbaImage::new(&self.pixels, self.width, self.height, self.width as usize * 4)
    }
}

/// Fully saturated color at hue `t` in `0..1`.
fn hue(t: f64) -> (f64, f64, f64) {
    let h = t * 6.0;
    let f = h.fract();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let sector = h as u32;
    match sector {
        0 => (1.0, f, 0.0),
        1 => (1.0 - f, 1.0, 0.0),
        2 => (0.0, 1.0, f),
        3 => (0.0, 1.0 - f, 1.0),
        4 => (f, 0.0, 1.0),
        _ => (1.0, 0.0, 1.0 - f),
    }
}

// ─── Painting ────────────────────────────────────────────────────────────────

/// Where the image goes: the left half under the title bar, inside a box.
fn image_area(cols: u16, rows: u16) -> Rect {
    Rect::new(1, 2, i32::from(cols / 2) - 2, i32::from(rows) - 3)
}

fn paint_frame(fb: &mut FrameBuffer, raster: &Raster, log: &[String], args: &Args, caps: &TermCaps) -> Result<Blitter> {
    let (w, h) = (i32::from(fb.width()), i32::from(fb.height()));
    let link = fb.intern_link("https://github.com/RLabs-Inc/n-nvim")?;
    let mut stack = [Rect::EMPTY; 8];
    let mut p = Painter::begin(fb, &mut stack)?;

    p.fill_rect(Rect::new(0, 0, w, h), PANE);
    p.fill_rect(Rect::new(0, 0, w, 1), TITLE);
    p.draw_text(1, 0, "n-render", TITLE.with_link(link));

    let area = image_area(args.cols, args.rows);
    p.draw_box(Rect::new(area.x - 1, area.y - 1, area.w + 2, area.h + 2), BORDER);
    let used = blit::blit(&mut p, area, &raster.view()?, args.blitter, &caps.blit)?;
    p.draw_text(2, 1, &format!(" {used:?} "), BORDER);

    // Log pane: newest line at the bottom.
    let pane = Rect::new(w / 2, 1, w - w / 2, h - 1);
    p.clip_push(pane)?;
    let visible = usize::try_from(pane.h).unwrap_or(0);
    let start = log.len().saturating_sub(visible);
    for (i, line) in log[start..].iter().enumerate() {
        let y = pane.y + i32::try_from(i).unwrap_or(i32::MAX);
        p.draw_text(pane.x + 1, y, line, PANE);
    }
    p.clip_pop()?;
    Ok(used)
}

fn log_lines(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("{i:04} frame event • 中文 ok")).collect()
}

// ─── Driver ──────────────────────────────────────────────────────────────────

fn present_image(raster: &Raster, args: &Args, caps: &TermCaps, out: &mut OutputBuffer) -> Result<()> {
    let area = image_area(args.cols, args.rows);
    let (Ok(col), Ok(row), Ok(cols), Ok(rows)) = (
        u16::try_from(area.x),
        u16::try_from(area.y),
        u16::try_from(area.w),
        u16::try_from(area.h),
    ) else {
        return Err(Error::InvalidArgument("grid too small for an image"));
    };
    let (Ok(px_w), Ok(px_h)) = (u16::try_from(raster.width), u16::try_from(raster.height)) else {
        return Err(Error::Limit("image larger than 65535 pixels"));
    };

    let mut frame = ImageFrame::new();
    frame.push(
        ImageCommand {
            col,
            row,
            cols,
            rows,
            image_id: 1,
            px_w,
            px_h,
            protocol: args.protocol,
            fit: args.fit,
            ..ImageCommand::default()
        },
        &raster.pixels,
    )?;
    let stats = ImagePresenter::new().present(&frame, &caps.images, out)?;
    tracing::info!(?stats, protocol = %args.protocol, "image presented");
    Ok(())
}

fn run(args: &Args) -> Result<()> {
    let caps = match &args.caps {
        Some(path) => TermCaps::from_toml_str(&std::fs::read_to_string(path)?)?,
        None => TermCaps::default(),
    };
    if args.cols < 8 || args.rows < 6 {
        return Err(Error::InvalidArgument("grid must be at least 8x6"));
    }
    let raster = match &args.image {
        Some(path) => Raster::load(path)?,
        None => Raster::test_card(256, 160),
    };

    let options = RenderOptions {
        scroll_optimization: args.scroll,
        ..RenderOptions::default()
    };
    let mut session = RenderSession::new(options);
    if args.alt {
        let mut stdout = io::stdout().lock();
        ansi::enter_alt_screen(&mut stdout)?;
        stdout.flush()?;
    }
    let mut fb = FrameBuffer::new(args.cols, args.rows);
    let mut log = log_lines(usize::from(args.rows));
    let cursor = CursorRequest::hidden().with_shape(CursorShape::SteadyBar);

    let used = paint_frame(&mut fb, &raster, &log, args, &caps)?;
    let stats = session.render(&fb, &caps, Some(&cursor))?;
    tracing::info!(?used, ?stats, "first frame");

    // Second frame: three new log lines.
    let next = log.len();
    log.extend((next..next + 3).map(|i| format!("{i:04} frame event • appended")));
    fb.reset_links();
    paint_frame(&mut fb, &raster, &log, args, &caps)?;
    let stats = session.render(&fb, &caps, Some(&cursor))?;
    tracing::info!(?stats, "second frame");

    let mut out = OutputBuffer::new();
    if args.protocol != ImageProtocol::None {
        present_image(&raster, args, &caps, &mut out)?;
    }

    // Leave the cursor below the picture with default colors.
    let last_row = i32::from(args.rows) - 1;
    session.render(&fb, &caps, Some(&CursorRequest::at(0, last_row)))?;
    session.flush()?;
    out.flush_stdout()?;

    if args.alt {
        io::stdin().read_line(&mut String::new())?;
    }
    let mut tail = Vec::new();
    ansi::reset(&mut tail)?;
    ansi::cursor_show(&mut tail)?;
    if args.alt {
        ansi::exit_alt_screen(&mut tail)?;
    } else {
        tail.push(b'\n');
    }
    let mut stdout = io::stdout().lock();
    stdout.write_all(&tail)?;
    stdout.flush()?;
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = match parse_args() {
        Ok(Some(args)) => args,
        Ok(None) => {
            println!("{USAGE}");
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("n-render: {e}\n{USAGE}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = run(&args) {
        eprintln!("n-render: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
