//! Colors, text modifiers and the per-process [`RenderContext`].
//!
//! Decoration is decided once: when the context is built without color,
//! every painting helper returns its input untouched.

use crate::config::Verbosity;
use bitflags::bitflags;
use crossterm::tty::IsTty;
use std::fmt::Write as _;

/// True-color RGB representation.
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Rgb {
    /// Red channel (0-255)
    pub r: u8,
    /// Green channel (0-255)
    pub g: u8,
    /// Blue channel (0-255)
    pub b: u8,
}

impl Rgb {
    /// Create a new RGB color.
    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build from a 24-bit hex value (e.g., `0xFF5500`).
    #[inline]
    pub const fn hex(hex: u32) -> Self {
        Self::new(
            ((hex >> 16) & 0xFF) as u8,
            ((hex >> 8) & 0xFF) as u8,
            (hex & 0xFF) as u8,
        )
    }
}

impl std::fmt::Debug for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl From<u32> for Rgb {
    #[inline]
    fn from(hex: u32) -> Self {
        Self::hex(hex)
    }
}

bitflags! {
    /// Text style modifiers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        /// Bold text
        const BOLD = 0b0000_0001;
        /// Dim/faint text
        const DIM = 0b0000_0010;
        /// Italic text
        const ITALIC = 0b0000_0100;
        /// Underlined text
        const UNDERLINE = 0b0000_1000;
    }
}

/// A foreground color plus modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Style {
    /// Foreground color, if any.
    pub fg: Option<Rgb>,
    /// Modifiers.
    pub modifiers: Modifiers,
}

impl Style {
    /// A plain foreground color.
    pub const fn fg(color: Rgb) -> Self {
        Self {
            fg: Some(color),
            modifiers: Modifiers::empty(),
        }
    }

    /// Add bold.
    #[must_use]
    pub const fn bold(self) -> Self {
        Self {
            modifiers: self.modifiers.union(Modifiers::BOLD),
            ..self
        }
    }

    /// Add dim.
    #[must_use]
    pub const fn dim(self) -> Self {
        Self {
            modifiers: self.modifiers.union(Modifiers::DIM),
            ..self
        }
    }

    /// Add underline.
    #[must_use]
    pub const fn underline(self) -> Self {
        Self {
            modifiers: self.modifiers.union(Modifiers::UNDERLINE),
            ..self
        }
    }

    fn write_sgr(self, out: &mut String) {
        if self.modifiers.contains(Modifiers::BOLD) {
            out.push_str("\x1b[1m");
        }
        if self.modifiers.contains(Modifiers::DIM) {
            out.push_str("\x1b[2m");
        }
        if self.modifiers.contains(Modifiers::ITALIC) {
            out.push_str("\x1b[3m");
        }
        if self.modifiers.contains(Modifiers::UNDERLINE) {
            out.push_str("\x1b[4m");
        }
        if let Some(color) = self.fg {
            let _ = write!(out, "\x1b[38;2;{};{};{}m", color.r, color.g, color.b);
        }
    }
}

/// Colors for each kind of block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    /// Headings and assistant labels.
    pub primary: Rgb,
    /// Bullets and secondary labels.
    pub secondary: Rgb,
    /// Links and tool results.
    pub accent: Rgb,
    /// Borders, metadata and rules.
    pub muted: Rgb,
    /// Assistant text.
    pub text: Rgb,
    /// Success markers.
    pub success: Rgb,
    /// Tool calls.
    pub warning: Rgb,
    /// Errors.
    pub error: Rgb,
    /// Thinking.
    pub info: Rgb,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            primary: Rgb::hex(0xFF79C6),
            secondary: Rgb::hex(0xBD93F9),
            accent: Rgb::hex(0x8BE9FD),
            muted: Rgb::hex(0x6272A4),
            text: Rgb::hex(0xF8F8F2),
            success: Rgb::hex(0x50FA7B),
            warning: Rgb::hex(0xF1FA8C),
            error: Rgb::hex(0xFF5555),
            info: Rgb::hex(0xBD93F9),
        }
    }
}

/// Everything a renderer needs to know about its output surface.
///
/// Built once by the host and passed by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderContext {
    /// Whether ANSI decoration is allowed.
    pub color: bool,
    /// Terminal width in columns.
    pub width: usize,
    /// Detail level for event blocks.
    pub verbosity: Verbosity,
    /// Colors.
    pub palette: Palette,
}

impl RenderContext {
    /// Narrowest width the renderers will lay out for.
    pub const MIN_WIDTH: usize = 20;

    /// Create a context.
    pub fn new(color: bool, width: usize, verbosity: Verbosity) -> Self {
        Self {
            color,
            width: width.max(Self::MIN_WIDTH),
            verbosity,
            palette: Palette::default(),
        }
    }

    /// Probe stdout once: color only on a TTY without `NO_COLOR`, width
    /// from the terminal size (80 when unknown).
    pub fn for_stdout(verbosity: Verbosity) -> Self {
        let color = std::io::stdout().is_tty() && std::env::var_os("NO_COLOR").is_none();
        let width = crossterm::terminal::size().map_or(80, |(cols, _)| usize::from(cols));
        Self::new(color, width, verbosity)
    }

    /// An undecorated 80-column context.
    pub fn plain() -> Self {
        Self::new(false, 80, Verbosity::Normal)
    }

    /// Replace the verbosity.
    #[must_use]
    pub const fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Wrap `text` in the SGR codes for `style`.
    pub fn paint(&self, text: &str, style: Style) -> String {
        if !self.color || text.is_empty() || style == Style::default() {
            return text.to_string();
        }
        let mut out = String::with_capacity(text.len() + 24);
        style.write_sgr(&mut out);
        out.push_str(text);
        out.push_str("\x1b[0m");
        out
    }

    /// Underline, used for italic emphasis.
    pub fn underline(&self, text: &str) -> String {
        self.paint(text, Style::default().underline())
    }

    /// Shorthand for a plain foreground color.
    pub fn fg(&self, text: &str, color: Rgb) -> String {
        self.paint(text, Style::fg(color))
    }

    /// Shorthand for muted metadata.
    pub fn muted(&self, text: &str) -> String {
        self.paint(text, Style::fg(self.palette.muted))
    }
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::plain()
    }
}
