//! Terminal color model.
//!
//! A color is a tagged value (default, basic 16, indexed 256, or 24-bit RGB)
//! plus SGR attribute flags. Every emission goes through [`Color::downgrade`]
//! against the terminal's capabilities first, so output never contains color
//! forms the terminal cannot display.

use std::fmt::Write as _;

/// The color payload, without attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorValue {
    /// No color: emits the fg/bg reset half (SGR 39/49).
    #[default]
    Default,
    /// One of the 16 basic colors (0-7 normal, 8-15 bright).
    Basic(u8),
    /// 256-color palette index.
    Indexed(u8),
    /// 24-bit true color.
    Rgb(u8, u8, u8),
}

/// A color plus rendering attributes.
///
/// Attributes ride along through [`Color::downgrade`] unchanged; only the
/// value is reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub value: ColorValue,
    pub bold: bool,
    pub dim: bool,
    pub italic: bool,
    pub underline: bool,
    pub reverse: bool,
}

impl Color {
    pub const fn none() -> Self {
        Self {
            value: ColorValue::Default,
            bold: false,
            dim: false,
            italic: false,
            underline: false,
            reverse: false,
        }
    }

    pub const fn basic(n: u8) -> Self {
        Self {
            value: ColorValue::Basic(n),
            ..Self::none()
        }
    }

    pub const fn indexed(n: u8) -> Self {
        Self {
            value: ColorValue::Indexed(n),
            ..Self::none()
        }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            value: ColorValue::Rgb(r, g, b),
            ..Self::none()
        }
    }

    pub const fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    /// True when this is a bare default color with no attributes.
    pub fn is_unset(&self) -> bool {
        *self == Self::none()
    }

    /// Emit a single CSI SGR sequence selecting this color.
    ///
    /// Attributes come first as extra parameters, then the color parameter:
    /// `38;5;n`/`48;5;n` for indexed, `38;2;r;g;b`/`48;2;r;g;b` for RGB,
    /// `30+n`/`40+n` (or `90+n`/`100+n` for bright) for basic, `39`/`49`
    /// for the default half.
    pub fn to_ansi(&self, is_fg: bool) -> String {
        let mut params = Vec::with_capacity(4);
        if self.bold {
            params.push("1".to_string());
        }
        if self.dim {
            params.push("2".to_string());
        }
        if self.italic {
            params.push("3".to_string());
        }
        if self.underline {
            params.push("4".to_string());
        }
        if self.reverse {
            params.push("7".to_string());
        }

        match self.value {
            ColorValue::Default => {
                params.push(if is_fg { "39" } else { "49" }.to_string());
            }
            ColorValue::Basic(n) => {
                let code = if n < 8 {
                    (if is_fg { 30 } else { 40 }) + u32::from(n)
                } else {
                    (if is_fg { 90 } else { 100 }) + u32::from(n - 8)
                };
                params.push(code.to_string());
            }
            ColorValue::Indexed(n) => {
                params.push(format!("{};5;{}", if is_fg { 38 } else { 48 }, n));
            }
            ColorValue::Rgb(r, g, b) => {
                params.push(format!(
                    "{};2;{};{};{}",
                    if is_fg { 38 } else { 48 },
                    r,
                    g,
                    b
                ));
            }
        }

        let mut out = String::with_capacity(16);
        let _ = write!(out, "\x1b[{}m", params.join(";"));
        out
    }

    /// Reduce this color to what the terminal can display.
    ///
    /// Monotonic: the result never requires more capability than the flags
    /// grant. RGB maps to the nearest 6x6x6 cube entry; an index collapses
    /// to basic `n % 8`.
    pub fn downgrade(&self, has_truecolor: bool, has_256: bool) -> Color {
        let mut out = *self;

        if let ColorValue::Rgb(r, g, b) = out.value {
            if !has_truecolor {
                out.value = ColorValue::Indexed(rgb_to_cube_index(r, g, b));
            }
        }

        if let ColorValue::Indexed(n) = out.value {
            if !has_256 {
                out.value = ColorValue::Basic(n % 8);
            }
        }

        out
    }

    /// Parse a user-facing color spec: `#RRGGBB`, a 0-255 index, or a name.
    pub fn parse_spec(spec: &str) -> Option<Color> {
        let spec = spec.trim();

        if let Some(hex) = spec.strip_prefix('#') {
            if hex.len() == 6 {
                let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
                let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
                let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
                return Some(Color::rgb(r, g, b));
            }
            return None;
        }

        if let Ok(n) = spec.parse::<u16>() {
            if n <= 255 {
                return Some(Color::indexed(n as u8));
            }
            return None;
        }

        let code = match spec {
            "black" => 0,
            "red" => 1,
            "green" => 2,
            "yellow" => 3,
            "blue" => 4,
            "magenta" => 5,
            "cyan" => 6,
            "white" => 7,
            "default" => return Some(Color::none()),
            _ => return None,
        };
        Some(Color::basic(code))
    }
}

/// Map an RGB channel triple to the 6x6x6 color cube (indices 16-231).
///
/// Channel quantization: values at or below 47 snap to 0, above that the
/// cube step is 40 with a 35 offset.
fn rgb_to_cube_index(r: u8, g: u8, b: u8) -> u8 {
    fn level(v: u8) -> u8 {
        if v > 47 {
            (v - 35) / 40
        } else {
            0
        }
    }
    16 + 36 * level(r) + 6 * level(g) + level(b)
}

/// Remove every CSI sequence (`ESC [ ... final`) from a string.
///
/// Segment renderers are free to embed SGR codes; the powerline renderer
/// enforces its own block colors and must remove them wholesale. The final
/// byte of a CSI sequence is any byte in 0x40-0x7E.
pub fn strip_ansi(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == 0x1b && i + 1 < bytes.len() && bytes[i + 1] == b'[' {
            i += 2;
            // Parameter and intermediate bytes are ASCII 0x20-0x3F; stop at
            // anything else so multibyte text after a malformed sequence is
            // preserved intact.
            while i < bytes.len() && (0x20..0x40).contains(&bytes[i]) {
                i += 1;
            }
            if i < bytes.len() && (0x40..=0x7e).contains(&bytes[i]) {
                i += 1; // final byte
            }
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }

    // CSI removal only drops ASCII-range bytes, so the remainder is still
    // valid UTF-8.
    String::from_utf8(out).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_colors_emit_classic_codes() {
        assert_eq!(Color::basic(1).to_ansi(true), "\x1b[31m");
        assert_eq!(Color::basic(1).to_ansi(false), "\x1b[41m");
        assert_eq!(Color::basic(9).to_ansi(true), "\x1b[91m");
        assert_eq!(Color::basic(15).to_ansi(false), "\x1b[107m");
    }

    #[test]
    fn indexed_and_rgb_emission() {
        assert_eq!(Color::indexed(208).to_ansi(true), "\x1b[38;5;208m");
        assert_eq!(Color::indexed(208).to_ansi(false), "\x1b[48;5;208m");
        assert_eq!(Color::rgb(255, 128, 0).to_ansi(true), "\x1b[38;2;255;128;0m");
        assert_eq!(Color::rgb(0, 95, 175).to_ansi(false), "\x1b[48;2;0;95;175m");
    }

    #[test]
    fn default_emits_reset_half() {
        assert_eq!(Color::none().to_ansi(true), "\x1b[39m");
        assert_eq!(Color::none().to_ansi(false), "\x1b[49m");
    }

    #[test]
    fn attributes_precede_color_parameter() {
        assert_eq!(Color::basic(2).bold().to_ansi(true), "\x1b[1;32m");

        let mut c = Color::rgb(255, 255, 255);
        c.bold = true;
        c.underline = true;
        assert_eq!(c.to_ansi(true), "\x1b[1;4;38;2;255;255;255m");
    }

    #[test]
    fn downgrade_is_monotonic() {
        let rgb = Color::rgb(255, 128, 0);

        // Full capability: untouched.
        assert_eq!(rgb.downgrade(true, true).value, ColorValue::Rgb(255, 128, 0));

        // No truecolor: never Rgb.
        let idx = rgb.downgrade(false, true);
        assert!(matches!(idx.value, ColorValue::Indexed(_)));

        // Neither: never Rgb nor Indexed.
        let basic = rgb.downgrade(false, false);
        assert!(matches!(basic.value, ColorValue::Basic(n) if n < 8));

        // Indexed input with no 256-color support collapses mod 8.
        assert_eq!(
            Color::indexed(208).downgrade(false, false).value,
            ColorValue::Basic(0)
        );
    }

    #[test]
    fn downgrade_preserves_attributes() {
        let c = Color::rgb(10, 20, 30).bold();
        assert!(c.downgrade(false, false).bold);
    }

    #[test]
    fn cube_approximation_matches_reference_values() {
        // Black snaps to cube index 16.
        assert_eq!(rgb_to_cube_index(0, 0, 0), 16);
        // White (255,255,255) -> level 5 on all channels -> 231.
        assert_eq!(rgb_to_cube_index(255, 255, 255), 231);
        // 0x005FAF -> levels (0, 1, 3) -> 16 + 6 + 3 = 25... compute directly.
        assert_eq!(rgb_to_cube_index(0, 95, 175), 16 + 36 * 0 + 6 * 1 + 3);
    }

    #[test]
    fn parse_spec_forms() {
        assert_eq!(
            Color::parse_spec("#FF8000").unwrap().value,
            ColorValue::Rgb(255, 128, 0)
        );
        assert_eq!(Color::parse_spec("208").unwrap().value, ColorValue::Indexed(208));
        assert_eq!(Color::parse_spec("red").unwrap().value, ColorValue::Basic(1));
        assert_eq!(Color::parse_spec("default").unwrap().value, ColorValue::Default);
        assert!(Color::parse_spec("256").is_none());
        assert!(Color::parse_spec("#FFF").is_none());
        assert!(Color::parse_spec("mauve").is_none());
    }

    #[test]
    fn strip_ansi_removes_csi_only() {
        assert_eq!(strip_ansi("\x1b[31mred\x1b[0m"), "red");
        assert_eq!(strip_ansi("\x1b[1;38;2;255;0;0mX\x1b[49m"), "X");
        assert_eq!(strip_ansi("plain"), "plain");
        // Unterminated sequence swallows the tail rather than leaking bytes.
        assert_eq!(strip_ansi("a\x1b[31"), "a");
    }
}
