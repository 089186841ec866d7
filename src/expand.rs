//! Pass 2 of prompt expansion: bash `\X` and zsh `%X` escapes.
//!
//! A single left-to-right scan over the pass-1 output. Both escape families
//! are expanded in the same scan, so a format string can mix them freely.
//! Any CSI sequence already present (emitted by a segment or by pass 1) is
//! copied through verbatim, never reinterpreted.
//!
//! Failure policy: an unknown escape emits its own two bytes, a malformed
//! color spec emits nothing, a strftime failure emits empty: rendering
//! never aborts over a bad format string.

use chrono::Local;

use crate::color::{Color, ColorValue};
use crate::context::PromptContext;
use crate::template::{self, TemplateContext};
use crate::PROMPT_OUTPUT_MAX;

/// Expand a prompt format string into terminal-ready bytes.
///
/// When `template` is provided, `${...}` references are resolved first
/// (pass 1); the shell façade always does this, standalone callers may skip
/// it. Output is capped at [`PROMPT_OUTPUT_MAX`], truncating silently.
pub fn expand(format: &str, ctx: &PromptContext, template: Option<&TemplateContext>) -> String {
    let intermediate;
    let input = match template {
        Some(tctx) => {
            intermediate = template::evaluate(format, tctx);
            intermediate.as_str()
        }
        None => format,
    };

    let mut out = String::with_capacity(input.len());
    let bytes = input.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            // CSI sequences pass through untouched: ESC [ params final.
            // Only ASCII can be part of the sequence; a stray multibyte
            // char after ESC [ falls back to normal copying.
            0x1b => {
                out.push('\x1b');
                i += 1;
                if i < bytes.len() && bytes[i] == b'[' {
                    out.push('[');
                    i += 1;
                    while i < bytes.len() && (0x20..0x40).contains(&bytes[i]) {
                        out.push(bytes[i] as char);
                        i += 1;
                    }
                    if i < bytes.len() && (0x40..=0x7e).contains(&bytes[i]) {
                        out.push(bytes[i] as char);
                        i += 1;
                    }
                }
            }
            b'\\' if i + 1 < bytes.len() => {
                i = expand_bash(bytes, i, ctx, &mut out);
            }
            b'%' if i + 1 < bytes.len() => {
                i = expand_zsh(input, bytes, i, ctx, &mut out);
            }
            _ => {
                let ch_len = utf8_len(bytes[i]);
                out.push_str(&input[i..i + ch_len]);
                i += ch_len;
            }
        }
    }

    crate::truncate_to(&mut out, PROMPT_OUTPUT_MAX);
    out
}

/// Expand one bash escape starting at `i` (`bytes[i] == '\\'`). Returns the
/// index of the first unconsumed byte.
fn expand_bash(bytes: &[u8], i: usize, ctx: &PromptContext, out: &mut String) -> usize {
    let next = bytes[i + 1];
    let mut pos = i + 2;

    match next {
        b'u' => out.push_str(&ctx.username),
        b'h' => out.push_str(&ctx.hostname_short),
        b'H' => out.push_str(&ctx.hostname_full),
        b'w' => out.push_str(&ctx.cwd_tilde),
        b'W' => out.push_str(ctx.cwd_basename()),
        b'd' => out.push_str(&strftime("%a %b %d")),
        b't' => out.push_str(&strftime("%H:%M:%S")),
        b'T' => out.push_str(&strftime("%I:%M:%S")),
        b'@' => out.push_str(&strftime("%I:%M %p")),
        b'A' => out.push_str(&strftime("%H:%M")),
        b'$' => out.push(if ctx.is_root { '#' } else { '$' }),
        b'n' => out.push('\n'),
        b'r' => out.push('\r'),
        b'\\' => out.push('\\'),
        // Non-printing markers are consumed, never emitted.
        b'[' | b']' => {}
        b'!' => out.push_str(&ctx.history_number.to_string()),
        b'#' => out.push_str(&ctx.command_number.to_string()),
        b'j' => out.push_str(&ctx.job_count.to_string()),
        b'l' => {
            let tail = ctx.tty_name.rsplit('/').next().unwrap_or(&ctx.tty_name);
            out.push_str(tail);
        }
        b's' => out.push_str(env!("CARGO_PKG_NAME")),
        b'v' => out.push_str(concat!(
            env!("CARGO_PKG_VERSION_MAJOR"),
            ".",
            env!("CARGO_PKG_VERSION_MINOR")
        )),
        b'V' => out.push_str(env!("CARGO_PKG_VERSION")),
        b'e' => out.push('\x1b'),
        b'a' => out.push('\x07'),
        b'0' => {
            let mut val: u32 = 0;
            let mut digits = 0;
            while digits < 3 && pos < bytes.len() && (b'0'..=b'7').contains(&bytes[pos]) {
                val = val * 8 + u32::from(bytes[pos] - b'0');
                pos += 1;
                digits += 1;
            }
            push_codepoint(out, val);
        }
        b'x' => {
            let mut val: u32 = 0;
            let mut digits = 0;
            while digits < 2 && pos < bytes.len() && bytes[pos].is_ascii_hexdigit() {
                val = val * 16 + u32::from((bytes[pos] as char).to_digit(16).unwrap_or(0));
                pos += 1;
                digits += 1;
            }
            push_codepoint(out, val);
        }
        other => {
            // Unknown escape: both bytes pass through.
            out.push('\\');
            out.push(other as char);
        }
    }

    pos
}

/// Expand one zsh escape starting at `i` (`bytes[i] == '%'`). Returns the
/// index of the first unconsumed byte.
fn expand_zsh(
    input: &str,
    bytes: &[u8],
    i: usize,
    ctx: &PromptContext,
    out: &mut String,
) -> usize {
    let next = bytes[i + 1];
    let mut pos = i + 2;

    match next {
        b'n' => out.push_str(&ctx.username),
        b'm' => out.push_str(&ctx.hostname_short),
        b'M' => out.push_str(&ctx.hostname_full),
        b'd' | b'/' => out.push_str(&ctx.cwd.to_string_lossy()),
        b'~' => out.push_str(&ctx.cwd_tilde),
        b'c' | b'.' => out.push_str(ctx.cwd_basename()),
        b'#' => out.push(if ctx.is_root { '#' } else { '%' }),
        b'%' => out.push('%'),
        b'T' => out.push_str(&strftime("%H:%M")),
        b't' | b'@' => out.push_str(&strftime("%l:%M %p")),
        b'*' => out.push_str(&strftime("%H:%M:%S")),
        b'j' => out.push_str(&ctx.job_count.to_string()),
        b'l' => out.push_str(&ctx.tty_name),
        b'?' => out.push_str(&ctx.last_exit_status.to_string()),
        b'D' => {
            if pos < bytes.len() && bytes[pos] == b'{' {
                let (fmt, after) = read_braced(input, bytes, pos);
                out.push_str(&strftime(fmt));
                pos = after;
            } else {
                out.push_str(&strftime("%y-%m-%d"));
            }
        }
        b'B' => out.push_str("\x1b[1m"),
        b'b' => out.push_str("\x1b[22m"),
        b'U' => out.push_str("\x1b[4m"),
        b'u' => out.push_str("\x1b[24m"),
        b'S' => out.push_str("\x1b[7m"),
        b's' => out.push_str("\x1b[27m"),
        b'F' => {
            if pos < bytes.len() && bytes[pos] == b'{' {
                let (spec, after) = read_braced(input, bytes, pos);
                emit_color_spec(out, spec, ctx, true);
                pos = after;
            }
        }
        b'f' => out.push_str("\x1b[39m"),
        b'K' => {
            if pos < bytes.len() && bytes[pos] == b'{' {
                let (spec, after) = read_braced(input, bytes, pos);
                emit_color_spec(out, spec, ctx, false);
                pos = after;
            }
        }
        b'k' => out.push_str("\x1b[49m"),
        other => {
            out.push('%');
            out.push(other as char);
        }
    }

    pos
}

/// Read a `{...}` argument starting at the `{`. Returns the body and the
/// index after the closing brace (or end of input when unterminated).
fn read_braced<'a>(input: &'a str, bytes: &[u8], open: usize) -> (&'a str, usize) {
    let start = open + 1;
    let mut end = start;
    while end < bytes.len() && bytes[end] != b'}' {
        end += 1;
    }
    let after = if end < bytes.len() { end + 1 } else { end };
    (&input[start..end], after)
}

/// Append the character for a numeric escape. Values above 255 (or NUL) are
/// dropped, matching the byte-oriented original.
fn push_codepoint(out: &mut String, val: u32) {
    if (1..=255).contains(&val) {
        if let Some(ch) = char::from_u32(val) {
            out.push(ch);
        }
    }
}

/// Emit a `%F{...}` / `%K{...}` color spec at the context's color depth.
///
/// Hex specs need at least 256-color support (there is no useful 8-color
/// approximation); numeric specs collapse to basic colors on 8-color
/// terminals; a malformed spec emits nothing.
fn emit_color_spec(out: &mut String, spec: &str, ctx: &PromptContext, is_fg: bool) {
    if ctx.color_depth == 0 {
        return;
    }
    let Some(color) = Color::parse_spec(spec) else {
        return;
    };

    match color.value {
        ColorValue::Rgb(..) => {
            if ctx.color_depth >= 3 {
                out.push_str(&color.to_ansi(is_fg));
            } else if ctx.color_depth == 2 {
                out.push_str(&color.downgrade(false, true).to_ansi(is_fg));
            }
        }
        ColorValue::Indexed(..) => {
            if ctx.color_depth >= 2 {
                out.push_str(&color.to_ansi(is_fg));
            } else {
                out.push_str(&color.downgrade(false, false).to_ansi(is_fg));
            }
        }
        ColorValue::Basic(..) | ColorValue::Default => {
            out.push_str(&color.to_ansi(is_fg));
        }
    }
}

fn strftime(fmt: &str) -> String {
    use std::fmt::Write;
    let mut s = String::new();
    // An invalid format specifier surfaces as a fmt error; emit empty
    // rather than partial output.
    if write!(s, "{}", Local::now().format(fmt)).is_err() {
        return String::new();
    }
    s
}

fn utf8_len(first: u8) -> usize {
    match first {
        b if b >= 0xf0 => 4,
        b if b >= 0xe0 => 3,
        b if b >= 0xc0 => 2,
        _ => 1,
    }
}
