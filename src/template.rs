//! Pass 1 of prompt expansion: `${...}` template syntax.
//!
//! Resolves segment references against the registry and the active theme.
//! Recognized forms:
//!
//! - `${NAME}`: render the segment (empty when not visible)
//! - `${NAME.PROP}`: a segment property (`${git.branch}`)
//! - `${?NAME:TRUE_TEXT}` / `${?NAME:TRUE_TEXT:FALSE_TEXT}`: visibility
//!   conditional; the chosen branch is emitted raw for pass 2 to re-scan
//! - `${COLOR:TEXT}`: wrap text in a theme palette color
//!
//! Unknown names pass the whole `${...}` through unchanged so pass 2 (and
//! ultimately the terminal) sees it as a literal. The only escapes this pass
//! owns are `\n`, `\\`, and `\$` (the latter suppresses `${` recognition);
//! every other `\X` or `%X` pair is left for pass 2.

use crate::context::PromptContext;
use crate::segment::SegmentRegistry;
use crate::theme::Theme;
use crate::PROMPT_OUTPUT_MAX;

/// Borrowed state the template pass resolves names against.
pub struct TemplateContext<'a> {
    pub segments: &'a SegmentRegistry,
    pub theme: &'a Theme,
    pub ctx: &'a PromptContext,
}

/// Evaluate `${...}` references in `format`. Output is capped at
/// [`PROMPT_OUTPUT_MAX`]; truncation is silent.
pub fn evaluate(format: &str, tctx: &TemplateContext) -> String {
    let mut out = String::with_capacity(format.len());
    let bytes = format.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' if i + 1 < bytes.len() => {
                match bytes[i + 1] {
                    b'n' => out.push('\n'),
                    b'\\' => out.push('\\'),
                    b'$' => out.push('$'),
                    other => {
                        // Not ours: keep the pair intact for pass 2.
                        out.push('\\');
                        out.push(other as char);
                    }
                }
                i += 2;
            }
            b'$' if i + 1 < bytes.len() && bytes[i + 1] == b'{' => {
                match find_close(bytes, i + 2) {
                    Some(end) => {
                        let body = &format[i + 2..end];
                        expand_body(body, tctx, &mut out);
                        i = end + 1;
                    }
                    None => {
                        // Unterminated reference: emit the rest literally.
                        out.push_str(&format[i..]);
                        break;
                    }
                }
            }
            _ => {
                let ch_len = utf8_len(bytes[i]);
                out.push_str(&format[i..i + ch_len]);
                i += ch_len;
            }
        }
    }

    crate::truncate_to(&mut out, PROMPT_OUTPUT_MAX);
    out
}

/// Position of the first `}` at or after `from`.
fn find_close(bytes: &[u8], from: usize) -> Option<usize> {
    bytes[from..].iter().position(|&b| b == b'}').map(|p| from + p)
}

fn utf8_len(first: u8) -> usize {
    match first {
        b if b >= 0xf0 => 4,
        b if b >= 0xe0 => 3,
        b if b >= 0xc0 => 2,
        _ => 1,
    }
}

fn expand_body(body: &str, tctx: &TemplateContext, out: &mut String) {
    // Conditional: ${?NAME:T} or ${?NAME:T:F}
    if let Some(cond) = body.strip_prefix('?') {
        let (name, rest) = match cond.split_once(':') {
            Some(pair) => pair,
            None => (cond, ""),
        };
        let (true_text, false_text) = match rest.split_once(':') {
            Some(pair) => pair,
            None => (rest, ""),
        };

        let visible = tctx
            .segments
            .find(name)
            .map(|seg| seg.is_visible(tctx.ctx))
            .unwrap_or(false);
        out.push_str(if visible { true_text } else { false_text });
        return;
    }

    // Palette color wrap: ${COLOR:TEXT}
    if let Some((color_name, text)) = body.split_once(':') {
        if let Some(color) = tctx.theme.colors.lookup(color_name) {
            if tctx.ctx.color_depth > 0 && !color.is_unset() {
                let color =
                    color.downgrade(tctx.ctx.has_truecolor, tctx.ctx.has_256_color);
                out.push_str(&color.to_ansi(true));
                out.push_str(text);
                out.push_str("\x1b[39m");
            } else {
                out.push_str(text);
            }
            return;
        }
        // Not a palette name: fall through to the unknown-reference path.
    }

    // Property access: ${NAME.PROP}
    if let Some((name, prop)) = body.split_once('.') {
        if let Some(segment) = tctx.segments.find(name) {
            if let Some(value) = segment.property(prop, tctx.ctx) {
                out.push_str(&value);
            }
            return;
        }
    } else if let Some(segment) = tctx.segments.find(body) {
        // Plain segment reference: ${NAME}
        if segment.is_visible(tctx.ctx) {
            if let Some(rendered) = tctx.segments.render_capped(body, tctx.ctx, tctx.theme) {
                out.push_str(&rendered);
            }
        }
        return;
    }

    // Unknown reference: emit verbatim so later stages treat it literally.
    out.push_str("${");
    out.push_str(body);
    out.push('}');
}
