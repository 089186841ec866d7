//! Powerline-style prompt rendering.
//!
//! Renders the active theme's enabled segments as colored blocks joined by
//! arrow glyphs. Each block enforces its own fg/bg pair, so SGR sequences
//! embedded in segment output are stripped wholesale: a stack-tracking
//! renderer would be slower and nondeterministic across segment authors.

use unicode_width::UnicodeWidthStr;

use crate::color::{strip_ansi, Color};
use crate::context::PromptContext;
use crate::segment::SegmentRegistry;
use crate::theme::Theme;
use crate::PROMPT_OUTPUT_MAX;

/// Arrow orientation: PS1 grows left-to-right, the right prompt mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    LeftToRight,
    RightToLeft,
}

/// Default separators (powerline glyphs U+E0B0 / U+E0B2).
const SEPARATOR_LTR: &str = "\u{e0b0}";
const SEPARATOR_RTL: &str = "\u{e0b2}";

/// Cap on rendered blocks per prompt.
const MAX_VISIBLE: usize = 32;

/// One rendered block with resolved colors. Transient: built per render,
/// dropped when assembly finishes.
struct Block {
    content: String,
    /// Display columns of `content`; the display layer positions the right
    /// prompt with this.
    width: usize,
    fg: Color,
    bg: Color,
}

/// Render the theme's enabled segments as powerline blocks.
pub fn render(
    theme: &Theme,
    segments: &SegmentRegistry,
    ctx: &PromptContext,
    direction: Direction,
) -> String {
    let blocks = collect_blocks(theme, segments, ctx);
    if blocks.is_empty() {
        return String::new();
    }

    let separator = match direction {
        Direction::LeftToRight => non_empty_or(&theme.symbols.separator_left, SEPARATOR_LTR),
        Direction::RightToLeft => non_empty_or(&theme.symbols.separator_right, SEPARATOR_RTL),
    };

    let mut out = String::with_capacity(128);
    match direction {
        Direction::LeftToRight => assemble_ltr(&blocks, separator, &mut out),
        Direction::RightToLeft => assemble_rtl(&blocks, separator, &mut out),
    }

    crate::truncate_to(&mut out, PROMPT_OUTPUT_MAX);
    out
}

fn non_empty_or<'a>(configured: &'a str, fallback: &'a str) -> &'a str {
    if configured.is_empty() {
        fallback
    } else {
        configured
    }
}

/// Default block background per segment name.
///
/// True-color values rather than palette indices: indexed entries get
/// remapped by terminal colorschemes and become unreadable behind text.
fn default_segment_bg(name: &str) -> Color {
    match name {
        "user" | "host" | "shlvl" => Color::rgb(68, 68, 68),
        "directory" | "kubernetes" => Color::rgb(0, 95, 175),
        "git" => Color::rgb(135, 95, 175),
        "status" => Color::rgb(175, 0, 0),
        "jobs" | "ssh" | "cmd_duration" | "aws" => Color::rgb(175, 95, 0),
        "time" => Color::rgb(58, 58, 58),
        "virtualenv" => Color::rgb(0, 135, 0),
        "container" => Color::rgb(0, 135, 135),
        _ => Color::rgb(68, 68, 68),
    }
}

/// Resolve a block's fg/bg: defaults, then theme text color, then
/// per-segment overrides, downgraded to the terminal's capabilities.
fn resolve_colors(theme: &Theme, name: &str, ctx: &PromptContext) -> (Color, Color) {
    let mut fg = Color::rgb(255, 255, 255).bold();
    let mut bg = default_segment_bg(name);

    if !theme.colors.text.is_unset() {
        fg = theme.colors.text;
    }

    if let Some(config) = theme.segment_override(name) {
        if let Some(color) = config.fg_color {
            fg = color;
        }
        if let Some(color) = config.bg_color {
            bg = color;
        }
    }

    (
        fg.downgrade(ctx.has_truecolor, ctx.has_256_color),
        bg.downgrade(ctx.has_truecolor, ctx.has_256_color),
    )
}

fn collect_blocks(theme: &Theme, segments: &SegmentRegistry, ctx: &PromptContext) -> Vec<Block> {
    let mut blocks = Vec::new();

    for name in &theme.enabled_segments {
        if blocks.len() >= MAX_VISIBLE {
            break;
        }
        let Some(segment) = segments.find(name) else {
            continue;
        };
        if !segment.is_visible(ctx) {
            continue;
        }
        if theme
            .segment_override(name)
            .and_then(|o| o.show)
            == Some(false)
        {
            continue;
        }

        let Some(rendered) = segments.render_capped(name, ctx, theme) else {
            continue;
        };
        let content = strip_ansi(&rendered);
        if content.is_empty() {
            continue;
        }

        let (fg, bg) = resolve_colors(theme, name, ctx);
        blocks.push(Block {
            width: content.width(),
            content,
            fg,
            bg,
        });
    }

    blocks
}

/// Left-to-right: `bg fg ␣content␣` per block; internal separators paint
/// this block's bg over the next block's bg; the final separator fades to
/// the terminal default.
fn assemble_ltr(blocks: &[Block], separator: &str, out: &mut String) {
    for (i, block) in blocks.iter().enumerate() {
        out.push_str(&block.bg.to_ansi(false));
        out.push_str(&block.fg.to_ansi(true));
        out.push(' ');
        out.push_str(&block.content);
        out.push(' ');

        if let Some(next) = blocks.get(i + 1) {
            out.push_str(&block.bg.to_ansi(true));
            out.push_str(&next.bg.to_ansi(false));
            out.push_str(separator);
        } else {
            out.push_str("\x1b[0m");
            out.push_str(&block.bg.to_ansi(true));
            out.push_str(separator);
            out.push_str("\x1b[0m");
        }
    }
}

/// Right-to-left mirror: each block is preceded by its separator; the first
/// separator sits on the terminal default background.
fn assemble_rtl(blocks: &[Block], separator: &str, out: &mut String) {
    for (i, block) in blocks.iter().enumerate() {
        out.push_str(&block.bg.to_ansi(true));
        if i > 0 {
            out.push_str(&blocks[i - 1].bg.to_ansi(false));
        }
        out.push_str(separator);

        out.push_str(&block.bg.to_ansi(false));
        out.push_str(&block.fg.to_ansi(true));
        out.push(' ');
        out.push_str(&block.content);
        out.push(' ');
    }

    out.push_str("\x1b[0m");
}

/// Total display width of the rendered blocks, separators included. The
/// display layer uses this to right-align the right prompt.
pub fn display_width(theme: &Theme, segments: &SegmentRegistry, ctx: &PromptContext) -> usize {
    let blocks = collect_blocks(theme, segments, ctx);
    if blocks.is_empty() {
        return 0;
    }
    let separator_width = non_empty_or(&theme.symbols.separator_left, SEPARATOR_LTR).width();
    blocks
        .iter()
        .map(|b| b.width + 2)
        .sum::<usize>()
        + blocks.len() * separator_width
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (Theme, SegmentRegistry, PromptContext) {
        let mut theme = Theme::builtin_powerline();
        theme.enabled_segments = vec!["user".to_string(), "directory".to_string()];
        let segments = SegmentRegistry::with_builtins();
        let ctx = PromptContext {
            username: "alice".to_string(),
            cwd_tilde: "~/project".to_string(),
            color_depth: 3,
            has_256_color: true,
            has_truecolor: true,
            ..Default::default()
        };
        (theme, segments, ctx)
    }

    fn count(haystack: &str, needle: &str) -> usize {
        haystack.matches(needle).count()
    }

    #[test]
    fn ltr_emits_one_separator_per_block() {
        let (theme, segments, ctx) = fixture();
        let out = render(&theme, &segments, &ctx, Direction::LeftToRight);
        // Two visible blocks: one internal + one trailing separator.
        assert_eq!(count(&out, SEPARATOR_LTR), 2);
        assert!(out.contains("alice"));
        assert!(out.contains("~/project"));
        assert!(out.ends_with("\x1b[0m"));
    }

    #[test]
    fn truecolor_terminal_gets_rgb_blocks() {
        let (theme, segments, ctx) = fixture();
        let out = render(&theme, &segments, &ctx, Direction::LeftToRight);
        assert_eq!(count(&out, "\x1b[48;2;"), 2, "one bg per block: {out:?}");
        assert!(count(&out, "38;2;") >= 2, "fg + separator transitions");
    }

    #[test]
    fn capability_limited_terminal_never_sees_rgb() {
        let (theme, segments, mut ctx) = fixture();
        ctx.color_depth = 2;
        ctx.has_truecolor = false;
        let out = render(&theme, &segments, &ctx, Direction::LeftToRight);
        assert!(!out.contains(";2;"));
        assert!(out.contains("\x1b[48;5;"));

        ctx.color_depth = 1;
        ctx.has_256_color = false;
        let out = render(&theme, &segments, &ctx, Direction::LeftToRight);
        assert!(!out.contains(";2;"));
        assert!(!out.contains(";5;"));
    }

    #[test]
    fn invisible_segments_are_skipped() {
        let (mut theme, segments, ctx) = fixture();
        // status requires a nonzero exit code; jobs requires jobs.
        theme.enabled_segments.push("status".to_string());
        theme.enabled_segments.push("jobs".to_string());
        let out = render(&theme, &segments, &ctx, Direction::LeftToRight);
        assert_eq!(count(&out, SEPARATOR_LTR), 2);
    }

    #[test]
    fn show_override_hides_a_segment() {
        let (mut theme, segments, ctx) = fixture();
        theme.segment_overrides.push(crate::theme::SegmentOverride {
            name: "user".to_string(),
            show: Some(false),
            ..Default::default()
        });
        let out = render(&theme, &segments, &ctx, Direction::LeftToRight);
        assert!(!out.contains("alice"));
        assert_eq!(count(&out, SEPARATOR_LTR), 1);
    }

    #[test]
    fn embedded_ansi_is_stripped_from_content() {
        let (mut theme, segments, mut ctx) = fixture();
        theme.enabled_segments = vec!["status".to_string()];
        ctx.last_exit_status = 130;
        // The status segment embeds an error-palette SGR; block content must
        // carry the digits only.
        let out = render(&theme, &segments, &ctx, Direction::LeftToRight);
        assert!(out.contains(" 130 "));
        assert!(!out.contains("\x1b[31m"));
    }

    #[test]
    fn rtl_mirrors_with_leading_separators() {
        let (theme, segments, ctx) = fixture();
        let out = render(&theme, &segments, &ctx, Direction::RightToLeft);
        assert_eq!(count(&out, SEPARATOR_RTL), 2);
        assert!(out.starts_with(&Color::rgb(68, 68, 68).to_ansi(true)));
        assert!(out.ends_with("\x1b[0m"));
    }

    #[test]
    fn no_visible_segments_renders_empty() {
        let (mut theme, segments, ctx) = fixture();
        theme.enabled_segments = vec!["status".to_string()];
        let out = render(&theme, &segments, &ctx, Direction::LeftToRight);
        assert!(out.is_empty());
    }

    #[test]
    fn per_segment_color_override_applies() {
        let (mut theme, segments, ctx) = fixture();
        theme.enabled_segments = vec!["user".to_string()];
        theme.segment_overrides.push(crate::theme::SegmentOverride {
            name: "user".to_string(),
            bg_color: Some(Color::rgb(1, 2, 3)),
            ..Default::default()
        });
        let out = render(&theme, &segments, &ctx, Direction::LeftToRight);
        assert!(out.contains("\x1b[48;2;1;2;3m"));
    }

    #[test]
    fn display_width_counts_blocks_and_separators() {
        let (theme, segments, ctx) = fixture();
        // "alice" (5+2) + "~/project" (9+2) + 2 separators (1 each).
        assert_eq!(display_width(&theme, &segments, &ctx), 20);
    }
}
