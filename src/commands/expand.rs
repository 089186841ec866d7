//! Expand an arbitrary format string through the two-pass pipeline.

use anyhow::Result;

use promptline::context::{PromptContext, RuntimeState, TerminalCaps};
use promptline::expand;
use promptline::segment::SegmentRegistry;
use promptline::styling::print;
use promptline::template::TemplateContext;
use promptline::theme::Theme;

pub fn run(format: &str) -> Result<()> {
    let segments = SegmentRegistry::with_builtins();
    let theme = Theme::builtin_default();
    let ctx = PromptContext::capture(RuntimeState::default(), TerminalCaps::detect(), None);

    let tctx = TemplateContext {
        segments: &segments,
        theme: &theme,
        ctx: &ctx,
    };
    print!("{}", expand::expand(format, &ctx, Some(&tctx)));
    Ok(())
}
