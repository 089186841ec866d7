//! Prompt segments and their registry.
//!
//! A segment is a named producer of one text fragment (`directory`, `git`,
//! `status`, ...) with a visibility predicate over the render context. The
//! registry owns the boxed segments; they are registered once at startup and
//! shared read-only for the life of the process.

pub mod builtins;

use std::collections::HashMap;

use crate::context::PromptContext;
use crate::error::PromptError;
use crate::theme::Theme;

/// Cap on a single segment's rendered content, in bytes.
pub const SEGMENT_OUTPUT_MAX: usize = 256;

/// A named producer of prompt text.
pub trait Segment: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this segment should appear for the given context.
    fn is_visible(&self, _ctx: &PromptContext) -> bool {
        true
    }

    /// Produce the segment's textual form. May contain embedded SGR
    /// sequences; the powerline renderer strips them, the plain path keeps
    /// them.
    fn render(&self, ctx: &PromptContext, theme: &Theme) -> String;

    /// Resolve a named sub-property (`${git.branch}` style). `None` when the
    /// segment has no such property.
    fn property(&self, _prop: &str, _ctx: &PromptContext) -> Option<String> {
        None
    }
}

/// Name-keyed collection of registered segments.
#[derive(Default)]
pub struct SegmentRegistry {
    segments: HashMap<&'static str, Box<dyn Segment>>,
}

impl SegmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with every built-in segment.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtins::register_all(&mut registry);
        registry
    }

    /// Register a segment. Names must be unique.
    pub fn register(&mut self, segment: Box<dyn Segment>) -> Result<(), PromptError> {
        let name = segment.name();
        if self.segments.contains_key(name) {
            return Err(PromptError::InvalidParameter("duplicate segment name"));
        }
        self.segments.insert(name, segment);
        Ok(())
    }

    pub fn find(&self, name: &str) -> Option<&dyn Segment> {
        self.segments.get(name).map(|b| b.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.segments.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Render a segment with the theme's per-segment format override and the
    /// output cap applied (truncation is silent, at a char boundary).
    ///
    /// A format override wraps the segment's own output wherever `{value}`
    /// appears, e.g. `format = "[{value}]"`.
    pub fn render_capped(&self, name: &str, ctx: &PromptContext, theme: &Theme) -> Option<String> {
        let segment = self.find(name)?;
        let mut out = segment.render(ctx, theme);

        if let Some(config) = theme.segment_override(name) {
            if let Some(format) = &config.format {
                out = format.replace("{value}", &out);
            }
        }

        if out.len() > SEGMENT_OUTPUT_MAX {
            let mut cut = SEGMENT_OUTPUT_MAX;
            while !out.is_char_boundary(cut) {
                cut -= 1;
            }
            out.truncate(cut);
        }
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;
    impl Segment for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }
        fn render(&self, _ctx: &PromptContext, _theme: &Theme) -> String {
            "x".repeat(1000)
        }
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = SegmentRegistry::new();
        registry.register(Box::new(Fixed)).unwrap();
        assert!(matches!(
            registry.register(Box::new(Fixed)),
            Err(PromptError::InvalidParameter(_))
        ));
    }

    #[test]
    fn builtin_set_is_complete() {
        let registry = SegmentRegistry::with_builtins();
        for name in [
            "user",
            "host",
            "directory",
            "git",
            "time",
            "status",
            "jobs",
            "symbol",
            "shlvl",
            "ssh",
            "cmd_duration",
            "virtualenv",
            "container",
            "aws",
            "kubernetes",
        ] {
            assert!(registry.contains(name), "missing builtin segment {name}");
        }
        assert_eq!(registry.len(), 15);
    }

    #[test]
    fn render_capped_truncates() {
        let mut registry = SegmentRegistry::new();
        registry.register(Box::new(Fixed)).unwrap();
        let ctx = PromptContext::default();
        let theme = Theme::builtin_default();
        let out = registry.render_capped("fixed", &ctx, &theme).unwrap();
        assert_eq!(out.len(), SEGMENT_OUTPUT_MAX);
    }

    #[test]
    fn find_unknown_is_none() {
        let registry = SegmentRegistry::with_builtins();
        assert!(registry.find("nonexistent").is_none());
    }

    #[test]
    fn format_override_wraps_segment_output() {
        let registry = SegmentRegistry::with_builtins();
        let ctx = PromptContext {
            username: "alice".to_string(),
            ..Default::default()
        };
        let mut theme = Theme::builtin_default();
        theme.segment_overrides.push(crate::theme::SegmentOverride {
            name: "user".to_string(),
            format: Some("[{value}]".to_string()),
            ..Default::default()
        });
        assert_eq!(
            registry.render_capped("user", &ctx, &theme).as_deref(),
            Some("[alice]")
        );
    }
}
