//! Built-in prompt segments.
//!
//! Each segment reads only the immutable render context; anything that needs
//! the OS (cwd, git state, environment) was captured before the render
//! started.

use chrono::Local;

use crate::color::Color;
use crate::context::PromptContext;
use crate::segment::{Segment, SegmentRegistry};
use crate::theme::Theme;

/// Minimum command duration worth showing, in milliseconds.
const CMD_DURATION_MIN_MS: u64 = 2000;

pub(super) fn register_all(registry: &mut SegmentRegistry) {
    // Names are distinct by construction, so registration cannot fail here.
    let segments: Vec<Box<dyn Segment>> = vec![
        Box::new(UserSegment),
        Box::new(HostSegment),
        Box::new(DirectorySegment),
        Box::new(GitSegment),
        Box::new(TimeSegment),
        Box::new(StatusSegment),
        Box::new(JobsSegment),
        Box::new(SymbolSegment),
        Box::new(ShlvlSegment),
        Box::new(SshSegment),
        Box::new(CmdDurationSegment),
        Box::new(VirtualenvSegment),
        Box::new(ContainerSegment),
        Box::new(AwsSegment),
        Box::new(KubernetesSegment),
    ];
    for segment in segments {
        let _ = registry.register(segment);
    }
}

/// Wrap `text` in a foreground color + reset, when the terminal has color.
fn colorize(ctx: &PromptContext, color: Color, text: &str) -> String {
    if ctx.color_depth == 0 || color.is_unset() {
        return text.to_string();
    }
    let color = color.downgrade(ctx.has_truecolor, ctx.has_256_color);
    format!("{}{}\x1b[39m", color.to_ansi(true), text)
}

struct UserSegment;

impl Segment for UserSegment {
    fn name(&self) -> &'static str {
        "user"
    }
    fn render(&self, ctx: &PromptContext, _theme: &Theme) -> String {
        ctx.username.clone()
    }
    fn property(&self, prop: &str, ctx: &PromptContext) -> Option<String> {
        match prop {
            "name" => Some(ctx.username.clone()),
            _ => None,
        }
    }
}

struct HostSegment;

impl Segment for HostSegment {
    fn name(&self) -> &'static str {
        "host"
    }
    fn render(&self, ctx: &PromptContext, _theme: &Theme) -> String {
        ctx.hostname_short.clone()
    }
    fn property(&self, prop: &str, ctx: &PromptContext) -> Option<String> {
        match prop {
            "short" => Some(ctx.hostname_short.clone()),
            "full" => Some(ctx.hostname_full.clone()),
            _ => None,
        }
    }
}

struct DirectorySegment;

impl Segment for DirectorySegment {
    fn name(&self) -> &'static str {
        "directory"
    }

    fn render(&self, ctx: &PromptContext, theme: &Theme) -> String {
        let truncation = theme
            .segment_override("directory")
            .and_then(|o| o.truncation_length);
        match truncation {
            Some(keep) if keep > 0 => truncate_path(&ctx.cwd_tilde, keep),
            _ => ctx.cwd_tilde.clone(),
        }
    }

    fn property(&self, prop: &str, ctx: &PromptContext) -> Option<String> {
        match prop {
            "path" => Some(ctx.cwd_tilde.clone()),
            "basename" => Some(ctx.cwd_basename().to_string()),
            _ => None,
        }
    }
}

/// Keep the last `keep` path components, marking elision with an ellipsis.
fn truncate_path(path: &str, keep: usize) -> String {
    let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
    if components.len() <= keep {
        return path.to_string();
    }
    let tail = components[components.len() - keep..].join("/");
    format!("…/{}", tail)
}

struct GitSegment;

impl Segment for GitSegment {
    fn name(&self) -> &'static str {
        "git"
    }

    fn is_visible(&self, ctx: &PromptContext) -> bool {
        ctx.git.as_ref().is_some_and(|g| g.is_git_repo)
    }

    fn render(&self, ctx: &PromptContext, theme: &Theme) -> String {
        let Some(git) = ctx.git.as_ref() else {
            return String::new();
        };
        if !git.is_git_repo {
            return String::new();
        }

        let head = if !git.branch.is_empty() {
            git.branch.clone()
        } else if !git.commit_short.is_empty() {
            format!("@{}", git.commit_short)
        } else {
            "HEAD".to_string()
        };

        let mut out = String::new();
        if !theme.symbols.branch_glyph.is_empty() {
            out.push_str(&theme.symbols.branch_glyph);
            out.push(' ');
        }

        let head_color = if git.is_dirty() {
            theme.colors.git_dirty
        } else {
            theme.colors.git_clean
        };
        out.push_str(&colorize(ctx, head_color, &head));

        if git.is_merging {
            out.push_str("|merge");
        }
        if git.is_rebasing {
            out.push_str("|rebase");
        }

        let mut marks = String::new();
        if git.staged > 0 {
            marks.push_str(&format!(" +{}", git.staged));
        }
        if git.unstaged > 0 {
            marks.push_str(&format!(" !{}", git.unstaged));
        }
        if git.untracked > 0 {
            marks.push_str(&format!(" ?{}", git.untracked));
        }
        if git.ahead > 0 {
            marks.push_str(&format!(" ↑{}", git.ahead));
        }
        if git.behind > 0 {
            marks.push_str(&format!(" ↓{}", git.behind));
        }
        out.push_str(&marks);

        out
    }

    fn property(&self, prop: &str, ctx: &PromptContext) -> Option<String> {
        let git = ctx.git.as_ref()?;
        match prop {
            "branch" => Some(git.branch.clone()),
            "commit" => Some(git.commit_short.clone()),
            "staged" => Some(git.staged.to_string()),
            "unstaged" => Some(git.unstaged.to_string()),
            "untracked" => Some(git.untracked.to_string()),
            "ahead" => Some(git.ahead.to_string()),
            "behind" => Some(git.behind.to_string()),
            "dirty" => Some(if git.is_dirty() { "1" } else { "0" }.to_string()),
            _ => None,
        }
    }
}

struct TimeSegment;

impl Segment for TimeSegment {
    fn name(&self) -> &'static str {
        "time"
    }
    fn render(&self, _ctx: &PromptContext, _theme: &Theme) -> String {
        Local::now().format("%H:%M:%S").to_string()
    }
}

struct StatusSegment;

impl Segment for StatusSegment {
    fn name(&self) -> &'static str {
        "status"
    }
    fn is_visible(&self, ctx: &PromptContext) -> bool {
        ctx.last_exit_status != 0
    }
    fn render(&self, ctx: &PromptContext, theme: &Theme) -> String {
        colorize(ctx, theme.colors.error, &ctx.last_exit_status.to_string())
    }
    fn property(&self, prop: &str, ctx: &PromptContext) -> Option<String> {
        match prop {
            "code" => Some(ctx.last_exit_status.to_string()),
            _ => None,
        }
    }
}

struct JobsSegment;

impl Segment for JobsSegment {
    fn name(&self) -> &'static str {
        "jobs"
    }
    fn is_visible(&self, ctx: &PromptContext) -> bool {
        ctx.job_count > 0
    }
    fn render(&self, ctx: &PromptContext, _theme: &Theme) -> String {
        format!("⚙{}", ctx.job_count)
    }
}

struct SymbolSegment;

impl Segment for SymbolSegment {
    fn name(&self) -> &'static str {
        "symbol"
    }
    fn render(&self, ctx: &PromptContext, theme: &Theme) -> String {
        if ctx.is_root {
            theme.symbols.root_char.clone()
        } else {
            theme.symbols.prompt_char.clone()
        }
    }
}

struct ShlvlSegment;

impl Segment for ShlvlSegment {
    fn name(&self) -> &'static str {
        "shlvl"
    }
    fn is_visible(&self, ctx: &PromptContext) -> bool {
        ctx.shlvl > 1
    }
    fn render(&self, ctx: &PromptContext, _theme: &Theme) -> String {
        format!("↕{}", ctx.shlvl)
    }
}

struct SshSegment;

impl Segment for SshSegment {
    fn name(&self) -> &'static str {
        "ssh"
    }
    fn is_visible(&self, ctx: &PromptContext) -> bool {
        ctx.is_ssh
    }
    fn render(&self, _ctx: &PromptContext, _theme: &Theme) -> String {
        "ssh".to_string()
    }
}

struct CmdDurationSegment;

impl Segment for CmdDurationSegment {
    fn name(&self) -> &'static str {
        "cmd_duration"
    }
    fn is_visible(&self, ctx: &PromptContext) -> bool {
        ctx.cmd_duration_ms.is_some_and(|ms| ms >= CMD_DURATION_MIN_MS)
    }
    fn render(&self, ctx: &PromptContext, _theme: &Theme) -> String {
        format_duration_ms(ctx.cmd_duration_ms.unwrap_or(0))
    }
}

fn format_duration_ms(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        let total_secs = ms / 1000;
        format!("{}m{}s", total_secs / 60, total_secs % 60)
    }
}

struct VirtualenvSegment;

impl Segment for VirtualenvSegment {
    fn name(&self) -> &'static str {
        "virtualenv"
    }
    fn is_visible(&self, ctx: &PromptContext) -> bool {
        ctx.virtualenv.is_some()
    }
    fn render(&self, ctx: &PromptContext, _theme: &Theme) -> String {
        let Some(venv) = ctx.virtualenv.as_deref() else {
            return String::new();
        };
        // Show the env directory name, not the whole path.
        venv.rsplit('/').next().unwrap_or(venv).to_string()
    }
}

struct ContainerSegment;

impl Segment for ContainerSegment {
    fn name(&self) -> &'static str {
        "container"
    }
    fn is_visible(&self, ctx: &PromptContext) -> bool {
        ctx.container.is_some()
    }
    fn render(&self, ctx: &PromptContext, _theme: &Theme) -> String {
        ctx.container.clone().unwrap_or_default()
    }
}

struct AwsSegment;

impl Segment for AwsSegment {
    fn name(&self) -> &'static str {
        "aws"
    }
    fn is_visible(&self, ctx: &PromptContext) -> bool {
        ctx.aws_profile.is_some()
    }
    fn render(&self, ctx: &PromptContext, _theme: &Theme) -> String {
        ctx.aws_profile.clone().unwrap_or_default()
    }
}

struct KubernetesSegment;

impl Segment for KubernetesSegment {
    fn name(&self) -> &'static str {
        "kubernetes"
    }
    fn is_visible(&self, ctx: &PromptContext) -> bool {
        ctx.kube_context.is_some()
    }
    fn render(&self, ctx: &PromptContext, _theme: &Theme) -> String {
        ctx.kube_context.clone().unwrap_or_default()
    }
}
