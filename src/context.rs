//! Per-render prompt context.
//!
//! A [`PromptContext`] is captured once at the start of a prompt render and
//! never mutated while rendering. Everything the template engine, escape
//! expander, and segments need: identity, cwd, runtime counters, terminal
//! capabilities, the latest git snapshot: lives here, so a render never
//! touches the OS mid-scan.

use std::env;
use std::path::{Path, PathBuf};

use crate::git::GitStatus;

/// Terminal color capabilities, as probed from the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TerminalCaps {
    pub has_colors: bool,
    pub has_256_color: bool,
    pub has_truecolor: bool,
}

impl TerminalCaps {
    /// Probe capabilities from environment variables.
    ///
    /// NO_COLOR and TERM=dumb disable color entirely; COLORTERM announces
    /// truecolor; a TERM ending in `256color` grants the 256-color palette.
    pub fn detect() -> Self {
        if env::var_os("NO_COLOR").is_some() {
            return Self::default();
        }

        let term = env::var("TERM").unwrap_or_default();
        if term == "dumb" {
            return Self::default();
        }

        let colorterm = env::var("COLORTERM").unwrap_or_default();
        let has_truecolor = colorterm == "truecolor" || colorterm == "24bit";
        let has_256 = has_truecolor || term.ends_with("256color") || term.ends_with("256");

        Self {
            has_colors: true,
            has_256_color: has_256,
            has_truecolor,
        }
    }

    /// Collapse the flags into the 0-3 depth scale used by escape expansion.
    pub fn color_depth(&self) -> u8 {
        if self.has_truecolor {
            3
        } else if self.has_256_color {
            2
        } else if self.has_colors {
            1
        } else {
            0
        }
    }
}

/// Runtime counters the shell feeds in before each render.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeState {
    pub last_exit_status: i32,
    pub job_count: usize,
    pub history_number: usize,
    pub command_number: usize,
    pub cmd_duration_ms: Option<u64>,
}

/// Immutable snapshot of everything a prompt render reads.
#[derive(Debug, Clone, Default)]
pub struct PromptContext {
    pub username: String,
    pub hostname_short: String,
    pub hostname_full: String,
    /// Full working directory.
    pub cwd: PathBuf,
    /// Working directory with `$HOME` folded to `~`.
    pub cwd_tilde: String,
    pub last_exit_status: i32,
    pub job_count: usize,
    pub history_number: usize,
    pub command_number: usize,
    /// 0=none, 1=basic, 2=256-color, 3=truecolor.
    pub color_depth: u8,
    pub has_256_color: bool,
    pub has_truecolor: bool,
    /// Tty device with the `/dev/` prefix removed (e.g. `pts/0`).
    pub tty_name: String,
    pub is_root: bool,
    pub shlvl: u32,
    pub cmd_duration_ms: Option<u64>,
    pub is_ssh: bool,
    pub virtualenv: Option<String>,
    pub container: Option<String>,
    pub aws_profile: Option<String>,
    pub kube_context: Option<String>,
    /// Latest snapshot published by the async worker, if any.
    pub git: Option<GitStatus>,
}

impl PromptContext {
    /// Capture a context from the process environment plus shell-fed state.
    pub fn capture(runtime: RuntimeState, caps: TerminalCaps, git: Option<GitStatus>) -> Self {
        let cwd = env::current_dir().unwrap_or_default();
        let home = env::var("HOME").unwrap_or_default();
        let hostname_full = hostname();
        let hostname_short = hostname_full
            .split('.')
            .next()
            .unwrap_or_default()
            .to_string();

        Self {
            username: env::var("USER")
                .or_else(|_| env::var("LOGNAME"))
                .unwrap_or_default(),
            hostname_short,
            hostname_full,
            cwd_tilde: tilde_fold(&cwd, &home),
            cwd,
            last_exit_status: runtime.last_exit_status,
            job_count: runtime.job_count,
            history_number: runtime.history_number,
            command_number: runtime.command_number,
            color_depth: caps.color_depth(),
            has_256_color: caps.has_256_color,
            has_truecolor: caps.has_truecolor,
            tty_name: tty_name(),
            is_root: is_root(),
            shlvl: env::var("SHLVL").ok().and_then(|v| v.parse().ok()).unwrap_or(1),
            cmd_duration_ms: runtime.cmd_duration_ms,
            is_ssh: env::var_os("SSH_CONNECTION").is_some() || env::var_os("SSH_TTY").is_some(),
            virtualenv: env::var("VIRTUAL_ENV").ok().filter(|v| !v.is_empty()),
            container: env::var("CONTAINER_ID")
                .ok()
                .filter(|v| !v.is_empty())
                .or_else(|| {
                    if Path::new("/run/.containerenv").exists()
                        || Path::new("/.dockerenv").exists()
                    {
                        Some("container".to_string())
                    } else {
                        None
                    }
                }),
            aws_profile: env::var("AWS_PROFILE").ok().filter(|v| !v.is_empty()),
            kube_context: env::var("KUBECONFIG_CONTEXT").ok().filter(|v| !v.is_empty()),
            git,
        }
    }

    /// Basename of the tilde-folded cwd: `~` at home, `/` at the root,
    /// otherwise the final path component.
    pub fn cwd_basename(&self) -> &str {
        if self.cwd_tilde == "~" || self.cwd_tilde == "/" {
            return &self.cwd_tilde;
        }
        match self.cwd_tilde.rsplit('/').next() {
            Some(last) if !last.is_empty() => last,
            _ => &self.cwd_tilde,
        }
    }
}

/// Fold `$HOME` to `~` when cwd is home or below it (component boundary only).
pub fn tilde_fold(cwd: &Path, home: &str) -> String {
    let cwd_str = cwd.to_string_lossy();
    if home.is_empty() {
        return cwd_str.into_owned();
    }
    if let Some(rest) = cwd_str.strip_prefix(home) {
        if rest.is_empty() {
            return "~".to_string();
        }
        if rest.starts_with('/') {
            return format!("~{}", rest);
        }
    }
    cwd_str.into_owned()
}

fn hostname() -> String {
    // HOSTNAME is exported by most interactive shells; /etc/hostname and
    // /proc fallbacks cover the rest without a libc binding.
    if let Ok(name) = env::var("HOSTNAME") {
        if !name.is_empty() {
            return name;
        }
    }
    for path in ["/etc/hostname", "/proc/sys/kernel/hostname"] {
        if let Ok(contents) = std::fs::read_to_string(path) {
            let name = contents.trim();
            if !name.is_empty() {
                return name.to_string();
            }
        }
    }
    String::new()
}

fn tty_name() -> String {
    // Resolve the controlling terminal via /proc; absent a tty (pipes,
    // editors), fall back to "?" like classic \l handling.
    if let Ok(target) = std::fs::read_link("/proc/self/fd/0") {
        let s = target.to_string_lossy();
        if let Some(dev) = s.strip_prefix("/dev/") {
            return dev.to_string();
        }
        return s.into_owned();
    }
    "?".to_string()
}

fn is_root() -> bool {
    // Effective uid without a libc call: /proc status on Linux, euid env as
    // a portable fallback.
    if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
        for line in status.lines() {
            if let Some(rest) = line.strip_prefix("Uid:") {
                // Fields: real, effective, saved, fs.
                if let Some(euid) = rest.split_whitespace().nth(1) {
                    return euid == "0";
                }
            }
        }
    }
    env::var("EUID").map(|v| v == "0").unwrap_or(false)
}
