//! Prompt façade: the shell-facing surface of the rendering pipeline.
//!
//! [`PromptComposer`] owns the registries, the PS1/PS2 ownership flags, and
//! the async git worker, and turns a prompt request into terminal-ready
//! bytes. Rendering never returns an error to the shell's command loop: a
//! failed or empty render degrades to the minimal `"$ "` / `"# "` prompt.
//!
//! Ownership discipline: a theme writes PS1/PS2 at activation; the moment
//! anything else writes one of them (reported via
//! [`PromptComposer::notify_prompt_var_set`]), that variable becomes
//! user-managed and later theme activations leave it alone. Only the
//! explicit theme-switch command or an `unset` hands it back.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use crate::context::{PromptContext, RuntimeState, TerminalCaps};
use crate::error::PromptError;
use crate::expand;
use crate::git::GitStatus;
use crate::powerline::{self, Direction};
use crate::segment::SegmentRegistry;
use crate::settings::Settings;
use crate::template::TemplateContext;
use crate::theme::{PromptStyle, Theme, ThemeRegistry, ThemeSource};
use crate::worker::AsyncWorker;

/// Which prompt the shell is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptVar {
    Ps1,
    Ps2,
    Rprompt,
}

/// The shell's variable store, as seen by the prompt subsystem.
///
/// Implementations must only hand back valid UTF-8: `String` enforces it at
/// this boundary; a shell whose variables are raw bytes rejects malformed
/// values in its implementation (the façade then falls back to the minimal
/// prompt).
pub trait SymbolTable: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;
    fn set(&mut self, name: &str, value: &str);
}

/// In-memory symbol table for tests and the CLI.
#[derive(Debug, Default)]
pub struct MemorySymbolTable {
    vars: HashMap<String, String>,
}

impl SymbolTable for MemorySymbolTable {
    fn get(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }
    fn set(&mut self, name: &str, value: &str) {
        self.vars.insert(name.to_string(), value.to_string());
    }
}

/// Composes prompts from live shell state and the active theme.
pub struct PromptComposer {
    segments: Arc<SegmentRegistry>,
    themes: Arc<ThemeRegistry>,
    symbols: Mutex<Box<dyn SymbolTable>>,
    ps1_user_managed: AtomicBool,
    ps2_user_managed: AtomicBool,
    git_snapshot: Arc<RwLock<Option<GitStatus>>>,
    worker: Option<AsyncWorker>,
    runtime: Mutex<RuntimeState>,
    sync_git_timeout: Duration,
    async_git_timeout: Duration,
}

impl PromptComposer {
    /// Build a composer with default settings (no config file lookup).
    pub fn new(symbols: Box<dyn SymbolTable>) -> Self {
        Self::with_settings(symbols, Settings::default())
    }

    /// Build a composer: registries with built-ins, user themes loaded, the
    /// configured theme activated, and (when enabled) the git worker started.
    pub fn with_settings(symbols: Box<dyn SymbolTable>, settings: Settings) -> Self {
        let segments = Arc::new(SegmentRegistry::with_builtins());
        let themes = Arc::new(ThemeRegistry::with_builtins());
        themes.load_user_themes(&segments);

        let git_snapshot: Arc<RwLock<Option<GitStatus>>> = Arc::new(RwLock::new(None));
        let worker = if settings.async_git {
            let slot = Arc::clone(&git_snapshot);
            let started = AsyncWorker::start(Box::new(move |response| {
                if let Some(status) = &response.git_status {
                    *slot.write().unwrap() = Some(status.clone());
                }
            }));
            match started {
                Ok(worker) => Some(worker),
                Err(e) => {
                    // Degrade to inline collection rather than failing init.
                    log::warn!("async git worker unavailable: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let composer = Self {
            segments,
            themes,
            symbols: Mutex::new(symbols),
            ps1_user_managed: AtomicBool::new(false),
            ps2_user_managed: AtomicBool::new(false),
            git_snapshot,
            worker,
            runtime: Mutex::new(RuntimeState::default()),
            sync_git_timeout: Duration::from_millis(settings.git_timeout_ms),
            async_git_timeout: Duration::from_millis(settings.async_git_timeout_ms),
        };

        if composer.activate_theme(&settings.theme).is_err() {
            // Unknown configured theme: fall back rather than failing init.
            log::warn!("theme {:?} not found, using default", settings.theme);
            let _ = composer.activate_theme("default");
        }
        composer
    }

    /// Update the shell-fed counters read by the next render.
    pub fn set_runtime_state(&self, state: RuntimeState) {
        *self.runtime.lock().unwrap() = state;
    }

    /// Render a prompt for the current state.
    pub fn render_prompt(&self, which: PromptVar) -> String {
        let theme = self.themes.active();
        let runtime = *self.runtime.lock().unwrap();
        let git = self.git_snapshot.read().unwrap().clone();
        let ctx = PromptContext::capture(runtime, TerminalCaps::detect(), git);

        let mut rendered = match (theme.layout.style, which) {
            (PromptStyle::Powerline, PromptVar::Ps1) => {
                powerline::render(&theme, &self.segments, &ctx, Direction::LeftToRight)
            }
            (PromptStyle::Powerline, PromptVar::Rprompt) => {
                powerline::render(&theme, &self.segments, &ctx, Direction::RightToLeft)
            }
            _ => {
                let format = self.format_for(which, &theme, &ctx);
                let tctx = TemplateContext {
                    segments: &self.segments,
                    theme: &theme,
                    ctx: &ctx,
                };
                expand::expand(&format, &ctx, Some(&tctx))
            }
        };

        if which == PromptVar::Ps1 {
            if rendered.is_empty() {
                rendered = fallback_prompt(ctx.is_root).to_string();
            }
            if theme.layout.newline_before_prompt {
                rendered.insert(0, '\n');
            }
        }
        rendered
    }

    /// The format string to expand for a plain-style render.
    fn format_for(&self, which: PromptVar, theme: &Theme, ctx: &PromptContext) -> String {
        let table = self.symbols.lock().unwrap();
        match which {
            PromptVar::Ps1 => table
                .get("PS1")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| {
                    if theme.layout.ps1_format.is_empty() {
                        fallback_prompt(ctx.is_root).to_string()
                    } else {
                        theme.layout.ps1_format.clone()
                    }
                }),
            PromptVar::Ps2 => table
                .get("PS2")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| {
                    if theme.layout.ps2_format.is_empty() {
                        "> ".to_string()
                    } else {
                        theme.layout.ps2_format.clone()
                    }
                }),
            PromptVar::Rprompt => table
                .get("RPROMPT")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| theme.layout.rprompt_format.clone()),
        }
    }

    /// Record that the shell wrote a prompt variable from user code.
    ///
    /// Flips the variable to user-managed and keeps the `PS1 ⇄ PROMPT`
    /// aliases in sync.
    pub fn notify_prompt_var_set(&self, name: &str, value: &str) {
        match name {
            "PS1" => {
                self.ps1_user_managed.store(true, Ordering::Release);
                self.symbols.lock().unwrap().set("PROMPT", value);
            }
            "PROMPT" => {
                self.ps1_user_managed.store(true, Ordering::Release);
                self.symbols.lock().unwrap().set("PS1", value);
            }
            "PS2" => {
                self.ps2_user_managed.store(true, Ordering::Release);
            }
            _ => {}
        }
    }

    /// Hand a variable back to theme management (the `unset` hook).
    pub fn reset_ownership(&self, name: &str) {
        match name {
            "PS1" | "PROMPT" => self.ps1_user_managed.store(false, Ordering::Release),
            "PS2" => self.ps2_user_managed.store(false, Ordering::Release),
            _ => {}
        }
    }

    /// Make a theme active, writing its format strings into PS1/PS2: but
    /// only for variables still under theme management.
    pub fn activate_theme(&self, name: &str) -> Result<(), PromptError> {
        let theme = self.themes.set_active(name)?;
        let mut table = self.symbols.lock().unwrap();

        if !self.ps1_user_managed.load(Ordering::Acquire) {
            table.set("PS1", &theme.layout.ps1_format);
            table.set("PROMPT", &theme.layout.ps1_format);
        }
        if !self.ps2_user_managed.load(Ordering::Acquire) {
            table.set("PS2", &theme.layout.ps2_format);
        }
        Ok(())
    }

    /// The explicit `theme set` command: reclaims both prompt variables for
    /// the theme, then activates it.
    pub fn switch_theme(&self, name: &str) -> Result<(), PromptError> {
        self.ps1_user_managed.store(false, Ordering::Release);
        self.ps2_user_managed.store(false, Ordering::Release);
        self.activate_theme(name)
    }

    /// Re-discover user themes; the active theme follows its name.
    pub fn reload_themes(&self) {
        self.themes.reload(&self.segments);
    }

    pub fn theme_list(&self) -> Vec<(String, ThemeSource)> {
        self.themes.list()
    }

    pub fn active_theme(&self) -> Arc<Theme> {
        self.themes.active()
    }

    pub fn segments(&self) -> &SegmentRegistry {
        &self.segments
    }

    /// Request a fresh git snapshot for `cwd`.
    ///
    /// With the worker running this is non-blocking: the request id is
    /// returned and the snapshot lands before some later render. Without a
    /// worker the collection runs inline.
    pub fn refresh_git_status(&self, cwd: &Path) -> Result<Option<u64>, PromptError> {
        match &self.worker {
            Some(worker) => worker
                .submit_git_status(cwd, self.async_git_timeout)
                .map(Some),
            None => {
                let status = GitStatus::collect(cwd, self.sync_git_timeout);
                *self.git_snapshot.write().unwrap() = Some(status);
                Ok(None)
            }
        }
    }

    /// Render the collapsed prompt redrawn over an accepted command line,
    /// when the active theme opts in.
    pub fn render_transient(&self) -> Option<String> {
        let theme = self.themes.active();
        if !theme.layout.enable_transient || theme.layout.transient_format.is_empty() {
            return None;
        }

        let runtime = *self.runtime.lock().unwrap();
        let git = self.git_snapshot.read().unwrap().clone();
        let ctx = PromptContext::capture(runtime, TerminalCaps::detect(), git);
        let tctx = TemplateContext {
            segments: &self.segments,
            theme: &theme,
            ctx: &ctx,
        };
        Some(expand::expand(&theme.layout.transient_format, &ctx, Some(&tctx)))
    }

    /// Most recently published git snapshot, if any.
    pub fn git_snapshot(&self) -> Option<GitStatus> {
        self.git_snapshot.read().unwrap().clone()
    }

    /// Stop the worker and wait for it; further git refreshes run inline.
    pub fn shutdown(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.shutdown();
            worker.wait();
        }
    }
}

fn fallback_prompt(is_root: bool) -> &'static str {
    if is_root {
        "# "
    } else {
        "$ "
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn composer() -> PromptComposer {
        let settings = Settings {
            async_git: false,
            ..Settings::default()
        };
        PromptComposer::with_settings(Box::new(MemorySymbolTable::default()), settings)
    }

    fn get_var(composer: &PromptComposer, name: &str) -> Option<String> {
        composer.symbols.lock().unwrap().get(name)
    }

    #[test]
    fn activation_writes_theme_formats() {
        let composer = composer();
        let theme = composer.active_theme();
        assert_eq!(get_var(&composer, "PS1").as_deref(), Some(theme.layout.ps1_format.as_str()));
        assert_eq!(get_var(&composer, "PROMPT"), get_var(&composer, "PS1"));
        assert_eq!(get_var(&composer, "PS2").as_deref(), Some("> "));
    }

    #[test]
    fn user_managed_ps1_survives_theme_activation() {
        let composer = composer();
        composer.symbols.lock().unwrap().set("PS1", "custom> ");
        composer.notify_prompt_var_set("PS1", "custom> ");

        composer.activate_theme("minimal").unwrap();
        assert_eq!(get_var(&composer, "PS1").as_deref(), Some("custom> "));
        // PS2 was still theme-managed, so it did change hands.
        assert_eq!(get_var(&composer, "PS2").as_deref(), Some("> "));
    }

    #[test]
    fn explicit_switch_reclaims_ps1() {
        let composer = composer();
        composer.symbols.lock().unwrap().set("PS1", "custom> ");
        composer.notify_prompt_var_set("PS1", "custom> ");

        composer.switch_theme("minimal").unwrap();
        assert_eq!(
            get_var(&composer, "PS1").as_deref(),
            Some("%~ ${symbol} ")
        );
    }

    #[test]
    fn unset_returns_variable_to_theme() {
        let composer = composer();
        composer.notify_prompt_var_set("PS1", "custom> ");
        composer.reset_ownership("PS1");
        composer.activate_theme("minimal").unwrap();
        assert_eq!(get_var(&composer, "PS1").as_deref(), Some("%~ ${symbol} "));
    }

    #[test]
    fn prompt_mirror_syncs_both_ways() {
        let composer = composer();
        composer.notify_prompt_var_set("PROMPT", "from-prompt> ");
        assert_eq!(get_var(&composer, "PS1").as_deref(), Some("from-prompt> "));

        composer.reset_ownership("PROMPT");
        composer.notify_prompt_var_set("PS1", "from-ps1> ");
        assert_eq!(get_var(&composer, "PROMPT").as_deref(), Some("from-ps1> "));
    }

    #[test]
    fn ps1_render_is_never_empty() {
        let composer = composer();
        composer.symbols.lock().unwrap().set("PS1", "");
        let out = composer.render_prompt(PromptVar::Ps1);
        assert!(!out.is_empty());
    }

    #[test]
    fn ps2_falls_back_to_theme_format() {
        let composer = composer();
        assert_eq!(composer.render_prompt(PromptVar::Ps2), "> ");
    }

    #[test]
    fn rprompt_defaults_to_empty() {
        let composer = composer();
        assert_eq!(composer.render_prompt(PromptVar::Rprompt), "");
    }

    #[test]
    fn transient_prompt_requires_opt_in() {
        let composer = composer();
        assert!(composer.render_transient().is_none());
    }

    #[test]
    fn sync_git_refresh_publishes_snapshot() {
        let composer = composer();
        let dir = std::env::temp_dir();
        let id = composer.refresh_git_status(&dir).unwrap();
        assert_eq!(id, None, "no worker: inline collection");
        assert!(composer.git_snapshot().is_some());
    }

    #[test]
    fn unknown_theme_activation_fails_cleanly() {
        let composer = composer();
        assert!(composer.activate_theme("no-such-theme").is_err());
        assert_eq!(composer.active_theme().name, "default");
    }
}
