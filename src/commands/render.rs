//! Render a prompt for the current directory and shell state.
//!
//! One-shot equivalent of what an embedding shell does per prompt: build a
//! composer, publish a git snapshot for the cwd, feed in the runtime
//! counters, and print the rendered bytes.

use anyhow::{Context, Result};

use promptline::context::RuntimeState;
use promptline::prompt::{MemorySymbolTable, PromptComposer};
use promptline::settings::Settings;
use promptline::styling::print;
use promptline::PromptVar;

pub fn run(which: PromptVar, theme: Option<&str>, exit_status: i32, jobs: usize) -> Result<()> {
    let settings = Settings {
        // One-shot render: collect git inline instead of racing a worker.
        async_git: false,
        ..Settings::load().unwrap_or_default()
    };

    let composer = PromptComposer::with_settings(Box::new(MemorySymbolTable::default()), settings);
    if let Some(name) = theme {
        composer
            .switch_theme(name)
            .with_context(|| format!("unknown theme '{name}'"))?;
    }

    let cwd = std::env::current_dir().context("failed to get current directory")?;
    let _ = composer.refresh_git_status(&cwd);

    composer.set_runtime_state(RuntimeState {
        last_exit_status: exit_status,
        job_count: jobs,
        ..Default::default()
    });

    print!("{}", composer.render_prompt(which));
    Ok(())
}
