//! Collect and print a git status snapshot.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use promptline::git::GitStatus;
use promptline::styling::println;

pub fn run(dir: Option<PathBuf>, timeout_ms: u64) -> Result<()> {
    let dir = match dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("failed to get current directory")?,
    };

    let status = GitStatus::collect(&dir, Duration::from_millis(timeout_ms));

    if !status.is_git_repo {
        println!("not a git repository");
        return Ok(());
    }

    if status.is_detached {
        println!("head      @{} (detached)", status.commit_short);
    } else {
        println!("branch    {}", status.branch);
    }
    println!("staged    {}", status.staged);
    println!("unstaged  {}", status.unstaged);
    println!("untracked {}", status.untracked);
    println!("ahead     {}", status.ahead);
    println!("behind    {}", status.behind);
    if status.is_merging {
        println!("state     merging");
    }
    if status.is_rebasing {
        println!("state     rebasing");
    }
    if status.timed_out {
        println!("warning   one or more git commands timed out");
    }
    Ok(())
}
