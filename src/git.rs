//! Git repository status snapshots.
//!
//! Gathers everything the `git` prompt segment displays: branch, detachment,
//! porcelain counts, upstream divergence, merge/rebase state: using timed
//! `git -C` subprocesses only. Any command failure degrades to conservative
//! defaults rather than an error: a prompt must render something even when
//! git cannot answer.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::exec::{self, run_git_in_dir};

/// Structured snapshot of a repository's state at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitStatus {
    pub is_git_repo: bool,
    /// Current branch name; empty when detached or unborn.
    pub branch: String,
    /// Abbreviated commit hash; filled when detached or branch-less.
    pub commit_short: String,
    pub is_detached: bool,
    pub is_merging: bool,
    pub is_rebasing: bool,
    pub staged: u32,
    pub unstaged: u32,
    pub untracked: u32,
    pub ahead: u32,
    pub behind: u32,
    /// True when any probe was killed for exceeding the timeout.
    pub timed_out: bool,
}

impl GitStatus {
    /// True when the working tree has staged, unstaged, or untracked changes.
    pub fn is_dirty(&self) -> bool {
        self.staged > 0 || self.unstaged > 0 || self.untracked > 0
    }

    /// Collect a snapshot for `cwd`, bounding every git call by `timeout`.
    ///
    /// Outside a repository this returns a default snapshot with
    /// `is_git_repo == false`: that is a successful collection, not an error.
    pub fn collect(cwd: &Path, timeout: Duration) -> GitStatus {
        let timeout = if timeout.is_zero() {
            exec::ASYNC_TIMEOUT
        } else {
            timeout
        };

        let mut status = GitStatus::default();

        let gate = run_git_in_dir(cwd, &["rev-parse", "--git-dir"], timeout);
        status.timed_out |= gate.timed_out;
        if !gate.success() {
            return status;
        }
        status.is_git_repo = true;
        let git_dir = resolve_git_dir(cwd, &gate.stdout);

        let branch = run_git_in_dir(cwd, &["branch", "--show-current"], timeout);
        status.timed_out |= branch.timed_out;
        if branch.success() {
            status.branch = branch.stdout;
        }

        // symbolic-ref is the authoritative detachment probe: it fails on a
        // detached HEAD even when branch --show-current merely prints nothing.
        let head_ref = run_git_in_dir(cwd, &["symbolic-ref", "HEAD"], timeout);
        status.timed_out |= head_ref.timed_out;
        status.is_detached = !head_ref.success();

        if status.is_detached || status.branch.is_empty() {
            let commit = run_git_in_dir(cwd, &["rev-parse", "--short", "HEAD"], timeout);
            status.timed_out |= commit.timed_out;
            if commit.success() {
                status.commit_short = commit.stdout;
            }
        }

        let porcelain = run_git_in_dir(cwd, &["status", "--porcelain"], timeout);
        status.timed_out |= porcelain.timed_out;
        if porcelain.success() {
            let (staged, unstaged, untracked) = count_porcelain(&porcelain.stdout);
            status.staged = staged;
            status.unstaged = unstaged;
            status.untracked = untracked;
        }

        let divergence = run_git_in_dir(
            cwd,
            &["rev-list", "--left-right", "--count", "HEAD...@{upstream}"],
            timeout,
        );
        status.timed_out |= divergence.timed_out;
        if divergence.success() {
            if let Some((ahead, behind)) = parse_ahead_behind(&divergence.stdout) {
                status.ahead = ahead;
                status.behind = behind;
            }
        }

        status.is_merging = git_dir.join("MERGE_HEAD").exists();
        status.is_rebasing =
            git_dir.join("rebase-merge").exists() || git_dir.join("rebase-apply").exists();

        status
    }
}

/// `rev-parse --git-dir` reports a path relative to `cwd` for normal
/// checkouts (usually just `.git`); anchor it before probing files.
fn resolve_git_dir(cwd: &Path, reported: &str) -> PathBuf {
    let dir = Path::new(reported);
    if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        cwd.join(dir)
    }
}

/// Count staged / unstaged / untracked entries from `status --porcelain`.
///
/// Column one (non-space, non-`?`) marks an index change, column two a
/// working-tree change; `?` lines are untracked. A single line can count as
/// both staged and unstaged (e.g. `MM`).
fn count_porcelain(output: &str) -> (u32, u32, u32) {
    let mut staged = 0;
    let mut unstaged = 0;
    let mut untracked = 0;

    for line in output.lines() {
        let mut chars = line.chars();
        let x = chars.next().unwrap_or(' ');
        let y = chars.next().unwrap_or(' ');

        if x == '?' {
            untracked += 1;
            continue;
        }
        if x != ' ' {
            staged += 1;
        }
        if y != ' ' && y != '?' {
            unstaged += 1;
        }
    }

    (staged, unstaged, untracked)
}

/// Parse `rev-list --left-right --count` output: two whitespace-separated
/// integers, ahead then behind.
fn parse_ahead_behind(output: &str) -> Option<(u32, u32)> {
    let mut fields = output.split_whitespace();
    let ahead = fields.next()?.parse().ok()?;
    let behind = fields.next()?.parse().ok()?;
    Some((ahead, behind))
}
