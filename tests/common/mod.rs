//! Test utilities.
//!
//! `TestRepo` creates an isolated git repository in a temporary directory
//! with deterministic configuration. Git commands run with a scrubbed
//! environment so global config, hooks, and locale cannot leak into test
//! results, and each repo is cleaned up when the test ends.

use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

pub struct TestRepo {
    // Held for cleanup on drop.
    _temp_dir: TempDir,
    root: PathBuf,
}

impl TestRepo {
    /// Create a fresh repository with one initial commit on `main`.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        // Canonicalize to resolve platform symlinks (macOS /var -> /private/var).
        let root = temp_dir
            .path()
            .canonicalize()
            .expect("failed to canonicalize temp path");

        let repo = Self {
            _temp_dir: temp_dir,
            root,
        };

        repo.git(&["init", "-b", "main"]);
        repo.git(&["config", "user.name", "Test User"]);
        repo.git(&["config", "user.email", "test@example.com"]);
        repo.git(&["config", "commit.gpgsign", "false"]);
        repo.write_file("README.md", "# test\n");
        repo.git(&["add", "."]);
        repo.git(&["commit", "-m", "initial commit"]);

        repo
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run a git command in the repo, panicking on failure.
    pub fn git(&self, args: &[&str]) -> String {
        let output = self.git_cmd(args).output().expect("failed to run git");
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).into_owned()
    }

    /// A git Command with isolated environment, not yet run.
    pub fn git_cmd(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new("git");
        cmd.args(args)
            .current_dir(&self.root)
            .env_remove("GIT_DIR")
            .env_remove("GIT_WORK_TREE")
            .env("GIT_CONFIG_GLOBAL", "/dev/null")
            .env("GIT_CONFIG_SYSTEM", "/dev/null")
            .env("GIT_AUTHOR_DATE", "2024-01-01T00:00:00Z")
            .env("GIT_COMMITTER_DATE", "2024-01-01T00:00:00Z")
            .env("LC_ALL", "C");
        cmd
    }

    pub fn write_file(&self, name: &str, contents: &str) {
        let path = self.root.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create parent dirs");
        }
        std::fs::write(path, contents).expect("failed to write file");
    }

    /// Stage everything and commit.
    pub fn commit_all(&self, message: &str) {
        self.git(&["add", "."]);
        self.git(&["commit", "-m", message]);
    }
}
